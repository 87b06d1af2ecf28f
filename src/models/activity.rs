// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity record stored in Firestore.

use serde::{Deserialize, Serialize};

/// Processing lifecycle of an uploaded activity.
///
/// `Uploaded` is written by the client when the raw file is stored.
/// The ingestion pipeline moves it to `Processed` or `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActivityStatus {
    #[default]
    Uploaded,
    Processed,
    Error,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Uploaded => "Uploaded",
            ActivityStatus::Processed => "Processed",
            ActivityStatus::Error => "Error",
        }
    }
}

/// Stored activity record (document ID is the activity ID).
///
/// Every field is optional on read: the client creates the document with
/// only a subset of them before the pipeline has run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityRecord {
    /// Activity ID (the document ID; filled from `_firestore_id` on read)
    #[serde(alias = "_firestore_id")]
    pub id: String,
    /// Missing status means the client never set one; treated as `Uploaded`.
    pub status: Option<ActivityStatus>,
    /// Blob path of the converted `.json.gz` artifact
    pub fit_file: Option<String>,
    /// File creation time from the decoded activity (RFC 3339)
    pub timestamp: Option<String>,
    /// Session distance, in the configured length unit
    pub distance: Option<f64>,
    /// Session average power (watts)
    pub average_power: Option<f64>,
    /// Session average speed, in the configured speed unit
    pub average_speed: Option<f64>,
    /// When the client uploaded the raw file (RFC 3339)
    pub uploaded_at: Option<String>,
    /// When the pipeline last committed a result (RFC 3339)
    pub processed_at: Option<String>,
    /// Diagnostic for `status == Error`
    pub error_message: Option<String>,
}

impl ActivityRecord {
    pub fn status(&self) -> ActivityStatus {
        self.status.unwrap_or_default()
    }

    /// Artifact path, only when it is valid to dereference.
    pub fn processed_artifact(&self) -> Option<&str> {
        match self.status() {
            ActivityStatus::Processed => self.fit_file.as_deref(),
            _ => None,
        }
    }
}

/// Fields written on successful ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedSummary {
    pub fit_file: String,
    pub timestamp: Option<String>,
    pub distance: Option<f64>,
    pub average_power: Option<f64>,
    pub average_speed: Option<f64>,
    pub processed_at: String,
}

impl ProcessedSummary {
    /// Apply the summary to a record, as a partial merge would.
    pub fn apply_to(&self, record: &mut ActivityRecord) {
        record.status = Some(ActivityStatus::Processed);
        record.fit_file = Some(self.fit_file.clone());
        record.timestamp = self.timestamp.clone();
        record.distance = self.distance;
        record.average_power = self.average_power;
        record.average_speed = self.average_speed;
        record.processed_at = Some(self.processed_at.clone());
        record.error_message = None;
    }
}
