// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Upload ingestion service.
//!
//! Handles the core workflow for a newly stored raw upload:
//! 1. Filter out anything that is not a `.fit` file
//! 2. Download the raw file into a scoped scratch directory
//! 3. Decode it and write the gzipped JSON artifact next to the upload
//! 4. Commit summary fields and the artifact path to the activity record
//!
//! Any failure after the record is known to exist marks it `Error`.

use crate::db::ActivityStore;
use crate::error::{AppError, Result};
use crate::fit::FitDecoder;
use crate::models::{DecodedFile, ProcessedSummary};
use crate::services::artifact::{self, ARTIFACT_CONTENT_TYPE, ARTIFACT_SUFFIX, FIT_EXTENSION};
use crate::storage::BlobStore;
use crate::time_utils::format_utc_rfc3339;
use serde::Deserialize;
use std::path::Path;

/// Object-finalize notification from Cloud Storage.
///
/// Only `bucket` and `name` are used; the rest of the object resource is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageEvent {
    pub bucket: String,
    pub name: String,
}

/// Result of handling one upload event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Not a FIT upload; nothing was touched.
    Skipped,
    Processed {
        activity_id: String,
        artifact_path: String,
        sessions: usize,
        records: usize,
    },
}

/// Converts raw uploads into artifacts and commits them to activity records.
pub struct UploadProcessor<'a, D, B> {
    db: &'a D,
    blobs: &'a B,
    decoder: &'a FitDecoder,
    scratch_root: &'a Path,
}

impl<'a, D: ActivityStore, B: BlobStore> UploadProcessor<'a, D, B> {
    pub fn new(db: &'a D, blobs: &'a B, decoder: &'a FitDecoder, scratch_root: &'a Path) -> Self {
        Self {
            db,
            blobs,
            decoder,
            scratch_root,
        }
    }

    /// Handle an event without propagating failures.
    ///
    /// Errors are logged (and recorded on the activity where possible);
    /// the caller only learns whether something was processed.
    pub async fn handle_event(&self, event: &StorageEvent) -> Option<IngestOutcome> {
        match self.process(event).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!(
                    bucket = %event.bucket,
                    object = %event.name,
                    error = %e,
                    "Failed to ingest upload"
                );
                None
            }
        }
    }

    /// Process one upload event.
    pub async fn process(&self, event: &StorageEvent) -> Result<IngestOutcome> {
        if !artifact::is_fit_file(&event.name) {
            tracing::info!(
                bucket = %event.bucket,
                object = %event.name,
                "Ignoring non-FIT upload"
            );
            return Ok(IngestOutcome::Skipped);
        }

        let activity_id = artifact::activity_id_from_path(&event.name);
        tracing::info!(
            activity_id,
            bucket = %event.bucket,
            object = %event.name,
            "Processing upload"
        );

        if !self.db.activity_exists(activity_id).await? {
            tracing::warn!(activity_id, "No activity record for upload, skipping");
            return Err(AppError::NotFound(format!(
                "Activity {} not found",
                activity_id
            )));
        }

        match self.convert_and_commit(event, activity_id).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let failed_at = format_utc_rfc3339(chrono::Utc::now());
                if let Err(db_err) = self
                    .db
                    .mark_failed(activity_id, &e.to_string(), &failed_at)
                    .await
                {
                    tracing::error!(
                        activity_id,
                        error = %db_err,
                        "Failed to record ingestion failure"
                    );
                }
                Err(e)
            }
        }
    }

    async fn convert_and_commit(
        &self,
        event: &StorageEvent,
        activity_id: &str,
    ) -> Result<IngestOutcome> {
        tokio::fs::create_dir_all(self.scratch_root).await?;
        let scratch = tempfile::Builder::new()
            .prefix("ingest-")
            .tempdir_in(self.scratch_root)?;

        let result = self.convert(event, activity_id, scratch.path()).await;

        // Runs on both paths; Drop would also remove it, but silently.
        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            tracing::warn!(
                path = %scratch_path.display(),
                error = %e,
                "Failed to remove scratch directory"
            );
        }

        let (summary, decoded) = result?;

        self.db.mark_processed(activity_id, &summary).await?;

        let sessions = decoded.activity.sessions.len();
        let records = decoded
            .primary_session()
            .map(|s| s.record_count())
            .unwrap_or(0);

        tracing::info!(
            activity_id,
            artifact = %summary.fit_file,
            sessions,
            records,
            "Activity processed"
        );

        Ok(IngestOutcome::Processed {
            activity_id: activity_id.to_string(),
            artifact_path: summary.fit_file,
            sessions,
            records,
        })
    }

    /// Download, decode, encode and upload. Leaves files only in `scratch`.
    async fn convert(
        &self,
        event: &StorageEvent,
        activity_id: &str,
        scratch: &Path,
    ) -> Result<(ProcessedSummary, DecodedFile)> {
        let raw_path = scratch.join(format!("{}.{}", activity_id, FIT_EXTENSION));
        self.blobs
            .download_to(&event.bucket, &event.name, &raw_path)
            .await?;

        let bytes = tokio::fs::read(&raw_path).await?;
        let decoded = self.decoder.decode(&bytes)?;

        let session_count = decoded.activity.sessions.len();
        if session_count > 1 {
            tracing::warn!(
                activity_id,
                sessions = session_count,
                "Multi-session file; summary uses the first session"
            );
        }

        let compressed = artifact::encode(&decoded)?;
        let local_artifact = scratch.join(format!("{}{}", activity_id, ARTIFACT_SUFFIX));
        tokio::fs::write(&local_artifact, &compressed).await?;

        let artifact_path = artifact::artifact_path(&event.name);
        self.blobs
            .upload_from(
                &event.bucket,
                &artifact_path,
                &local_artifact,
                ARTIFACT_CONTENT_TYPE,
            )
            .await?;

        tracing::debug!(
            activity_id,
            raw_bytes = bytes.len(),
            artifact_bytes = compressed.len(),
            "Artifact uploaded"
        );

        let summary = summarize(&decoded, artifact_path);
        Ok((summary, decoded))
    }
}

/// Summary fields for the activity record, from the first session.
fn summarize(decoded: &DecodedFile, artifact_path: String) -> ProcessedSummary {
    let session = decoded.primary_session();
    let timestamp = decoded
        .activity
        .timestamp
        .or_else(|| session.and_then(|s| s.start_time));

    ProcessedSummary {
        fit_file: artifact_path,
        timestamp: timestamp.map(format_utc_rfc3339),
        distance: session.and_then(|s| s.total_distance),
        average_power: session.and_then(|s| s.avg_power),
        average_speed: session.and_then(|s| s.avg_speed),
        processed_at: format_utc_rfc3339(chrono::Utc::now()),
    }
}
