// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations on activity records.

use crate::db::{collections, ActivityStore};
use crate::error::AppError;
use crate::models::{ActivityRecord, ActivityStatus, ProcessedSummary};
use serde::{Deserialize, Serialize};

/// Fields written when an activity is processed.
const PROCESSED_FIELDS: [&str; 8] = [
    "status",
    "fitFile",
    "timestamp",
    "distance",
    "averagePower",
    "averageSpeed",
    "processedAt",
    "errorMessage",
];

/// Fields written when processing fails.
const FAILED_FIELDS: [&str; 3] = ["status", "errorMessage", "processedAt"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessedPatch {
    status: ActivityStatus,
    fit_file: String,
    timestamp: Option<String>,
    distance: Option<f64>,
    average_power: Option<f64>,
    average_speed: Option<f64>,
    processed_at: String,
    error_message: Option<String>,
}

impl From<&ProcessedSummary> for ProcessedPatch {
    fn from(summary: &ProcessedSummary) -> Self {
        Self {
            status: ActivityStatus::Processed,
            fit_file: summary.fit_file.clone(),
            timestamp: summary.timestamp.clone(),
            distance: summary.distance,
            average_power: summary.average_power,
            average_speed: summary.average_speed,
            processed_at: summary.processed_at.clone(),
            error_message: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FailedPatch {
    status: ActivityStatus,
    error_message: String,
    processed_at: String,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // The emulator accepts any bearer token; hand it an unsigned one.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Create or replace a whole activity record.
    ///
    /// The client owns record creation; this exists for seeding and tests.
    pub async fn set_activity(&self, record: &ActivityRecord) -> Result<(), AppError> {
        let _: ActivityRecord = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .document_id(&record.id)
            .object(record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete an activity record.
    pub async fn delete_activity(&self, activity_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::ACTIVITIES)
            .document_id(activity_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

impl ActivityStore for FirestoreDb {
    async fn get_activity(&self, activity_id: &str) -> Result<Option<ActivityRecord>, AppError> {
        let record: Option<ActivityRecord> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(activity_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(record.map(|mut r| {
            if r.id.is_empty() {
                r.id = activity_id.to_string();
            }
            r
        }))
    }

    async fn mark_processed(
        &self,
        activity_id: &str,
        summary: &ProcessedSummary,
    ) -> Result<(), AppError> {
        let patch = ProcessedPatch::from(summary);

        let _: ActivityRecord = self
            .get_client()?
            .fluent()
            .update()
            .fields(PROCESSED_FIELDS)
            .in_col(collections::ACTIVITIES)
            .document_id(activity_id)
            .object(&patch)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    async fn mark_failed(
        &self,
        activity_id: &str,
        message: &str,
        failed_at: &str,
    ) -> Result<(), AppError> {
        let patch = FailedPatch {
            status: ActivityStatus::Error,
            error_message: message.to_string(),
            processed_at: failed_at.to_string(),
        };

        let _: ActivityRecord = self
            .get_client()?
            .fluent()
            .update()
            .fields(FAILED_FIELDS)
            .in_col(collections::ACTIVITIES)
            .document_id(activity_id)
            .object(&patch)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    async fn list_stuck(&self, cutoff: &str) -> Result<Vec<ActivityRecord>, AppError> {
        // A missing `status` reads as `Uploaded`, which an equality filter
        // cannot match, so status is checked after the range query.
        let cutoff = cutoff.to_string();
        let candidates: Vec<ActivityRecord> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| q.field("uploadedAt").less_than(cutoff.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(candidates
            .into_iter()
            .filter(|r| r.status() == ActivityStatus::Uploaded)
            .collect())
    }
}
