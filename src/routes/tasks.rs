// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Maintenance task routes.
//!
//! Called by Cloud Scheduler or an operator, not by users. Protected by the
//! shared tasks token (see `middleware::tasks_auth`).

use crate::db::ActivityStore;
use crate::error::AppError;
use crate::services::{reconcile_stuck, IngestOutcome, StorageEvent, UploadProcessor};
use crate::storage::BlobStore;
use crate::AppState;
use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Task handler routes.
pub fn routes<D: ActivityStore, B: BlobStore>() -> Router<Arc<AppState<D, B>>> {
    Router::new()
        .route("/tasks/reconcile", post(reconcile::<D, B>))
        .route("/tasks/reprocess", post(reprocess::<D, B>))
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub failed: Vec<String>,
}

/// Mark activities stuck in `Uploaded` as failed.
async fn reconcile<D: ActivityStore, B: BlobStore>(
    State(state): State<Arc<AppState<D, B>>>,
) -> Result<Json<ReconcileResponse>, AppError> {
    let stuck_after = chrono::Duration::minutes(state.config.stuck_after_minutes);
    let failed = reconcile_stuck(&state.db, chrono::Utc::now(), stuck_after).await?;

    tracing::info!(count = failed.len(), "Reconciliation complete");

    Ok(Json(ReconcileResponse { failed }))
}

#[derive(Debug, Serialize)]
pub struct ReprocessResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<String>,
}

/// Re-run ingestion for an uploaded object.
///
/// Unlike the event route, failures are returned to the caller.
async fn reprocess<D: ActivityStore, B: BlobStore>(
    State(state): State<Arc<AppState<D, B>>>,
    Json(event): Json<StorageEvent>,
) -> Result<Json<ReprocessResponse>, AppError> {
    tracing::info!(bucket = %event.bucket, object = %event.name, "Reprocessing upload");

    let processor = UploadProcessor::new(
        &state.db,
        &state.blobs,
        &state.decoder,
        &state.config.scratch_dir,
    );

    let response = match processor.process(&event).await? {
        IngestOutcome::Skipped => ReprocessResponse {
            outcome: "skipped",
            activity_id: None,
            artifact_path: None,
        },
        IngestOutcome::Processed {
            activity_id,
            artifact_path,
            ..
        } => ReprocessResponse {
            outcome: "processed",
            activity_id: Some(activity_id),
            artifact_path: Some(artifact_path),
        },
    };

    Ok(Json(response))
}
