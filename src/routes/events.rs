// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Cloud Storage object-finalize notifications.
//!
//! Delivered by Eventarc as the object resource, either bare or wrapped in a
//! CloudEvent-style `{"data": ...}` envelope.

use crate::db::ActivityStore;
use crate::error::AppError;
use crate::services::{IngestOutcome, StorageEvent, UploadProcessor};
use crate::storage::BlobStore;
use crate::AppState;
use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes<D: ActivityStore, B: BlobStore>() -> Router<Arc<AppState<D, B>>> {
    Router::new().route("/events/storage", post(handle_storage_event::<D, B>))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EventEnvelope {
    Wrapped { data: StorageEvent },
    Bare(StorageEvent),
}

impl EventEnvelope {
    fn into_event(self) -> StorageEvent {
        match self {
            EventEnvelope::Wrapped { data } => data,
            EventEnvelope::Bare(event) => event,
        }
    }
}

/// Acknowledgement body. The event source ignores it; it aids debugging.
#[derive(Debug, Serialize)]
pub struct EventAck {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
}

/// Run ingestion for one finalize event.
///
/// Always acknowledged once parsed: failures are logged and recorded on the
/// activity, and a redelivery would not change the outcome.
async fn handle_storage_event<D: ActivityStore, B: BlobStore>(
    State(state): State<Arc<AppState<D, B>>>,
    body: Bytes,
) -> Result<Json<EventAck>, AppError> {
    let event = serde_json::from_slice::<EventEnvelope>(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid storage event: {}", e)))?
        .into_event();

    let processor = UploadProcessor::new(
        &state.db,
        &state.blobs,
        &state.decoder,
        &state.config.scratch_dir,
    );

    let ack = match processor.handle_event(&event).await {
        Some(IngestOutcome::Skipped) => EventAck {
            outcome: "skipped",
            activity_id: None,
        },
        Some(IngestOutcome::Processed { activity_id, .. }) => EventAck {
            outcome: "processed",
            activity_id: Some(activity_id),
        },
        None => EventAck {
            outcome: "failed",
            activity_id: None,
        },
    };

    Ok(Json(ack))
}
