// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Callable functions used by the web client.
//!
//! Requests use the callable convention `{"data": {...}}` and answer with
//! `{"result": ...}` or a typed `{"error": {"code", "message"}}`.

use crate::db::ActivityStore;
use crate::error::{CallError, CallErrorCode};
use crate::middleware::Caller;
use crate::models::ActivitySeries;
use crate::services::{SeriesQuery, SeriesRequest};
use crate::storage::BlobStore;
use crate::AppState;
use axum::{body::Bytes, extract::State, routing::post, Extension, Json, Router};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub fn routes<D: ActivityStore, B: BlobStore>() -> Router<Arc<AppState<D, B>>> {
    Router::new().route(
        "/functions/activity-series",
        post(activity_series::<D, B>),
    )
}

/// Successful callable response.
#[derive(Debug, Serialize)]
pub struct CallResult<T> {
    pub result: T,
}

/// Unwrap the callable envelope; a bare object is accepted too.
fn parse_call<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, CallError> {
    let invalid = |msg: String| CallError::new(CallErrorCode::InvalidArgument, msg);

    let value: Value = if body.is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(body).map_err(|e| invalid(format!("Invalid JSON: {}", e)))?
    };

    let args = match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };

    serde_json::from_value(args).map_err(|e| invalid(format!("Invalid arguments: {}", e)))
}

/// Flattened series for one processed activity.
async fn activity_series<D: ActivityStore, B: BlobStore>(
    State(state): State<Arc<AppState<D, B>>>,
    Extension(caller): Extension<Caller>,
    body: Bytes,
) -> Result<Json<CallResult<ActivitySeries>>, CallError> {
    let request: SeriesRequest = parse_call(&body)?;

    let query = SeriesQuery::new(
        &state.db,
        &state.blobs,
        &state.config.storage_bucket,
        &state.config.scratch_dir,
    );
    let series = query.fetch(caller.user_id(), &request).await?;

    Ok(Json(CallResult { result: series }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_call_envelope() {
        let req: SeriesRequest = parse_call(br#"{"data":{"activity":"abc"}}"#).unwrap();
        assert_eq!(req.activity.as_deref(), Some("abc"));

        let req: SeriesRequest = parse_call(br#"{"activity":"abc"}"#).unwrap();
        assert_eq!(req.activity.as_deref(), Some("abc"));

        let req: SeriesRequest = parse_call(b"").unwrap();
        assert!(req.activity.is_none());
    }

    #[test]
    fn test_parse_call_rejects_wrong_types() {
        let err = parse_call::<SeriesRequest>(br#"{"data":{"activity":42}}"#).unwrap_err();
        assert_eq!(err.code, CallErrorCode::InvalidArgument);

        let err = parse_call::<SeriesRequest>(b"not json").unwrap_err();
        assert_eq!(err.code, CallErrorCode::InvalidArgument);
    }
}
