// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Maintenance route tests (reconcile, reprocess).

use axum::http::StatusCode;
use fit_pipeline::db::ActivityStore;
use fit_pipeline::models::ActivityStatus;
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{create_test_app, fit, uploaded_record, BUCKET};

const TOKEN: &str = "test_tasks_token";

#[tokio::test]
async fn test_tasks_require_token() {
    let app = create_test_app();

    let (status, _) = app.post_json("/tasks/reconcile", json!({}), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post_json("/tasks/reconcile", json!({}), Some("wrong"))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post_json(
            "/tasks/reprocess",
            json!({"bucket": BUCKET, "name": "a.fit"}),
            Some("wrong"),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.db().write_count(), 0);
}

#[tokio::test]
async fn test_reconcile_marks_stuck_uploads() {
    let app = create_test_app();
    app.db()
        .insert(uploaded_record("stale", "2000-01-01T00:00:00Z"))
        .unwrap();
    let recent = fit_pipeline::time_utils::format_utc_rfc3339(chrono::Utc::now());
    app.db().insert(uploaded_record("recent", &recent)).unwrap();

    let (status, body) = app
        .post_json("/tasks/reconcile", json!({}), Some(TOKEN))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["failed"], json!(["stale"]));

    let stale = app.db().get_activity("stale").await.unwrap().unwrap();
    assert_eq!(stale.status(), ActivityStatus::Error);
    let recent = app.db().get_activity("recent").await.unwrap().unwrap();
    assert_eq!(recent.status(), ActivityStatus::Uploaded);
}

#[tokio::test]
async fn test_reprocess_runs_ingestion() {
    let app = create_test_app();
    app.seed_uploaded("abc123");
    app.seed_upload("rides/abc123.fit", fit::two_lap_activity());

    let (status, body) = app
        .post_json(
            "/tasks/reprocess",
            json!({"bucket": BUCKET, "name": "rides/abc123.fit"}),
            Some(TOKEN),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "processed");
    assert_eq!(body["artifact_path"], "rides/abc123.json.gz");

    let record = app.db().get_activity("abc123").await.unwrap().unwrap();
    assert_eq!(record.status(), ActivityStatus::Processed);
}

#[tokio::test]
async fn test_reprocess_reports_failures() {
    let app = create_test_app();
    app.seed_upload("missing.fit", fit::two_lap_activity());

    let (status, body) = app
        .post_json(
            "/tasks/reprocess",
            json!({"bucket": BUCKET, "name": "missing.fit"}),
            Some(TOKEN),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_health() {
    let app = create_test_app();
    let request = axum::http::Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
