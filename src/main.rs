// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! FIT pipeline API server
//!
//! Receives Cloud Storage finalize events for uploaded FIT files and serves
//! the decoded activity series to authenticated callers.

use fit_pipeline::{config::Config, db::FirestoreDb, storage::GcsStorage, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        port = config.port,
        bucket = %config.storage_bucket,
        scratch_dir = %config.scratch_dir.display(),
        "Starting FIT pipeline"
    );

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Initialize Cloud Storage
    let blobs = GcsStorage::new()
        .await
        .expect("Failed to connect to Cloud Storage");

    tokio::fs::create_dir_all(&config.scratch_dir).await?;

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db, blobs));

    // Build router
    let app = fit_pipeline::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fit_pipeline=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
