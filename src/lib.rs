// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! FIT pipeline: ingest uploaded FIT activity files and serve their series.
//!
//! Uploads land in Cloud Storage; each finalize event is decoded into a
//! gzipped JSON artifact stored next to the upload and summarized onto the
//! activity's Firestore record. A callable query flattens the artifact into
//! a lap-tagged time series for charting.

pub mod config;
pub mod db;
pub mod error;
pub mod fit;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use fit::FitDecoder;
use storage::GcsStorage;

/// Shared application state.
///
/// Generic over the stores so tests can run the full router in memory.
pub struct AppState<D = FirestoreDb, B = GcsStorage> {
    pub config: Config,
    pub db: D,
    pub blobs: B,
    pub decoder: FitDecoder,
}

impl<D, B> AppState<D, B> {
    pub fn new(config: Config, db: D, blobs: B) -> Self {
        let decoder = FitDecoder::new(config.decoder.clone());
        Self {
            config,
            db,
            blobs,
            decoder,
        }
    }
}
