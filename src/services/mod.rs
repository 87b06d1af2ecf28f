// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod artifact;
pub mod ingest;
pub mod query;
pub mod reconcile;

pub use ingest::{IngestOutcome, StorageEvent, UploadProcessor};
pub use query::{project_series, SeriesQuery, SeriesRequest};
pub use reconcile::reconcile_stuck;
