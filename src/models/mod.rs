// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod decoded;
pub mod series;

pub use activity::{ActivityRecord, ActivityStatus, ProcessedSummary};
pub use decoded::{DecodedActivity, DecodedFile, Lap, Record, Session};
pub use series::{ActivitySeries, SeriesPoint};
