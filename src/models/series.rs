// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Flattened time series returned to the client.

use chrono::{DateTime, Utc};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Session aggregates plus every sample, tagged with its lap.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivitySeries {
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub start_time: Option<DateTime<Utc>>,
    pub total_elapsed_time: Option<f64>,
    pub avg_speed: Option<f64>,
    pub avg_cadence: Option<f64>,
    pub avg_power: Option<f64>,
    pub total_distance: Option<f64>,
    pub total_ascent: Option<f64>,
    pub total_descent: Option<f64>,
    pub lap_count: usize,
    pub session_count: usize,
    pub points: Vec<SeriesPoint>,
}

/// One sample. `lap` is 1-based by position in the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SeriesPoint {
    pub lap: usize,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<f64>,
    pub distance: Option<f64>,
    pub power: Option<f64>,
    pub altitude: Option<f64>,
    pub speed: Option<f64>,
    pub cadence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}
