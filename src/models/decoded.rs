// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Decoded FIT activity, persisted as the compressed JSON artifact.
//!
//! Units follow the decoder configuration (speed, length, temperature);
//! power is in watts, cadence in rpm, times in seconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Root of the artifact document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodedFile {
    pub activity: DecodedActivity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodedActivity {
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sessions: Vec<Session>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub start_time: Option<DateTime<Utc>>,
    pub total_elapsed_time: Option<f64>,
    pub avg_speed: Option<f64>,
    pub avg_cadence: Option<f64>,
    pub avg_power: Option<f64>,
    pub total_distance: Option<f64>,
    pub total_ascent: Option<f64>,
    pub total_descent: Option<f64>,
    #[serde(default)]
    pub laps: Vec<Lap>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lap {
    pub start_time: Option<DateTime<Utc>>,
    pub total_elapsed_time: Option<f64>,
    pub total_distance: Option<f64>,
    #[serde(default)]
    pub records: Vec<Record>,
}

/// One sample. Sensor-dependent fields are absent when not recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cadence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl DecodedFile {
    /// The session the summary and the series are built from.
    pub fn primary_session(&self) -> Option<&Session> {
        self.activity.sessions.first()
    }
}

impl Session {
    pub fn record_count(&self) -> usize {
        self.laps.iter().map(|lap| lap.records.len()).sum()
    }
}
