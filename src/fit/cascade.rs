// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Assembly of flat FIT messages into sessions, laps and records.
//!
//! FIT writes a lap message when the lap ends and a session message when
//! the session ends, so records are buffered until the next lap closes
//! them and laps until the next session does.

use super::{DecodeError, DecoderConfig};
use crate::models::{DecodedActivity, DecodedFile, Lap, Record, Session};
use chrono::{DateTime, Utc};
use fitparser::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum MessageKind {
    FileId,
    Activity,
    Session,
    Lap,
    Record,
}

/// One decoded message, fields keyed by profile name.
#[derive(Debug, Clone)]
pub(super) struct Message {
    kind: MessageKind,
    fields: HashMap<String, Value>,
}

impl Message {
    pub(super) fn new(kind: MessageKind, fields: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            kind,
            fields: fields.into_iter().collect(),
        }
    }

    fn time(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.fields.get(name)? {
            Value::Timestamp(t) => Some(t.with_timezone(&Utc)),
            _ => None,
        }
    }

    /// First present numeric field among `names`, in order of preference.
    fn number(&self, names: &[&str]) -> Option<f64> {
        names
            .iter()
            .find_map(|name| self.fields.get(*name).and_then(numeric))
    }
}

fn numeric(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Byte(v) | Value::Enum(v) | Value::UInt8(v) | Value::UInt8z(v) => Some(f64::from(*v)),
        Value::SInt8(v) => Some(f64::from(*v)),
        Value::UInt16(v) | Value::UInt16z(v) => Some(f64::from(*v)),
        Value::SInt16(v) => Some(f64::from(*v)),
        Value::UInt32(v) | Value::UInt32z(v) => Some(f64::from(*v)),
        Value::SInt32(v) => Some(f64::from(*v)),
        Value::UInt64(v) | Value::UInt64z(v) => Some(*v as f64),
        Value::SInt64(v) => Some(*v as f64),
        Value::Float32(v) => Some(f64::from(*v)),
        Value::Float64(v) => Some(*v),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

pub(super) struct CascadeBuilder<'a> {
    config: &'a DecoderConfig,
    time_created: Option<DateTime<Utc>>,
    activity_timestamp: Option<DateTime<Utc>>,
    first_record_time: Option<DateTime<Utc>>,
    pending_records: Vec<Record>,
    pending_laps: Vec<Lap>,
    sessions: Vec<Session>,
}

impl<'a> CascadeBuilder<'a> {
    pub(super) fn new(config: &'a DecoderConfig) -> Self {
        Self {
            config,
            time_created: None,
            activity_timestamp: None,
            first_record_time: None,
            pending_records: Vec::new(),
            pending_laps: Vec::new(),
            sessions: Vec::new(),
        }
    }

    pub(super) fn push(&mut self, message: &Message) {
        match message.kind {
            MessageKind::FileId => {
                self.time_created = self.time_created.or(message.time("time_created"));
            }
            MessageKind::Activity => {
                self.activity_timestamp = message.time("timestamp");
            }
            MessageKind::Record => {
                let record = self.record(message);
                self.pending_records.push(record);
            }
            MessageKind::Lap => {
                let lap = Lap {
                    start_time: message.time("start_time"),
                    total_elapsed_time: message.number(&["total_elapsed_time"]),
                    total_distance: message
                        .number(&["total_distance"])
                        .map(|m| self.config.length_unit.convert(m)),
                    records: std::mem::take(&mut self.pending_records),
                };
                self.pending_laps.push(lap);
            }
            MessageKind::Session => {
                let session = self.session(message);
                self.sessions.push(session);
            }
        }
    }

    fn record(&mut self, message: &Message) -> Record {
        let config = self.config;
        let timestamp = message.time("timestamp");

        let elapsed_time = if config.elapsed_record_field {
            timestamp.map(|t| {
                let start = *self.first_record_time.get_or_insert(t);
                (t - start).num_milliseconds() as f64 / 1000.0
            })
        } else {
            None
        };

        Record {
            timestamp,
            elapsed_time,
            distance: message
                .number(&["distance"])
                .map(|m| config.length_unit.convert(m)),
            power: message.number(&["power"]),
            altitude: message.number(&["enhanced_altitude", "altitude"]),
            speed: message
                .number(&["enhanced_speed", "speed"])
                .map(|mps| config.speed_unit.convert(mps)),
            cadence: message.number(&["cadence"]),
            heart_rate: message.number(&["heart_rate"]),
            temperature: message
                .number(&["temperature"])
                .map(|c| config.temperature_unit.convert(c)),
        }
    }

    fn session(&mut self, message: &Message) -> Session {
        let config = self.config;
        Session {
            start_time: message.time("start_time"),
            total_elapsed_time: message.number(&["total_elapsed_time"]),
            avg_speed: message
                .number(&["enhanced_avg_speed", "avg_speed"])
                .map(|mps| config.speed_unit.convert(mps)),
            avg_cadence: message.number(&["avg_cadence"]),
            avg_power: message.number(&["avg_power"]),
            total_distance: message
                .number(&["total_distance"])
                .map(|m| config.length_unit.convert(m)),
            total_ascent: message.number(&["total_ascent"]),
            total_descent: message.number(&["total_descent"]),
            laps: std::mem::take(&mut self.pending_laps),
        }
    }

    pub(super) fn finish(mut self) -> Result<DecodedFile, DecodeError> {
        if !self.pending_records.is_empty() {
            self.pending_laps.push(Lap {
                records: std::mem::take(&mut self.pending_records),
                ..Default::default()
            });
        }

        if !self.pending_laps.is_empty() {
            let laps = std::mem::take(&mut self.pending_laps);
            match self.sessions.last_mut() {
                Some(session) => session.laps.extend(laps),
                None => self.sessions.push(Session {
                    laps,
                    ..Default::default()
                }),
            }
        }

        if self.sessions.is_empty() {
            return Err(DecodeError::NoSessions);
        }

        Ok(DecodedFile {
            activity: DecodedActivity {
                timestamp: self.time_created.or(self.activity_timestamp),
                sessions: self.sessions,
            },
        })
    }
}
