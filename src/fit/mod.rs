// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! FIT activity file decoder.
//!
//! Binary parsing (definitions, scaling, CRCs) is delegated to `fitparser`.
//! This module turns its flat message list into the nested
//! session → lap → record structure stored in the artifact.

mod cascade;
pub mod units;

use crate::models::DecodedFile;
use cascade::{CascadeBuilder, Message, MessageKind};
use fitparser::de::DecodeOption;
use fitparser::profile::MesgNum;
use std::collections::HashSet;

pub use units::{LengthUnit, SpeedUnit, TemperatureUnit, UnknownSetting};

/// How strictly the file's integrity is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Header and data CRCs must match.
    #[default]
    Strict,
    /// CRC mismatches are ignored.
    Lenient,
}

impl std::str::FromStr for DecodeMode {
    type Err = UnknownSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(DecodeMode::Strict),
            "lenient" => Ok(DecodeMode::Lenient),
            other => Err(UnknownSetting(other.to_string())),
        }
    }
}

/// Decoder settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderConfig {
    pub speed_unit: SpeedUnit,
    pub length_unit: LengthUnit,
    pub temperature_unit: TemperatureUnit,
    pub mode: DecodeMode,
    /// Add `elapsed_time` (seconds since the first record) to each record.
    pub elapsed_record_field: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            speed_unit: SpeedUnit::default(),
            length_unit: LengthUnit::default(),
            temperature_unit: TemperatureUnit::default(),
            mode: DecodeMode::default(),
            elapsed_record_field: true,
        }
    }
}

/// Smallest valid FIT file header (the 14-byte form adds a CRC).
const MIN_HEADER_LEN: usize = 12;

/// Decoding failures.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The parser rejected the buffer (bad header, truncated data, CRC).
    #[error("malformed FIT file: {0}")]
    Malformed(String),

    #[error("FIT file contains no activity data")]
    NoSessions,
}

/// Decodes FIT buffers into [`DecodedFile`]s.
#[derive(Debug, Clone, Default)]
pub struct FitDecoder {
    config: DecoderConfig,
}

impl FitDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// Decode a complete FIT file held in memory.
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedFile, DecodeError> {
        if bytes.len() < MIN_HEADER_LEN {
            return Err(DecodeError::Malformed(format!(
                "{} bytes is shorter than a FIT header",
                bytes.len()
            )));
        }

        let mut options = HashSet::new();
        if self.config.mode == DecodeMode::Lenient {
            options.insert(DecodeOption::SkipHeaderCrcValidation);
            options.insert(DecodeOption::SkipDataCrcValidation);
        }

        let mut reader = bytes;
        let data_records = fitparser::de::from_reader_with_options(&mut reader, &options)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;

        tracing::debug!(
            messages = data_records.len(),
            bytes = bytes.len(),
            "FIT messages parsed"
        );

        let mut builder = CascadeBuilder::new(&self.config);
        for data_record in &data_records {
            let kind = match data_record.kind() {
                MesgNum::FileId => MessageKind::FileId,
                MesgNum::Activity => MessageKind::Activity,
                MesgNum::Session => MessageKind::Session,
                MesgNum::Lap => MessageKind::Lap,
                MesgNum::Record => MessageKind::Record,
                _ => continue,
            };
            let message = Message::new(
                kind,
                data_record
                    .fields()
                    .iter()
                    .map(|field| (field.name().to_string(), field.value().clone())),
            );
            builder.push(&message);
        }

        builder.finish()
    }
}
