// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Output units for decoded measurements.
//!
//! The FIT profile reports speed in m/s, lengths in m and temperature in
//! degrees Celsius; these convert from those base units.

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeedUnit {
    MetersPerSecond,
    #[default]
    KilometersPerHour,
    MilesPerHour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthUnit {
    Meters,
    #[default]
    Kilometers,
    Miles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
    Kelvin,
}

const METERS_PER_MILE: f64 = 1609.344;

impl SpeedUnit {
    pub fn convert(&self, mps: f64) -> f64 {
        match self {
            SpeedUnit::MetersPerSecond => mps,
            SpeedUnit::KilometersPerHour => mps * 3.6,
            SpeedUnit::MilesPerHour => mps * 3600.0 / METERS_PER_MILE,
        }
    }
}

impl LengthUnit {
    pub fn convert(&self, meters: f64) -> f64 {
        match self {
            LengthUnit::Meters => meters,
            LengthUnit::Kilometers => meters / 1000.0,
            LengthUnit::Miles => meters / METERS_PER_MILE,
        }
    }
}

impl TemperatureUnit {
    pub fn convert(&self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
            TemperatureUnit::Kelvin => celsius + 273.15,
        }
    }
}

/// Unrecognized unit or mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized setting: {0}")]
pub struct UnknownSetting(pub String);

impl FromStr for SpeedUnit {
    type Err = UnknownSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m/s" => Ok(SpeedUnit::MetersPerSecond),
            "km/h" => Ok(SpeedUnit::KilometersPerHour),
            "mph" => Ok(SpeedUnit::MilesPerHour),
            other => Err(UnknownSetting(other.to_string())),
        }
    }
}

impl FromStr for LengthUnit {
    type Err = UnknownSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" => Ok(LengthUnit::Meters),
            "km" => Ok(LengthUnit::Kilometers),
            "mi" => Ok(LengthUnit::Miles),
            other => Err(UnknownSetting(other.to_string())),
        }
    }
}

impl FromStr for TemperatureUnit {
    type Err = UnknownSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "celsius" => Ok(TemperatureUnit::Celsius),
            "fahrenheit" => Ok(TemperatureUnit::Fahrenheit),
            "kelvin" => Ok(TemperatureUnit::Kelvin),
            other => Err(UnknownSetting(other.to_string())),
        }
    }
}
