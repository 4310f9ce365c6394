//! Parser for headerless, unitless CSV query output.
//!
//! Expected format for a single requested field on a three-device host:
//! ```text
//! 10
//! 20
//! 30
//! ```

use crate::field::{DeviceReading, MetricField};

/// Value reported for device 0 when the output cannot be parsed.
pub const FALLBACK_VALUE: f64 = 0.0;

/// Outcome of parsing one query's stdout.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedSample {
    /// Every line parsed; readings are in line order
    Readings(Vec<DeviceReading>),
    /// Empty or non-numeric output, replaced by one zero reading
    Fallback {
        readings: Vec<DeviceReading>,
        /// First line that did not parse (empty when the output was empty)
        offending: String,
    },
}

impl ParsedSample {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn readings(&self) -> &[DeviceReading] {
        match self {
            Self::Readings(r) | Self::Fallback { readings: r, .. } => r,
        }
    }

    pub fn into_readings(self) -> Vec<DeviceReading> {
        match self {
            Self::Readings(r) | Self::Fallback { readings: r, .. } => r,
        }
    }
}

/// Parse query stdout into per-device readings.
///
/// A single bad line discards the whole sample in favour of the zero
/// fallback, so a driver answering `[N/A]` shows up as a literal 0.
pub fn parse_query_output(field: MetricField, output: &str) -> ParsedSample {
    let mut readings = Vec::new();

    for (device_index, line) in output.trim().lines().enumerate() {
        let token = line.trim();
        match token.parse::<f64>() {
            Ok(value) => readings.push(DeviceReading::new(field, device_index, value)),
            Err(_) => return fallback(field, token),
        }
    }

    if readings.is_empty() {
        return fallback(field, "");
    }

    ParsedSample::Readings(readings)
}

fn fallback(field: MetricField, offending: &str) -> ParsedSample {
    ParsedSample::Fallback {
        readings: vec![DeviceReading::new(field, 0, FALLBACK_VALUE)],
        offending: offending.to_string(),
    }
}
