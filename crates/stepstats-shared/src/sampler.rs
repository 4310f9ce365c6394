//! Device stats sampler.
//!
//! Turns a requested field into metric batches: one query, one parse, one
//! `MetricMap` per field. Composite helpers return one batch per field so the
//! monitor can hand each to the sink separately.

use crate::error::Result;
use crate::field::{DeviceReading, MetricField};
use crate::parsers::{parse_query_output, ParsedSample};
use crate::query::QueryRunner;
use crate::sink::MetricMap;
use tracing::{debug, warn};

/// Fields logged for "usage".
pub const USAGE_FIELDS: &[MetricField] = &[MetricField::UtilizationGpu];

/// Fields logged for "memory", in emission order.
pub const MEMORY_FIELDS: &[MetricField] = &[
    MetricField::MemoryUsed,
    MetricField::MemoryFree,
    MetricField::UtilizationMemory,
];

pub const FAN_FIELDS: &[MetricField] = &[MetricField::FanSpeed];

pub const TEMPERATURE_FIELDS: &[MetricField] =
    &[MetricField::TemperatureGpu, MetricField::TemperatureMemory];

pub struct DeviceStatsSampler<R> {
    runner: R,
}

impl<R: QueryRunner> DeviceStatsSampler<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Query one field and parse it into readings.
    ///
    /// Invocation errors propagate. Unparsable output becomes a single zero
    /// reading for device 0 and a warning.
    pub fn readings(&self, field: MetricField) -> Result<Vec<DeviceReading>> {
        let stdout = self.runner.query(field)?;
        let parsed = parse_query_output(field, &stdout);

        if let ParsedSample::Fallback { offending, .. } = &parsed {
            warn!(
                field = %field,
                offending = %offending,
                "Unparsable device query output, reporting 0 for gpu_id_0"
            );
        } else {
            debug!(field = %field, device_count = parsed.readings().len(), "Sampled device field");
        }

        Ok(parsed.into_readings())
    }

    /// Sample one field as `metric name -> value`.
    pub fn sample(&self, field: MetricField) -> Result<MetricMap> {
        Ok(self
            .readings(field)?
            .into_iter()
            .map(|r| (r.metric_name(), r.value))
            .collect())
    }

    /// One batch per field, in the given order.
    pub fn sample_all(&self, fields: &[MetricField]) -> Result<Vec<MetricMap>> {
        fields.iter().map(|f| self.sample(*f)).collect()
    }

    pub fn usage(&self) -> Result<Vec<MetricMap>> {
        self.sample_all(USAGE_FIELDS)
    }

    pub fn memory(&self) -> Result<Vec<MetricMap>> {
        self.sample_all(MEMORY_FIELDS)
    }

    pub fn fan(&self) -> Result<Vec<MetricMap>> {
        self.sample_all(FAN_FIELDS)
    }

    pub fn temperature(&self) -> Result<Vec<MetricMap>> {
        self.sample_all(TEMPERATURE_FIELDS)
    }
}
