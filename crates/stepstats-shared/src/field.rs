//! Queryable device fields and the readings they produce.
//!
//! Field names follow `nvidia-smi --query-gpu` naming:
//!
//! - **utilization.gpu**: percent of the sample period during which one or
//!   more kernels was executing.
//! - **utilization.memory**: percent of the sample period during which device
//!   memory was being read or written.
//! - **memory.used** / **memory.free**: allocated and free device memory, MB.
//! - **fan.speed**: intended fan speed as a percent of maximum. Many parts do
//!   not report it.
//! - **temperature.gpu** / **temperature.memory**: core and HBM temperature.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Display unit attached to a field's readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Percent,
    Megabytes,
    DegreesCelsius,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Percent => "%",
            Unit::Megabytes => "MB",
            Unit::DegreesCelsius => "degrees C",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A device property the query tool can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricField {
    #[serde(rename = "utilization.gpu")]
    UtilizationGpu,
    #[serde(rename = "utilization.memory")]
    UtilizationMemory,
    #[serde(rename = "memory.used")]
    MemoryUsed,
    #[serde(rename = "memory.free")]
    MemoryFree,
    #[serde(rename = "fan.speed")]
    FanSpeed,
    #[serde(rename = "temperature.gpu")]
    TemperatureGpu,
    #[serde(rename = "temperature.memory")]
    TemperatureMemory,
}

impl MetricField {
    pub const ALL: [MetricField; 7] = [
        MetricField::UtilizationGpu,
        MetricField::UtilizationMemory,
        MetricField::MemoryUsed,
        MetricField::MemoryFree,
        MetricField::FanSpeed,
        MetricField::TemperatureGpu,
        MetricField::TemperatureMemory,
    ];

    /// Name passed to `--query-gpu=`.
    pub fn query_name(&self) -> &'static str {
        match self {
            MetricField::UtilizationGpu => "utilization.gpu",
            MetricField::UtilizationMemory => "utilization.memory",
            MetricField::MemoryUsed => "memory.used",
            MetricField::MemoryFree => "memory.free",
            MetricField::FanSpeed => "fan.speed",
            MetricField::TemperatureGpu => "temperature.gpu",
            MetricField::TemperatureMemory => "temperature.memory",
        }
    }

    pub fn unit(&self) -> Unit {
        match self {
            MetricField::UtilizationGpu
            | MetricField::UtilizationMemory
            | MetricField::FanSpeed => Unit::Percent,
            MetricField::MemoryUsed | MetricField::MemoryFree => Unit::Megabytes,
            MetricField::TemperatureGpu | MetricField::TemperatureMemory => Unit::DegreesCelsius,
        }
    }
}

impl fmt::Display for MetricField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_name())
    }
}

impl FromStr for MetricField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        MetricField::ALL
            .iter()
            .copied()
            .find(|f| f.query_name() == wanted)
            .ok_or_else(|| format!("unknown device field '{}'", wanted))
    }
}

/// Build the metric name for one device reading.
///
/// `gpu_<field>/gpu_id_<index> (<unit>)`. Dashboards key on this string, so
/// it must not change.
pub fn metric_name(field: MetricField, device_index: usize) -> String {
    format!(
        "gpu_{}/gpu_id_{} ({})",
        field.query_name(),
        device_index,
        field.unit().as_str()
    )
}

/// One numeric value for one device, as returned by a single query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceReading {
    pub field: MetricField,
    /// Position in the query output, not a hardware id
    pub device_index: usize,
    pub value: f64,
    pub unit: Unit,
}

impl DeviceReading {
    pub fn new(field: MetricField, device_index: usize, value: f64) -> Self {
        Self {
            field,
            device_index,
            value,
            unit: field.unit(),
        }
    }

    pub fn metric_name(&self) -> String {
        metric_name(self.field, self.device_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_name_convention() {
        assert_eq!(
            metric_name(MetricField::UtilizationGpu, 0),
            "gpu_utilization.gpu/gpu_id_0 (%)"
        );
        assert_eq!(
            metric_name(MetricField::MemoryFree, 3),
            "gpu_memory.free/gpu_id_3 (MB)"
        );
        assert_eq!(
            metric_name(MetricField::TemperatureMemory, 1),
            "gpu_temperature.memory/gpu_id_1 (degrees C)"
        );
    }

    #[test]
    fn test_units() {
        assert_eq!(MetricField::FanSpeed.unit(), Unit::Percent);
        assert_eq!(MetricField::MemoryUsed.unit(), Unit::Megabytes);
        assert_eq!(MetricField::TemperatureGpu.unit(), Unit::DegreesCelsius);
    }

    #[test]
    fn test_parse_query_name() {
        for field in MetricField::ALL {
            assert_eq!(field.query_name().parse::<MetricField>(), Ok(field));
        }
        assert!("power.draw".parse::<MetricField>().is_err());
    }

    #[test]
    fn test_reading_carries_field_unit() {
        let reading = DeviceReading::new(MetricField::MemoryUsed, 2, 1024.0);
        assert_eq!(reading.unit, Unit::Megabytes);
        assert_eq!(reading.metric_name(), "gpu_memory.used/gpu_id_2 (MB)");
    }
}
