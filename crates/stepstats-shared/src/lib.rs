//! Shared types and logic for stepstats.
//!
//! Samples accelerator telemetry at training-loop hooks and emits it as
//! step-indexed metrics, next to intra-step and inter-step timings.

pub mod config;
pub mod error;
pub mod field;
pub mod monitor;
pub mod parsers;
pub mod query;
pub mod sampler;
pub mod sink;
pub mod timing;

pub use config::{MonitorConfig, SamplerConfig};
pub use error::{Result, StatsError};
pub use field::{metric_name, DeviceReading, MetricField, Unit};
pub use monitor::{rank_from, rank_from_env, StatsMonitor};
pub use query::{NvidiaSmi, QueryRunner};
pub use sampler::DeviceStatsSampler;
pub use sink::{JsonlSink, MemorySink, MetricMap, MetricRecord, MetricsSink};
pub use timing::{StepTimer, INTER_STEP_METRIC, INTRA_STEP_METRIC};
