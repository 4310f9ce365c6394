//! Monitor configuration.
//!
//! Six toggles decide what is sampled at each hook. They can be set in code
//! through the builder methods or loaded from a TOML file:
//!
//! ```toml
//! log_level = "info"
//! metrics_path = "/var/log/train/metrics.jsonl"
//!
//! [sampler]
//! memory_utilization = true
//! gpu_utilization = true
//! intra_step_time = true
//! inter_step_time = true
//! fan_speed = false
//! temperature = false
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Which samples and timings are taken at each hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Used, free and percent memory at step start and end
    #[serde(default = "default_true")]
    pub memory_utilization: bool,

    /// Percent GPU utilization at step start and end
    #[serde(default = "default_true")]
    pub gpu_utilization: bool,

    /// Duration of each step
    #[serde(default)]
    pub intra_step_time: bool,

    /// Time between the end of one step and the start of the next
    #[serde(default)]
    pub inter_step_time: bool,

    /// Percent fan speed at step end
    #[serde(default)]
    pub fan_speed: bool,

    /// GPU and memory temperature at step end
    #[serde(default)]
    pub temperature: bool,
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            memory_utilization: true,
            gpu_utilization: true,
            intra_step_time: false,
            inter_step_time: false,
            fan_speed: false,
            temperature: false,
        }
    }
}

impl SamplerConfig {
    /// Every toggle off.
    pub fn all_disabled() -> Self {
        Self {
            memory_utilization: false,
            gpu_utilization: false,
            intra_step_time: false,
            inter_step_time: false,
            fan_speed: false,
            temperature: false,
        }
    }

    /// Every toggle on.
    pub fn all_enabled() -> Self {
        Self {
            memory_utilization: true,
            gpu_utilization: true,
            intra_step_time: true,
            inter_step_time: true,
            fan_speed: true,
            temperature: true,
        }
    }

    pub fn with_memory_utilization(mut self, on: bool) -> Self {
        self.memory_utilization = on;
        self
    }

    pub fn with_gpu_utilization(mut self, on: bool) -> Self {
        self.gpu_utilization = on;
        self
    }

    pub fn with_intra_step_time(mut self, on: bool) -> Self {
        self.intra_step_time = on;
        self
    }

    pub fn with_inter_step_time(mut self, on: bool) -> Self {
        self.inter_step_time = on;
        self
    }

    pub fn with_fan_speed(mut self, on: bool) -> Self {
        self.fan_speed = on;
        self
    }

    pub fn with_temperature(mut self, on: bool) -> Self {
        self.temperature = on;
        self
    }

    /// True when any hook will invoke the query tool.
    pub fn any_device_sampling(&self) -> bool {
        self.memory_utilization || self.gpu_utilization || self.fan_speed || self.temperature
    }
}

/// File-level configuration for `stepstatsctl` and embedders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub sampler: SamplerConfig,

    /// Explicit query tool path instead of a `PATH` lookup
    #[serde(default)]
    pub query_tool: Option<PathBuf>,

    /// JSONL file receiving metrics
    #[serde(default)]
    pub metrics_path: Option<PathBuf>,

    /// Default tracing filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sampler: SamplerConfig::default(),
            query_tool: None,
            metrics_path: None,
            log_level: default_log_level(),
        }
    }
}

impl MonitorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
