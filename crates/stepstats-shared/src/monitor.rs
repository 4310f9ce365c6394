//! Lifecycle orchestrator.
//!
//! `StatsMonitor` is driven by whatever owns the training loop:
//!
//! ```ignore
//! let runner = NvidiaSmi::locate()?;
//! let mut monitor = StatsMonitor::attach(SamplerConfig::default(), runner, Some(sink))?;
//! monitor.train_start(true);
//! for epoch in 0..epochs {
//!     monitor.epoch_start();
//!     for batch in loader {
//!         monitor.step_start(global_step, Instant::now())?;
//!         train_step(batch);
//!         monitor.step_end(global_step, Instant::now())?;
//!         global_step += 1;
//!     }
//! }
//! ```
//!
//! Every hook runs to completion, including the blocking device queries,
//! before returning. A failed query fails the hook.

use crate::config::SamplerConfig;
use crate::error::{Result, StatsError};
use crate::query::QueryRunner;
use crate::sampler::DeviceStatsSampler;
use crate::sink::{MetricMap, MetricsSink};
use crate::timing::{StepTimer, INTER_STEP_METRIC, INTRA_STEP_METRIC};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Environment variables consulted for the distributed rank, in order.
///
/// Global ranks come first: `LOCAL_RANK` is 0 on every node.
pub const RANK_ENV_VARS: &[&str] = &["RANK", "SLURM_PROCID", "LOCAL_RANK"];

/// Rank of this process in distributed training, 0 when not distributed.
pub fn rank_from_env() -> usize {
    rank_from(|var| std::env::var(var).ok())
}

/// First parsable rank among `RANK_ENV_VARS`, looked up through `lookup`.
///
/// Unparsable values are skipped with a warning rather than read as rank 0.
pub fn rank_from(lookup: impl Fn(&str) -> Option<String>) -> usize {
    for var in RANK_ENV_VARS.iter().copied() {
        let Some(raw) = lookup(var) else {
            continue;
        };
        match raw.trim().parse::<usize>() {
            Ok(rank) => return rank,
            Err(_) => warn!(var = %var, value = %raw, "Ignoring unparsable rank variable"),
        }
    }
    0
}

pub struct StatsMonitor<R, S> {
    config: SamplerConfig,
    sampler: DeviceStatsSampler<R>,
    sink: S,
    timer: StepTimer,
    rank: usize,
    on_device: Option<bool>,
}

impl<R: QueryRunner, S: MetricsSink> StatsMonitor<R, S> {
    /// Wire the sampler and timer to a sink.
    ///
    /// The query tool is checked when `runner` is built (see
    /// `NvidiaSmi::locate`); a missing sink is checked here. Both are fatal.
    pub fn attach(config: SamplerConfig, runner: R, sink: Option<S>) -> Result<Self> {
        let sink = sink.ok_or(StatsError::MissingSink)?;

        info!(
            memory_utilization = config.memory_utilization,
            gpu_utilization = config.gpu_utilization,
            intra_step_time = config.intra_step_time,
            inter_step_time = config.inter_step_time,
            fan_speed = config.fan_speed,
            temperature = config.temperature,
            "Attached device stats monitor"
        );

        Ok(Self {
            config,
            sampler: DeviceStatsSampler::new(runner),
            sink,
            timer: StepTimer::new(config.intra_step_time, config.inter_step_time),
            rank: 0,
            on_device: None,
        })
    }

    /// Only rank 0 emits; other ranks turn the step hooks into no-ops.
    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = rank;
        self
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn is_emitter(&self) -> bool {
        self.rank == 0
    }

    /// Whether training runs on the GPU, as reported to `train_start`.
    pub fn on_device(&self) -> Option<bool> {
        self.on_device
    }

    /// Called once before the first epoch.
    pub fn train_start(&mut self, on_device: bool) {
        self.on_device = Some(on_device);
        if !on_device {
            warn!(
                "Device stats monitor is attached but training is not running on the GPU; \
                 logged utilization will be independent from the model"
            );
        }
    }

    pub fn epoch_start(&mut self) {
        self.timer.reset();
    }

    pub fn step_start(&mut self, step: u64, now: Instant) -> Result<()> {
        if !self.is_emitter() {
            return Ok(());
        }

        self.log_utilization(step)?;

        if let Some(ms) = self.timer.on_step_start(now) {
            self.emit_timing(INTER_STEP_METRIC, ms, step)?;
        }
        Ok(())
    }

    pub fn step_end(&mut self, step: u64, now: Instant) -> Result<()> {
        if !self.is_emitter() {
            return Ok(());
        }

        self.log_utilization(step)?;

        if self.config.fan_speed {
            let batches = self.sampler.fan()?;
            self.emit_all(batches, step)?;
        }

        if self.config.temperature {
            let batches = self.sampler.temperature()?;
            self.emit_all(batches, step)?;
        }

        if let Some(ms) = self.timer.on_step_end(now) {
            self.emit_timing(INTRA_STEP_METRIC, ms, step)?;
        }
        Ok(())
    }

    /// Usage and memory, shared by both step hooks.
    fn log_utilization(&mut self, step: u64) -> Result<()> {
        if self.config.gpu_utilization {
            let batches = self.sampler.usage()?;
            self.emit_all(batches, step)?;
        }

        if self.config.memory_utilization {
            let batches = self.sampler.memory()?;
            self.emit_all(batches, step)?;
        }
        Ok(())
    }

    fn emit_all(&mut self, batches: Vec<MetricMap>, step: u64) -> Result<()> {
        for batch in &batches {
            debug!(step, metrics = batch.len(), "Emitting device metrics");
            self.sink.log_metrics(batch, step)?;
        }
        Ok(())
    }

    fn emit_timing(&mut self, name: &str, ms: f64, step: u64) -> Result<()> {
        debug!(step, metric = name, ms, "Emitting step timing");
        let mut batch = MetricMap::new();
        batch.insert(name.to_string(), ms);
        self.sink.log_metrics(&batch, step)
    }
}
