//! Command implementations for stepstatsctl.

use anyhow::{Context, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, Instant};
use stepstats_shared::{
    rank_from_env, DeviceStatsSampler, JsonlSink, MetricField, MetricsSink, MonitorConfig,
    NvidiaSmi, SamplerConfig, StatsMonitor,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub struct RunOptions {
    pub epochs: u32,
    pub steps: u64,
    pub step_ms: u64,
    pub output: Option<PathBuf>,
    pub rank: Option<usize>,
    pub timings: bool,
    pub thermals: bool,
    pub on_device: bool,
}

pub fn load_config(path: Option<&Path>) -> Result<MonitorConfig> {
    MonitorConfig::load_or_default(path).with_context(|| match path {
        Some(p) => format!("Failed to load config from {}", p.display()),
        None => "Failed to build default config".to_string(),
    })
}

/// Logs go to stderr so metrics on stdout stay machine-readable.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

pub fn fields() -> Result<()> {
    for field in MetricField::ALL {
        println!("{:<20} {}", field.query_name(), field.unit());
    }
    Ok(())
}

pub fn sample(config: &MonitorConfig, field: MetricField) -> Result<()> {
    let sampler = DeviceStatsSampler::new(locate_tool(config)?);
    let metrics = sampler
        .sample(field)
        .with_context(|| format!("Failed to sample {}", field))?;
    println!("{}", serde_json::to_string_pretty(&metrics)?);
    Ok(())
}

pub fn run(config: MonitorConfig, opts: RunOptions) -> Result<()> {
    let runner = locate_tool(&config)?;
    let sampler_config = effective_sampler(config.sampler, opts.timings, opts.thermals);
    let sink = open_sink(opts.output.as_deref().or(config.metrics_path.as_deref()))?;
    let rank = opts.rank.unwrap_or_else(rank_from_env);

    let mut monitor = StatsMonitor::attach(sampler_config, runner, Some(sink))
        .context("Failed to attach stats monitor")?
        .with_rank(rank);

    info!(
        epochs = opts.epochs,
        steps = opts.steps,
        step_ms = opts.step_ms,
        rank,
        "Starting simulated training loop"
    );
    monitor.train_start(opts.on_device);

    let work = Duration::from_millis(opts.step_ms);
    let mut global_step: u64 = 0;
    for epoch in 0..opts.epochs {
        monitor.epoch_start();
        for _ in 0..opts.steps {
            monitor
                .step_start(global_step, Instant::now())
                .with_context(|| format!("Step {} (epoch {}) start failed", global_step, epoch))?;
            sleep(work);
            monitor
                .step_end(global_step, Instant::now())
                .with_context(|| format!("Step {} (epoch {}) end failed", global_step, epoch))?;
            global_step += 1;
        }
    }

    info!(steps = global_step, "Training loop finished");
    Ok(())
}

fn locate_tool(config: &MonitorConfig) -> Result<NvidiaSmi> {
    NvidiaSmi::from_override(config.query_tool.as_deref())
        .context("Cannot use the stats monitor without the NVIDIA driver")
}

fn open_sink(path: Option<&Path>) -> Result<Box<dyn MetricsSink>> {
    match path {
        Some(p) => {
            let sink = JsonlSink::create(p)
                .with_context(|| format!("Failed to open metrics file {}", p.display()))?;
            Ok(Box::new(sink))
        }
        None => Ok(Box::new(JsonlSink::new(io::stdout()))),
    }
}

/// Apply CLI switches on top of the configured toggles.
fn effective_sampler(base: SamplerConfig, timings: bool, thermals: bool) -> SamplerConfig {
    let mut config = base;
    if timings {
        config = config.with_intra_step_time(true).with_inter_step_time(true);
    }
    if thermals {
        config = config.with_fan_speed(true).with_temperature(true);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switches_only_enable() {
        let base = SamplerConfig::default();
        assert_eq!(effective_sampler(base, false, false), base);

        let both = effective_sampler(base, true, true);
        assert!(both.intra_step_time && both.inter_step_time);
        assert!(both.fan_speed && both.temperature);
        assert!(both.gpu_utilization && both.memory_utilization);

        let off = SamplerConfig::all_disabled();
        let timings = effective_sampler(off, true, false);
        assert!(!timings.any_device_sampling());
    }

    #[test]
    fn test_open_sink_creates_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("out").join("metrics.jsonl");
        let mut sink = open_sink(Some(&path)).unwrap();

        let mut batch = stepstats_shared::MetricMap::new();
        batch.insert("batch_time/intra_step (ms)".to_string(), 5.0);
        sink.log_metrics(&batch, 0).unwrap();
        drop(sink);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn test_missing_config_has_context() {
        let err = load_config(Some(Path::new("/nonexistent/stepstats.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }
}
