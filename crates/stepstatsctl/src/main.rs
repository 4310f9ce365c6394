//! stepstatsctl - device stats for training loops
//!
//! Samples GPU telemetry through `nvidia-smi` and drives the stats monitor
//! from a simulated training loop.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stepstats_shared::MetricField;

#[derive(Parser)]
#[command(name = "stepstatsctl")]
#[command(about = "Sample GPU stats at training step boundaries", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List queryable device fields and their units
    Fields,

    /// Sample one field and print the metrics as JSON
    Sample {
        /// Field query name, e.g. utilization.gpu
        #[arg(value_parser = parse_field)]
        field: MetricField,
    },

    /// Run a simulated training loop with the monitor attached
    Run {
        #[arg(long, default_value_t = 1)]
        epochs: u32,

        /// Steps per epoch
        #[arg(long, default_value_t = 10)]
        steps: u64,

        /// Simulated work per step in milliseconds
        #[arg(long, default_value_t = 100)]
        step_ms: u64,

        /// JSONL metrics file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Distributed rank; read from RANK/SLURM_PROCID/LOCAL_RANK when omitted
        #[arg(long)]
        rank: Option<usize>,

        /// Log step durations
        #[arg(long)]
        timings: bool,

        /// Also log fan speed and temperatures
        #[arg(long)]
        thermals: bool,

        /// The simulated model runs on the CPU
        #[arg(long)]
        cpu: bool,
    },
}

fn parse_field(s: &str) -> Result<MetricField, String> {
    s.parse()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;
    commands::init_logging(&config.log_level);

    match cli.command {
        Commands::Fields => commands::fields(),
        Commands::Sample { field } => commands::sample(&config, field),
        Commands::Run {
            epochs,
            steps,
            step_ms,
            output,
            rank,
            timings,
            thermals,
            cpu,
        } => commands::run(
            config,
            commands::RunOptions {
                epochs,
                steps,
                step_ms,
                output,
                rank,
                timings,
                thermals,
                on_device: !cpu,
            },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_cpu_switch() {
        let cli = Cli::try_parse_from(["stepstatsctl", "run", "--cpu"]).unwrap();
        assert!(matches!(cli.command, Commands::Run { cpu: true, .. }));

        let cli = Cli::try_parse_from(["stepstatsctl", "run"]).unwrap();
        assert!(matches!(cli.command, Commands::Run { cpu: false, .. }));
    }
}
