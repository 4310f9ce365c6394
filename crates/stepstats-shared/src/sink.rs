//! Metrics sinks.
//!
//! A sink accepts `name -> value` batches tagged with a step index. The
//! monitor calls it several times per step with disjoint name sets.

use crate::error::{Result, StatsError};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Metric name to value, in device order.
pub type MetricMap = IndexMap<String, f64>;

/// A single emitted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub name: String,
    pub value: f64,
    pub step: u64,
}

pub trait MetricsSink {
    fn log_metrics(&mut self, metrics: &MetricMap, step: u64) -> Result<()>;
}

impl<S: MetricsSink + ?Sized> MetricsSink for &mut S {
    fn log_metrics(&mut self, metrics: &MetricMap, step: u64) -> Result<()> {
        (**self).log_metrics(metrics, step)
    }
}

impl<S: MetricsSink + ?Sized> MetricsSink for Box<S> {
    fn log_metrics(&mut self, metrics: &MetricMap, step: u64) -> Result<()> {
        (**self).log_metrics(metrics, step)
    }
}

/// Keeps everything in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Vec<MetricRecord>,
    batches: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records in arrival order.
    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }

    /// Number of `log_metrics` calls.
    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MetricRecord> + 'a {
        self.records.iter().filter(move |r| r.name == name)
    }

    pub fn for_step(&self, step: u64) -> impl Iterator<Item = &MetricRecord> + '_ {
        self.records.iter().filter(move |r| r.step == step)
    }
}

impl MetricsSink for MemorySink {
    fn log_metrics(&mut self, metrics: &MetricMap, step: u64) -> Result<()> {
        self.batches += 1;
        self.records.extend(metrics.iter().map(|(name, value)| MetricRecord {
            name: name.clone(),
            value: *value,
            step,
        }));
        Ok(())
    }
}

/// One JSONL line per batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricLine {
    pub timestamp: DateTime<Utc>,
    pub step: u64,
    pub metrics: MetricMap,
}

/// Writes batches as JSON lines, flushing after each one.
pub struct JsonlSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonlSink<BufWriter<File>> {
    /// Append to a file, creating it and its parent directories.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> MetricsSink for JsonlSink<W> {
    fn log_metrics(&mut self, metrics: &MetricMap, step: u64) -> Result<()> {
        let line = MetricLine {
            timestamp: Utc::now(),
            step,
            metrics: metrics.clone(),
        };
        let json = serde_json::to_string(&line)?;
        writeln!(self.writer, "{}", json)
            .and_then(|_| self.writer.flush())
            .map_err(StatsError::Sink)
    }
}
