//! Device query invocation.
//!
//! The sampler only needs the raw stdout of a successful query. Anything that
//! stops the tool from producing it (missing binary, spawn failure, non-zero
//! exit) is an error for the caller; parsing problems are not handled here.

use crate::error::{Result, StatsError};
use crate::field::MetricField;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Binary looked up on `PATH` when no explicit path is configured.
pub const NVIDIA_SMI: &str = "nvidia-smi";

/// Output format requested from the tool: no header row, no unit suffixes.
pub const QUERY_FORMAT: &str = "--format=csv,nounits,noheader";

/// Runs one device query and returns its stdout.
pub trait QueryRunner {
    fn query(&self, field: MetricField) -> Result<String>;
}

impl<R: QueryRunner + ?Sized> QueryRunner for &R {
    fn query(&self, field: MetricField) -> Result<String> {
        (**self).query(field)
    }
}

impl<R: QueryRunner + ?Sized> QueryRunner for Box<R> {
    fn query(&self, field: MetricField) -> Result<String> {
        (**self).query(field)
    }
}

/// `nvidia-smi --query-gpu` runner.
#[derive(Debug, Clone)]
pub struct NvidiaSmi {
    path: PathBuf,
}

impl NvidiaSmi {
    /// Resolve `nvidia-smi` on `PATH`.
    pub fn locate() -> Result<Self> {
        let path = which::which(NVIDIA_SMI)
            .map_err(|e| StatsError::QueryToolMissing(format!("{} ({})", NVIDIA_SMI, e)))?;
        debug!(path = %path.display(), "Located device query tool");
        Ok(Self { path })
    }

    /// Use an explicit binary instead of searching `PATH`.
    pub fn at(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(StatsError::QueryToolMissing(path.display().to_string()));
        }
        Ok(Self { path })
    }

    /// `at` when a path is configured, `locate` otherwise.
    pub fn from_override(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::at(p),
            None => Self::locate(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Arguments for a single-field query.
    pub fn query_args(field: MetricField) -> [String; 2] {
        [
            format!("--query-gpu={}", field.query_name()),
            QUERY_FORMAT.to_string(),
        ]
    }
}

impl QueryRunner for NvidiaSmi {
    fn query(&self, field: MetricField) -> Result<String> {
        let output = Command::new(&self.path)
            .args(Self::query_args(field))
            .output()
            .map_err(|source| StatsError::Spawn {
                command: self.path.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(StatsError::query_failed(
                field.query_name(),
                output.status,
                &output.stderr,
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        debug!(field = %field, bytes = stdout.len(), "Device query returned");
        Ok(stdout)
    }
}
