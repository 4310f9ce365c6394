//! Error types for stepstats.

use std::process::ExitStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Cannot attach stats monitor: no metrics sink configured")]
    MissingSink,

    #[error("Device query tool not found: {0}. Is the NVIDIA driver installed?")]
    QueryToolMissing(String),

    #[error("Failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Query for {field} exited with {}: {stderr}", exit_label(.code))]
    QueryFailed {
        field: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Metrics sink error: {0}")]
    Sink(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {}", c),
        None => "no status (terminated by signal)".to_string(),
    }
}

impl StatsError {
    /// Build a `QueryFailed` from a finished process.
    pub fn query_failed(field: impl Into<String>, status: ExitStatus, stderr: &[u8]) -> Self {
        StatsError::QueryFailed {
            field: field.into(),
            code: status.code(),
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }

    /// Setup problems: raised once at attach time, never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StatsError::MissingSink
                | StatsError::QueryToolMissing(_)
                | StatsError::TomlDe(_)
        )
    }

    /// The query process could not run or reported failure.
    pub fn is_invocation(&self) -> bool {
        matches!(self, StatsError::Spawn { .. } | StatsError::QueryFailed { .. })
    }
}

pub type Result<T> = std::result::Result<T, StatsError>;
