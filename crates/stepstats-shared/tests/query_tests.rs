//! Tests for the `nvidia-smi` runner against stub scripts.
//!
//! The stubs stand in for the real tool so invocation and exit-status
//! handling can be checked on hosts without a GPU.

#![cfg(unix)]

use stepstats_shared::{DeviceStatsSampler, MetricField, NvidiaSmi, QueryRunner, StatsError};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_stub(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("nvidia-smi");
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[test]
fn test_stub_output_is_returned() {
    let temp = TempDir::new().unwrap();
    let stub = write_stub(&temp, "printf '10\\n20\\n30\\n'");
    let smi = NvidiaSmi::at(&stub).unwrap();

    let stdout = smi.query(MetricField::UtilizationGpu).unwrap();
    assert_eq!(stdout, "10\n20\n30\n");
}

#[test]
fn test_stub_receives_field_and_format() {
    let temp = TempDir::new().unwrap();
    let stub = write_stub(&temp, "echo \"$1\"; echo \"$2\" >&2; [ \"$2\" = \"--format=csv,nounits,noheader\" ]");
    let smi = NvidiaSmi::at(&stub).unwrap();

    let stdout = smi.query(MetricField::TemperatureGpu).unwrap();
    assert_eq!(stdout.trim(), "--query-gpu=temperature.gpu");
}

#[test]
fn test_non_zero_exit_is_query_failed() {
    let temp = TempDir::new().unwrap();
    let stub = write_stub(&temp, "echo 'No devices were found' >&2; exit 6");
    let smi = NvidiaSmi::at(&stub).unwrap();

    match smi.query(MetricField::MemoryUsed) {
        Err(StatsError::QueryFailed { field, code, stderr }) => {
            assert_eq!(field, "memory.used");
            assert_eq!(code, Some(6));
            assert_eq!(stderr, "No devices were found");
        }
        other => panic!("expected QueryFailed, got {:?}", other),
    }
}

#[test]
fn test_sampler_over_stub() {
    let temp = TempDir::new().unwrap();
    let stub = write_stub(&temp, "printf '8123\\n512\\n'");
    let sampler = DeviceStatsSampler::new(NvidiaSmi::at(&stub).unwrap());

    let map = sampler.sample(MetricField::MemoryUsed).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map["gpu_memory.used/gpu_id_0 (MB)"], 8123.0);
    assert_eq!(map["gpu_memory.used/gpu_id_1 (MB)"], 512.0);
}

#[test]
fn test_sampler_propagates_exit_failure() {
    let temp = TempDir::new().unwrap();
    let stub = write_stub(&temp, "exit 1");
    let sampler = DeviceStatsSampler::new(NvidiaSmi::at(&stub).unwrap());

    let err = sampler.sample(MetricField::FanSpeed).unwrap_err();
    assert!(err.is_invocation());
}

#[test]
fn test_unexecutable_tool_is_spawn_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nvidia-smi");
    fs::write(&path, "not a program").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

    let smi = NvidiaSmi::at(&path).unwrap();
    let err = smi.query(MetricField::UtilizationGpu).unwrap_err();
    assert!(matches!(err, StatsError::Spawn { .. }));
}
