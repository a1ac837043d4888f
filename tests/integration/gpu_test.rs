use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use vitals::core::sampler::probes::{GpuProbe, MAX_FAILURES};
use vitals::core::sampler::Probe;
use vitals::platform::gpu::{GpuBackend, GpuDetector};
use vitals::Reading;

/// Detector confined to `root`: `bin/` is the search path, `drm/` the sysfs
/// tree. No fallback tool locations.
fn detector(root: &Path) -> GpuDetector {
    fs::create_dir_all(root.join("bin")).unwrap();
    fs::create_dir_all(root.join("drm")).unwrap();
    GpuDetector::new()
        .with_search_path(root.join("bin").as_os_str())
        .with_drm_root(root.join("drm"))
        .with_tool_locations(Vec::new())
}

fn busy_file(root: &Path, card: u32, contents: &str) -> PathBuf {
    let device = root.join("drm").join(format!("card{}", card)).join("device");
    fs::create_dir_all(&device).unwrap();
    let path = device.join("gpu_busy_percent");
    fs::write(&path, contents).unwrap();
    path
}

#[cfg(unix)]
fn fake_tool(root: &Path, name: &str, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = root.join("bin").join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[test]
fn test_no_tooling_detects_none() {
    let temp_dir = TempDir::new().unwrap();
    assert_eq!(detector(temp_dir.path()).detect(), GpuBackend::None);
}

#[test]
fn test_sysfs_card_is_found() {
    let temp_dir = TempDir::new().unwrap();
    let detector = detector(temp_dir.path());
    let path = busy_file(temp_dir.path(), 2, "10\n");

    assert_eq!(detector.detect(), GpuBackend::AmdSysfs(path));
}

#[test]
fn test_radeontop_known_location_is_last_resort() {
    let temp_dir = TempDir::new().unwrap();
    let tool = temp_dir.path().join("radeontop");
    fs::write(&tool, "").unwrap();

    let detector = detector(temp_dir.path()).with_tool_locations(vec![tool.clone()]);
    assert_eq!(detector.detect(), GpuBackend::AmdExternalTool(tool));

    let busy = busy_file(temp_dir.path(), 0, "10\n");
    assert_eq!(detector.detect(), GpuBackend::AmdSysfs(busy));
}

#[cfg(unix)]
#[test]
fn test_nvidia_wins_over_amd() {
    let temp_dir = TempDir::new().unwrap();
    let detector = detector(temp_dir.path());
    busy_file(temp_dir.path(), 0, "10\n");
    let smi = fake_tool(temp_dir.path(), "nvidia-smi", "echo 37");

    assert_eq!(detector.detect(), GpuBackend::Nvidia(smi));
}

#[cfg(unix)]
#[tokio::test]
async fn test_nvidia_probe_reads_utilization() {
    let temp_dir = TempDir::new().unwrap();
    let detector = detector(temp_dir.path());
    fake_tool(temp_dir.path(), "nvidia-smi", "echo 37");

    let mut probe = GpuProbe::new(detector, Duration::from_secs(5));
    assert_eq!(probe.sample().await, Reading::new(37.0));
    assert_eq!(probe.health().failure_count, 0);
}

#[tokio::test]
async fn test_success_resets_failure_count() {
    let temp_dir = TempDir::new().unwrap();
    let detector = detector(temp_dir.path());
    let busy = busy_file(temp_dir.path(), 0, "garbage");

    let mut probe = GpuProbe::new(detector, Duration::from_secs(1));
    probe.sample().await;
    probe.sample().await;
    assert_eq!(probe.health().failure_count, 2);

    fs::write(&busy, "64\n").unwrap();
    assert_eq!(probe.sample().await, Reading::new(64.0));
    assert_eq!(probe.health().failure_count, 0);
    assert!(!probe.health().disabled);
}

#[tokio::test]
async fn test_failure_latch_disables_until_reset() {
    let temp_dir = TempDir::new().unwrap();
    let detector = detector(temp_dir.path());
    let busy = busy_file(temp_dir.path(), 0, "garbage");

    let mut probe = GpuProbe::new(detector, Duration::from_secs(1));
    for attempt in 1..=MAX_FAILURES {
        assert_eq!(probe.sample().await, Reading::ZERO);
        assert_eq!(probe.health().failure_count, attempt);
    }
    assert!(probe.health().disabled);
    assert!(probe.last_error().is_some());

    // Disabled probes do not touch the backend any more
    fs::write(&busy, "42\n").unwrap();
    assert_eq!(probe.sample().await, Reading::ZERO);
    assert_eq!(probe.health().failure_count, MAX_FAILURES);

    probe.reset();
    assert!(!probe.health().disabled);
    assert!(probe.last_error().is_none());
    assert_eq!(probe.backend(), &GpuBackend::AmdSysfs(busy));
    assert_eq!(probe.sample().await, Reading::new(42.0));
}

#[cfg(unix)]
#[tokio::test]
async fn test_hung_tool_counts_as_failure() {
    let temp_dir = TempDir::new().unwrap();
    let detector = detector(temp_dir.path());
    fake_tool(temp_dir.path(), "nvidia-smi", "sleep 5");

    let mut probe = GpuProbe::new(detector, Duration::from_millis(100));
    assert_eq!(probe.sample().await, Reading::ZERO);
    assert_eq!(probe.health().failure_count, 1);
    assert!(probe.last_error().unwrap().contains("timed out"));
}

#[test]
fn test_without_backend_reads_zero_without_failing() {
    let temp_dir = TempDir::new().unwrap();
    let mut probe = GpuProbe::new(detector(temp_dir.path()), Duration::from_secs(1));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    for _ in 0..(MAX_FAILURES + 1) {
        assert_eq!(runtime.block_on(probe.sample()), Reading::ZERO);
    }
    assert_eq!(probe.health().failure_count, 0);
    assert!(!probe.health().disabled);
}
