use std::fs;
use std::time::Duration;

use tempfile::TempDir;
use vitals::core::sampler::probes::{CpuProbe, RamProbe, StorageProbe, TemperatureProbe};
use vitals::core::sampler::{Probe, ProbeOptions, ProbeSet};
use vitals::platform::gpu::GpuDetector;
use vitals::{MetricKind, Reading};

fn write_zone(root: &std::path::Path, name: &str, zone_type: &str, millidegrees: &str) {
    let zone = root.join(name);
    fs::create_dir_all(&zone).unwrap();
    fs::write(zone.join("type"), zone_type).unwrap();
    fs::write(zone.join("temp"), millidegrees).unwrap();
}

#[tokio::test]
async fn test_cpu_probe_uses_counter_deltas() {
    let temp_dir = TempDir::new().unwrap();
    let stat = temp_dir.path().join("stat");
    fs::write(&stat, "cpu  100 0 100 800 0 0 0 0 0 0\ncpu0 1 2 3 4\n").unwrap();

    let mut probe = CpuProbe::with_stat_path(&stat);
    // Measured against the zero baseline
    assert_eq!(probe.sample().await, Reading::new(20.0));

    fs::write(&stat, "cpu  200 0 200 1400 0 0 0 0 0 0\n").unwrap();
    assert_eq!(probe.sample().await, Reading::new(25.0));

    // Counters did not move
    assert_eq!(probe.sample().await, Reading::ZERO);
}

#[tokio::test]
async fn test_cpu_probe_failure_keeps_previous_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let stat = temp_dir.path().join("stat");
    fs::write(&stat, "cpu  100 0 100 800\n").unwrap();

    let mut probe = CpuProbe::with_stat_path(&stat);
    probe.sample().await;
    let before = probe.previous();

    fs::write(&stat, "intr 12345\n").unwrap();
    assert_eq!(probe.sample().await, Reading::ZERO);
    assert_eq!(probe.previous(), before);
    assert!(probe.last_error().is_some());

    fs::write(&stat, "cpu  150 0 150 900\n").unwrap();
    assert_eq!(probe.sample().await, Reading::new(50.0));
    assert!(probe.last_error().is_none());
}

#[tokio::test]
async fn test_ram_probe_reads_meminfo() {
    let temp_dir = TempDir::new().unwrap();
    let meminfo = temp_dir.path().join("meminfo");
    fs::write(
        &meminfo,
        "MemTotal:        1000 kB\nMemFree:          100 kB\nMemAvailable:     250 kB\n",
    )
    .unwrap();

    let mut probe = RamProbe::with_meminfo_path(&meminfo);
    assert_eq!(probe.sample().await, Reading::new(75.0));
}

#[tokio::test]
async fn test_ram_probe_missing_file_reads_zero() {
    let temp_dir = TempDir::new().unwrap();
    let mut probe = RamProbe::with_meminfo_path(temp_dir.path().join("nope"));

    assert_eq!(probe.sample().await, Reading::ZERO);
    assert!(probe.last_error().is_some());
}

#[tokio::test]
async fn test_temperature_discovery_keeps_cpu_zones() {
    let temp_dir = TempDir::new().unwrap();
    write_zone(temp_dir.path(), "thermal_zone0", "acpitz\n", "27800\n");
    write_zone(temp_dir.path(), "thermal_zone1", "x86_pkg_temp\n", "50000\n");
    write_zone(temp_dir.path(), "thermal_zone2", "TCPU\n", "70000\n");

    let mut probe = TemperatureProbe::discover(temp_dir.path());
    assert_eq!(
        probe.zones(),
        &[
            temp_dir.path().join("thermal_zone1").join("temp"),
            temp_dir.path().join("thermal_zone2").join("temp"),
        ]
    );
    assert_eq!(probe.sample().await, Reading::new(50.0));
}

#[tokio::test]
async fn test_temperature_skips_implausible_zones() {
    let temp_dir = TempDir::new().unwrap();
    write_zone(temp_dir.path(), "thermal_zone0", "cpu-thermal", "0");
    write_zone(temp_dir.path(), "thermal_zone1", "cpu-thermal", "50000");
    write_zone(temp_dir.path(), "thermal_zone2", "cpu-thermal", "70000");
    write_zone(temp_dir.path(), "thermal_zone3", "cpu-thermal", "200000");

    let mut probe = TemperatureProbe::discover(temp_dir.path());
    assert_eq!(probe.zones().len(), 4);
    assert_eq!(probe.sample().await, Reading::new(50.0));
}

#[tokio::test]
async fn test_temperature_falls_back_to_first_zone() {
    let temp_dir = TempDir::new().unwrap();
    write_zone(temp_dir.path(), "thermal_zone0", "acpitz", "60000");

    let probe = TemperatureProbe::discover(temp_dir.path());
    assert_eq!(
        probe.zones().first(),
        Some(&temp_dir.path().join("thermal_zone0").join("temp"))
    );
}

#[tokio::test]
async fn test_temperature_without_plausible_reading_is_zero() {
    let temp_dir = TempDir::new().unwrap();
    write_zone(temp_dir.path(), "thermal_zone0", "cpu", "1000");

    let mut probe = TemperatureProbe::with_zones(vec![
        temp_dir.path().join("thermal_zone0").join("temp"),
        temp_dir.path().join("missing").join("temp"),
    ]);
    assert_eq!(probe.sample().await, Reading::ZERO);
    assert!(probe.last_error().is_some());
}

#[cfg(unix)]
#[tokio::test]
async fn test_storage_probe_bad_mount_reads_zero() {
    let temp_dir = TempDir::new().unwrap();
    let mut probe = StorageProbe::new(
        temp_dir.path().join("not-mounted"),
        Duration::from_secs(5),
    );

    assert_eq!(probe.sample().await, Reading::ZERO);
    assert!(probe.last_error().is_some());
}

#[test]
fn test_probe_set_has_one_probe_per_metric() {
    let temp_dir = TempDir::new().unwrap();
    let options = ProbeOptions {
        proc_stat: temp_dir.path().join("stat"),
        proc_meminfo: temp_dir.path().join("meminfo"),
        thermal_root: temp_dir.path().join("thermal"),
        storage_mount: temp_dir.path().to_path_buf(),
        command_timeout: Duration::from_millis(500),
        gpu_detector: GpuDetector::new()
            .with_search_path(temp_dir.path().as_os_str())
            .with_drm_root(temp_dir.path().join("drm"))
            .with_tool_locations(Vec::new()),
    };

    let probes = ProbeSet::from_options(&options);
    assert_eq!(probes.len(), MetricKind::ALL.len());
    assert_eq!(probes.metrics().collect::<Vec<_>>(), MetricKind::ALL.to_vec());
}
