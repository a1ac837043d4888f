use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use vitals::core::config::VitalsConfig;
use vitals::core::sampler::{config_watch_task, ChannelSink, ProbeOptions, Settings, VitalsRuntime};
use vitals::platform::gpu::GpuDetector;

fn sandboxed_options(root: &std::path::Path) -> ProbeOptions {
    ProbeOptions {
        proc_stat: root.join("stat"),
        proc_meminfo: root.join("meminfo"),
        thermal_root: root.join("thermal"),
        storage_mount: root.to_path_buf(),
        command_timeout: Duration::from_millis(500),
        gpu_detector: GpuDetector::new()
            .with_search_path(root.as_os_str())
            .with_drm_root(root.join("drm"))
            .with_tool_locations(Vec::new()),
    }
}

#[test]
fn test_shutdown_sent_before_run_is_honored() {
    let temp_dir = TempDir::new().unwrap();
    let runtime = VitalsRuntime::new(&VitalsConfig::default(), sandboxed_options(temp_dir.path()))
        .unwrap()
        .watch_config(temp_dir.path().join("config.json"), Duration::from_secs(60));

    // As if Ctrl-C arrived while probes were still being built
    runtime.shutdown_sender().send(()).unwrap();

    let (sink, _rx) = ChannelSink::new();
    runtime.run(Arc::new(sink)).unwrap();
}

#[test]
fn test_zero_reload_interval_is_accepted() {
    let temp_dir = TempDir::new().unwrap();
    let runtime = VitalsRuntime::new(&VitalsConfig::default(), sandboxed_options(temp_dir.path()))
        .unwrap()
        .watch_config(temp_dir.path().join("config.json"), Duration::ZERO);

    runtime.shutdown_sender().send(()).unwrap();
    let (sink, _rx) = ChannelSink::new();
    runtime.run(Arc::new(sink)).unwrap();
}

#[tokio::test]
async fn test_config_watcher_with_zero_interval_runs() {
    let temp_dir = TempDir::new().unwrap();
    let settings = Settings::from_config(&VitalsConfig::default());
    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);

    let watcher = tokio::spawn(config_watch_task(
        temp_dir.path().join("config.json"),
        settings,
        Duration::ZERO,
        shutdown_rx,
    ));
    tokio::time::sleep(Duration::from_millis(20)).await;

    shutdown_tx.send(()).unwrap();
    watcher.await.unwrap();
}
