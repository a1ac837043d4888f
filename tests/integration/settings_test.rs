use std::time::Duration;

use vitals::core::config::VitalsConfig;
use vitals::core::sampler::{SettingChange, SettingKey, SettingValue, Settings};
use vitals::MetricKind;

#[test]
fn test_settings_seeded_from_config() {
    let mut config = VitalsConfig::default();
    config.set_visible(MetricKind::Storage, false);
    config.set_interval_ms(MetricKind::Ram, 1500);

    let settings = Settings::from_config(&config);
    assert!(!settings.is_visible(MetricKind::Storage));
    assert!(settings.is_visible(MetricKind::Cpu));
    assert_eq!(settings.interval(MetricKind::Ram), Duration::from_millis(1500));
    assert_eq!(
        settings.get(SettingKey::Interval(MetricKind::Ram)),
        Some(SettingValue::Millis(1500))
    );
}

#[tokio::test]
async fn test_prefix_subscription_only_sees_matching_keys() {
    let settings = Settings::from_config(&VitalsConfig::default());
    let mut visibility = settings.subscribe("show-");

    settings.set_interval_ms(MetricKind::Cpu, 1000);
    settings.set_visible(MetricKind::Gpu, false);

    let change = visibility.recv().await.unwrap();
    assert_eq!(
        change,
        SettingChange {
            key: SettingKey::Visible(MetricKind::Gpu),
            value: SettingValue::Bool(false),
        }
    );
}

#[tokio::test]
async fn test_metric_subscription_gets_clamped_value() {
    let settings = Settings::from_config(&VitalsConfig::default());
    let mut cpu = settings.subscribe_metric(MetricKind::Cpu);

    settings.set_interval_ms(MetricKind::Ram, 1000);
    settings.set_interval_ms(MetricKind::Cpu, 1);

    let change = cpu.recv().await.unwrap();
    assert_eq!(change.key, SettingKey::Interval(MetricKind::Cpu));
    assert_eq!(change.value, SettingValue::Millis(500));
}

#[tokio::test]
async fn test_unchanged_values_are_not_broadcast() {
    let settings = Settings::from_config(&VitalsConfig::default());
    let mut all = settings.subscribe("");

    assert_eq!(settings.apply_config(&VitalsConfig::default()), 0);

    let mut config = VitalsConfig::default();
    config.set_visible(MetricKind::Temperature, false);
    assert_eq!(settings.apply_config(&config), 1);

    let change = all.recv().await.unwrap();
    assert_eq!(change.key, SettingKey::Visible(MetricKind::Temperature));
}

#[test]
fn test_dispose_unsubscribes() {
    let settings = Settings::from_config(&VitalsConfig::default());
    assert_eq!(settings.subscriber_count(), 0);

    let first = settings.subscribe("");
    let second = settings.subscribe_metric(MetricKind::Gpu);
    assert_eq!(settings.subscriber_count(), 2);

    first.dispose();
    assert_eq!(settings.subscriber_count(), 1);
    drop(second);
    assert_eq!(settings.subscriber_count(), 0);
}

#[tokio::test]
async fn test_subscription_ends_when_store_is_dropped() {
    let settings = Settings::from_config(&VitalsConfig::default());
    let mut subscription = settings.subscribe("");
    drop(settings);

    assert!(subscription.recv().await.is_none());
}

#[tokio::test]
async fn test_lagging_subscriber_is_resynced() {
    let settings = Settings::from_config(&VitalsConfig::default());
    let mut cpu = settings.subscribe_metric(MetricKind::Cpu);

    // Overflow the change channel
    for i in 0..200u64 {
        settings.set_interval_ms(MetricKind::Ram, 1000 + i);
    }
    settings.set_interval_ms(MetricKind::Cpu, 4000);
    settings.set_visible(MetricKind::Cpu, false);

    let mut seen = Vec::new();
    while seen.len() < 2 {
        seen.push(cpu.recv().await.unwrap());
    }

    assert!(seen.contains(&SettingChange {
        key: SettingKey::Interval(MetricKind::Cpu),
        value: SettingValue::Millis(4000),
    }));
    assert!(seen.contains(&SettingChange {
        key: SettingKey::Visible(MetricKind::Cpu),
        value: SettingValue::Bool(false),
    }));
}

#[tokio::test]
async fn test_config_watcher_applies_file_changes() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");

    let mut config = VitalsConfig::default();
    config.set_visible(MetricKind::Gpu, false);
    config.set_interval_ms(MetricKind::Cpu, 1000);
    config.save_to(&path).unwrap();

    let settings = Settings::from_config(&VitalsConfig::default());
    let mut changes = settings.subscribe("");
    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
    let watcher = tokio::spawn(vitals::core::sampler::config_watch_task(
        path,
        settings.clone(),
        Duration::from_millis(20),
        shutdown_rx,
    ));

    let first = tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .unwrap()
        .unwrap();
    let second = tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .unwrap()
        .unwrap();
    let keys = [first.key, second.key];
    assert!(keys.contains(&SettingKey::Visible(MetricKind::Gpu)));
    assert!(keys.contains(&SettingKey::Interval(MetricKind::Cpu)));
    assert!(!settings.is_visible(MetricKind::Gpu));
    assert_eq!(settings.interval(MetricKind::Cpu), Duration::from_millis(1000));

    shutdown_tx.send(()).unwrap();
    watcher.await.unwrap();
}
