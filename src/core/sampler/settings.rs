//! Typed settings store with a change-event stream.
//!
//! Keys follow the widget's preference names: `show-<metric>` for
//! visibility and `<metric>-update-interval` (milliseconds) for cadence.
//! Every effective change is broadcast as a [`SettingChange`]; consumers
//! subscribe by key prefix or by metric and get a [`Subscription`] token.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::metrics::MetricKind;
use crate::core::config::VitalsConfig;
use crate::error::VitalsError;

pub const MIN_INTERVAL_MS: u64 = 500;
pub const MAX_INTERVAL_MS: u64 = 300_000;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

pub fn clamp_interval_ms(ms: u64) -> u64 {
    ms.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    Visible(MetricKind),
    Interval(MetricKind),
}

impl SettingKey {
    pub fn metric(self) -> MetricKind {
        match self {
            SettingKey::Visible(metric) | SettingKey::Interval(metric) => metric,
        }
    }

    /// Preference name, e.g. `show-cpu` or `cpu-update-interval`
    pub fn name(self) -> String {
        match self {
            SettingKey::Visible(metric) => format!("show-{}", metric.key()),
            SettingKey::Interval(metric) => format!("{}-update-interval", metric.key()),
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for SettingKey {
    type Err = VitalsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(metric) = s.strip_prefix("show-") {
            return metric.parse().map(SettingKey::Visible);
        }
        if let Some(metric) = s.strip_suffix("-update-interval") {
            return metric.parse().map(SettingKey::Interval);
        }
        Err(VitalsError::config(format!("unknown setting '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingValue {
    Bool(bool),
    Millis(u64),
}

/// One effective settings change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingChange {
    pub key: SettingKey,
    pub value: SettingValue,
}

/// Which changes a subscription receives
#[derive(Debug, Clone)]
pub enum KeyFilter {
    /// Keys whose name starts with the prefix (`""` matches everything)
    Prefix(String),
    /// Every key of one metric
    Metric(MetricKind),
}

impl KeyFilter {
    pub fn matches(&self, key: SettingKey) -> bool {
        match self {
            KeyFilter::Prefix(prefix) => key.name().starts_with(prefix.as_str()),
            KeyFilter::Metric(metric) => key.metric() == *metric,
        }
    }
}

/// Shared settings store. Cloning shares the same state.
#[derive(Clone)]
pub struct Settings {
    values: Arc<Mutex<HashMap<SettingKey, SettingValue>>>,
    tx: broadcast::Sender<SettingChange>,
}

impl Settings {
    /// Store seeded from `config`
    pub fn from_config(config: &VitalsConfig) -> Self {
        let (tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let settings = Self {
            values: Arc::new(Mutex::new(HashMap::new())),
            tx,
        };
        {
            let mut values = settings.values.lock();
            for (key, value) in config_entries(config) {
                values.insert(key, normalize(key, value));
            }
        }
        settings
    }

    pub fn get(&self, key: SettingKey) -> Option<SettingValue> {
        self.values.lock().get(&key).copied()
    }

    /// Visible unless explicitly hidden
    pub fn is_visible(&self, metric: MetricKind) -> bool {
        !matches!(
            self.get(SettingKey::Visible(metric)),
            Some(SettingValue::Bool(false))
        )
    }

    pub fn interval(&self, metric: MetricKind) -> Duration {
        let ms = match self.get(SettingKey::Interval(metric)) {
            Some(SettingValue::Millis(ms)) => ms,
            _ => VitalsConfig::default().interval_ms(metric),
        };
        Duration::from_millis(clamp_interval_ms(ms))
    }

    /// Store `value` under `key`; broadcasts and returns `true` only if the
    /// stored value changed. Intervals are clamped to the allowed range.
    pub fn set(&self, key: SettingKey, value: SettingValue) -> bool {
        let value = normalize(key, value);
        {
            let mut values = self.values.lock();
            if values.get(&key) == Some(&value) {
                return false;
            }
            values.insert(key, value);
        }

        log::debug!("Setting {} changed to {:?}", key, value);
        // No subscribers is fine
        let _ = self.tx.send(SettingChange { key, value });
        true
    }

    pub fn set_visible(&self, metric: MetricKind, visible: bool) -> bool {
        self.set(SettingKey::Visible(metric), SettingValue::Bool(visible))
    }

    pub fn set_interval_ms(&self, metric: MetricKind, ms: u64) -> bool {
        self.set(SettingKey::Interval(metric), SettingValue::Millis(ms))
    }

    /// Push every field of `config`, emitting only the differences.
    ///
    /// Returns the number of keys that changed.
    pub fn apply_config(&self, config: &VitalsConfig) -> usize {
        config_entries(config)
            .into_iter()
            .filter(|&(key, value)| self.set(key, value))
            .count()
    }

    /// Subscribe to keys starting with `prefix`
    pub fn subscribe(&self, prefix: &str) -> Subscription {
        self.subscribe_with(KeyFilter::Prefix(prefix.to_string()))
    }

    /// Subscribe to every key of `metric`
    pub fn subscribe_metric(&self, metric: MetricKind) -> Subscription {
        self.subscribe_with(KeyFilter::Metric(metric))
    }

    pub fn subscribe_with(&self, filter: KeyFilter) -> Subscription {
        Subscription {
            filter,
            rx: self.tx.subscribe(),
            values: Arc::downgrade(&self.values),
            pending: VecDeque::new(),
        }
    }

    /// Live subscription tokens
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Disposable subscription to settings changes.
///
/// Dropping the token unsubscribes; [`Subscription::dispose`] does it
/// explicitly.
pub struct Subscription {
    filter: KeyFilter,
    rx: broadcast::Receiver<SettingChange>,
    values: Weak<Mutex<HashMap<SettingKey, SettingValue>>>,
    pending: VecDeque<SettingChange>,
}

impl Subscription {
    /// Next matching change, or `None` once the store is gone.
    ///
    /// A subscriber that fell behind is resynchronized with the current
    /// value of every matching key.
    pub async fn recv(&mut self) -> Option<SettingChange> {
        loop {
            if let Some(change) = self.pending.pop_front() {
                return Some(change);
            }

            match self.rx.recv().await {
                Ok(change) if self.filter.matches(change.key) => return Some(change),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Settings subscriber lagged by {} changes; resyncing", skipped);
                    self.resync();
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    fn resync(&mut self) {
        let Some(values) = self.values.upgrade() else {
            return;
        };
        let mut current: Vec<SettingChange> = values
            .lock()
            .iter()
            .filter(|(key, _)| self.filter.matches(**key))
            .map(|(&key, &value)| SettingChange { key, value })
            .collect();
        current.sort_by_key(|change| change.key.name());
        self.pending.extend(current);
    }

    pub fn filter(&self) -> &KeyFilter {
        &self.filter
    }

    pub fn dispose(self) {
        log::debug!("Settings subscription {:?} disposed", self.filter);
    }
}

fn normalize(key: SettingKey, value: SettingValue) -> SettingValue {
    match (key, value) {
        (SettingKey::Interval(_), SettingValue::Millis(ms)) => {
            SettingValue::Millis(clamp_interval_ms(ms))
        }
        _ => value,
    }
}

fn config_entries(config: &VitalsConfig) -> Vec<(SettingKey, SettingValue)> {
    MetricKind::ALL
        .into_iter()
        .flat_map(|metric| {
            [
                (
                    SettingKey::Visible(metric),
                    SettingValue::Bool(config.is_visible(metric)),
                ),
                (
                    SettingKey::Interval(metric),
                    SettingValue::Millis(config.interval_ms(metric)),
                ),
            ]
        })
        .collect()
}
