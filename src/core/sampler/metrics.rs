use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VitalsError;

/// One monitored vital.
///
/// Used as the sole key for probes, timers and readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Cpu,
    Ram,
    Storage,
    #[serde(rename = "temp")]
    Temperature,
    Gpu,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Cpu,
        MetricKind::Ram,
        MetricKind::Storage,
        MetricKind::Temperature,
        MetricKind::Gpu,
    ];

    /// Stable lower-case key, shared with the settings keys (`show-<key>`,
    /// `<key>-update-interval`).
    pub fn key(self) -> &'static str {
        match self {
            MetricKind::Cpu => "cpu",
            MetricKind::Ram => "ram",
            MetricKind::Storage => "storage",
            MetricKind::Temperature => "temp",
            MetricKind::Gpu => "gpu",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            MetricKind::Cpu => "CPU",
            MetricKind::Ram => "RAM",
            MetricKind::Storage => "Storage",
            MetricKind::Temperature => "Temperature",
            MetricKind::Gpu => "GPU",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for MetricKind {
    type Err = VitalsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        MetricKind::ALL
            .into_iter()
            .find(|kind| kind.key() == lower || kind.display_name().eq_ignore_ascii_case(&lower))
            .ok_or_else(|| VitalsError::parse(format!("unknown metric '{}'", s)))
    }
}

/// Unitless utilization percentage, always within [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Reading(f64);

impl Reading {
    pub const ZERO: Reading = Reading(0.0);

    /// Non-finite input becomes 0 before clamping.
    pub fn new(value: f64) -> Self {
        if value.is_finite() {
            Reading(value.clamp(0.0, 100.0))
        } else {
            Reading::ZERO
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }
}

impl From<f64> for Reading {
    fn from(value: f64) -> Self {
        Reading::new(value)
    }
}

impl From<Reading> for f64 {
    fn from(reading: Reading) -> Self {
        reading.0
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}%", self.0)
    }
}

/// Latest reading per metric
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VitalsSnapshot {
    pub timestamp: i64, // Unix timestamp
    pub readings: BTreeMap<MetricKind, Reading>,
}

impl VitalsSnapshot {
    pub fn get(&self, metric: MetricKind) -> Option<Reading> {
        self.readings.get(&metric).copied()
    }

    pub fn record(&mut self, metric: MetricKind, reading: Reading) {
        self.readings.insert(metric, reading);
        self.timestamp = chrono::Utc::now().timestamp();
    }
}
