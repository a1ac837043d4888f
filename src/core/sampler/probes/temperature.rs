use std::fs;
use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::core::sampler::metrics::{MetricKind, Reading};
use crate::core::sampler::probe::Probe;
use crate::error::{Result, VitalsError};

/// 30°C maps to 0%
pub const MIN_TEMP_CELSIUS: f64 = 30.0;
/// 90°C maps to 100%
pub const MAX_TEMP_CELSIUS: f64 = 90.0;

/// Readings outside this open interval are sensor stubs or garbage.
const PLAUSIBLE_CELSIUS: (f64, f64) = (5.0, 150.0);

/// Zone type substrings that identify CPU/package sensors (lower-case).
const CPU_ZONE_TYPES: [&str; 11] = [
    "cpu",
    "processor",
    "x86_pkg_temp",
    "pkg_temp",
    "package",
    "coretemp",
    "k10temp",
    "zenpower",
    "tctl",
    "tdie",
    "soc_thermal",
];

const HWMON_FALLBACKS: [&str; 2] = [
    "/sys/class/hwmon/hwmon0/temp1_input",
    "/sys/class/hwmon/hwmon1/temp1_input",
];

/// Does a thermal zone `type` string describe a CPU sensor?
pub fn is_cpu_zone_type(zone_type: &str) -> bool {
    let lower = zone_type.trim().to_ascii_lowercase();
    CPU_ZONE_TYPES.iter().any(|needle| lower.contains(needle))
}

/// Parse a millidegree `temp` file into Celsius.
pub fn parse_millidegrees(contents: &str) -> Result<f64> {
    let trimmed = contents.trim();
    trimmed
        .parse::<i64>()
        .map(|milli| milli as f64 / 1000.0)
        .map_err(|_| VitalsError::parse(format!("unexpected temperature '{}'", trimmed)))
}

pub fn is_plausible(celsius: f64) -> bool {
    celsius > PLAUSIBLE_CELSIUS.0 && celsius < PLAUSIBLE_CELSIUS.1
}

/// Average of the plausible readings mapped onto 30°C..90°C.
pub fn temperature_percent(celsius: &[f64]) -> f64 {
    let valid: Vec<f64> = celsius.iter().copied().filter(|&c| is_plausible(c)).collect();
    if valid.is_empty() {
        return 0.0;
    }

    let average = valid.iter().sum::<f64>() / valid.len() as f64;
    ((average - MIN_TEMP_CELSIUS) / (MAX_TEMP_CELSIUS - MIN_TEMP_CELSIUS)) * 100.0
}

/// Enumerate `thermal_zoneN` entries under `thermal_root` whose type is
/// CPU related, in name order.
fn discover_cpu_zones(thermal_root: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(thermal_root) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Cannot enumerate {}: {}", thermal_root.display(), e);
            return Vec::new();
        }
    };

    let mut zones: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("thermal_zone"))
        .map(|entry| entry.path())
        .filter(|zone| {
            fs::read_to_string(zone.join("type"))
                .map(|zone_type| is_cpu_zone_type(&zone_type))
                .unwrap_or(false)
        })
        .map(|zone| zone.join("temp"))
        .collect();

    zones.sort();
    zones
}

/// CPU thermal state averaged over the detected zones.
pub struct TemperatureProbe {
    zones: Vec<PathBuf>,
    last_error: Option<String>,
}

impl TemperatureProbe {
    /// Detect zones under `thermal_root` (normally `/sys/class/thermal`).
    ///
    /// Without a CPU-typed zone the well-known fallback paths are used, kept
    /// only if they exist. The zone set is fixed afterwards.
    pub fn discover<P: AsRef<Path>>(thermal_root: P) -> Self {
        let thermal_root = thermal_root.as_ref();
        let mut zones = discover_cpu_zones(thermal_root);

        if zones.is_empty() {
            let fallbacks = std::iter::once(thermal_root.join("thermal_zone0").join("temp"))
                .chain(HWMON_FALLBACKS.iter().map(PathBuf::from));
            zones = fallbacks.filter(|path| path.exists()).collect();
        }

        if zones.is_empty() {
            log::warn!("No thermal sources found; temperature will read 0");
        } else {
            log::info!("Temperature sources: {:?}", zones);
        }

        Self::with_zones(zones)
    }

    /// Use an explicit zone list, skipping discovery.
    pub fn with_zones(zones: Vec<PathBuf>) -> Self {
        Self {
            zones,
            last_error: None,
        }
    }

    pub fn zones(&self) -> &[PathBuf] {
        &self.zones
    }

    async fn read_usage(&mut self) -> Reading {
        let mut readings = Vec::with_capacity(self.zones.len());
        let mut failure = None;

        for zone in &self.zones {
            let result = match tokio::fs::read_to_string(zone).await {
                Ok(contents) => parse_millidegrees(&contents),
                Err(e) => Err(e.into()),
            };
            match result {
                Ok(celsius) => readings.push(celsius),
                Err(e) => failure = Some(format!("{}: {}", zone.display(), e)),
            }
        }

        if readings.iter().all(|&c| !is_plausible(c)) {
            let error = failure.unwrap_or_else(|| "no plausible temperature reading".to_string());
            log::debug!("Temperature sample failed: {}", error);
            self.last_error = Some(error);
            return Reading::ZERO;
        }

        self.last_error = failure;
        Reading::new(temperature_percent(&readings))
    }
}

impl Probe for TemperatureProbe {
    fn kind(&self) -> MetricKind {
        MetricKind::Temperature
    }

    fn sample(&mut self) -> BoxFuture<'_, Reading> {
        self.read_usage().boxed()
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }
}
