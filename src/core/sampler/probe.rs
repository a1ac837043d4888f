use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::Mutex;

use super::metrics::{MetricKind, Reading};
use super::probes::{CpuProbe, GpuProbe, RamProbe, StorageProbe, TemperatureProbe};
use crate::core::config::VitalsConfig;
use crate::platform::command::DEFAULT_COMMAND_TIMEOUT;
use crate::platform::gpu::GpuDetector;

/// Sampling unit for one vital.
///
/// `sample` never fails: any internal error is folded into
/// [`Reading::ZERO`] and kept for [`Probe::last_error`].
pub trait Probe: Send {
    /// The vital this probe measures
    fn kind(&self) -> MetricKind;

    /// Take one reading
    fn sample(&mut self) -> BoxFuture<'_, Reading>;

    /// Drop cached detection state and detect again
    fn reset(&mut self) {}

    /// Last failure seen by `sample`, if any
    fn last_error(&self) -> Option<String> {
        None
    }
}

/// A probe shared between the scheduler and the timer tasks it spawns.
///
/// The lock serializes samples of one metric.
pub type SharedProbe = Arc<Mutex<Box<dyn Probe>>>;

/// Where probes read from.
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub proc_stat: PathBuf,
    pub proc_meminfo: PathBuf,
    pub thermal_root: PathBuf,
    pub storage_mount: PathBuf,
    pub command_timeout: Duration,
    pub gpu_detector: GpuDetector,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            proc_stat: PathBuf::from("/proc/stat"),
            proc_meminfo: PathBuf::from("/proc/meminfo"),
            thermal_root: PathBuf::from("/sys/class/thermal"),
            storage_mount: PathBuf::from("/"),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            gpu_detector: GpuDetector::new(),
        }
    }
}

impl ProbeOptions {
    /// System paths with the timeout and mount point taken from `config`
    pub fn from_config(config: &VitalsConfig) -> Self {
        Self {
            storage_mount: PathBuf::from(&config.storage_mount),
            command_timeout: config.command_timeout(),
            ..Self::default()
        }
    }
}

/// One probe per metric.
#[derive(Default)]
pub struct ProbeSet {
    probes: BTreeMap<MetricKind, SharedProbe>,
}

impl ProbeSet {
    /// Build all five probes.
    ///
    /// Thermal zone discovery and GPU detection happen here.
    pub fn from_options(options: &ProbeOptions) -> Self {
        let mut set = Self::default();
        set.insert(Box::new(CpuProbe::with_stat_path(&options.proc_stat)));
        set.insert(Box::new(RamProbe::with_meminfo_path(&options.proc_meminfo)));
        set.insert(Box::new(StorageProbe::new(
            &options.storage_mount,
            options.command_timeout,
        )));
        set.insert(Box::new(TemperatureProbe::discover(&options.thermal_root)));
        set.insert(Box::new(GpuProbe::new(
            options.gpu_detector.clone(),
            options.command_timeout,
        )));
        set
    }

    /// Add or replace the probe for its metric
    pub fn insert(&mut self, probe: Box<dyn Probe>) {
        self.probes.insert(probe.kind(), Arc::new(Mutex::new(probe)));
    }

    pub fn get(&self, metric: MetricKind) -> Option<SharedProbe> {
        self.probes.get(&metric).cloned()
    }

    pub fn metrics(&self) -> impl Iterator<Item = MetricKind> + '_ {
        self.probes.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}
