use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::core::sampler::metrics::{MetricKind, Reading};
use crate::core::sampler::probe::Probe;
use crate::error::{Result, VitalsError};

/// Cumulative time-in-state counters of the aggregate `cpu ` line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub total: u64,
    pub idle: u64,
}

/// Parse the first line of `/proc/stat`.
///
/// Field index 3 (0-based, after the `cpu` prefix) is idle time; the sum of
/// all fields is total time.
pub fn parse_cpu_times(stat: &str) -> Result<CpuTimes> {
    let line = stat
        .lines()
        .next()
        .ok_or_else(|| VitalsError::parse("empty stat file"))?;

    let fields = line
        .strip_prefix("cpu ")
        .ok_or_else(|| VitalsError::parse("first stat line is not the aggregate cpu line"))?;

    let times: Vec<u64> = fields
        .split_whitespace()
        .filter_map(|field| field.parse::<u64>().ok())
        .collect();

    if times.len() < 4 {
        return Err(VitalsError::parse(format!(
            "expected at least 4 cpu fields, found {}",
            times.len()
        )));
    }

    Ok(CpuTimes {
        total: times.iter().sum(),
        idle: times[3],
    })
}

/// Busy percentage between two snapshots; 0 when total did not advance.
pub fn usage_between(previous: CpuTimes, current: CpuTimes) -> f64 {
    let total_delta = current.total as i128 - previous.total as i128;
    let idle_delta = current.idle as i128 - previous.idle as i128;

    if total_delta <= 0 {
        return 0.0;
    }

    ((total_delta - idle_delta) as f64 / total_delta as f64) * 100.0
}

/// Processor load from `/proc/stat` deltas.
pub struct CpuProbe {
    stat_path: PathBuf,
    previous: CpuTimes,
    last_error: Option<String>,
}

impl CpuProbe {
    pub fn new() -> Self {
        Self::with_stat_path("/proc/stat")
    }

    pub fn with_stat_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            stat_path: path.as_ref().to_path_buf(),
            previous: CpuTimes::default(),
            last_error: None,
        }
    }

    /// Take the priming snapshot without reporting it.
    pub async fn prime(&mut self) {
        let _ = self.read_usage().await;
    }

    /// Counters stored by the last successful sample
    pub fn previous(&self) -> CpuTimes {
        self.previous
    }

    async fn read_usage(&mut self) -> Reading {
        match self.read_times().await {
            Ok(current) => {
                // The zero baseline makes the first sample report the
                // busy ratio of the snapshot itself.
                let usage = usage_between(self.previous, current);
                self.previous = current;
                self.last_error = None;
                Reading::new(usage)
            }
            Err(e) => {
                log::debug!("CPU sample failed: {}", e);
                self.last_error = Some(e.to_string());
                Reading::ZERO
            }
        }
    }

    async fn read_times(&self) -> Result<CpuTimes> {
        let stat = tokio::fs::read_to_string(&self.stat_path).await?;
        parse_cpu_times(&stat)
    }
}

impl Default for CpuProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for CpuProbe {
    fn kind(&self) -> MetricKind {
        MetricKind::Cpu
    }

    fn sample(&mut self) -> BoxFuture<'_, Reading> {
        self.read_usage().boxed()
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }
}
