use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::core::sampler::metrics::{MetricKind, Reading};
use crate::core::sampler::probe::Probe;
use crate::error::{Result, VitalsError};

/// `MemTotal` and `MemAvailable` in kB
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub total_kb: u64,
    pub available_kb: u64,
}

impl MemInfo {
    pub fn usage_percent(&self) -> f64 {
        if self.total_kb == 0 {
            return 0.0;
        }
        let used = self.total_kb.saturating_sub(self.available_kb);
        (used as f64 / self.total_kb as f64) * 100.0
    }
}

/// Parse `Key:   value kB` lines of `/proc/meminfo`.
pub fn parse_meminfo(contents: &str) -> Result<MemInfo> {
    let mut total = None;
    let mut available = None;

    for line in contents.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let slot = match key.trim() {
            "MemTotal" => &mut total,
            "MemAvailable" => &mut available,
            _ => continue,
        };
        *slot = rest
            .split_whitespace()
            .next()
            .and_then(|value| value.parse::<u64>().ok());

        if total.is_some() && available.is_some() {
            break;
        }
    }

    let total_kb = total
        .filter(|&kb| kb > 0)
        .ok_or_else(|| VitalsError::parse("MemTotal missing or zero"))?;

    Ok(MemInfo {
        total_kb,
        available_kb: available.unwrap_or(0),
    })
}

/// Memory pressure from `/proc/meminfo`. Stateless.
pub struct RamProbe {
    meminfo_path: PathBuf,
    last_error: Option<String>,
}

impl RamProbe {
    pub fn new() -> Self {
        Self::with_meminfo_path("/proc/meminfo")
    }

    pub fn with_meminfo_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            meminfo_path: path.as_ref().to_path_buf(),
            last_error: None,
        }
    }

    async fn read_usage(&mut self) -> Reading {
        let result: Result<MemInfo> = async {
            let contents = tokio::fs::read_to_string(&self.meminfo_path).await?;
            parse_meminfo(&contents)
        }
        .await;

        match result {
            Ok(info) => {
                self.last_error = None;
                Reading::new(info.usage_percent())
            }
            Err(e) => {
                log::debug!("RAM sample failed: {}", e);
                self.last_error = Some(e.to_string());
                Reading::ZERO
            }
        }
    }
}

impl Default for RamProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for RamProbe {
    fn kind(&self) -> MetricKind {
        MetricKind::Ram
    }

    fn sample(&mut self) -> BoxFuture<'_, Reading> {
        self.read_usage().boxed()
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }
}
