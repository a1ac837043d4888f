use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::sampler::{clamp_interval_ms, MetricKind};

/// User preferences consumed by the sampler.
///
/// Field names serialize to the preference keys (`show-cpu`,
/// `cpu-update-interval`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct VitalsConfig {
    pub show_cpu: bool,
    pub show_ram: bool,
    pub show_storage: bool,
    pub show_temp: bool,
    pub show_gpu: bool,

    /// Update intervals in milliseconds
    pub cpu_update_interval: u64,
    pub ram_update_interval: u64,
    pub storage_update_interval: u64,
    pub temp_update_interval: u64,
    pub gpu_update_interval: u64,

    /// Upper bound for one external tool invocation
    pub command_timeout_ms: u64,
    /// Mount point reported by the storage vital
    pub storage_mount: String,
}

impl Default for VitalsConfig {
    fn default() -> Self {
        Self {
            show_cpu: true,
            show_ram: true,
            show_storage: true,
            show_temp: true,
            show_gpu: true,
            cpu_update_interval: 2000,
            ram_update_interval: 2000,
            storage_update_interval: 5000,
            temp_update_interval: 2000,
            gpu_update_interval: 2000,
            command_timeout_ms: 2000,
            storage_mount: "/".to_string(),
        }
    }
}

impl VitalsConfig {
    /// Load from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load from `path`. A missing, empty or unreadable-format file yields
    /// the defaults; intervals are clamped to the allowed range.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if !path.exists() {
            VitalsConfig::default()
        } else {
            let data = fs::read(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;

            if data.is_empty() {
                VitalsConfig::default()
            } else {
                serde_json::from_slice(&data).unwrap_or_else(|e| {
                    log::warn!("Ignoring malformed config {:?}: {}", path, e);
                    VitalsConfig::default()
                })
            }
        };

        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data = serde_json::to_vec_pretty(self).with_context(|| "Failed to serialize config")?;

        fs::write(path, data)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("vitals").join("config.json"))
    }

    /// Clamp every interval into the allowed range
    pub fn normalize(&mut self) {
        for metric in MetricKind::ALL {
            let ms = self.interval_ms(metric);
            self.set_interval_ms(metric, ms);
        }
    }

    pub fn is_visible(&self, metric: MetricKind) -> bool {
        match metric {
            MetricKind::Cpu => self.show_cpu,
            MetricKind::Ram => self.show_ram,
            MetricKind::Storage => self.show_storage,
            MetricKind::Temperature => self.show_temp,
            MetricKind::Gpu => self.show_gpu,
        }
    }

    pub fn set_visible(&mut self, metric: MetricKind, visible: bool) {
        let slot = match metric {
            MetricKind::Cpu => &mut self.show_cpu,
            MetricKind::Ram => &mut self.show_ram,
            MetricKind::Storage => &mut self.show_storage,
            MetricKind::Temperature => &mut self.show_temp,
            MetricKind::Gpu => &mut self.show_gpu,
        };
        *slot = visible;
    }

    pub fn interval_ms(&self, metric: MetricKind) -> u64 {
        match metric {
            MetricKind::Cpu => self.cpu_update_interval,
            MetricKind::Ram => self.ram_update_interval,
            MetricKind::Storage => self.storage_update_interval,
            MetricKind::Temperature => self.temp_update_interval,
            MetricKind::Gpu => self.gpu_update_interval,
        }
    }

    /// Set an interval, clamped to [500, 300000] ms
    pub fn set_interval_ms(&mut self, metric: MetricKind, ms: u64) {
        let slot = match metric {
            MetricKind::Cpu => &mut self.cpu_update_interval,
            MetricKind::Ram => &mut self.ram_update_interval,
            MetricKind::Storage => &mut self.storage_update_interval,
            MetricKind::Temperature => &mut self.temp_update_interval,
            MetricKind::Gpu => &mut self.gpu_update_interval,
        };
        *slot = clamp_interval_ms(ms);
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms.max(1))
    }
}
