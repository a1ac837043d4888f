//! GPU-specific platform code.
//!
//! Detects which GPU tooling is usable on this host and reads utilization
//! through it. Supports NVIDIA (via `nvidia-smi`) and AMD (via the amdgpu
//! sysfs busy counter, or `radeontop`).

mod amd;
mod nvidia;

pub use amd::{parse_busy_percent, parse_radeontop, read_busy_percent, read_radeontop, RADEONTOP};
pub use nvidia::{parse_utilization, read_utilization, NVIDIA_SMI};

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Number of `cardN` entries scanned for a busy-percent file.
pub const MAX_DRM_CARDS: u32 = 8;

/// Default sysfs directory holding `cardN` entries.
pub const DRM_ROOT: &str = "/sys/class/drm";

/// Places radeontop is commonly installed outside the search path.
pub const RADEONTOP_LOCATIONS: [&str; 3] = [
    "/usr/bin/radeontop",
    "/usr/local/bin/radeontop",
    "/usr/sbin/radeontop",
];

/// The GPU tooling selected by detection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GpuBackend {
    /// `nvidia-smi` at the given path
    Nvidia(PathBuf),
    /// amdgpu `gpu_busy_percent` file
    AmdSysfs(PathBuf),
    /// `radeontop` at the given path
    AmdExternalTool(PathBuf),
    #[default]
    None,
}

impl GpuBackend {
    pub fn is_none(&self) -> bool {
        matches!(self, GpuBackend::None)
    }

    pub fn label(&self) -> &'static str {
        match self {
            GpuBackend::Nvidia(_) => "nvidia-smi",
            GpuBackend::AmdSysfs(_) => "amdgpu sysfs",
            GpuBackend::AmdExternalTool(_) => "radeontop",
            GpuBackend::None => "none",
        }
    }
}

impl fmt::Display for GpuBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuBackend::Nvidia(path)
            | GpuBackend::AmdSysfs(path)
            | GpuBackend::AmdExternalTool(path) => {
                write!(f, "{} ({})", self.label(), path.display())
            }
            GpuBackend::None => f.write_str("none"),
        }
    }
}

/// Finds the GPU backend to use.
///
/// Detection order:
/// 1. NVIDIA (`nvidia-smi` on the search path)
/// 2. AMD sysfs (`cardN/device/gpu_busy_percent`, no privilege needed)
/// 3. AMD `radeontop` (search path, then known install locations)
///
/// Falls back to [`GpuBackend::None`].
#[derive(Debug, Clone)]
pub struct GpuDetector {
    search_path: Option<OsString>,
    drm_root: PathBuf,
    max_cards: u32,
    tool_locations: Vec<PathBuf>,
}

impl Default for GpuDetector {
    fn default() -> Self {
        Self {
            search_path: None,
            drm_root: PathBuf::from(DRM_ROOT),
            max_cards: MAX_DRM_CARDS,
            tool_locations: RADEONTOP_LOCATIONS.iter().map(PathBuf::from).collect(),
        }
    }
}

impl GpuDetector {
    /// Detector using `$PATH` and the real sysfs tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Search `path` (a `PATH`-style list) instead of `$PATH`.
    pub fn with_search_path<S: Into<OsString>>(mut self, path: S) -> Self {
        self.search_path = Some(path.into());
        self
    }

    pub fn with_drm_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.drm_root = root.into();
        self
    }

    pub fn with_tool_locations(mut self, locations: Vec<PathBuf>) -> Self {
        self.tool_locations = locations;
        self
    }

    /// Run detection in priority order, stopping at the first match.
    pub fn detect(&self) -> GpuBackend {
        let backend = if let Some(path) = self.find_program(NVIDIA_SMI) {
            GpuBackend::Nvidia(path)
        } else if let Some(path) = self.find_sysfs_busy_file() {
            GpuBackend::AmdSysfs(path)
        } else if let Some(path) = self.find_radeontop() {
            GpuBackend::AmdExternalTool(path)
        } else {
            GpuBackend::None
        };

        log::info!("GPU backend detected: {}", backend);
        backend
    }

    fn find_program(&self, name: &str) -> Option<PathBuf> {
        match &self.search_path {
            Some(paths) => which::which_in(name, Some(paths), Path::new("/")).ok(),
            None => which::which(name).ok(),
        }
    }

    fn find_sysfs_busy_file(&self) -> Option<PathBuf> {
        (0..self.max_cards)
            .map(|index| {
                self.drm_root
                    .join(format!("card{}", index))
                    .join("device")
                    .join("gpu_busy_percent")
            })
            .find(|path| path.is_file())
    }

    fn find_radeontop(&self) -> Option<PathBuf> {
        self.find_program(RADEONTOP)
            .or_else(|| self.tool_locations.iter().find(|p| p.is_file()).cloned())
    }
}
