// Command handlers module
pub mod config;
pub mod gpu;
pub mod sample;
pub mod version;
pub mod watch;

// Re-exports for cleaner imports
pub use sample::execute as sample;
pub use version::execute as version;
pub use watch::execute as watch;

use anyhow::Result;
use clap::ArgMatches;
use std::path::PathBuf;

use crate::core::VitalsConfig;

/// Resolve `--config` (or the default location) and load it.
pub fn load_config(matches: &ArgMatches) -> Result<(VitalsConfig, PathBuf)> {
    let path = match matches.get_one::<PathBuf>("config") {
        Some(path) => path.clone(),
        None => VitalsConfig::get_config_path()?,
    };
    let config = VitalsConfig::load_from(&path)?;
    Ok((config, path))
}
