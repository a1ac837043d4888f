// Vitals Library - Public API

// Re-export error types
pub mod error;
pub use error::{Result, VitalsError};

// Module declarations
pub mod commands;
pub mod core;
pub mod platform;

// Re-export commonly used types
pub use core::config::VitalsConfig;
pub use core::sampler::{MetricKind, Reading};

/// Initialize logging. `RUST_LOG` overrides `default_level`.
pub fn init_logging(default_level: log::LevelFilter) {
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();
}
