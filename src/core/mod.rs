// Core business logic module

pub mod config;
pub mod sampler;

// Re-export commonly used items
pub use config::VitalsConfig;
pub use sampler::{MetricKind, Reading, Scheduler, Settings};
