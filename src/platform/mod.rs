// Platform-specific code module

pub mod command;
pub mod gpu;

// Re-exports for cleaner imports
pub use command::{run_command, DEFAULT_COMMAND_TIMEOUT};
pub use gpu::{GpuBackend, GpuDetector};
