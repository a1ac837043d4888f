use std::io;
use std::time::Duration;
use thiserror::Error;

/// Error type for the vitals sampler
#[derive(Error, Debug)]
pub enum VitalsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Command `{program}` failed: {message}")]
    Command { program: String, message: String },

    #[error("Command `{program}` timed out after {timeout:?}")]
    CommandTimeout { program: String, timeout: Duration },

    #[error("GPU not available: {0}")]
    GpuNotAvailable(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for the vitals sampler
pub type Result<T> = std::result::Result<T, VitalsError>;

impl VitalsError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        VitalsError::Config(msg.into())
    }

    /// Create a parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        VitalsError::Parse(msg.into())
    }

    /// Create a command failure for `program`
    pub fn command<P: Into<String>, S: Into<String>>(program: P, msg: S) -> Self {
        VitalsError::Command {
            program: program.into(),
            message: msg.into(),
        }
    }

    pub fn command_timeout<P: Into<String>>(program: P, timeout: Duration) -> Self {
        VitalsError::CommandTimeout {
            program: program.into(),
            timeout,
        }
    }

    pub fn gpu_not_available<S: Into<String>>(msg: S) -> Self {
        VitalsError::GpuNotAvailable(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        VitalsError::Other(msg.into())
    }
}
