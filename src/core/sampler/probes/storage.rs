use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::core::sampler::metrics::{MetricKind, Reading};
use crate::core::sampler::probe::Probe;
use crate::error::{Result, VitalsError};
use crate::platform::command::run_command;

/// Column of the `df -P` data row holding the use percentage
/// (`Filesystem 1024-blocks Used Available Capacity Mounted on`).
pub const DF_CAPACITY_COLUMN: usize = 4;

const DF: &str = "df";

/// Parse `df -P <mount>` output: header line, then one data row.
pub fn parse_df_output(output: &str) -> Result<f64> {
    let row = output
        .lines()
        .nth(1)
        .ok_or_else(|| VitalsError::parse("df output has no data row"))?;

    let column = row
        .split_whitespace()
        .nth(DF_CAPACITY_COLUMN)
        .ok_or_else(|| VitalsError::parse(format!("df row too short: '{}'", row)))?;

    column
        .strip_suffix('%')
        .and_then(|value| value.parse::<u32>().ok())
        .map(f64::from)
        .ok_or_else(|| VitalsError::parse(format!("unexpected df capacity '{}'", column)))
}

/// Disk usage of one mount point via `df`.
pub struct StorageProbe {
    mount: PathBuf,
    timeout: Duration,
    last_error: Option<String>,
}

impl StorageProbe {
    pub fn new<P: AsRef<Path>>(mount: P, timeout: Duration) -> Self {
        Self {
            mount: mount.as_ref().to_path_buf(),
            timeout,
            last_error: None,
        }
    }

    async fn read_usage(&mut self) -> Reading {
        let args = [OsStr::new("-P"), self.mount.as_os_str()];
        let result = run_command(Path::new(DF), args, self.timeout)
            .await
            .and_then(|output| parse_df_output(&output));

        match result {
            Ok(percent) => {
                self.last_error = None;
                Reading::new(percent)
            }
            Err(e) => {
                log::debug!("Storage sample for {} failed: {}", self.mount.display(), e);
                self.last_error = Some(e.to_string());
                Reading::ZERO
            }
        }
    }
}

impl Probe for StorageProbe {
    fn kind(&self) -> MetricKind {
        MetricKind::Storage
    }

    fn sample(&mut self) -> BoxFuture<'_, Reading> {
        self.read_usage().boxed()
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }
}
