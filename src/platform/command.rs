//! Bounded external command execution.
//!
//! Every external tool the probes rely on (`df`, `nvidia-smi`, `radeontop`)
//! runs through [`run_command`], so a hung tool only delays its own metric.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{Result, VitalsError};

/// Default upper bound for a single external command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(2000);

/// Run `program` with `args` and return its stdout.
///
/// Fails on spawn errors, non-zero exit status and timeouts. The child is
/// killed when the timeout elapses.
pub async fn run_command<I, S>(program: &Path, args: I, timeout: Duration) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let name = program.display().to_string();

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, child).await {
        Ok(result) => result.map_err(|e| VitalsError::command(&name, e.to_string()))?,
        Err(_) => return Err(VitalsError::command_timeout(name, timeout)),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VitalsError::command(
            name,
            format!("exited with {}: {}", output.status, stderr.trim()),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
