use std::path::Path;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, VitalsError};
use crate::platform::command::run_command;

/// Name of the AMD monitoring tool looked up on the search path
pub const RADEONTOP: &str = "radeontop";

/// Dump a single sample to stdout.
const RADEONTOP_ARGS: [&str; 4] = ["-d", "-", "-l", "1"];

/// Matches the `gpu 12.34%` token of a radeontop dump line
static GPU_TOKEN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)\bgpu\s+(\d+(?:\.\d+)?)\s*%").ok());

/// Read the amdgpu `gpu_busy_percent` sysfs file.
pub async fn read_busy_percent(path: &Path) -> Result<f64> {
    let contents = tokio::fs::read_to_string(path).await?;
    parse_busy_percent(&contents)
}

pub fn parse_busy_percent(contents: &str) -> Result<f64> {
    let trimmed = contents.trim();
    trimmed
        .parse::<u32>()
        .map(f64::from)
        .map_err(|_| VitalsError::parse(format!("unexpected gpu_busy_percent '{}'", trimmed)))
}

/// Take one radeontop sample.
pub async fn read_radeontop(tool: &Path, timeout: Duration) -> Result<f64> {
    let output = run_command(tool, RADEONTOP_ARGS, timeout).await?;
    parse_radeontop(&output)
}

/// Extract the GPU busy percentage from free-form radeontop output.
///
/// A dump line looks like
/// `1700000000.123456: bus 03, gpu 23.33%, ee 0.00%, vgt 1.67%, ...`.
pub fn parse_radeontop(output: &str) -> Result<f64> {
    let regex = GPU_TOKEN
        .as_ref()
        .ok_or_else(|| VitalsError::other("radeontop pattern failed to compile"))?;

    let captures = regex
        .captures(output)
        .ok_or_else(|| VitalsError::parse("no gpu token in radeontop output"))?;

    captures[1]
        .parse::<f64>()
        .map_err(|e| VitalsError::parse(format!("bad radeontop percentage: {}", e)))
}
