use std::path::Path;
use std::time::Duration;

use crate::error::{Result, VitalsError};
use crate::platform::command::run_command;

/// Name of the NVIDIA management tool looked up on the search path
pub const NVIDIA_SMI: &str = "nvidia-smi";

const QUERY_ARGS: [&str; 2] = [
    "--query-gpu=utilization.gpu",
    "--format=csv,noheader,nounits",
];

/// Query GPU utilization through `nvidia-smi`.
pub async fn read_utilization(tool: &Path, timeout: Duration) -> Result<f64> {
    let output = run_command(tool, QUERY_ARGS, timeout).await?;
    parse_utilization(&output)
}

/// Parse `--format=csv,noheader,nounits` output.
///
/// One line per device; the first device is used.
pub fn parse_utilization(output: &str) -> Result<f64> {
    let line = output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| VitalsError::parse("nvidia-smi produced no output"))?;

    let field = line.split(',').next().unwrap_or(line).trim();

    field
        .parse::<f64>()
        .map_err(|_| VitalsError::parse(format!("unexpected nvidia-smi value '{}'", field)))
}
