use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use std::time::Duration;

use super::load_config;
use crate::core::sampler::probes::GpuProbe;
use crate::core::sampler::Probe;
use crate::platform::gpu::GpuDetector;

/// Show the detected GPU backend and optionally take a few samples.
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let (config, _) = load_config(matches)?;
    let samples = matches.get_one::<u32>("samples").copied().unwrap_or(0);

    let mut probe = GpuProbe::new(GpuDetector::new(), config.command_timeout());

    if probe.backend().is_none() {
        println!("{}", "No usable GPU tooling found.".yellow());
        println!(
            "{}",
            "Looked for nvidia-smi, amdgpu gpu_busy_percent and radeontop.".dimmed()
        );
        return Ok(());
    }

    println!("{} {}", "GPU backend:".white(), probe.backend().to_string().cyan().bold());

    if samples == 0 {
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?;

    runtime.block_on(async {
        for i in 0..samples {
            if i > 0 {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            let reading = probe.sample().await;
            let health = probe.health();
            if health.disabled {
                println!("{}", "GPU probe disabled after repeated failures".red());
                break;
            }
            match probe.last_error().filter(|_| health.failure_count > 0) {
                Some(error) => println!("{:>4}  {}", reading.to_string().yellow(), error.dimmed()),
                None => println!("{:>4}", reading.to_string().green()),
            }
        }
    });

    Ok(())
}
