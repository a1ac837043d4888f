//! One-shot sampling of the vitals.

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use std::time::Duration;

use super::load_config;
use crate::core::sampler::{MetricKind, ProbeOptions, ProbeSet, Reading};

/// Gap between the priming and the reported CPU snapshot
const CPU_SETTLE: Duration = Duration::from_millis(500);

/// Execute the sample command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let (config, _) = load_config(matches)?;
    let json = matches.get_flag("json");

    let metrics: Vec<MetricKind> = match matches.get_many::<MetricKind>("metric") {
        Some(values) => values.copied().collect(),
        None => MetricKind::ALL.to_vec(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?;

    let probes = ProbeSet::from_options(&ProbeOptions::from_config(&config));
    let readings = runtime.block_on(sample_all(&probes, &metrics));

    if json {
        let snapshot: serde_json::Map<String, serde_json::Value> = readings
            .iter()
            .map(|(metric, reading, _)| (metric.key().to_string(), serde_json::json!(reading)))
            .collect();
        println!("{}", serde_json::Value::Object(snapshot));
        return Ok(());
    }

    for (metric, reading, error) in readings {
        let line = format!("{:<12} {:>4}", metric.display_name(), reading.to_string());
        match error {
            Some(error) => println!("{}  {}", line.yellow(), error.dimmed()),
            None => println!("{}", line.green()),
        }
    }

    Ok(())
}

async fn sample_all(
    probes: &ProbeSet,
    metrics: &[MetricKind],
) -> Vec<(MetricKind, Reading, Option<String>)> {
    let mut readings = Vec::with_capacity(metrics.len());

    for &metric in metrics {
        let Some(probe) = probes.get(metric) else {
            continue;
        };
        let mut probe = probe.lock().await;

        if metric == MetricKind::Cpu {
            // First sample only primes the counters
            probe.sample().await;
            tokio::time::sleep(CPU_SETTLE).await;
        }

        let reading = probe.sample().await;
        readings.push((metric, reading, probe.last_error()));
    }

    readings
}
