//! Watch command handler.
//!
//! Streams readings from every visible vital until interrupted.

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use std::sync::Arc;

use super::load_config;
use crate::core::sampler::{
    MetricKind, ProbeOptions, Reading, ReadingSink, VitalsRuntime, DEFAULT_RELOAD_INTERVAL,
};

/// Prints each reading as it arrives.
struct PrintSink {
    json: bool,
}

impl ReadingSink for PrintSink {
    fn on_reading(&self, metric: MetricKind, reading: Reading) {
        if self.json {
            let line = serde_json::json!({
                "timestamp": chrono::Utc::now().timestamp(),
                "metric": metric,
                "value": reading,
            });
            println!("{}", line);
        } else {
            println!(
                "{} {:<12} {:>4}",
                chrono::Local::now().format("%H:%M:%S").to_string().dimmed(),
                metric.display_name().cyan(),
                colorize(reading)
            );
        }
    }
}

fn colorize(reading: Reading) -> colored::ColoredString {
    let text = reading.to_string();
    match reading.value() {
        v if v >= 90.0 => text.red().bold(),
        v if v >= 70.0 => text.yellow(),
        _ => text.green(),
    }
}

/// Execute the watch command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let (mut config, config_path) = load_config(matches)?;
    let json = matches.get_flag("json");
    let follow_config = !matches.get_flag("no-reload");

    let only: Vec<MetricKind> = matches
        .get_many::<MetricKind>("only")
        .map(|values| values.copied().collect())
        .unwrap_or_default();

    if !only.is_empty() {
        for metric in MetricKind::ALL {
            config.set_visible(metric, only.contains(&metric));
        }
    }

    let interval = matches.get_one::<u64>("interval").copied();
    if let Some(ms) = interval {
        for metric in MetricKind::ALL {
            config.set_interval_ms(metric, ms);
        }
    }

    let options = ProbeOptions::from_config(&config);
    let mut runtime =
        VitalsRuntime::new(&config, options).context("Failed to start sampler runtime")?;

    // Reloading would undo command-line overrides
    if follow_config && only.is_empty() && interval.is_none() {
        runtime = runtime.watch_config(config_path, DEFAULT_RELOAD_INTERVAL);
    }

    let shutdown = runtime.shutdown_sender();
    ctrlc::set_handler(move || {
        let _ = shutdown.send(());
    })
    .context("Failed to install Ctrl-C handler")?;

    if !json {
        println!("{}", "Sampling vitals (Ctrl-C to stop)...".white());
    }

    runtime
        .run(Arc::new(PrintSink { json }))
        .context("Sampler failed")
}
