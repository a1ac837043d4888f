use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;

use super::load_config;
use crate::core::sampler::{MetricKind, MAX_INTERVAL_MS, MIN_INTERVAL_MS};

pub fn execute(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", sub_matches)) => show(sub_matches),
        Some(("path", sub_matches)) => {
            let (_, path) = load_config(sub_matches)?;
            println!("{}", path.display().to_string().cyan().bold());
            Ok(())
        }
        Some(("set-interval", sub_matches)) => set_interval(sub_matches),
        Some(("show-metric", sub_matches)) => set_visible(sub_matches, true),
        Some(("hide-metric", sub_matches)) => set_visible(sub_matches, false),
        _ => {
            println!("Use 'vitals config --help' for more information.");
            Ok(())
        }
    }
}

fn show(matches: &ArgMatches) -> Result<()> {
    let (config, path) = load_config(matches)?;

    println!("{}", format!("Configuration ({}):", path.display()).white());
    for metric in MetricKind::ALL {
        let visibility = if config.is_visible(metric) {
            "shown".green()
        } else {
            "hidden".dimmed()
        };
        println!(
            "  {:<12} {:>7} ms  {}",
            metric.display_name().cyan(),
            config.interval_ms(metric),
            visibility
        );
    }
    println!("  {:<12} {:>7} ms", "tool timeout".cyan(), config.command_timeout_ms);
    println!("  {:<12} {}", "storage".cyan(), config.storage_mount);

    Ok(())
}

fn set_interval(matches: &ArgMatches) -> Result<()> {
    let metric = *matches
        .get_one::<MetricKind>("metric")
        .context("Metric argument is required")?;
    let ms = *matches
        .get_one::<u64>("ms")
        .context("Interval argument is required")?;

    let (mut config, path) = load_config(matches)?;
    config.set_interval_ms(metric, ms);
    config.save_to(&path)?;

    let applied = config.interval_ms(metric);
    if applied != ms {
        println!(
            "{}",
            format!(
                "⚠️  Interval clamped to the allowed range {}..={} ms",
                MIN_INTERVAL_MS, MAX_INTERVAL_MS
            )
            .yellow()
        );
    }
    println!(
        "{} {} ms",
        format!("✓ {} update interval set to:", metric).green(),
        applied
    );

    Ok(())
}

fn set_visible(matches: &ArgMatches, visible: bool) -> Result<()> {
    let metric = *matches
        .get_one::<MetricKind>("metric")
        .context("Metric argument is required")?;

    let (mut config, path) = load_config(matches)?;
    config.set_visible(metric, visible);
    config.save_to(&path)?;

    let state = if visible { "shown" } else { "hidden" };
    println!("{}", format!("✓ {} is now {}", metric, state).green());

    Ok(())
}
