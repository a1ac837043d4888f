use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

use vitals::commands;
use vitals::MetricKind;

fn metric_arg(id: &'static str) -> Arg {
    Arg::new(id)
        .help("Metric: cpu, ram, storage, temp or gpu")
        .value_parser(value_parser!(MetricKind))
}

fn build_cli() -> Command {
    Command::new("vitals")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Samples CPU, memory, disk, thermal and GPU load")
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('V')
                .long("version")
                .help("Print version information")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Config file (defaults to the user config directory)")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(
            Command::new("watch")
                .about("Stream readings until interrupted")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print one JSON object per reading")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    metric_arg("only")
                        .long("only")
                        .help("Only sample these metrics")
                        .num_args(1..)
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_name("MS")
                        .help("Override every update interval (500-300000 ms)")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("no-reload")
                        .long("no-reload")
                        .help("Do not follow changes to the config file")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("sample")
                .about("Take one reading per metric")
                .arg(metric_arg("metric").num_args(0..).index(1))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print readings as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("gpu")
                .about("Show the detected GPU backend")
                .arg(
                    Arg::new("samples")
                        .short('n')
                        .long("samples")
                        .value_name("N")
                        .help("Take N samples, one per second")
                        .value_parser(value_parser!(u32)),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Show or change sampler settings")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("show").about("Print the current settings"))
                .subcommand(Command::new("path").about("Print the config file location"))
                .subcommand(
                    Command::new("set-interval")
                        .about("Set a metric's update interval in milliseconds")
                        .arg(metric_arg("metric").required(true).index(1))
                        .arg(
                            Arg::new("ms")
                                .help("Interval in milliseconds (500-300000)")
                                .required(true)
                                .index(2)
                                .value_parser(value_parser!(u64)),
                        ),
                )
                .subcommand(
                    Command::new("show-metric")
                        .about("Enable sampling of a metric")
                        .arg(metric_arg("metric").required(true).index(1)),
                )
                .subcommand(
                    Command::new("hide-metric")
                        .about("Disable sampling of a metric")
                        .arg(metric_arg("metric").required(true).index(1)),
                ),
        )
        .subcommand(Command::new("version").about("Shows version information"))
}

fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let level = if matches.get_flag("verbose") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    vitals::init_logging(level);

    if matches.get_flag("version") {
        return commands::version();
    }

    match matches.subcommand() {
        Some(("watch", sub_matches)) => commands::watch(sub_matches),
        Some(("sample", sub_matches)) => commands::sample(sub_matches),
        Some(("gpu", sub_matches)) => commands::gpu::execute(sub_matches),
        Some(("config", sub_matches)) => commands::config::execute(sub_matches),
        Some(("version", _)) => commands::version(),
        _ => {
            println!("Use 'vitals --help' for more information.");
            Ok(())
        }
    }
}
