use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::prelude::*;

use clook::elevator::ElevatorRegistry;
use clook::{Config, Controller, RecordingSink, Workload};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("verbose"));

    let config = load_config(&matches)?;
    info!("Scheduler configuration: {:?}", config);

    let registry = ElevatorRegistry::with_builtin();
    let sink = Arc::new(RecordingSink::new());
    let controller = Controller::new(config, &registry, sink.clone())?;

    match matches.subcommand() {
        Some(("replay", sub)) => {
            let path = sub
                .get_one::<String>("file")
                .context("missing workload file")?;
            let workload = Workload::from_file(path)
                .with_context(|| format!("failed to load workload {}", path))?;
            let device = match sub.get_one::<String>("device") {
                Some(name) => name.clone(),
                None => controller.config().devices[0].clone(),
            };

            let summary = controller.replay(&device, &workload).await?;
            info!(
                "{}: admitted {}, dispatched {}, merged {}, throttled {}",
                device, summary.admitted, summary.dispatched, summary.merged, summary.throttled
            );
        }
        Some(("simulate", sub)) => {
            let requests = *sub.get_one::<usize>("requests").context("missing --requests")?;
            let seed = *sub.get_one::<u64>("seed").context("missing --seed")?;

            for (device, summary) in controller.simulate(requests, seed).await? {
                let stats = controller.device(&device)?.stats().await;
                info!(
                    "{}: admitted {}, dispatched {}, throttled {}, sweeps wrapped {}",
                    device, summary.admitted, summary.dispatched, summary.throttled, stats.wraps
                );
            }
        }
        _ => unreachable!("subcommand is required"),
    }

    info!("{} requests reached the dispatch sink", sink.len().await);
    controller.shutdown().await?;
    Ok(())
}

fn cli() -> Command {
    Command::new("clook")
        .version("0.1.0")
        .about("C-LOOK disk I/O request scheduler")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("JSON configuration file"),
        )
        .arg(
            Arg::new("elevator")
                .long("elevator")
                .global(true)
                .help("Elevator to attach to each device"),
        )
        .arg(
            Arg::new("queue-depth")
                .long("queue-depth")
                .global(true)
                .value_parser(clap::value_parser!(usize))
                .help("Maximum queued requests per device"),
        )
        .arg(
            Arg::new("devices")
                .long("devices")
                .global(true)
                .help("Comma-separated device names"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug diagnostics on stderr"),
        )
        .subcommand(
            Command::new("replay")
                .about("Replay a workload file and print the scheduler trace")
                .arg(Arg::new("file").required(true).help("Workload file"))
                .arg(
                    Arg::new("device")
                        .long("device")
                        .help("Device to replay on (default: first configured)"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Drive every device with a random workload")
                .arg(
                    Arg::new("requests")
                        .long("requests")
                        .short('n')
                        .value_parser(clap::value_parser!(usize))
                        .default_value("1000"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("1"),
                ),
        )
}

/// Trace lines go to stdout untouched; everything else goes to stderr.
fn init_logging(verbose: bool) {
    let diagnostics_level = if verbose { Level::DEBUG } else { Level::INFO };

    let trace_layer = tracing_subscriber::fmt::layer()
        .without_time()
        .with_target(false)
        .with_level(false)
        .with_ansi(false)
        .with_filter(filter_fn(|meta| meta.target() == "sched"));

    let diagnostics_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter_fn(move |meta| {
            meta.target() != "sched" && *meta.level() <= diagnostics_level
        }));

    tracing_subscriber::registry()
        .with(trace_layer)
        .with(diagnostics_layer)
        .init();
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<Config> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config {}", path))?,
        None => Config::default(),
    };

    if let Some(name) = matches.get_one::<String>("elevator") {
        config.elevator = name.clone();
    }
    if let Some(depth) = matches.get_one::<usize>("queue-depth") {
        config.queue_depth = *depth;
    }
    if let Some(devices) = matches.get_one::<String>("devices") {
        config.devices = devices
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    config.validate()?;
    Ok(config)
}
