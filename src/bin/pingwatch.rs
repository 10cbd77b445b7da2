use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use pingwatch::{
    actors::{
        messages::MonitorEvent,
        scheduler::{SchedulerHandle, SchedulerSettings},
    },
    config::{Config, read_config_file},
    monitor::Monitor,
    monitors::ping::PingProber,
    util,
};
use tokio::sync::broadcast;
use tracing::{debug, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (defaults to $PINGWATCH_CONFIG or ./pingwatch.json)
    #[arg(short, long)]
    file: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = filter::Targets::new().with_targets(vec![("pingwatch", level)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let path = args.file.unwrap_or_else(util::get_config_file);
    let mut config = if Path::new(&path).exists() {
        read_config_file(&path)?
    } else {
        info!("no config file at {path}, using defaults");
        Config::default()
    };
    config.apply_env_overrides();
    let config = config.resolve()?;

    let monitor = Monitor::from_config(&config).await;
    info!(
        "monitoring {} targets every {:?} (timeout {:?})",
        config.targets.len(),
        config.interval,
        config.timeout
    );
    if !monitor.alerts().is_enabled() {
        info!("alerts disabled");
    }

    let reporter = tokio::spawn(report(monitor.subscribe()));

    let scheduler = SchedulerHandle::spawn(
        monitor.clone(),
        Arc::new(PingProber::new()),
        SchedulerSettings::from(&config),
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    scheduler.shutdown().await;
    reporter.abort();

    for status in monitor.statuses().await {
        info!(
            "{}: {} (last latency: {:?} ms)",
            status.target,
            status.label(),
            status.last_latency_ms
        );
    }

    Ok(())
}

async fn report(mut events: broadcast::Receiver<MonitorEvent>) {
    loop {
        match events.recv().await {
            Ok(MonitorEvent::ProbeCompleted { target, result }) => match result.latency_ms {
                Some(latency) if result.reachable => debug!("{target}: up ({latency:.1} ms)"),
                _ => debug!("{target}: down"),
            },
            Ok(MonitorEvent::Transition(event)) => {
                trace!("transition published: {event}");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("reporter lagged, skipped {skipped} events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
