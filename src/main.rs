use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use infra_health_reporter::config::{load_config, Config};
use infra_health_reporter::{inspection_summary, run_inspection, run_ri_coverage, AwsCliInventory};

const MAX_INTERVAL_MINUTES: u64 = 525_600;

#[derive(Debug, Parser)]
#[command(name = "infra-health-reporter", version, about = "AWS RI coverage and infrastructure health reports")]
struct Cli {
    /// TOML settings file
    #[arg(long, env = "REPORTER_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Skip webhook delivery
    #[arg(long, global = true)]
    no_notify: bool,

    /// Repeat the command every N minutes instead of running once
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..=MAX_INTERVAL_MINUTES))]
    interval_minutes: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// EC2 Reserved Instance coverage across configured regions
    RiCoverage,
    /// Threshold inspection of Prometheus host metrics
    Inspect,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref())?;
    info!("regions = {:?}", cfg.ri_analysis.regions);

    let Some(minutes) = cli.interval_minutes else {
        return run_once(cli.command, &cfg, !cli.no_notify).await;
    };

    info!("Running {:?} every {} minutes", cli.command, minutes);
    let mut ticker = tokio::time::interval(tick_period(minutes));
    // a slow cycle pushes the next one back instead of bursting to catch up
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Err(e) = run_once(cli.command, &cfg, !cli.no_notify).await {
            error!("Run failed: {:#}", e);
        }
    }
}

async fn run_once(command: Command, cfg: &Config, send: bool) -> Result<()> {
    match command {
        Command::RiCoverage => {
            let inventory = AwsCliInventory::new(cfg.ri_analysis.profile.clone());
            let report = run_ri_coverage(cfg, &inventory, send).await?;
            println!("\n{}", report.to_markdown());
        }
        Command::Inspect => {
            let report = run_inspection(cfg, send).await?;
            println!("\n{}", inspection_summary(&report));
            println!("Metrics collected: {}\n", report.metrics_count());
        }
    }
    Ok(())
}

fn tick_period(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
