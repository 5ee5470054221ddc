//! Iron Frontier - standalone driver
//!
//! Loads a configuration and an optional snapshot, runs the upkeep
//! scheduler for a number of ticks and writes the snapshot back.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::runtime::Runtime;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use iron_frontier::core::clock::SystemClock;
use iron_frontier::core::config::FrontierConfig;
use iron_frontier::core::error::Result;
use iron_frontier::frontier::Frontier;
use iron_frontier::ports::{MemoryInventory, MemoryLedger, MemoryWorld, Ports, RecordingNotifier};
use iron_frontier::runtime::{spawn_scheduler, SchedulerOptions};
use iron_frontier::upgrades::UpgradeCatalog;

#[derive(Parser, Debug)]
#[command(name = "iron-frontier")]
#[command(about = "Run the territory and war engine against a snapshot")]
struct Args {
    /// Engine configuration (TOML); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Upgrade catalog (TOML); built-in tiers when omitted
    #[arg(long)]
    upgrades: Option<PathBuf>,

    /// Snapshot loaded at start (if it exists) and saved at the end
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Scheduler ticks to run
    #[arg(long, default_value_t = 3)]
    ticks: u64,

    /// Override the configured tick interval, in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("iron_frontier=info")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => FrontierConfig::load_from_toml(path)?,
        None => FrontierConfig::default(),
    };
    config.validate()?;
    let catalog = match &args.upgrades {
        Some(path) => UpgradeCatalog::load_from_toml(path)?,
        None => UpgradeCatalog::with_defaults(),
    };

    // Standalone runs have no game server behind them
    let ports = Ports::new(
        Some(Box::new(MemoryLedger::new())),
        Box::new(MemoryInventory::new()),
        Box::new(RecordingNotifier::new()),
        Box::new(MemoryWorld::new()),
    );
    let mut frontier = Frontier::new(config, catalog, ports, Box::new(SystemClock));

    if let Some(path) = args.snapshot.as_ref().filter(|p| p.exists()) {
        let report = frontier.load_snapshot_file(path)?;
        tracing::info!(
            states = report.states,
            camps = report.camps,
            wars = report.wars,
            skipped = report.skipped,
            "snapshot loaded"
        );
    }

    let mut options = SchedulerOptions::from_config(&frontier);
    options.max_ticks = Some(args.ticks);
    options.snapshot_path = args.snapshot.clone();
    if let Some(ms) = args.interval_ms {
        options.period = Duration::from_millis(ms.max(1));
    }

    tracing::info!(ticks = args.ticks, period_ms = options.period.as_millis() as u64, "Iron Frontier starting");

    let rt = Runtime::new()?;
    let shared = Arc::new(Mutex::new(frontier));
    let ran = rt.block_on(async {
        let handle = spawn_scheduler(Arc::clone(&shared), options);
        handle.await.unwrap_or_else(|err| {
            tracing::warn!(%err, "scheduler task failed");
            0
        })
    });

    let frontier = rt.block_on(shared.lock());
    if let Some(path) = &args.snapshot {
        frontier.save_snapshot(path)?;
    }
    println!(
        "Ran {} ticks: {} states, {} camps, {} active wars",
        ran,
        frontier.store().state_count(),
        frontier.store().camp_count(),
        frontier.conflict().war_count()
    );
    Ok(())
}
