//! Periodic driver for [`Frontier::tick`]
//!
//! The engine is single-threaded; hosts share it behind an
//! `Arc<tokio::sync::Mutex<_>>` and this task takes the lock once per
//! interval, the same way player actions do.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::frontier::Frontier;

/// Scheduler settings
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub period: Duration,
    /// Stop after this many ticks; `None` runs until the task is aborted
    pub max_ticks: Option<u64>,
    /// Written whenever a tick left the store dirty
    pub snapshot_path: Option<PathBuf>,
}

impl SchedulerOptions {
    /// Period taken from `upkeep.tick_interval_secs`
    pub fn from_config(frontier: &Frontier) -> Self {
        Self {
            period: Duration::from_secs(frontier.config().upkeep.tick_interval_secs.max(1)),
            max_ticks: None,
            snapshot_path: None,
        }
    }
}

/// Spawn the tick loop. Returns the number of ticks run when it stops.
pub fn spawn_scheduler(frontier: Arc<Mutex<Frontier>>, options: SchedulerOptions) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut timer = interval(options.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick of a tokio interval completes immediately
        timer.tick().await;

        let mut ran = 0u64;
        loop {
            if options.max_ticks.map_or(false, |max| ran >= max) {
                break;
            }
            timer.tick().await;

            let mut guard = frontier.lock().await;
            let report = guard.tick();
            ran += 1;
            if !report.conflict.resolved.is_empty() {
                info!(tick = report.tick, wars = report.conflict.resolved.len(), "wars resolved");
            }
            if let Some(path) = &options.snapshot_path {
                if guard.take_dirty() {
                    if let Err(err) = guard.save_snapshot(path) {
                        warn!(path = %path.display(), %err, "snapshot save failed");
                    }
                }
            }
        }
        ran
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::core::config::FrontierConfig;
    use crate::ports::{MemoryInventory, MemoryLedger, MemoryWorld, Ports, RecordingNotifier};
    use crate::upgrades::UpgradeCatalog;

    fn frontier() -> Frontier {
        let ports = Ports::new(
            Some(Box::new(MemoryLedger::new())),
            Box::new(MemoryInventory::new()),
            Box::new(RecordingNotifier::new()),
            Box::new(MemoryWorld::new()),
        );
        Frontier::new(
            FrontierConfig::default(),
            UpgradeCatalog::with_defaults(),
            ports,
            Box::new(ManualClock::new(0)),
        )
    }

    #[tokio::test]
    async fn test_scheduler_runs_requested_ticks() {
        let shared = Arc::new(Mutex::new(frontier()));
        let options = SchedulerOptions {
            period: Duration::from_millis(5),
            max_ticks: Some(3),
            snapshot_path: None,
        };
        let ran = spawn_scheduler(Arc::clone(&shared), options).await.unwrap();
        assert_eq!(ran, 3);
        assert_eq!(shared.lock().await.ticks(), 3);
    }

    #[test]
    fn test_options_follow_config() {
        let options = SchedulerOptions::from_config(&frontier());
        assert_eq!(options.period, Duration::from_secs(20));
        assert!(options.max_ticks.is_none());
    }
}
