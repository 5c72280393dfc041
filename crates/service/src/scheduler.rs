//! Periodic per-index refresh loops.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::coordinator::SnapshotCoordinator;

/// One background task per managed index, each ticking on the coordinator's
/// refresh interval. Refresh errors are already recorded by the coordinator,
/// so the loops only log and carry on.
pub struct RefreshScheduler {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl RefreshScheduler {
    /// Spawns the loops. The first tick fires one interval from now; callers
    /// wanting an immediate snapshot run a warm-up `trigger_refresh` first.
    #[must_use]
    pub fn start(coordinator: &SnapshotCoordinator) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let period = coordinator.refresh_interval();

        let handles = coordinator
            .indices()
            .into_iter()
            .map(|index| {
                tokio::spawn(run_index_loop(
                    coordinator.clone(),
                    index,
                    period,
                    shutdown_rx.clone(),
                ))
            })
            .collect();

        info!(refresh_seconds = period.as_secs(), "Refresh scheduler started");
        Self {
            shutdown_tx,
            handles,
        }
    }

    /// Number of running index loops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Signals every loop and waits for them to exit. A refresh already
    /// running on its own task still completes and updates the cache.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
        info!("Refresh scheduler stopped");
    }
}

async fn run_index_loop(
    coordinator: SnapshotCoordinator,
    index: String,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Outcome is recorded in the slot state and debug ring.
                if let Err(e) = coordinator.trigger_refresh(&index).await {
                    debug!(index = %index, error = %e, "Scheduled refresh failed");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!(index = %index, "Refresh loop exiting");
                    return;
                }
            }
        }
    }
}
