//! Periodic snapshot refresh.
//!
//! Re-fetches everything on every tick. The task stops when the handle is
//! stopped or dropped, so a torn-down view never receives another update.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{service::MarketService, snapshot::MarketSnapshot};

/// Background refresh of a [`MarketService`] snapshot
pub struct SnapshotPoller;

/// Handle to a running poller
pub struct PollerHandle {
    shutdown: watch::Sender<bool>,
    updates: watch::Receiver<Option<MarketSnapshot>>,
    task: Option<JoinHandle<()>>,
}

impl SnapshotPoller {
    /// Start polling `service` every `interval`. The first fetch happens immediately.
    pub fn spawn(service: MarketService, interval: Duration) -> PollerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (updates_tx, updates_rx) = watch::channel(None);
        let task = tokio::spawn(run(service, interval, shutdown_rx, updates_tx));

        PollerHandle {
            shutdown: shutdown_tx,
            updates: updates_rx,
            task: Some(task),
        }
    }
}

async fn run(
    service: MarketService,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    updates: watch::Sender<Option<MarketSnapshot>>,
) {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            result = shutdown.changed() => {
                if result.is_err() || *shutdown.borrow() {
                    info!("Snapshot poller stopped");
                    break;
                }
            }
            _ = ticker.tick() => {
                // A stop requested while fetching drops the fetch unpublished.
                tokio::select! {
                    _ = shutdown.changed() => {
                        info!("Snapshot poller stopped during refresh");
                        break;
                    }
                    result = service.fetch_snapshot() => match result {
                        Ok(snapshot) => {
                            debug!(
                                markets = snapshot.markets.len(),
                                bets = snapshot.bets.len(),
                                "snapshot refreshed"
                            );
                            if updates.send(Some(snapshot)).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "snapshot refresh failed"),
                    },
                }
            }
        }
    }
}

impl PollerHandle {
    /// Receiver of published snapshots; `None` until the first successful fetch
    pub fn subscribe(&self) -> watch::Receiver<Option<MarketSnapshot>> {
        self.updates.clone()
    }

    /// Most recent successful snapshot
    pub fn latest(&self) -> Option<MarketSnapshot> {
        self.updates.borrow().clone()
    }

    /// Signal the task to stop and wait for it to finish
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
