use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, warn};

use super::LeaderboardReconciler;
use crate::{error::FunnelResult, service::WaitlistService};

/// Refreshes a shared reconciler. The lock is only taken to read the service
/// handle and to install the result, never across the fetch.
pub async fn refresh_shared<W: WaitlistService>(
    reconciler: &Mutex<LeaderboardReconciler<W>>,
) -> FunnelResult<()> {
    let service = reconciler.lock().await.service();
    let fetched = service.leaderboard().await;
    reconciler.lock().await.apply(fetched).map(|_| ())
}

/// Background refresh loop for a mounted dashboard.
///
/// The first refresh runs immediately, then once per interval. Dropping the
/// handle stops the loop.
pub struct LeaderboardPoller {
    handle: JoinHandle<()>,
    refreshed: watch::Receiver<u64>,
}

impl LeaderboardPoller {
    pub fn spawn<W: WaitlistService>(
        reconciler: Arc<Mutex<LeaderboardReconciler<W>>>,
        every: Duration,
    ) -> Self {
        let (tx, refreshed) = watch::channel(0u64);
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match refresh_shared(&reconciler).await {
                    Ok(()) => {
                        tx.send_modify(|count| *count += 1);
                    }
                    Err(err) => warn!(%err, "scheduled leaderboard refresh failed"),
                }
            }
        });
        debug!(?every, "leaderboard poller started");
        LeaderboardPoller { handle, refreshed }
    }

    /// Ticks once per successful refresh.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.refreshed.clone()
    }

    pub fn stop(self) {}
}

impl Drop for LeaderboardPoller {
    fn drop(&mut self) {
        self.handle.abort();
        debug!("leaderboard poller stopped");
    }
}
