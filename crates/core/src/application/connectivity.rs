// Connectivity Watcher - turns online transitions into drains

use crate::application::dispatcher::Dispatcher;
use crate::application::shutdown::ShutdownToken;
use crate::port::NetworkMonitor;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Follows a NetworkMonitor feed and triggers drains
///
/// Every online notification spawns a drain; overlapping ones are absorbed
/// by the dispatcher's single-flight guard.
pub struct ConnectivityWatcher {
    dispatcher: Arc<Dispatcher>,
    network: Arc<dyn NetworkMonitor>,
}

impl ConnectivityWatcher {
    pub fn new(dispatcher: Arc<Dispatcher>, network: Arc<dyn NetworkMonitor>) -> Self {
        Self {
            dispatcher,
            network,
        }
    }

    pub fn spawn(self, shutdown: ShutdownToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Watch until shutdown or until the feed closes
    ///
    /// Starting while already online counts as a transition.
    pub async fn run(self, mut shutdown: ShutdownToken) {
        let mut feed = self.network.subscribe();
        let mut online = *feed.borrow_and_update();
        info!(online, "Connectivity watcher started");

        if online {
            self.dispatcher.spawn_drain();
        }

        loop {
            tokio::select! {
                changed = feed.changed() => {
                    if changed.is_err() {
                        info!("Connectivity feed closed");
                        break;
                    }
                    // Flips between two polls coalesce, so an online value
                    // always drains even if the last one seen was online too
                    let now_online = *feed.borrow_and_update();
                    if now_online {
                        info!(was_online = online, "Connectivity online, starting drain");
                        self.dispatcher.spawn_drain();
                    } else if online {
                        info!("Connectivity lost");
                    }
                    online = now_online;
                }
                _ = shutdown.wait() => {
                    debug!("Connectivity watcher shutting down");
                    break;
                }
            }
        }

        info!("Connectivity watcher stopped");
    }
}
