// Network Monitor Port
// Connectivity is consumed as a boolean feed; detection itself lives outside core

use tokio::sync::watch;

/// Connectivity feed
///
/// `is_online` is advisory: it reflects the last observed value, and a
/// submission issued on stale state simply fails and counts as an attempt.
pub trait NetworkMonitor: Send + Sync {
    /// Last observed connectivity
    fn is_online(&self) -> bool;

    /// Receiver notified on every connectivity change
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Connectivity set explicitly by the embedding application
///
/// Backed by a watch channel, so subscribers see the latest value and
/// intermediate flips may coalesce.
pub struct ManualNetworkMonitor {
    tx: watch::Sender<bool>,
}

impl ManualNetworkMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self { tx }
    }

    /// Publish a connectivity value (no-op if unchanged)
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
    }
}

impl NetworkMonitor for ManualNetworkMonitor {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
