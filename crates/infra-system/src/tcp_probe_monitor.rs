// TCP connectivity probe
// Online means a TCP connection to the probe target succeeds within the timeout
use offline_queue_core::application::ShutdownToken;
use offline_queue_core::port::NetworkMonitor;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// NetworkMonitor that periodically dials a host:port
pub struct TcpProbeMonitor {
    target: String,
    interval: Duration,
    timeout: Duration,
    tx: watch::Sender<bool>,
}

impl TcpProbeMonitor {
    /// Starts offline until the first probe completes
    pub fn new(target: impl Into<String>, interval: Duration, timeout: Duration) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            target: target.into(),
            interval,
            timeout,
            tx,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Dial the target once without publishing
    pub async fn probe_once(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.target)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                debug!(probe_target = %self.target, error = %e, "Connectivity probe failed");
                false
            }
            Err(_) => {
                debug!(
                    probe_target = %self.target,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Connectivity probe timed out"
                );
                false
            }
        }
    }

    /// Probe and publish the result; subscribers only see changes
    pub async fn refresh(&self) -> bool {
        let online = self.probe_once().await;
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!(probe_target = %self.target, online, "Connectivity changed");
        }
        online
    }

    /// Probe every `interval` until shutdown
    pub fn spawn(self: Arc<Self>, mut shutdown: ShutdownToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                probe_target = %self.target,
                interval_ms = self.interval.as_millis() as u64,
                "Connectivity probe started"
            );
            loop {
                self.refresh().await;
                tokio::select! {
                    _ = tokio::time::sleep(self.interval) => {}
                    _ = shutdown.wait() => break,
                }
            }
            info!(probe_target = %self.target, "Connectivity probe stopped");
        })
    }
}

impl NetworkMonitor for TcpProbeMonitor {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
