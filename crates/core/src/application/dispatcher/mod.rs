// Dispatcher - drains pending items against their submitters

mod flight_guard;

use flight_guard::FlightGuard;

use crate::application::constants::DEFAULT_SUBMIT_TIMEOUT;
use crate::application::panic_guard::panic_message;
use crate::application::queue_store::QueueStore;
use crate::application::retry::{RetryDecision, RetryPolicy};
use crate::domain::{ItemId, QueueItem};
use crate::port::{NetworkMonitor, SubmitError, SubmitterRegistry};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Counters for one completed drain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub delivered: usize,
    pub requeued: usize,
    pub exhausted: usize,
    /// Connectivity dropped before the queue was exhausted
    pub halted_offline: bool,
}

/// What a drain trigger did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    Completed(DrainReport),
    /// Another drain holds the single-flight flag; nothing was done
    AlreadyRunning,
    /// Triggered while offline; nothing was done
    Offline,
    /// The drain task panicked or was cancelled by runtime shutdown
    Interrupted,
}

/// Drains the queue one item at a time, in insertion order
///
/// At most one drain runs at a time. A trigger arriving while a drain is in
/// progress is dropped rather than queued.
pub struct Dispatcher {
    store: Arc<QueueStore>,
    submitters: SubmitterRegistry,
    network: Arc<dyn NetworkMonitor>,
    retry_policy: RetryPolicy,
    submit_timeout: Duration,
    in_flight: AtomicBool,
    /// Ids reset by `retry_item`, pending pickup by the running drain
    retried: Mutex<HashSet<ItemId>>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<QueueStore>,
        submitters: SubmitterRegistry,
        network: Arc<dyn NetworkMonitor>,
    ) -> Self {
        Self {
            store,
            submitters,
            network,
            retry_policy: RetryPolicy::default(),
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            in_flight: AtomicBool::new(false),
            retried: Mutex::new(HashSet::new()),
        }
    }

    /// Override the per-submission watchdog
    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn store(&self) -> &Arc<QueueStore> {
        &self.store
    }

    pub fn is_draining(&self) -> bool {
        self.in_flight.load(std::sync::atomic::Ordering::Acquire)
    }

    /// Run a drain on its own task
    pub fn spawn_drain(self: &Arc<Self>) -> JoinHandle<DrainOutcome> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move { dispatcher.run_drain().await })
    }

    /// Submit every eligible PENDING item while online
    ///
    /// Each item is attempted at most once per drain, unless it is manually
    /// retried while the drain runs. A failed item goes back to PENDING (or
    /// FAILED once its budget is spent) and the drain moves on.
    ///
    /// The drain itself runs on a spawned task. Dropping this future stops
    /// waiting for the report but never abandons a claimed item.
    pub async fn drain(self: &Arc<Self>) -> DrainOutcome {
        match self.spawn_drain().await {
            Ok(outcome) => outcome,
            Err(join_err) if join_err.is_panic() => {
                let msg = panic_message(join_err.into_panic().as_ref());
                error!(panic_msg = %msg, "Drain task panicked");
                DrainOutcome::Interrupted
            }
            Err(join_err) => {
                error!(error = %join_err, "Drain task cancelled");
                DrainOutcome::Interrupted
            }
        }
    }

    async fn run_drain(&self) -> DrainOutcome {
        if !self.network.is_online() {
            debug!("Drain skipped: offline");
            return DrainOutcome::Offline;
        }

        let Some(mut guard) = FlightGuard::try_acquire(&self.in_flight) else {
            debug!("Drain skipped: already running");
            return DrainOutcome::AlreadyRunning;
        };

        info!("Drain started");
        let mut report = DrainReport::default();
        let mut attempted: HashSet<ItemId> = HashSet::new();

        loop {
            if !self.network.is_online() {
                info!("Connectivity lost, halting drain");
                report.halted_offline = true;
                break;
            }

            self.forget_retried(&mut attempted);
            let item = match self.store.claim_next_pending(&attempted).await {
                Some(item) => item,
                None => {
                    if self.store.stats().processing > 0 {
                        warn!("Drain stopped: another item is PROCESSING");
                        break;
                    }
                    // Release, then catch items enqueued or retried after the last claim
                    drop(guard);
                    self.forget_retried(&mut attempted);
                    if !self.store.has_claimable(&attempted) {
                        break;
                    }
                    match FlightGuard::try_acquire(&self.in_flight) {
                        Some(reacquired) => {
                            guard = reacquired;
                            continue;
                        }
                        None => break,
                    }
                }
            };
            attempted.insert(item.id.clone());

            match self.attempt(&item).await {
                Ok(()) => {
                    self.store.complete(&item.id).await;
                    report.delivered += 1;
                    info!(item_id = %item.id, kind = %item.kind, "Item delivered");
                }
                Err(message) => {
                    match self
                        .store
                        .record_failure(&item.id, &message, &self.retry_policy)
                        .await
                    {
                        Some(RetryDecision::Requeue) => report.requeued += 1,
                        Some(RetryDecision::Exhausted) => report.exhausted += 1,
                        None => {}
                    }
                }
            }
        }

        info!(
            delivered = report.delivered,
            requeued = report.requeued,
            exhausted = report.exhausted,
            halted_offline = report.halted_offline,
            "Drain finished"
        );
        DrainOutcome::Completed(report)
    }

    /// Make manually retried items eligible again in the running drain
    fn forget_retried(&self, attempted: &mut HashSet<ItemId>) {
        for id in self.retried.lock().drain() {
            attempted.remove(&id);
        }
    }

    /// Manual retry of a FAILED or PENDING item
    ///
    /// Resets its retry budget and drains if online. A drain already in
    /// progress picks the item up even if it attempted it before. Returns
    /// false for an unknown id or the item currently in flight.
    pub async fn retry_item(self: &Arc<Self>, id: &str) -> bool {
        if !self.store.reset_for_retry(id).await {
            return false;
        }
        self.retried.lock().insert(id.to_string());
        if self.network.is_online() {
            self.drain().await;
        }
        true
    }

    /// One submission under the watchdog, on its own task
    ///
    /// Errors come back as the text recorded in `last_error`.
    async fn attempt(&self, item: &QueueItem) -> Result<(), String> {
        let Some(submitter) = self.submitters.get(item.kind) else {
            warn!(item_id = %item.id, kind = %item.kind, "No submitter registered");
            return Err(format!("No submitter registered for {}", item.kind));
        };

        debug!(
            item_id = %item.id,
            kind = %item.kind,
            retry_count = item.retry_count,
            "Submitting item"
        );

        let payload = item.payload.clone();
        let mut handle = tokio::spawn(async move { submitter.submit(&payload).await });

        match tokio::time::timeout(self.submit_timeout, &mut handle).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => {
                warn!(item_id = %item.id, error = %e, "Submission failed");
                Err(e.to_string())
            }
            Ok(Err(join_err)) if join_err.is_panic() => {
                let msg = panic_message(join_err.into_panic().as_ref());
                error!(item_id = %item.id, panic_msg = %msg, "Submitter panicked");
                Err(format!("Submitter panicked: {}", msg))
            }
            Ok(Err(join_err)) => {
                error!(item_id = %item.id, error = %join_err, "Submission task cancelled");
                Err(format!("Submission cancelled: {}", join_err))
            }
            Err(_) => {
                handle.abort();
                let timeout = SubmitError::Timeout(self.submit_timeout.as_millis() as u64);
                warn!(item_id = %item.id, error = %timeout, "Submission watchdog fired");
                Err(timeout.to_string())
            }
        }
    }
}
