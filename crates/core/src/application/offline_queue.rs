// Offline Queue - facade over store, dispatcher and connectivity

use crate::application::connectivity::ConnectivityWatcher;
use crate::application::constants::{DEFAULT_SNAPSHOT_KEY, DEFAULT_SUBMIT_TIMEOUT};
use crate::application::dispatcher::{Dispatcher, DrainOutcome};
use crate::application::listeners::ListenerHandle;
use crate::application::queue_store::{QueueStats, QueueStore};
use crate::application::retry::RetryPolicy;
use crate::application::shutdown::ShutdownToken;
use crate::domain::{ActionKind, ItemPayload, QueueItem};
use crate::error::Result;
use crate::port::{IdProvider, NetworkMonitor, SnapshotStore, SubmitterRegistry, TimeProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Tunables for an OfflineQueue instance
#[derive(Debug, Clone)]
pub struct OfflineQueueOptions {
    pub snapshot_key: String,
    pub submit_timeout: Duration,
    pub retry_policy: RetryPolicy,
}

impl Default for OfflineQueueOptions {
    fn default() -> Self {
        Self {
            snapshot_key: DEFAULT_SNAPSHOT_KEY.to_string(),
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            retry_policy: RetryPolicy::default(),
        }
    }
}

/// Offline action queue
///
/// Enqueues are durable before they return. Enqueueing while online also
/// starts a background drain.
pub struct OfflineQueue {
    store: Arc<QueueStore>,
    dispatcher: Arc<Dispatcher>,
    network: Arc<dyn NetworkMonitor>,
}

impl OfflineQueue {
    pub async fn open(
        snapshots: Arc<dyn SnapshotStore>,
        submitters: SubmitterRegistry,
        network: Arc<dyn NetworkMonitor>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        options: OfflineQueueOptions,
    ) -> Self {
        let store = Arc::new(
            QueueStore::open(snapshots, id_provider, time_provider, options.snapshot_key).await,
        );
        let dispatcher = Arc::new(
            Dispatcher::new(Arc::clone(&store), submitters, Arc::clone(&network))
                .with_submit_timeout(options.submit_timeout)
                .with_retry_policy(options.retry_policy),
        );

        Self {
            store,
            dispatcher,
            network,
        }
    }

    pub async fn enqueue(&self, kind: ActionKind, payload: ItemPayload) -> QueueItem {
        let item = self.store.enqueue(kind, payload).await;
        if self.network.is_online() {
            debug!(item_id = %item.id, "Online at enqueue, scheduling drain");
            self.dispatcher.spawn_drain();
        }
        item
    }

    /// Enqueue with the kind given by name (`bounty`, `message`)
    pub async fn enqueue_named(
        &self,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<QueueItem> {
        let kind: ActionKind = kind.parse()?;
        Ok(self.enqueue(kind, ItemPayload::new(payload)).await)
    }

    pub fn get_queue(&self) -> Vec<QueueItem> {
        self.store.get_queue()
    }

    pub fn get_queue_by_kind(&self, kind: ActionKind) -> Vec<QueueItem> {
        self.store.get_queue_by_kind(kind)
    }

    pub fn get(&self, id: &str) -> Option<QueueItem> {
        self.store.get(id)
    }

    pub fn has_pending_items(&self) -> bool {
        self.store.has_pending_items()
    }

    pub fn stats(&self) -> QueueStats {
        self.store.stats()
    }

    pub async fn remove_item(&self, id: &str) -> bool {
        self.store.remove_item(id).await
    }

    pub async fn retry_item(&self, id: &str) -> bool {
        self.dispatcher.retry_item(id).await
    }

    pub async fn clear_failed_items(&self) -> usize {
        self.store.clear_failed_items().await
    }

    pub fn add_listener<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.store.add_listener(callback)
    }

    /// Drain now, in the caller's task
    pub async fn drain(&self) -> DrainOutcome {
        self.dispatcher.drain().await
    }

    pub fn is_online(&self) -> bool {
        self.network.is_online()
    }

    /// Start draining on every transition to online
    pub fn watch_connectivity(&self, shutdown: ShutdownToken) -> JoinHandle<()> {
        ConnectivityWatcher::new(Arc::clone(&self.dispatcher), Arc::clone(&self.network))
            .spawn(shutdown)
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::snapshot_store::mocks::InMemorySnapshotStore;
    use crate::port::submitter::mocks::MockSubmitter;
    use crate::port::time_provider::mocks::SteppingTimeProvider;
    use crate::port::ManualNetworkMonitor;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::assert_ok;

    async fn open_queue(online: bool) -> (OfflineQueue, Arc<MockSubmitter>) {
        let submitter = Arc::new(MockSubmitter::new_success());
        let queue = OfflineQueue::open(
            Arc::new(InMemorySnapshotStore::new()),
            SubmitterRegistry::new()
                .with(ActionKind::Bounty, submitter.clone())
                .with(ActionKind::Message, submitter.clone()),
            Arc::new(ManualNetworkMonitor::new(online)),
            Arc::new(SequentialIdProvider::new()),
            Arc::new(SteppingTimeProvider::new(0)),
            OfflineQueueOptions::default(),
        )
        .await;
        (queue, submitter)
    }

    #[tokio::test]
    async fn test_offline_enqueue_waits() {
        let (queue, submitter) = open_queue(false).await;
        let item = queue
            .enqueue(ActionKind::Bounty, ItemPayload::new(json!({"reward": 5})))
            .await;

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(submitter.call_count(), 0);
        assert_eq!(queue.get_queue()[0].id, item.id);
    }

    #[tokio::test]
    async fn test_online_enqueue_drains_in_background() {
        let (queue, submitter) = open_queue(true).await;
        queue
            .enqueue(ActionKind::Message, ItemPayload::new(json!({"text": "hi"})))
            .await;

        for _ in 0..100 {
            if queue.get_queue().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(queue.get_queue().is_empty());
        assert_eq!(submitter.call_count(), 1);
    }

    #[tokio::test]
    async fn test_enqueue_named_rejects_unknown_kind() {
        let (queue, _) = open_queue(false).await;

        let err = queue.enqueue_named("invoice", json!({})).await.unwrap_err();
        assert!(matches!(err, AppError::Domain(_)));
        assert!(queue.get_queue().is_empty());

        let item = assert_ok!(queue.enqueue_named("message", json!({"text": "x"})).await);
        assert_eq!(item.kind, ActionKind::Message);
    }

    #[tokio::test]
    async fn test_listener_lifecycle() {
        let (queue, _) = open_queue(false).await;
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handle = queue.add_listener(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        queue
            .enqueue(ActionKind::Bounty, ItemPayload::new(json!({})))
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        handle.unsubscribe();
        queue
            .enqueue(ActionKind::Bounty, ItemPayload::new(json!({})))
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
