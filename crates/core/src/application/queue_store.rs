// Queue Store - owns the ordered item list and its persisted snapshot

use crate::application::listeners::{ListenerHandle, ListenerRegistry};
use crate::application::recovery::recover_interrupted_items;
use crate::application::retry::{RetryDecision, RetryPolicy};
use crate::domain::{ActionKind, ItemId, ItemPayload, ItemStatus, QueueItem};
use crate::port::{IdProvider, SnapshotStore, TimeProvider};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Queue counters for operator display
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub failed: usize,
    /// created_at of the oldest PENDING item
    pub oldest_pending: Option<i64>,
}

/// Ordered collection of queue items plus its durable snapshot
///
/// Every mutation goes through the write gate: the list is changed, the full
/// snapshot is written, then listeners are notified. Reads only take the
/// short list lock and never wait on storage.
pub struct QueueStore {
    items: Mutex<Vec<QueueItem>>,
    write_gate: tokio::sync::Mutex<()>,
    snapshots: Arc<dyn SnapshotStore>,
    snapshot_key: String,
    listeners: ListenerRegistry,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl QueueStore {
    /// Restore the queue from its snapshot
    ///
    /// A missing, unreadable or unparseable snapshot yields an empty queue;
    /// the problem is logged and never returned.
    ///
    /// # Arguments
    /// * `snapshots` - Durable blob storage
    /// * `id_provider` - Item ID generator
    /// * `time_provider` - Clock for `created_at`
    /// * `snapshot_key` - Key the snapshot lives under
    pub async fn open(
        snapshots: Arc<dyn SnapshotStore>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        snapshot_key: impl Into<String>,
    ) -> Self {
        let snapshot_key = snapshot_key.into();
        let mut items = load_snapshot(snapshots.as_ref(), &snapshot_key).await;
        let recovered = recover_interrupted_items(&mut items);

        info!(
            key = %snapshot_key,
            item_count = items.len(),
            "Queue restored from snapshot"
        );

        let store = Self {
            items: Mutex::new(items),
            write_gate: tokio::sync::Mutex::new(()),
            snapshots,
            snapshot_key,
            listeners: ListenerRegistry::new(),
            id_provider,
            time_provider,
        };

        if recovered > 0 {
            let _gate = store.write_gate.lock().await;
            let snapshot = encode_snapshot(&store.items.lock());
            if let Some(snapshot) = snapshot {
                store.persist(&snapshot).await;
            }
        }

        store
    }

    pub fn snapshot_key(&self) -> &str {
        &self.snapshot_key
    }

    /// Append a new PENDING item
    ///
    /// Returns once the snapshot write has been attempted.
    pub async fn enqueue(&self, kind: ActionKind, payload: ItemPayload) -> QueueItem {
        let item = QueueItem::new(
            self.id_provider.generate_id(),
            self.time_provider.now_millis(),
            kind,
            payload,
        );
        let created = item.clone();

        self.mutate(move |items| {
            items.push(item);
            Some(())
        })
        .await;

        info!(item_id = %created.id, kind = %created.kind, "Item enqueued");
        created
    }

    /// Copy of the queue in insertion order
    pub fn get_queue(&self) -> Vec<QueueItem> {
        self.items.lock().clone()
    }

    /// Items of one kind, in insertion order
    pub fn get_queue_by_kind(&self, kind: ActionKind) -> Vec<QueueItem> {
        self.items
            .lock()
            .iter()
            .filter(|item| item.kind == kind)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<QueueItem> {
        self.items.lock().iter().find(|item| item.id == id).cloned()
    }

    /// True iff at least one item is PENDING
    pub fn has_pending_items(&self) -> bool {
        self.items.lock().iter().any(QueueItem::is_pending)
    }

    pub fn stats(&self) -> QueueStats {
        let items = self.items.lock();
        let mut stats = QueueStats::default();
        for item in items.iter() {
            match item.status {
                ItemStatus::Pending => {
                    stats.pending += 1;
                    stats.oldest_pending = Some(
                        stats
                            .oldest_pending
                            .map_or(item.created_at, |t| t.min(item.created_at)),
                    );
                }
                ItemStatus::Processing => stats.processing += 1,
                ItemStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Remove an item; false (and no write) if the id is unknown
    pub async fn remove_item(&self, id: &str) -> bool {
        let removed = self
            .mutate(|items| {
                let pos = items.iter().position(|item| item.id == id)?;
                Some(items.remove(pos))
            })
            .await;

        match removed {
            Some(item) => {
                info!(item_id = %item.id, status = %item.status, "Item removed");
                true
            }
            None => {
                debug!(item_id = %id, "Remove requested for unknown item");
                false
            }
        }
    }

    /// Drop every FAILED item in one write and one notification
    ///
    /// # Returns
    /// Number of items removed
    pub async fn clear_failed_items(&self) -> usize {
        let removed = self
            .mutate(|items| {
                let before = items.len();
                items.retain(|item| !item.is_failed());
                Some(before - items.len())
            })
            .await
            .unwrap_or(0);

        info!(removed_count = removed, "Cleared failed items");
        removed
    }

    pub fn add_listener<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.add_listener(callback)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.listener_count()
    }

    // ------------------------------------------------------------------------
    // Dispatcher-facing operations
    // ------------------------------------------------------------------------

    /// Claim the first PENDING item not in `skip`, marking it PROCESSING
    ///
    /// Refuses while another item is PROCESSING.
    pub async fn claim_next_pending(&self, skip: &HashSet<ItemId>) -> Option<QueueItem> {
        self.mutate(|items| {
            if items.iter().any(|item| item.status == ItemStatus::Processing) {
                warn!("Claim refused: an item is already PROCESSING");
                return None;
            }
            let item = items
                .iter_mut()
                .find(|item| item.is_pending() && !skip.contains(&item.id))?;
            item.begin_processing().ok()?;
            Some(item.clone())
        })
        .await
    }

    /// True if a PENDING item outside `skip` exists
    pub fn has_claimable(&self, skip: &HashSet<ItemId>) -> bool {
        self.items
            .lock()
            .iter()
            .any(|item| item.is_pending() && !skip.contains(&item.id))
    }

    /// Delete a delivered item
    pub async fn complete(&self, id: &str) -> bool {
        let removed = self
            .mutate(|items| {
                let pos = items.iter().position(|item| item.id == id)?;
                Some(items.remove(pos))
            })
            .await
            .is_some();

        if !removed {
            debug!(item_id = %id, "Delivered item was removed while in flight");
        }
        removed
    }

    /// Apply a failed attempt through the retry policy
    ///
    /// None if the item vanished while in flight.
    pub async fn record_failure(
        &self,
        id: &str,
        error: &str,
        policy: &RetryPolicy,
    ) -> Option<RetryDecision> {
        self.mutate(|items| {
            let item = items.iter_mut().find(|item| item.id == id)?;
            match policy.apply_failure(item, error) {
                Ok(decision) => Some(decision),
                Err(e) => {
                    warn!(item_id = %id, error = %e, "Could not record failed attempt");
                    None
                }
            }
        })
        .await
    }

    /// Manual retry: zero the retry budget of a FAILED or PENDING item
    ///
    /// False for unknown ids and for the item currently in flight.
    pub async fn reset_for_retry(&self, id: &str) -> bool {
        let reset = self
            .mutate(|items| {
                let item = items.iter_mut().find(|item| item.id == id)?;
                item.reset_for_retry().ok()
            })
            .await
            .is_some();

        if reset {
            info!(item_id = %id, "Item reset for manual retry");
        } else {
            debug!(item_id = %id, "Manual retry ignored (unknown or in flight)");
        }
        reset
    }

    /// Run `op` on the list; if it reports a change, persist and notify
    async fn mutate<R>(&self, op: impl FnOnce(&mut Vec<QueueItem>) -> Option<R>) -> Option<R> {
        let _gate = self.write_gate.lock().await;

        let (result, snapshot) = {
            let mut items = self.items.lock();
            let result = op(&mut *items)?;
            (result, encode_snapshot(&items))
        };

        if let Some(snapshot) = snapshot {
            self.persist(&snapshot).await;
        }
        self.listeners.notify();

        Some(result)
    }

    async fn persist(&self, snapshot: &str) {
        if let Err(e) = self.snapshots.save(&self.snapshot_key, snapshot).await {
            error!(
                key = %self.snapshot_key,
                error = %e,
                "Failed to persist queue snapshot (in-memory queue stays authoritative)"
            );
        }
    }
}

async fn load_snapshot(snapshots: &dyn SnapshotStore, key: &str) -> Vec<QueueItem> {
    let blob = match snapshots.load(key).await {
        Ok(Some(blob)) => blob,
        Ok(None) => {
            debug!(key = %key, "No queue snapshot found, starting empty");
            return Vec::new();
        }
        Err(e) => {
            error!(key = %key, error = %e, "Failed to read queue snapshot, starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<QueueItem>>(&blob) {
        Ok(items) => items,
        Err(e) => {
            warn!(
                key = %key,
                error = %e,
                snapshot_bytes = blob.len(),
                "Discarding unparseable queue snapshot"
            );
            Vec::new()
        }
    }
}

fn encode_snapshot(items: &[QueueItem]) -> Option<String> {
    match serde_json::to_string(items) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            error!(error = %e, "Failed to serialize queue snapshot");
            None
        }
    }
}
