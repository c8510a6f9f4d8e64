//! Critical Edge Case Tests
//!
//! Races and failure paths around drains, persistence and listeners

mod common;

use async_trait::async_trait;
use common::{open_queue, sqlite_store, wait_until};
use offline_queue_core::application::{
    DrainOutcome, DrainReport, OfflineQueue, OfflineQueueOptions,
};
use offline_queue_core::domain::{ActionKind, ItemPayload, ItemStatus};
use offline_queue_core::port::id_provider::UuidProvider;
use offline_queue_core::port::snapshot_store::mocks::InMemorySnapshotStore;
use offline_queue_core::port::submitter::mocks::MockBehavior;
use offline_queue_core::port::time_provider::SystemTimeProvider;
use offline_queue_core::port::{
    ManualNetworkMonitor, SnapshotStore, SubmitError, Submitter, SubmitterRegistry,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn payload(n: usize) -> ItemPayload {
    ItemPayload::new(json!({"n": n}))
}

fn completed(outcome: DrainOutcome) -> DrainReport {
    match outcome {
        DrainOutcome::Completed(report) => report,
        other => panic!("expected a completed drain, got {:?}", other),
    }
}

/// Rejects payloads marked `"poison": true`, accepts everything else
#[derive(Default)]
struct PoisonAwareSubmitter {
    accepted: Mutex<Vec<ItemPayload>>,
}

#[async_trait]
impl Submitter for PoisonAwareSubmitter {
    async fn submit(&self, payload: &ItemPayload) -> Result<(), SubmitError> {
        if payload.as_value()["poison"] == json!(true) {
            return Err(SubmitError::Rejected("422 poison".to_string()));
        }
        self.accepted.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

/// Critical Test 1: concurrent enqueues lose nothing and persist everything
#[tokio::test]
async fn test_concurrent_enqueues_all_persisted() {
    let store = sqlite_store().await;
    let t = Arc::new(open_queue(store.clone(), MockBehavior::Success, false).await);

    let mut handles = Vec::new();
    for n in 0..20 {
        let t = Arc::clone(&t);
        handles.push(tokio::spawn(async move {
            let kind = if n % 2 == 0 {
                ActionKind::Bounty
            } else {
                ActionKind::Message
            };
            t.queue.enqueue(kind, payload(n)).await.id
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        assert!(ids.insert(handle.await.unwrap()), "duplicate item id");
    }

    let in_memory = t.queue.get_queue();
    assert_eq!(in_memory.len(), 20);

    // Last write wins and must match the final in-memory order
    let blob = store.load("offline_queue").await.unwrap().unwrap();
    let persisted: Vec<offline_queue_core::domain::QueueItem> =
        serde_json::from_str(&blob).unwrap();
    assert_eq!(persisted, in_memory);
}

/// Critical Test 2: an exhausted head item does not block the rest
#[tokio::test]
async fn test_no_head_of_line_blocking() {
    let submitter = Arc::new(PoisonAwareSubmitter::default());
    let network = Arc::new(ManualNetworkMonitor::new(false));
    let queue = OfflineQueue::open(
        Arc::new(InMemorySnapshotStore::new()),
        SubmitterRegistry::new()
            .with(ActionKind::Bounty, submitter.clone())
            .with(ActionKind::Message, submitter.clone()),
        network.clone(),
        Arc::new(UuidProvider),
        Arc::new(SystemTimeProvider),
        OfflineQueueOptions::default(),
    )
    .await;

    let poison = queue
        .enqueue(ActionKind::Bounty, ItemPayload::new(json!({"poison": true})))
        .await;
    queue.enqueue(ActionKind::Message, payload(1)).await;
    queue.enqueue(ActionKind::Bounty, payload(2)).await;
    network.set_online(true);

    let first = completed(queue.drain().await);
    assert_eq!(first.delivered, 2);
    assert_eq!(first.requeued, 1);
    assert_eq!(*submitter.accepted.lock().unwrap(), vec![payload(1), payload(2)]);

    completed(queue.drain().await);
    let last = completed(queue.drain().await);
    assert_eq!(last.exhausted, 1);

    let remaining = queue.get_queue();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, poison.id);
    assert_eq!(remaining[0].status, ItemStatus::Failed);
}

/// Critical Test 3: an item enqueued mid-drain is picked up by that drain
#[tokio::test]
async fn test_enqueue_during_drain_is_delivered() {
    let t = Arc::new(open_queue(sqlite_store().await, MockBehavior::Slow(150), false).await);
    t.queue.enqueue(ActionKind::Bounty, payload(1)).await;
    t.network.set_online(true);

    let drainer = Arc::clone(&t);
    let drain = tokio::spawn(async move { drainer.queue.drain().await });
    assert!(wait_until(|| t.submitter.call_count() == 1).await);

    // Online enqueue triggers a drain that collapses into the running one
    t.queue.enqueue(ActionKind::Message, payload(2)).await;

    let report = completed(drain.await.unwrap());
    assert_eq!(report.delivered, 2);
    assert!(t.queue.get_queue().is_empty());
    assert_eq!(t.submitter.calls(), vec![payload(1), payload(2)]);
}

/// Critical Test 4: the item in flight can be neither retried nor double-submitted
#[tokio::test]
async fn test_in_flight_item_rejects_manual_retry() {
    let t = Arc::new(open_queue(sqlite_store().await, MockBehavior::Slow(150), false).await);
    let item = t.queue.enqueue(ActionKind::Bounty, payload(1)).await;
    t.network.set_online(true);

    let drainer = Arc::clone(&t);
    let drain = tokio::spawn(async move { drainer.queue.drain().await });
    assert!(
        wait_until(|| t
            .queue
            .get(&item.id)
            .map_or(false, |i| i.status == ItemStatus::Processing))
        .await
    );

    assert!(!t.queue.retry_item(&item.id).await);
    completed(drain.await.unwrap());
    assert_eq!(t.submitter.call_count(), 1);
}

/// Critical Test 5: removing the in-flight item is harmless
#[tokio::test]
async fn test_remove_while_in_flight() {
    let t = Arc::new(open_queue(sqlite_store().await, MockBehavior::Slow(150), false).await);
    let item = t.queue.enqueue(ActionKind::Bounty, payload(1)).await;
    t.network.set_online(true);

    let drainer = Arc::clone(&t);
    let drain = tokio::spawn(async move { drainer.queue.drain().await });
    assert!(wait_until(|| t.submitter.call_count() == 1).await);

    assert!(t.queue.remove_item(&item.id).await);
    completed(drain.await.unwrap());
    assert!(t.queue.get_queue().is_empty());
}

/// Critical Test 6: a hung submitter is cut off by the watchdog
#[tokio::test]
async fn test_hung_submitter_times_out() {
    let t = open_queue(sqlite_store().await, MockBehavior::Hang, false).await;
    let item = t.queue.enqueue(ActionKind::Message, payload(1)).await;
    t.network.set_online(true);

    let report = completed(t.queue.drain().await);
    assert_eq!(report.requeued, 1);

    let item = t.queue.get(&item.id).unwrap();
    assert_eq!(item.status, ItemStatus::Pending);
    assert_eq!(
        item.last_error.as_deref(),
        Some("Submission timed out after 500ms")
    );
}

/// Critical Test 7: storage outage does not stop the queue
#[tokio::test]
async fn test_persistence_failure_keeps_queue_working() {
    let snapshots = Arc::new(InMemorySnapshotStore::new());
    snapshots.set_fail_saves(true);
    let t = open_queue(snapshots.clone(), MockBehavior::Success, false).await;

    t.queue.enqueue(ActionKind::Bounty, payload(1)).await;
    assert_eq!(t.queue.get_queue().len(), 1);

    t.network.set_online(true);
    completed(t.queue.drain().await);
    assert!(t.queue.get_queue().is_empty());
    assert!(snapshots.save_count() >= 3);

    // Storage comes back: the next write carries the full current state
    snapshots.set_fail_saves(false);
    t.queue.clear_failed_items().await;
    assert_eq!(snapshots.blob("offline_queue").as_deref(), Some("[]"));
}

/// Critical Test 8: a panicking listener cannot break a mutation
#[tokio::test]
async fn test_panicking_listener_is_contained() {
    let store = sqlite_store().await;
    let t = open_queue(store.clone(), MockBehavior::Success, false).await;
    let healthy_calls = Arc::new(AtomicUsize::new(0));

    let _bad = t.queue.add_listener(|| panic!("observer bug"));
    let counter = Arc::clone(&healthy_calls);
    let _good = t.queue.add_listener(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let item = t.queue.enqueue(ActionKind::Bounty, payload(1)).await;
    assert_eq!(healthy_calls.load(Ordering::SeqCst), 1);
    assert!(t.queue.get(&item.id).is_some());
    assert!(store.load("offline_queue").await.unwrap().unwrap().contains(&item.id));
}
