//! Shared setup for integration tests
#![allow(dead_code)]

use offline_queue_core::application::{OfflineQueue, OfflineQueueOptions};
use offline_queue_core::domain::ActionKind;
use offline_queue_core::port::id_provider::mocks::SequentialIdProvider;
use offline_queue_core::port::submitter::mocks::{MockBehavior, MockSubmitter};
use offline_queue_core::port::time_provider::SystemTimeProvider;
use offline_queue_core::port::{ManualNetworkMonitor, SnapshotStore, SubmitterRegistry};
use offline_queue_infra_sqlite::{open_snapshot_store, SqliteSnapshotStore};
use std::sync::Arc;
use std::time::Duration;

pub struct TestQueue {
    pub queue: OfflineQueue,
    pub network: Arc<ManualNetworkMonitor>,
    pub submitter: Arc<MockSubmitter>,
}

/// Migrated in-memory SQLite snapshot store
pub async fn sqlite_store() -> Arc<SqliteSnapshotStore> {
    Arc::new(
        open_snapshot_store(":memory:", Arc::new(SystemTimeProvider))
            .await
            .unwrap(),
    )
}

/// Queue with one mock submitter registered for every kind
pub async fn open_queue(
    snapshots: Arc<dyn SnapshotStore>,
    behavior: MockBehavior,
    online: bool,
) -> TestQueue {
    let submitter = Arc::new(MockSubmitter::new(behavior));
    let network = Arc::new(ManualNetworkMonitor::new(online));
    let mut submitters = SubmitterRegistry::new();
    for kind in ActionKind::ALL {
        submitters.register(kind, submitter.clone());
    }

    let queue = OfflineQueue::open(
        snapshots,
        submitters,
        network.clone(),
        Arc::new(SequentialIdProvider::new()),
        Arc::new(SystemTimeProvider),
        OfflineQueueOptions {
            submit_timeout: Duration::from_millis(500),
            ..Default::default()
        },
    )
    .await;

    TestQueue {
        queue,
        network,
        submitter,
    }
}

/// Poll `condition` for up to 3 seconds
pub async fn wait_until(condition: impl Fn() -> bool) -> bool {
    for _ in 0..300 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
