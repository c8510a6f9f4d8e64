// Snapshot Store Port (Interface)

use crate::error::Result;
use async_trait::async_trait;

/// Durable key/value storage for the serialized queue
///
/// The queue is persisted as one blob under one key; every mutation rewrites
/// the whole blob.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read the blob stored under `key` (None if never written)
    async fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replace the blob stored under `key`
    async fn save(&self, key: &str, snapshot: &str) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory snapshot store with write counting and failure injection
    #[derive(Default)]
    pub struct InMemorySnapshotStore {
        blobs: Mutex<HashMap<String, String>>,
        save_count: AtomicUsize,
        fail_saves: AtomicBool,
        fail_loads: AtomicBool,
    }

    impl InMemorySnapshotStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-seed a blob (e.g. a corrupted snapshot)
        pub fn with_blob(key: &str, blob: &str) -> Self {
            let store = Self::default();
            store
                .blobs
                .lock()
                .unwrap()
                .insert(key.to_string(), blob.to_string());
            store
        }

        pub fn blob(&self, key: &str) -> Option<String> {
            self.blobs.lock().unwrap().get(key).cloned()
        }

        pub fn save_count(&self) -> usize {
            self.save_count.load(Ordering::SeqCst)
        }

        pub fn set_fail_saves(&self, fail: bool) {
            self.fail_saves.store(fail, Ordering::SeqCst);
        }

        pub fn set_fail_loads(&self, fail: bool) {
            self.fail_loads.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl SnapshotStore for InMemorySnapshotStore {
        async fn load(&self, key: &str) -> Result<Option<String>> {
            if self.fail_loads.load(Ordering::SeqCst) {
                return Err(AppError::Storage("mock load failure".to_string()));
            }
            Ok(self.blobs.lock().unwrap().get(key).cloned())
        }

        async fn save(&self, key: &str, snapshot: &str) -> Result<()> {
            self.save_count.fetch_add(1, Ordering::SeqCst);
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(AppError::Storage("mock disk full".to_string()));
            }
            self.blobs
                .lock()
                .unwrap()
                .insert(key.to_string(), snapshot.to_string());
            Ok(())
        }
    }
}
