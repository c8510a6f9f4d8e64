// SQLite SnapshotStore Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use offline_queue_core::error::Result;
use offline_queue_core::port::{SnapshotStore, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

/// Snapshot blobs stored one row per key
pub struct SqliteSnapshotStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteSnapshotStore {
    /// Wrap a pool whose schema is already migrated
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM snapshots WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        debug!(key = %key, found = value.is_some(), "Snapshot loaded");
        Ok(value)
    }

    async fn save(&self, key: &str, snapshot: &str) -> Result<()> {
        let now = self.time_provider.now_millis();

        sqlx::query(
            r#"
            INSERT INTO snapshots (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(snapshot)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!(key = %key, bytes = snapshot.len(), "Snapshot saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use offline_queue_core::port::time_provider::mocks::SteppingTimeProvider;
    use tokio_test::assert_ok;

    async fn setup_store() -> SqliteSnapshotStore {
        let pool = create_pool(":memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteSnapshotStore::new(pool, Arc::new(SteppingTimeProvider::new(1_000)))
    }

    #[tokio::test]
    async fn test_load_missing_key() {
        let store = setup_store().await;
        assert_eq!(store.load("offline_queue").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = setup_store().await;
        assert_ok!(store.save("offline_queue", "[]").await);
        assert_eq!(
            store.load("offline_queue").await.unwrap().as_deref(),
            Some("[]")
        );
    }

    #[tokio::test]
    async fn test_save_overwrites_single_row() {
        let store = setup_store().await;
        store.save("offline_queue", "[1]").await.unwrap();
        store.save("offline_queue", "[1,2]").await.unwrap();

        assert_eq!(
            store.load("offline_queue").await.unwrap().as_deref(),
            Some("[1,2]")
        );

        let (rows, updated_at): (i64, i64) =
            sqlx::query_as("SELECT COUNT(*), MAX(updated_at) FROM snapshots")
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(rows, 1);
        assert_eq!(updated_at, 2_000);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store = setup_store().await;
        store.save("a", "first").await.unwrap();
        store.save("b", "second").await.unwrap();

        assert_eq!(store.load("a").await.unwrap().as_deref(), Some("first"));
        assert_eq!(store.load("b").await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_unmigrated_database_is_a_storage_error() {
        let pool = create_pool(":memory:").await.unwrap();
        let store = SqliteSnapshotStore::new(pool, Arc::new(SteppingTimeProvider::new(0)));

        let err = store.save("offline_queue", "[]").await.unwrap_err();
        assert!(err.to_string().starts_with("Storage error"));
    }
}
