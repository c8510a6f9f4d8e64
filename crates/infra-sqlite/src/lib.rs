// Offline Queue Infrastructure - SQLite Adapter
// Implements: SnapshotStore

mod connection;
mod error;
mod migration;
mod snapshot_store;

pub use connection::create_pool;
pub use migration::run_migrations;
pub use snapshot_store::SqliteSnapshotStore;

use offline_queue_core::error::Result;
use offline_queue_core::port::TimeProvider;
use std::sync::Arc;

/// Open (creating if needed) and migrate a snapshot database
pub async fn open_snapshot_store(
    database_url: &str,
    time_provider: Arc<dyn TimeProvider>,
) -> Result<SqliteSnapshotStore> {
    let pool = create_pool(database_url).await?;
    run_migrations(&pool).await?;
    Ok(SqliteSnapshotStore::new(pool, time_provider))
}
