// SQLite Connection Pool Setup

use crate::error::map_sqlx_error;
use offline_queue_core::error::{AppError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Create SQLite connection pool with WAL mode
///
/// Accepts a `sqlite:` URL, a plain file path, or `:memory:`. In-memory
/// databases get a single connection so every query sees the same data.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    let in_memory = database_url.contains(":memory:");
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{}", database_url)
    };

    let mut options = SqliteConnectOptions::from_str(&url)
        .map_err(|e| AppError::Config(format!("Invalid database URL {}: {}", url, e)))?
        .busy_timeout(Duration::from_secs(5))
        .create_if_missing(true);
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { 4 })
        // Keep the in-memory database alive for the pool's lifetime
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)?;

    debug!(url = %url, "SQLite pool created");
    Ok(pool)
}
