// Error type shared by the core and its adapters

use thiserror::Error;

/// Errors surfaced by ports and fallible queue operations
///
/// Queue mutations themselves never fail on storage problems; these errors
/// come back from adapters and are logged by the queue store.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    /// Snapshot backend failure (SQLite, filesystem, bad key)
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

// sqlx::Error is mapped to AppError::Storage inside infra-sqlite (orphan rule)
