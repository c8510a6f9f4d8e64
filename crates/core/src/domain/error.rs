// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid item status transition: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Queue item not found: {0}")]
    ItemNotFound(String),

    #[error("Unknown action kind: {0}")]
    UnknownActionKind(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
