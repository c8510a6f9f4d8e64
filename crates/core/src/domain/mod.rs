// Domain Layer - Queue items and their status transitions

pub mod error;
pub mod item;

// Re-exports
pub use error::DomainError;
pub use item::{ActionKind, ItemId, ItemPayload, ItemStatus, QueueItem, MAX_RETRIES_EXCEEDED};
