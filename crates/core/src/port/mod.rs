// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod network_monitor;
pub mod snapshot_store;
pub mod submitter;
pub mod time_provider;

// Re-exports
pub use id_provider::{IdProvider, UuidProvider};
pub use network_monitor::{ManualNetworkMonitor, NetworkMonitor};
pub use snapshot_store::SnapshotStore;
pub use submitter::{SubmitError, Submitter, SubmitterRegistry};
pub use time_provider::{SystemTimeProvider, TimeProvider};
