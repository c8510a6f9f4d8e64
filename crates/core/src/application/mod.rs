// Application Layer - Queue use cases

pub mod connectivity;
pub mod constants;
pub mod dispatcher;
pub mod listeners;
pub mod offline_queue;
pub mod panic_guard;
pub mod queue_store;
pub mod recovery;
pub mod retry;
pub mod shutdown;

// Re-exports
pub use connectivity::ConnectivityWatcher;
pub use dispatcher::{Dispatcher, DrainOutcome, DrainReport};
pub use listeners::{ListenerHandle, ListenerRegistry};
pub use offline_queue::{OfflineQueue, OfflineQueueOptions};
pub use queue_store::{QueueStats, QueueStore};
pub use retry::{RetryDecision, RetryPolicy};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
