// Queue constants (no magic values)
use std::time::Duration;

/// Failed attempts allowed before an item turns FAILED
pub const MAX_RETRIES: u32 = 3;

/// Watchdog around every submitter call (30s)
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Key the queue snapshot is stored under
pub const DEFAULT_SNAPSHOT_KEY: &str = "offline_queue";
