// Crash recovery for restored snapshots
use crate::domain::{ItemStatus, QueueItem};
use tracing::{info, warn};

/// Requeue items that were PROCESSING when the previous process died
///
/// Their submission may or may not have reached the remote side; putting them
/// back to PENDING with counters unchanged keeps delivery at-least-once.
///
/// # Returns
/// Number of items recovered
pub fn recover_interrupted_items(items: &mut [QueueItem]) -> usize {
    let mut recovered = 0;

    for item in items.iter_mut().filter(|i| i.status == ItemStatus::Processing) {
        match item.recover_interrupted() {
            Ok(()) => {
                warn!(
                    item_id = %item.id,
                    kind = %item.kind,
                    retry_count = item.retry_count,
                    "Recovered interrupted item, back to PENDING"
                );
                recovered += 1;
            }
            Err(e) => warn!(item_id = %item.id, error = %e, "Could not recover item"),
        }
    }

    if recovered > 0 {
        info!(recovered_count = recovered, "Interrupted item recovery complete");
    }
    recovered
}
