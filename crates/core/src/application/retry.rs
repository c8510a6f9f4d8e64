// Retry logic - bounded retry budget per item
use crate::application::constants::MAX_RETRIES;
use crate::domain::{DomainError, QueueItem};
use tracing::{info, warn};

/// Retry decision result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Back to Pending; reconsidered on the next drain trigger
    Requeue,
    /// Retry budget spent; item is now Failed
    Exhausted,
}

/// Retry policy
///
/// There is no timer: a requeued item waits for the next drain trigger
/// (reconnect, manual retry, enqueue while online).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(MAX_RETRIES)
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries: max_retries.max(1),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Apply a failed attempt to a Processing item
    ///
    /// Increments `retry_count`; once it reaches `max_retries` the item turns
    /// Failed with "Max retries exceeded", otherwise it returns to Pending
    /// carrying `error` as `last_error`.
    pub fn apply_failure(
        &self,
        item: &mut QueueItem,
        error: &str,
    ) -> Result<RetryDecision, DomainError> {
        if item.retry_count + 1 >= self.max_retries {
            item.mark_exhausted()?;
            warn!(
                item_id = %item.id,
                kind = %item.kind,
                retry_count = item.retry_count,
                error = %error,
                "Max retries reached, item marked FAILED"
            );
            Ok(RetryDecision::Exhausted)
        } else {
            item.requeue_after_failure(error)?;
            info!(
                item_id = %item.id,
                kind = %item.kind,
                retry_count = item.retry_count,
                max_retries = self.max_retries,
                error = %error,
                "Submission failed, item requeued"
            );
            Ok(RetryDecision::Requeue)
        }
    }
}
