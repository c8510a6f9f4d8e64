// Queue Item Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Item ID (UUID v4)
pub type ItemId = String;

/// Message recorded on an item once its retry budget is spent
pub const MAX_RETRIES_EXCEEDED: &str = "Max retries exceeded";

/// Closed set of domain actions that can be buffered while offline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Create a bounty posting
    Bounty,
    /// Send a chat message
    Message,
}

impl ActionKind {
    pub const ALL: [ActionKind; 2] = [ActionKind::Bounty, ActionKind::Message];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Bounty => "bounty",
            ActionKind::Message => "message",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bounty" => Ok(ActionKind::Bounty),
            "message" => Ok(ActionKind::Message),
            other => Err(DomainError::UnknownActionKind(other.to_string())),
        }
    }
}

/// Item Status
///
/// Delivery is not a status: a delivered item is deleted from the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Pending,
    Processing,
    Failed,
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            ItemStatus::Pending => "PENDING",
            ItemStatus::Processing => "PROCESSING",
            ItemStatus::Failed => "FAILED",
        })
    }
}

/// Item Payload (opaque to the queue)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemPayload(serde_json::Value);

impl ItemPayload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for ItemPayload {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// One buffered domain mutation awaiting remote submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub payload: ItemPayload,
    pub created_at: i64, // epoch ms
    pub status: ItemStatus,
    pub retry_count: u32,
    pub last_error: Option<String>,
}

impl QueueItem {
    /// Create a new pending item
    ///
    /// # Arguments
    ///
    /// * `id` - Unique item ID (injected, not generated)
    /// * `created_at` - Enqueue timestamp in epoch ms (injected, not system time)
    /// * `kind` - Action kind selecting the submitter
    /// * `payload` - Action payload
    pub fn new(
        id: impl Into<String>,
        created_at: i64,
        kind: ActionKind,
        payload: ItemPayload,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            payload,
            created_at,
            status: ItemStatus::Pending,
            retry_count: 0,
            last_error: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ItemStatus::Pending
    }

    pub fn is_failed(&self) -> bool {
        self.status == ItemStatus::Failed
    }

    /// Transition to Processing (claimed by the dispatcher)
    pub fn begin_processing(&mut self) -> Result<()> {
        self.expect_status(ItemStatus::Pending, ItemStatus::Processing)?;
        self.status = ItemStatus::Processing;
        Ok(())
    }

    /// Failed attempt with budget left: back to Pending, counter bumped
    pub fn requeue_after_failure(&mut self, error: impl Into<String>) -> Result<()> {
        self.expect_status(ItemStatus::Processing, ItemStatus::Pending)?;
        self.retry_count += 1;
        self.status = ItemStatus::Pending;
        self.last_error = Some(error.into());
        Ok(())
    }

    /// Failed attempt that spends the last retry: terminal Failed
    pub fn mark_exhausted(&mut self) -> Result<()> {
        self.expect_status(ItemStatus::Processing, ItemStatus::Failed)?;
        self.retry_count += 1;
        self.status = ItemStatus::Failed;
        self.last_error = Some(MAX_RETRIES_EXCEEDED.to_string());
        Ok(())
    }

    /// Manual retry: clears the retry budget and the last error
    pub fn reset_for_retry(&mut self) -> Result<()> {
        if self.status == ItemStatus::Processing {
            return Err(DomainError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: ItemStatus::Pending.to_string(),
            });
        }
        self.retry_count = 0;
        self.status = ItemStatus::Pending;
        self.last_error = None;
        Ok(())
    }

    /// Item restored as Processing after a crash goes back to Pending
    pub fn recover_interrupted(&mut self) -> Result<()> {
        self.expect_status(ItemStatus::Processing, ItemStatus::Pending)?;
        self.status = ItemStatus::Pending;
        Ok(())
    }

    fn expect_status(&self, expected: ItemStatus, to: ItemStatus) -> Result<()> {
        if self.status != expected {
            return Err(DomainError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item() -> QueueItem {
        QueueItem::new(
            "item-1",
            1_000,
            ActionKind::Bounty,
            ItemPayload::new(json!({"title": "Fix my bike"})),
        )
    }

    #[test]
    fn test_new_item_is_pending() {
        let item = item();
        assert_eq!(item.status, ItemStatus::Pending);
        assert_eq!(item.retry_count, 0);
        assert!(item.last_error.is_none());
    }

    #[test]
    fn test_failure_cycle() {
        let mut item = item();
        item.begin_processing().unwrap();
        item.requeue_after_failure("503 Service Unavailable").unwrap();
        assert_eq!(item.status, ItemStatus::Pending);
        assert_eq!(item.retry_count, 1);
        assert_eq!(item.last_error.as_deref(), Some("503 Service Unavailable"));

        item.begin_processing().unwrap();
        item.mark_exhausted().unwrap();
        assert_eq!(item.status, ItemStatus::Failed);
        assert_eq!(item.retry_count, 2);
        assert_eq!(item.last_error.as_deref(), Some(MAX_RETRIES_EXCEEDED));
    }

    #[test]
    fn test_cannot_claim_failed_item() {
        let mut item = item();
        item.begin_processing().unwrap();
        item.mark_exhausted().unwrap();

        let err = item.begin_processing().unwrap_err();
        assert!(err.to_string().contains("FAILED -> PROCESSING"));
    }

    #[test]
    fn test_reset_for_retry() {
        let mut item = item();
        item.begin_processing().unwrap();
        item.mark_exhausted().unwrap();

        item.reset_for_retry().unwrap();
        assert_eq!(item.status, ItemStatus::Pending);
        assert_eq!(item.retry_count, 0);
        assert!(item.last_error.is_none());
    }

    #[test]
    fn test_reset_rejected_while_processing() {
        let mut item = item();
        item.begin_processing().unwrap();
        assert!(item.reset_for_retry().is_err());
    }

    #[test]
    fn test_recover_interrupted_keeps_counters() {
        let mut item = item();
        item.retry_count = 2;
        item.status = ItemStatus::Processing;

        item.recover_interrupted().unwrap();
        assert_eq!(item.status, ItemStatus::Pending);
        assert_eq!(item.retry_count, 2);
    }

    #[test]
    fn test_snapshot_field_names() {
        let value = serde_json::to_value(item()).unwrap();
        assert_eq!(value["type"], "bounty");
        assert_eq!(value["status"], "PENDING");
        assert_eq!(value["payload"]["title"], "Fix my bike");
    }

    #[test]
    fn test_action_kind_parse() {
        assert_eq!("Message".parse::<ActionKind>().unwrap(), ActionKind::Message);
        assert!("refund".parse::<ActionKind>().is_err());
    }
}
