// Submitter Port
// Performs the remote side effect for one action kind (posting service, messaging service)

use crate::domain::{ActionKind, ItemPayload};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Submission errors
///
/// Every variant counts as a failed attempt against the item's retry budget.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Rejected by remote: {0}")]
    Rejected(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Submission timed out after {0}ms")]
    Timeout(u64),
}

/// Submitter trait
///
/// Implementations must not hold on to queue internals and must tolerate
/// being called more than once for the same logical action (delivery is
/// at-least-once).
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Deliver one payload to the remote collaborator
    async fn submit(&self, payload: &ItemPayload) -> Result<(), SubmitError>;
}

/// Action kind -> submitter mapping supplied by the embedding application
#[derive(Default, Clone)]
pub struct SubmitterRegistry {
    handlers: HashMap<ActionKind, Arc<dyn Submitter>>,
}

impl SubmitterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration
    pub fn with(mut self, kind: ActionKind, submitter: Arc<dyn Submitter>) -> Self {
        self.register(kind, submitter);
        self
    }

    /// Register (or replace) the submitter for `kind`
    pub fn register(&mut self, kind: ActionKind, submitter: Arc<dyn Submitter>) {
        self.handlers.insert(kind, submitter);
    }

    pub fn get(&self, kind: ActionKind) -> Option<Arc<dyn Submitter>> {
        self.handlers.get(&kind).cloned()
    }

    pub fn contains(&self, kind: ActionKind) -> bool {
        self.handlers.contains_key(&kind)
    }
}

impl std::fmt::Debug for SubmitterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmitterRegistry")
            .field("kinds", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Mock submitter behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always succeed
        Success,
        /// Always fail with message
        Fail(String),
        /// Fail the next N calls, then succeed
        FailTimes(usize, String),
        /// Succeed after a delay (for overlap testing)
        Slow(u64),
        /// Never return
        Hang,
        /// Panic with message (for panic isolation testing)
        Panic(String),
    }

    /// Mock Submitter for testing
    pub struct MockSubmitter {
        behavior: Arc<Mutex<MockBehavior>>,
        calls: Arc<Mutex<Vec<ItemPayload>>>,
    }

    impl MockSubmitter {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }

        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(message.into()))
        }

        pub fn set_behavior(&self, behavior: MockBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        /// Payloads received, in call order
        pub fn calls(&self) -> Vec<ItemPayload> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Submitter for MockSubmitter {
        async fn submit(&self, payload: &ItemPayload) -> Result<(), SubmitError> {
            self.calls.lock().unwrap().push(payload.clone());

            let behavior = {
                let mut guard = self.behavior.lock().unwrap();
                let current = guard.clone();
                if let MockBehavior::FailTimes(remaining, msg) = current {
                    *guard = if remaining > 1 {
                        MockBehavior::FailTimes(remaining - 1, msg.clone())
                    } else {
                        MockBehavior::Success
                    };
                    MockBehavior::Fail(msg)
                } else {
                    current
                }
            };

            match behavior {
                MockBehavior::Success => Ok(()),
                MockBehavior::Fail(msg) => Err(SubmitError::Rejected(msg)),
                MockBehavior::FailTimes(..) => Ok(()),
                MockBehavior::Slow(ms) => {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Ok(())
                }
                MockBehavior::Hang => {
                    std::future::pending::<()>().await;
                    Ok(())
                }
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg);
                }
            }
        }
    }
}
