// Listener Registry - fan-out notification on queue mutations

use crate::application::panic_guard::{execute_guarded, PanicGuardResult};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::error;

type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Inner {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Registry of mutation observers
///
/// Listeners carry no payload; observers re-read state from the queue.
#[derive(Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a callback, returning its unsubscribe handle
    pub fn add_listener<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.listeners.push((id, Arc::new(callback)));

        ListenerHandle {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Invoke every listener in subscription order
    ///
    /// Iterates over a copy of the registry, so (un)subscribing from inside a
    /// callback only affects later notifications.
    pub fn notify(&self) {
        let listeners: Vec<Listener> = self
            .inner
            .lock()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            if let PanicGuardResult::Panicked(msg) = execute_guarded(|| listener()) {
                error!(
                    panic_msg = %msg,
                    "Queue listener panicked; continuing with remaining listeners"
                );
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }
}

/// Unsubscribe handle returned by `add_listener`
///
/// Dropping the handle keeps the subscription alive; call `unsubscribe`.
#[must_use = "dropping the handle leaves the listener subscribed forever"]
pub struct ListenerHandle {
    id: u64,
    registry: Weak<Mutex<Inner>>,
}

impl ListenerHandle {
    pub fn unsubscribe(self) {
        if let Some(inner) = self.registry.upgrade() {
            inner.lock().listeners.retain(|(id, _)| *id != self.id);
        }
    }
}
