//! Multicast event bus used by every subscription channel.
//!
//! Callbacks are kept in registration order and deduplicated by `Arc`
//! identity. `trigger` iterates a snapshot of the registry, so a callback may
//! subscribe or unsubscribe (itself included) while an event is delivered.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Error returned by a callback. Propagated out of [`EventBus::trigger`].
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// A registered event handler.
pub type Callback<T> = Arc<dyn Fn(&T) -> Result<(), CallbackError> + Send + Sync>;

/// Wrap a closure as a [`Callback`]. Keep the returned `Arc` to unsubscribe
/// later.
pub fn callback<T, F>(f: F) -> Callback<T>
where
    F: Fn(&T) -> Result<(), CallbackError> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub struct EventBus<T> {
    callbacks: Mutex<Vec<Callback<T>>>,
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        Self {
            callbacks: Mutex::new(Vec::new()),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Vec<Callback<T>>> {
        self.callbacks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register `callback`. Returns false if this exact callback is already
    /// registered.
    pub fn subscribe(&self, callback: Callback<T>) -> bool {
        let mut callbacks = self.registry();
        if callbacks.iter().any(|existing| Arc::ptr_eq(existing, &callback)) {
            return false;
        }
        callbacks.push(callback);
        true
    }

    /// Remove `callback`. Returns false if it was not registered.
    pub fn unsubscribe(&self, callback: &Callback<T>) -> bool {
        let mut callbacks = self.registry();
        let before = callbacks.len();
        callbacks.retain(|existing| !Arc::ptr_eq(existing, callback));
        callbacks.len() != before
    }

    pub fn contains(&self, callback: &Callback<T>) -> bool {
        self.registry()
            .iter()
            .any(|existing| Arc::ptr_eq(existing, callback))
    }

    /// Invoke every callback registered at the time of the call, in
    /// registration order, on the caller's task.
    ///
    /// Stops at the first callback error and returns it.
    pub fn trigger(&self, event: &T) -> Result<(), CallbackError> {
        let snapshot: Vec<Callback<T>> = self.registry().clone();
        for callback in snapshot {
            callback(event)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry().is_empty()
    }
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("callbacks", &self.len())
            .finish()
    }
}
