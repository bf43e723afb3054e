//! Ordered handler registries with idempotent removal tokens.
//!
//! Every transport and proxy-layer instance owns its own registries;
//! there is no process-wide handler table, so two concurrent
//! connections never see each other's callbacks.
//!
//! Handlers for one registry run synchronously, in registration order.
//! No ordering is promised *across* registries. `emit` iterates over a
//! snapshot of the handler list, so a handler may subscribe or
//! unsubscribe (itself included) while an emit is in flight without
//! corrupting the iteration.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Entry<T> {
    id: u64,
    handler: Handler<T>,
}

/// An ordered collection of callbacks for one event kind.
pub struct HandlerRegistry<T> {
    entries: Arc<Mutex<Vec<Entry<T>>>>,
    next_id: AtomicU64,
}

impl<T> HandlerRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a handler, returning its removal token.
    pub fn subscribe(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> Subscription
    where
        T: 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Entry {
                id,
                handler: Arc::new(handler),
            });

        let entries = Arc::downgrade(&self.entries);
        Subscription {
            remove: Box::new(move || {
                if let Some(entries) = Weak::upgrade(&entries) {
                    entries
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .retain(|entry| entry.id != id);
                }
            }),
        }
    }

    /// Run every registered handler, in registration order.
    ///
    /// The handler list is snapshotted before iterating: handlers added
    /// during this emit run on the *next* emit, and handlers removed
    /// during this emit still finish the current one.
    pub fn emit(&self, payload: &T) {
        let snapshot: Vec<Handler<T>> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|entry| Arc::clone(&entry.handler))
            .collect();

        for handler in snapshot {
            handler(payload);
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for HandlerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Removal token for one registration.
///
/// Calling [`unsubscribe`](Self::unsubscribe) more than once is a
/// no-op: removal is keyed by a unique id, so the second call finds
/// nothing to remove. Dropping the token without calling it leaves the
/// handler registered.
pub struct Subscription {
    remove: Box<dyn Fn() + Send + Sync>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        (self.remove)();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
