//! Subscriber types for the reactive system.
//!
//! A Subscriber represents any computation that reads observed state and
//! must be re-run when that state changes: watchers, render passes, or any
//! callback registered with the [`Runtime`](super::Runtime).

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a subscriber.
///
/// Deps store subscriber IDs rather than the subscribers themselves, so a
/// dropped subscriber never keeps observed state alive (and vice versa).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A computation that can be the active reader and can be asked to re-run.
///
/// `update` is called synchronously from inside a write. Implementations
/// that batch or defer work do so on their own; the engine only promises to
/// call `update` once per notifying Dep.
pub trait Subscriber: Send + Sync {
    /// The identity under which this subscriber registers with Deps.
    fn id(&self) -> SubscriberId;

    /// One of the Deps this subscriber read has changed.
    fn update(&self);
}

/// A subscriber backed by a plain callback.
///
/// It never runs user logic of its own; it only reacts. Pair it with
/// [`ReactiveContext::scope`](super::ReactiveContext::scope) to record reads
/// on its behalf.
pub struct FnSubscriber {
    id: SubscriberId,
    notify: Box<dyn Fn() + Send + Sync>,
}

impl FnSubscriber {
    /// Create a new subscriber with the given notification callback.
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            id: SubscriberId::new(),
            notify: Box::new(notify),
        }
    }
}

impl Subscriber for FnSubscriber {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn update(&self) {
        (self.notify)();
    }
}

impl std::fmt::Debug for FnSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSubscriber").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn fn_subscriber_update_calls_callback() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        let subscriber = FnSubscriber::new(move || {
            called_clone.store(true, Ordering::SeqCst);
        });

        assert!(!called.load(Ordering::SeqCst));
        subscriber.update();
        assert!(called.load(Ordering::SeqCst));
    }
}
