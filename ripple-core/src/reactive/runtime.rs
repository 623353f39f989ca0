//! Reactive Runtime
//!
//! The runtime owns the process-wide subscriber registry. Deps only store
//! [`SubscriberId`]s; when a Dep notifies, the runtime resolves each ID to a
//! live subscriber and asks it to update.
//!
//! # How It Works
//!
//! 1. A subscriber registers itself and receives a [`ReactiveHandle`] (or,
//!    like [`Watcher`](super::Watcher), unregisters itself on drop).
//!
//! 2. During its run, reactive reads add its ID to the Deps they touch.
//!
//! 3. A write notifies the Dep, which dispatches each stored ID through
//!    the runtime. IDs whose subscriber is gone are reported back so the Dep
//!    can forget them.
//!
//! The registry holds weak references, so registration never keeps a
//! subscriber alive.

use std::sync::{Arc, OnceLock, Weak};

use dashmap::DashMap;

use super::context::ReactiveContext;
use super::subscriber::{Subscriber, SubscriberId};

/// Handle to a registered subscriber.
///
/// Dropping this handle unregisters the subscriber from the runtime.
#[derive(Debug)]
pub struct ReactiveHandle {
    subscriber_id: SubscriberId,
}

impl ReactiveHandle {
    /// The registered subscriber's ID.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }
}

impl Drop for ReactiveHandle {
    fn drop(&mut self) {
        Runtime::unregister(self.subscriber_id);
    }
}

/// The global reactive runtime.
pub struct Runtime;

// Maps subscriber IDs to weak references to avoid preventing cleanup.
static REGISTRY: OnceLock<DashMap<SubscriberId, Weak<dyn Subscriber>>> = OnceLock::new();

fn get_registry() -> &'static DashMap<SubscriberId, Weak<dyn Subscriber>> {
    REGISTRY.get_or_init(DashMap::new)
}

impl Runtime {
    /// Register a subscriber with the runtime.
    ///
    /// Returns a handle that unregisters the subscriber when dropped.
    pub fn register(subscriber: Arc<dyn Subscriber>) -> ReactiveHandle {
        let subscriber_id = Self::insert(&subscriber);
        ReactiveHandle { subscriber_id }
    }

    pub(crate) fn insert(subscriber: &Arc<dyn Subscriber>) -> SubscriberId {
        let id = subscriber.id();
        get_registry().insert(id, Arc::downgrade(subscriber));
        tracing::trace!(subscriber = ?id, "registered subscriber");
        id
    }

    pub(crate) fn unregister(id: SubscriberId) {
        get_registry().remove(&id);
        tracing::trace!(subscriber = ?id, "unregistered subscriber");
    }

    /// Check whether a live subscriber is registered under `id`.
    pub fn is_registered(id: SubscriberId) -> bool {
        Self::resolve(id).is_some()
    }

    fn resolve(id: SubscriberId) -> Option<Arc<dyn Subscriber>> {
        // The map guard must be released before the subscriber runs: its
        // update may register or unregister subscribers.
        get_registry().get(&id).and_then(|weak| weak.upgrade())
    }

    /// Ask the subscriber registered under `id` to update.
    ///
    /// Returns `false` if no live subscriber is registered under that ID.
    pub(crate) fn dispatch(id: SubscriberId) -> bool {
        match Self::resolve(id) {
            Some(subscriber) => {
                subscriber.update();
                true
            }
            None => false,
        }
    }

    /// Get the current subscriber being tracked, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        ReactiveContext::current_subscriber()
    }

    /// Check if we're inside a tracked computation.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    struct MockSubscriber {
        id: SubscriberId,
        updates: AtomicI32,
    }

    impl MockSubscriber {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                id: SubscriberId::new(),
                updates: AtomicI32::new(0),
            })
        }
    }

    impl Subscriber for MockSubscriber {
        fn id(&self) -> SubscriberId {
            self.id
        }

        fn update(&self) {
            self.updates.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn runtime_registers_and_unregisters() {
        let subscriber = MockSubscriber::new();
        let id = subscriber.id;

        let handle = Runtime::register(subscriber.clone());
        assert!(Runtime::is_registered(id));

        drop(handle);
        assert!(!Runtime::is_registered(id));
    }

    #[test]
    fn runtime_dispatches_to_live_subscribers() {
        let subscriber = MockSubscriber::new();
        let id = subscriber.id;
        let _handle = Runtime::register(subscriber.clone());

        assert!(Runtime::dispatch(id));
        assert!(Runtime::dispatch(id));
        assert_eq!(subscriber.updates.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn runtime_skips_dropped_subscribers() {
        let subscriber = MockSubscriber::new();
        let id = subscriber.id;
        let _handle = Runtime::register(subscriber.clone());

        drop(subscriber);
        assert!(!Runtime::is_registered(id));
        assert!(!Runtime::dispatch(id));
    }
}
