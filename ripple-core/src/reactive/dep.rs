//! Dependency Sets
//!
//! A [`Dep`] bridges reads of one piece of observed state to the subscribers
//! that performed them. There are two kinds, distinguished only by who owns
//! them:
//!
//! - a per-key Dep, created when a key is made reactive, notified when that
//!   key's value is replaced;
//! - an Observer's self Dep, notified on structural changes to the whole
//!   composite (keys added or removed, list elements inserted or removed).
//!
//! # Re-entrancy
//!
//! Notifying a subscriber may synchronously run it, and that run may read
//! this same Dep again (re-registering) or cause another subscriber to drop
//! out of it. `notify` therefore iterates a snapshot taken before the first
//! subscriber runs, and never holds the subscriber lock while dispatching.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::Mutex;
use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::runtime::Runtime;
use super::SubscriberId;

/// Counter for generating unique Dep IDs.
static DEP_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a Dep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepId(u64);

impl DepId {
    fn next() -> Self {
        Self(DEP_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// A registry of subscribers interested in one observable slot.
///
/// Cloning a Dep yields another handle to the same registry.
#[derive(Clone)]
pub struct Dep {
    id: DepId,

    /// Registered subscribers, in registration order, each at most once.
    subscribers: Arc<Mutex<IndexSet<SubscriberId>>>,
}

impl Dep {
    /// Create an empty Dep.
    pub fn new() -> Self {
        Self {
            id: DepId::next(),
            subscribers: Arc::new(Mutex::new(IndexSet::new())),
        }
    }

    /// Get the Dep's unique ID.
    pub fn id(&self) -> DepId {
        self.id
    }

    /// Register the currently active subscriber, if there is one.
    pub fn depend(&self) {
        if let Some(subscriber_id) = ReactiveContext::track_dependency(self) {
            self.add_subscriber(subscriber_id);
        }
    }

    /// Register a subscriber directly. Registering twice is a no-op.
    pub fn add_subscriber(&self, subscriber_id: SubscriberId) {
        self.subscribers.lock().insert(subscriber_id);
    }

    /// Remove a subscriber.
    pub fn remove_subscriber(&self, subscriber_id: SubscriberId) {
        self.subscribers.lock().shift_remove(&subscriber_id);
    }

    /// Ask every registered subscriber to update, in registration order.
    pub fn notify(&self) {
        let snapshot: SmallVec<[SubscriberId; 8]> =
            self.subscribers.lock().iter().copied().collect();

        if snapshot.is_empty() {
            return;
        }

        tracing::trace!(dep = ?self.id, subscribers = snapshot.len(), "notifying");

        let mut dead: SmallVec<[SubscriberId; 4]> = SmallVec::new();
        for subscriber_id in snapshot {
            if !Runtime::dispatch(subscriber_id) {
                dead.push(subscriber_id);
            }
        }

        if !dead.is_empty() {
            let mut subscribers = self.subscribers.lock();
            for subscriber_id in dead {
                subscribers.shift_remove(&subscriber_id);
            }
        }
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Check whether `subscriber_id` is registered.
    pub fn has_subscriber(&self, subscriber_id: SubscriberId) -> bool {
        self.subscribers.lock().contains(&subscriber_id)
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Dep {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Dep {}

impl std::fmt::Debug for Dep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.id)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{ReactiveHandle, Subscriber};
    use parking_lot::Mutex as PlMutex;
    use std::sync::atomic::AtomicI32;

    struct Recorder {
        id: SubscriberId,
        log: Arc<PlMutex<Vec<SubscriberId>>>,
    }

    impl Subscriber for Recorder {
        fn id(&self) -> SubscriberId {
            self.id
        }

        fn update(&self) {
            self.log.lock().push(self.id);
        }
    }

    fn recorder(log: &Arc<PlMutex<Vec<SubscriberId>>>) -> (Arc<Recorder>, ReactiveHandle) {
        let recorder = Arc::new(Recorder {
            id: SubscriberId::new(),
            log: log.clone(),
        });
        let handle = Runtime::register(recorder.clone());
        (recorder, handle)
    }

    #[test]
    fn depend_without_active_subscriber_is_noop() {
        let dep = Dep::new();
        dep.depend();
        assert_eq!(dep.subscriber_count(), 0);
    }

    #[test]
    fn depend_registers_once() {
        let dep = Dep::new();
        let id = SubscriberId::new();

        ReactiveContext::scope(id, || {
            dep.depend();
            dep.depend();
        });

        assert_eq!(dep.subscriber_count(), 1);
        assert!(dep.has_subscriber(id));
    }

    #[test]
    fn notify_runs_in_registration_order() {
        let log = Arc::new(PlMutex::new(Vec::new()));
        let (first, _h1) = recorder(&log);
        let (second, _h2) = recorder(&log);

        let dep = Dep::new();
        dep.add_subscriber(second.id);
        dep.add_subscriber(first.id);

        dep.notify();
        assert_eq!(*log.lock(), vec![second.id, first.id]);
    }

    #[test]
    fn notify_on_empty_dep_is_noop() {
        Dep::new().notify();
    }

    #[test]
    fn notify_forgets_dropped_subscribers() {
        let log = Arc::new(PlMutex::new(Vec::new()));
        let (gone, handle) = recorder(&log);
        let dep = Dep::new();
        dep.add_subscriber(gone.id);

        drop(handle);
        drop(gone);
        dep.notify();

        assert_eq!(dep.subscriber_count(), 0);
        assert!(log.lock().is_empty());
    }

    struct Remover {
        id: SubscriberId,
        dep: Dep,
        victim: SubscriberId,
        runs: AtomicI32,
    }

    impl Subscriber for Remover {
        fn id(&self) -> SubscriberId {
            self.id
        }

        fn update(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.dep.remove_subscriber(self.victim);
            self.dep.add_subscriber(SubscriberId::new());
        }
    }

    #[test]
    fn notify_iterates_snapshot_while_subscribers_mutate() {
        let log = Arc::new(PlMutex::new(Vec::new()));
        let (victim, _hv) = recorder(&log);
        let dep = Dep::new();

        let remover = Arc::new(Remover {
            id: SubscriberId::new(),
            dep: dep.clone(),
            victim: victim.id,
            runs: AtomicI32::new(0),
        });
        let _hr = Runtime::register(remover.clone());

        dep.add_subscriber(remover.id);
        dep.add_subscriber(victim.id);
        dep.notify();

        // The victim was in the snapshot, so it still ran this pass.
        assert_eq!(remover.runs.load(Ordering::SeqCst), 1);
        assert_eq!(*log.lock(), vec![victim.id]);
        assert!(!dep.has_subscriber(victim.id));
    }
}
