//! Reactive Context
//!
//! The reactive context tracks which subscriber is currently running.
//! This is what lets a read register a dependency without the reader ever
//! naming the Dep it joins.
//!
//! # Implementation
//!
//! We use a thread-local stack. Running a subscriber pushes an entry, and the
//! guard returned by [`ReactiveContext::enter`] pops it on drop, so the
//! previous subscriber is restored on every exit path, unwinding included.
//! Nested activation (a subscriber whose run synchronously triggers another)
//! simply stacks.
//!
//! The "observation enabled" switch lives here too and follows the same
//! save/restore discipline through [`ObservingGuard`].

use std::cell::{Cell, RefCell};

use indexmap::IndexMap;

use super::dep::{Dep, DepId};
use super::SubscriberId;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
    static OBSERVING: Cell<bool> = const { Cell::new(true) };
}

/// An entry in the reactive context stack.
struct ContextEntry {
    /// The running subscriber, or `None` for an untracked section.
    subscriber_id: Option<SubscriberId>,
    /// Deps read during this run, in first-read order.
    dependencies: IndexMap<DepId, Dep>,
}

/// Guard that pops the context when dropped.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// While this context is active, every reactive read registers the
    /// subscriber with the Dep being read.
    pub fn enter(subscriber_id: SubscriberId) -> Self {
        Self::push(Some(subscriber_id))
    }

    /// Enter a section in which reads are not tracked, even when an outer
    /// subscriber is running.
    pub fn enter_untracked() -> Self {
        Self::push(None)
    }

    fn push(subscriber_id: Option<SubscriberId>) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                subscriber_id,
                dependencies: IndexMap::new(),
            });
        });

        Self { subscriber_id }
    }

    /// Run `f` as `subscriber_id`, restoring the previous subscriber after.
    pub fn scope<R>(subscriber_id: SubscriberId, f: impl FnOnce() -> R) -> R {
        let _ctx = Self::enter(subscriber_id);
        f()
    }

    /// Check if a subscriber is currently active.
    pub fn is_active() -> bool {
        Self::current_subscriber().is_some()
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().and_then(|entry| entry.subscriber_id))
    }

    /// Record that the current run read `dep`.
    ///
    /// Returns the subscriber that should be added to the Dep, or `None` when
    /// nothing is being tracked.
    pub(crate) fn track_dependency(dep: &Dep) -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            let entry = stack.last_mut()?;
            let id = entry.subscriber_id?;
            entry
                .dependencies
                .entry(dep.id())
                .or_insert_with(|| dep.clone());
            Some(id)
        })
    }

    /// Get the Deps collected in the current context.
    pub fn get_dependencies() -> Vec<Dep> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|entry| entry.dependencies.values().cloned().collect())
                .unwrap_or_default()
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.subscriber_id, self.subscriber_id,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.subscriber_id, entry.subscriber_id
                );
            }
        });
    }
}

/// Run `f` without tracking any reads.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::enter_untracked();
    f()
}

/// Guard for the thread-local "observation enabled" switch.
///
/// The previous setting comes back when the guard drops.
pub struct ObservingGuard {
    previous: bool,
}

impl ObservingGuard {
    /// Enable or disable observation of new values until the guard drops.
    pub fn set(enabled: bool) -> Self {
        let previous = OBSERVING.with(|observing| observing.replace(enabled));
        Self { previous }
    }
}

impl Drop for ObservingGuard {
    fn drop(&mut self) {
        OBSERVING.with(|observing| observing.set(self.previous));
    }
}

/// Whether `observe` may wrap values it has not seen before.
pub fn should_observe() -> bool {
    OBSERVING.with(Cell::get)
}

/// Run `f` with observation of new values disabled.
///
/// Values observed before the call keep their tracking; only fresh values
/// reached during `f` are left plain.
pub fn without_observing<R>(f: impl FnOnce() -> R) -> R {
    let _guard = ObservingGuard::set(false);
    f()
}
