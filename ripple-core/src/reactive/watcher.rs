//! Watcher Implementation
//!
//! A Watcher is the reference subscriber: a side-effecting computation that
//! runs once on creation and re-runs whenever state it read changes.
//!
//! # How Watchers Work
//!
//! 1. `execute` runs the function inside a [`ReactiveContext`], so every
//!    reactive read registers the watcher with the Dep it touched.
//!
//! 2. After the run, Deps read last time but not this time drop the watcher.
//!    A branch that is no longer taken stops triggering re-runs.
//!
//! 3. `update` (called by a notifying Dep) re-runs synchronously. A watcher
//!    that writes state it reads re-enters itself; nesting deeper than
//!    `Config::max_update_depth` is refused with a warning.
//!
//! # Cleanup
//!
//! A watcher unregisters from the runtime and leaves its Deps when disposed
//! or when the last handle is dropped.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::config;

use super::context::ReactiveContext;
use super::dep::{Dep, DepId};
use super::runtime::Runtime;
use super::subscriber::{Subscriber, SubscriberId};

/// A computation that re-runs when its dependencies change.
///
/// # Example
///
/// ```rust,ignore
/// let state = Value::from_json(r#"{"count": 0}"#)?;
/// observe(&state, false);
/// let record = state.as_record().unwrap().clone();
///
/// let watcher = Watcher::new(move || {
///     println!("count is {:?}", record.get("count"));
/// });
///
/// state.as_record().unwrap().set("count", 5.into()); // prints "count is Some(Number(5))"
/// ```
#[derive(Clone)]
pub struct Watcher {
    inner: Arc<WatcherInner>,
}

struct WatcherInner {
    id: SubscriberId,

    run: Box<dyn Fn() + Send + Sync>,

    /// Deps read during the last completed run.
    deps: Mutex<IndexMap<DepId, Dep>>,

    disposed: AtomicBool,

    run_count: AtomicUsize,

    /// Current nesting of `execute` calls.
    depth: AtomicUsize,
}

impl Watcher {
    /// Create a watcher and run it once to collect its dependencies.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let watcher = Self::new_lazy(run);
        watcher.execute();
        watcher
    }

    /// Create a watcher without running it. It has no dependencies until
    /// the first [`execute`](Self::execute).
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let inner = Arc::new(WatcherInner {
            id: SubscriberId::new(),
            run: Box::new(run),
            deps: Mutex::new(IndexMap::new()),
            disposed: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
            depth: AtomicUsize::new(0),
        });

        let subscriber: Arc<dyn Subscriber> = inner.clone();
        Runtime::insert(&subscriber);

        Self { inner }
    }

    /// The watcher's subscriber ID.
    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Run the watcher now, re-collecting its dependencies.
    pub fn execute(&self) {
        self.inner.execute();
    }

    /// Stop the watcher. It leaves every Dep and never runs again.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::SeqCst);
        self.inner.leave_deps();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Number of completed runs.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Number of Deps read during the last run.
    pub fn dependency_count(&self) -> usize {
        self.inner.deps.lock().len()
    }
}

/// Decrements the nesting counter on every exit path.
struct DepthGuard<'a>(&'a AtomicUsize);

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl WatcherInner {
    fn execute(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        let _depth = DepthGuard(&self.depth);
        if depth > config::max_update_depth() {
            dev_warn!(
                watcher = ?self.id,
                depth,
                "watcher re-entered itself too many times; possible infinite update loop"
            );
            return;
        }

        let collected = {
            let _ctx = ReactiveContext::enter(self.id);
            (self.run)();
            ReactiveContext::get_dependencies()
        };

        // Disposed mid-run: nothing collected may keep the watcher.
        if self.disposed.load(Ordering::SeqCst) {
            for dep in &collected {
                dep.remove_subscriber(self.id);
            }
            return;
        }

        let current: IndexMap<DepId, Dep> =
            collected.into_iter().map(|dep| (dep.id(), dep)).collect();
        let previous = std::mem::replace(&mut *self.deps.lock(), current.clone());

        for (id, dep) in previous {
            if !current.contains_key(&id) {
                dep.remove_subscriber(self.id);
            }
        }

        self.run_count.fetch_add(1, Ordering::SeqCst);
    }

    fn leave_deps(&self) {
        let deps = std::mem::take(&mut *self.deps.lock());
        for dep in deps.values() {
            dep.remove_subscriber(self.id);
        }
    }
}

impl Subscriber for WatcherInner {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn update(&self) {
        self.execute();
    }
}

impl Drop for WatcherInner {
    fn drop(&mut self) {
        Runtime::unregister(self.id);
        self.leave_deps();
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{observe, Value};
    use std::sync::{OnceLock, Weak};

    fn counter_state(json: &str) -> crate::reactive::Record {
        let value = Value::from_json(json).unwrap();
        observe(&value, false);
        value.as_record().unwrap().clone()
    }

    #[test]
    fn watcher_runs_on_creation() {
        let watcher = Watcher::new(|| {});
        assert_eq!(watcher.run_count(), 1);
    }

    #[test]
    fn lazy_watcher_does_not_run_on_creation() {
        let watcher = Watcher::new_lazy(|| {});
        assert_eq!(watcher.run_count(), 0);

        watcher.execute();
        assert_eq!(watcher.run_count(), 1);
    }

    #[test]
    fn watcher_reruns_when_read_key_changes() {
        let state = counter_state(r#"{"count": 0}"#);
        let reader = state.clone();
        let watcher = Watcher::new(move || {
            reader.get("count");
        });

        state.set("count", 1.into());
        state.set("count", 2.into());
        assert_eq!(watcher.run_count(), 3);
    }

    #[test]
    fn stale_branches_stop_notifying() {
        let state = counter_state(r#"{"flag": true, "a": 1, "b": 1}"#);
        let reader = state.clone();
        let watcher = Watcher::new(move || {
            let flag = reader.get("flag").and_then(|v| v.as_bool()).unwrap_or(false);
            if flag {
                reader.get("a");
            } else {
                reader.get("b");
            }
        });
        assert_eq!(watcher.dependency_count(), 2);

        state.set("flag", false.into());
        assert_eq!(watcher.run_count(), 2);

        state.set("a", 2.into());
        assert_eq!(watcher.run_count(), 2);

        state.set("b", 2.into());
        assert_eq!(watcher.run_count(), 3);
    }

    #[test]
    fn disposed_watcher_does_not_run() {
        let state = counter_state(r#"{"count": 0}"#);
        let reader = state.clone();
        let watcher = Watcher::new(move || {
            reader.get("count");
        });

        watcher.dispose();
        assert!(watcher.is_disposed());
        assert_eq!(watcher.dependency_count(), 0);

        state.set("count", 1.into());
        watcher.execute();
        assert_eq!(watcher.run_count(), 1);
    }

    #[test]
    fn dispose_during_run_leaves_collected_deps() {
        let state = counter_state(r#"{"count": 0}"#);
        let reader = state.clone();
        let slot: Arc<OnceLock<Weak<WatcherInner>>> = Arc::default();
        let this = slot.clone();
        let watcher = Watcher::new_lazy(move || {
            reader.get("count");
            if let Some(inner) = this.get().and_then(Weak::upgrade) {
                Watcher { inner }.dispose();
            }
        });
        let _ = slot.set(Arc::downgrade(&watcher.inner));

        watcher.execute();
        assert!(watcher.is_disposed());
        assert_eq!(watcher.dependency_count(), 0);

        state.set("count", 1.into());
        assert_eq!(watcher.run_count(), 0);
    }

    #[test]
    fn panicking_run_releases_depth() {
        let fail = Arc::new(AtomicBool::new(false));
        let trigger = fail.clone();
        let watcher = Watcher::new(move || {
            if trigger.load(Ordering::SeqCst) {
                panic!("watcher failed");
            }
        });

        fail.store(true, Ordering::SeqCst);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| watcher.execute()));
        assert!(result.is_err());
        assert_eq!(watcher.inner.depth.load(Ordering::SeqCst), 0);
        assert!(!ReactiveContext::is_active());

        fail.store(false, Ordering::SeqCst);
        watcher.execute();
        assert_eq!(watcher.run_count(), 2);
    }

    #[test]
    fn dropped_watcher_leaves_runtime() {
        let watcher = Watcher::new(|| {});
        let id = watcher.id();
        assert!(Runtime::is_registered(id));

        drop(watcher);
        assert!(!Runtime::is_registered(id));
    }

    #[test]
    fn self_feeding_watcher_is_bounded() {
        let state = counter_state(r#"{"count": 0}"#);
        let reader = state.clone();
        let watcher = Watcher::new(move || {
            let count = reader.get("count").and_then(|v| v.as_number()).unwrap_or(0.0);
            reader.set("count", (count + 1.0).into());
        });

        let limit = config::max_update_depth();
        assert_eq!(watcher.run_count(), limit);
        assert_eq!(state.get("count"), Some(Value::from(limit as f64)));
    }

    #[test]
    fn clone_shares_state() {
        let watcher1 = Watcher::new(|| {});
        let watcher2 = watcher1.clone();

        assert_eq!(watcher1.id(), watcher2.id());

        watcher1.execute();
        assert_eq!(watcher2.run_count(), 2);

        watcher1.dispose();
        assert!(watcher2.is_disposed());
    }
}
