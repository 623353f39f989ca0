//! Observation
//!
//! [`observe`] attaches an [`Observer`] to a composite value, at most one per
//! value, and makes the value's members reactive:
//!
//! - every existing key of a record gets a reactive property
//!   ([`define_reactive`]) holding its value, its own Dep, and the Observer
//!   of its value if that value is composite;
//! - every element of a list is observed in turn (lists report structural
//!   changes themselves, see [`List`]).
//!
//! Nested composites are observed when the key holding them is made
//! reactive, so one `observe` call walks the whole reachable tree.
//!
//! # Read-time registration
//!
//! A reactive getter registers the active subscriber with:
//!
//! 1. the key's own Dep (the value in that slot gets replaced);
//! 2. the self Dep of the value's Observer, if any (keys are added to or
//!    removed from that value, or it is a list and its elements change);
//! 3. for list values, the self Dep of every observed element, recursively
//!    through nested lists.
//!
//! A subscriber that read `o.a` but never `o.a.b` is therefore not notified
//! when `o.a.b` is written, only when `o.a` is replaced or changes shape.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config;

use super::context::{should_observe, ReactiveContext};
use super::dep::Dep;
use super::list::List;
use super::record::{Getter, Record, Setter, Slot};
use super::value::{same_value, Value};

/// Observer bookkeeping stored on the observed value itself.
pub(crate) struct ObserverState {
    /// The self Dep: notified on structural changes.
    dep: Dep,
    /// How many subscriber hosts use this value as their root data.
    root_count: AtomicUsize,
}

impl ObserverState {
    fn new() -> Self {
        Self {
            dep: Dep::new(),
            root_count: AtomicUsize::new(0),
        }
    }

    pub(crate) fn dep(&self) -> &Dep {
        &self.dep
    }

    pub(crate) fn root_count(&self) -> usize {
        self.root_count.load(Ordering::SeqCst)
    }
}

/// A record or a list.
#[derive(Clone, Debug)]
pub enum Composite {
    Record(Record),
    List(List),
}

impl Composite {
    /// The composite inside `value`, if it is one.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Record(record) => Some(Composite::Record(record.clone())),
            Value::List(list) => Some(Composite::List(list.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Composite::Record(record) => Value::Record(record.clone()),
            Composite::List(list) => Value::List(list.clone()),
        }
    }

    fn observer_state(&self) -> Option<Arc<ObserverState>> {
        match self {
            Composite::Record(record) => record.observer_state(),
            Composite::List(list) => list.observer_state(),
        }
    }

    fn attach_observer(&self, state: Arc<ObserverState>) -> Arc<ObserverState> {
        match self {
            Composite::Record(record) => record.attach_observer(state),
            Composite::List(list) => list.attach_observer(state),
        }
    }

    fn is_extensible(&self) -> bool {
        match self {
            Composite::Record(record) => record.is_extensible(),
            Composite::List(_) => true,
        }
    }

    fn is_host(&self) -> bool {
        matches!(self, Composite::Record(record) if record.is_host())
    }
}

/// Handle to the observer of one composite value.
#[derive(Clone)]
pub struct Observer {
    value: Composite,
    state: Arc<ObserverState>,
}

impl Observer {
    /// Wrap a value that has no observer yet.
    fn new(value: Composite) -> Self {
        // Attach before walking so a value reachable from itself is found
        // already observed instead of recursing forever.
        let state = value.attach_observer(Arc::new(ObserverState::new()));
        let observer = Self { value, state };

        match &observer.value {
            Composite::Record(record) => {
                tracing::trace!(keys = record.len(), "observing record");
                for key in record.keys() {
                    define_reactive(record, &key, None, ReactiveOptions::default());
                }
            }
            Composite::List(list) => {
                tracing::trace!(len = list.len(), "observing list");
                for item in list.to_vec() {
                    observe(&item, false);
                }
            }
        }

        observer
    }

    /// The existing observer of `value`, without observing it.
    pub fn of(value: &Value) -> Option<Self> {
        let value = Composite::from_value(value)?;
        let state = value.observer_state()?;
        Some(Self { value, state })
    }

    /// The observed value.
    pub fn value(&self) -> Value {
        self.value.to_value()
    }

    /// The self Dep.
    pub fn dep(&self) -> &Dep {
        &self.state.dep
    }

    /// How many subscriber hosts hold this value as root data.
    pub fn root_count(&self) -> usize {
        self.state.root_count()
    }

    /// Whether two handles refer to the same observer.
    pub fn ptr_eq(&self, other: &Observer) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("value", &self.value)
            .field("dep", &self.state.dep)
            .field("root_count", &self.root_count())
            .finish()
    }
}

/// Observe `value`, returning its observer.
///
/// A value that already has an observer gets the same one back. Otherwise
/// nothing is observed (and `None` returned) when the value is not a record
/// or list, observation is switched off, the server-rendering gate is set,
/// the record is non-extensible, or it is a subscriber-host instance.
///
/// `as_root_data` marks the value as a host's root data.
pub fn observe(value: &Value, as_root_data: bool) -> Option<Observer> {
    let composite = Composite::from_value(value)?;

    let observer = match composite.observer_state() {
        Some(state) => Some(Observer {
            value: composite,
            state,
        }),
        None if should_observe()
            && !config::is_server_rendering()
            && composite.is_extensible()
            && !composite.is_host() =>
        {
            Some(Observer::new(composite))
        }
        None => None,
    };

    if as_root_data {
        if let Some(observer) = &observer {
            observer.state.root_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    observer
}

/// Development hook run before a changing write is applied.
pub type CustomSetter = Arc<dyn Fn(&Value) + Send + Sync>;

/// Options for [`define_reactive`].
#[derive(Clone, Default)]
pub struct ReactiveOptions {
    /// Track only the slot itself; leave its value unobserved.
    pub shallow: bool,
    /// Called (when warnings are enabled) before a write that changes the
    /// value is applied.
    pub custom_setter: Option<CustomSetter>,
}

/// The reactive getter/setter pair installed on one key.
pub(crate) struct ReactiveProperty {
    dep: Dep,
    /// Value storage, unused when a user getter supplies the value.
    cell: Mutex<Value>,
    /// Observer of the current value.
    child: Mutex<Option<Observer>>,
    getter: Option<Getter>,
    setter: Option<Setter>,
    shallow: bool,
    custom_setter: Option<CustomSetter>,
}

impl ReactiveProperty {
    /// Current value, untracked.
    pub(crate) fn peek(&self) -> Value {
        match &self.getter {
            Some(get) => get(),
            None => self.cell.lock().clone(),
        }
    }

    pub(crate) fn get(&self) -> Value {
        let value = self.peek();

        if ReactiveContext::is_active() {
            self.dep.depend();
            let child = self.child.lock().clone();
            if let Some(child) = child {
                child.dep().depend();
                if let Value::List(list) = &value {
                    depend_array(list);
                }
            }
        }

        value
    }

    pub(crate) fn set(&self, new_value: Value) {
        let value = self.peek();
        if same_value(&new_value, &value) {
            return;
        }

        if let Some(custom_setter) = &self.custom_setter {
            if config::warnings_enabled() {
                custom_setter(&new_value);
            }
        }

        match (&self.getter, &self.setter) {
            // Read-only accessor.
            (Some(_), None) => return,
            (_, Some(set)) => set(new_value.clone()),
            (None, None) => *self.cell.lock() = new_value.clone(),
        }

        let child = if self.shallow {
            None
        } else {
            observe(&new_value, false)
        };
        *self.child.lock() = child;

        self.dep.notify();
    }

    #[cfg(test)]
    pub(crate) fn dep(&self) -> &Dep {
        &self.dep
    }
}

/// Make `key` on `record` reactive.
///
/// `initial` supplies the value for a key that has none yet; when absent the
/// key's current value is used. An existing user accessor is composed with,
/// not replaced. Returns `false` when nothing was installed: the slot is
/// non-configurable, or the key is new and the record is non-extensible.
/// A key that is already reactive keeps its original property.
pub fn define_reactive(
    record: &Record,
    key: &str,
    initial: Option<Value>,
    options: ReactiveOptions,
) -> bool {
    let existing = record.slot(key);

    let (getter, setter) = match &existing {
        Some(slot) if !slot.is_configurable() => return false,
        Some(Slot::Reactive(_)) => return true,
        Some(Slot::Accessor(accessor)) => (accessor.get.clone(), accessor.set.clone()),
        _ => (None, None),
    };

    let value = match (initial, &existing) {
        (Some(value), _) => value,
        (None, Some(Slot::Data { value, .. })) => value.clone(),
        // A getter without setter is the only source of truth; nothing is
        // stored or observed up front.
        (None, Some(Slot::Accessor(_))) => match (&getter, &setter) {
            (Some(get), Some(_)) => get(),
            _ => Value::Null,
        },
        (None, _) => Value::Null,
    };

    let child = if options.shallow {
        None
    } else {
        observe(&value, false)
    };

    let property = ReactiveProperty {
        dep: Dep::new(),
        cell: Mutex::new(value),
        child: Mutex::new(child),
        getter,
        setter,
        shallow: options.shallow,
        custom_setter: options.custom_setter,
    };

    record.define(key, Slot::Reactive(Arc::new(property)))
}

/// Register the active subscriber with every observed element of `list`,
/// descending into nested lists.
fn depend_array(list: &List) {
    for item in list.to_vec() {
        if let Some(observer) = Observer::of(&item) {
            observer.dep().depend();
        }
        if let Value::List(inner) = &item {
            depend_array(inner);
        }
    }
}

/// Register the active subscriber as a reader of `value` as a whole.
///
/// This is the registration a reactive getter performs for the value it
/// returns, minus the per-key Dep: structural changes to `value` (keys added
/// or deleted, list elements inserted or removed) will notify the reader.
pub fn track(value: &Value) {
    if !ReactiveContext::is_active() {
        return;
    }
    if let Some(observer) = Observer::of(value) {
        observer.dep().depend();
        if let Value::List(list) = value {
            depend_array(list);
        }
    }
}
