//! Records
//!
//! A [`Record`] is a keyed composite with insertion-ordered slots. Reading
//! and writing go through [`Record::get`] and [`Record::set`], which behave
//! like plain property access: a slot made reactive by the engine runs its
//! tracking getter and notifying setter, a user accessor runs the user's
//! closures, and a plain data slot just stores the value.
//!
//! Writing a key the record does not have adds a *plain* slot, even on an
//! observed record. Use [`reactive::set`](super::set) to add a key that is
//! tracked and announced to readers of the record.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::observer::{ObserverState, ReactiveProperty};
use super::value::Value;

/// A user-supplied getter.
pub type Getter = Arc<dyn Fn() -> Value + Send + Sync>;

/// A user-supplied setter.
pub type Setter = Arc<dyn Fn(Value) + Send + Sync>;

/// A computed slot backed by user closures.
///
/// When the engine makes such a slot reactive it composes with the closures
/// instead of replacing them.
#[derive(Clone)]
pub struct Accessor {
    pub(crate) get: Option<Getter>,
    pub(crate) set: Option<Setter>,
    pub(crate) configurable: bool,
}

impl Accessor {
    /// An accessor with neither getter nor setter. Reads yield `Null`.
    pub fn new() -> Self {
        Self {
            get: None,
            set: None,
            configurable: true,
        }
    }

    pub fn with_getter<F>(mut self, get: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.get = Some(Arc::new(get));
        self
    }

    pub fn with_setter<F>(mut self, set: F) -> Self
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.set = Some(Arc::new(set));
        self
    }

    /// Forbid redefining or removing the slot. The engine leaves
    /// non-configurable slots untracked.
    pub fn non_configurable(mut self) -> Self {
        self.configurable = false;
        self
    }
}

impl Default for Accessor {
    fn default() -> Self {
        Self::new()
    }
}

/// One property slot.
#[derive(Clone)]
pub(crate) enum Slot {
    Data { value: Value, configurable: bool },
    Accessor(Accessor),
    Reactive(Arc<ReactiveProperty>),
}

impl Slot {
    pub(crate) fn is_configurable(&self) -> bool {
        match self {
            Slot::Data { configurable, .. } => *configurable,
            Slot::Accessor(accessor) => accessor.configurable,
            Slot::Reactive(_) => true,
        }
    }

    /// Evaluate the slot as a read.
    fn read(&self) -> Value {
        match self {
            Slot::Data { value, .. } => value.clone(),
            Slot::Accessor(accessor) => accessor.get.as_ref().map(|get| get()).unwrap_or_default(),
            Slot::Reactive(property) => property.get(),
        }
    }
}

struct RecordInner {
    slots: Mutex<IndexMap<Arc<str>, Slot>>,
    observer: OnceLock<Arc<ObserverState>>,
    extensible: AtomicBool,
    /// This record is a subscriber-host instance, not plain state.
    host: bool,
}

/// A keyed composite value.
#[derive(Clone)]
pub struct Record(Arc<RecordInner>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::with_host_flag(false)
    }

    /// Create the instance record of a subscriber host.
    pub(crate) fn new_host() -> Self {
        Self::with_host_flag(true)
    }

    fn with_host_flag(host: bool) -> Self {
        Self(Arc::new(RecordInner {
            slots: Mutex::new(IndexMap::new()),
            observer: OnceLock::new(),
            extensible: AtomicBool::new(true),
            host,
        }))
    }

    /// Read a key. Returns `None` if the record has no such key.
    pub fn get(&self, key: &str) -> Option<Value> {
        // Slots are cloned out so getters run without the lock held.
        let slot = self.slot(key)?;
        Some(slot.read())
    }

    /// Write a key.
    ///
    /// A missing key is added as a plain, untracked slot unless the record
    /// is non-extensible, in which case the write is dropped.
    pub fn set(&self, key: &str, value: Value) {
        match self.slot(key) {
            Some(Slot::Reactive(property)) => property.set(value),
            Some(Slot::Accessor(accessor)) => {
                if let Some(set) = &accessor.set {
                    set(value);
                }
            }
            Some(Slot::Data { .. }) => {
                if let Some(Slot::Data { value: stored, .. }) = self.0.slots.lock().get_mut(key) {
                    *stored = value;
                }
            }
            None => {
                if self.is_extensible() {
                    self.0.slots.lock().insert(
                        key.into(),
                        Slot::Data {
                            value,
                            configurable: true,
                        },
                    );
                }
            }
        }
    }

    /// Define a plain data slot, replacing any configurable slot under `key`.
    ///
    /// Returns `false` if the existing slot is non-configurable or the key is
    /// new and the record is non-extensible.
    pub fn define_property(&self, key: &str, value: Value, configurable: bool) -> bool {
        self.define(key, Slot::Data { value, configurable })
    }

    /// Define an accessor slot. Same rules as [`define_property`](Self::define_property).
    pub fn define_accessor(&self, key: &str, accessor: Accessor) -> bool {
        self.define(key, Slot::Accessor(accessor))
    }

    pub(crate) fn define(&self, key: &str, slot: Slot) -> bool {
        let mut slots = self.0.slots.lock();
        if let Some(existing) = slots.get_mut(key) {
            if !existing.is_configurable() {
                return false;
            }
            *existing = slot;
            return true;
        }
        if !self.is_extensible() {
            return false;
        }
        slots.insert(key.into(), slot);
        true
    }

    /// Remove a key and return the value it held.
    ///
    /// Non-configurable slots stay in place and yield `None`.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let removed = {
            let mut slots = self.0.slots.lock();
            match slots.get(key).map(Slot::is_configurable) {
                Some(true) => slots.shift_remove(key),
                _ => None,
            }
        };
        removed.map(|slot| match slot {
            Slot::Reactive(property) => property.peek(),
            other => other.read(),
        })
    }

    /// Whether the record has its own slot under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.slots.lock().contains_key(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<Arc<str>> {
        self.0.slots.lock().keys().cloned().collect()
    }

    /// Key/value pairs in insertion order. Each value is read as by
    /// [`get`](Self::get).
    pub fn entries(&self) -> Vec<(Arc<str>, Value)> {
        let slots: Vec<(Arc<str>, Slot)> = self
            .0
            .slots
            .lock()
            .iter()
            .map(|(key, slot)| (key.clone(), slot.clone()))
            .collect();
        slots
            .into_iter()
            .map(|(key, slot)| (key, slot.read()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Refuse new keys from now on. Observation skips non-extensible records.
    pub fn prevent_extensions(&self) {
        self.0.extensible.store(false, Ordering::SeqCst);
    }

    pub fn is_extensible(&self) -> bool {
        self.0.extensible.load(Ordering::SeqCst)
    }

    /// Whether two handles refer to the same record.
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn is_host(&self) -> bool {
        self.0.host
    }

    pub(crate) fn slot(&self, key: &str) -> Option<Slot> {
        self.0.slots.lock().get(key).cloned()
    }

    pub(crate) fn observer_state(&self) -> Option<Arc<ObserverState>> {
        self.0.observer.get().cloned()
    }

    pub(crate) fn attach_observer(&self, state: Arc<ObserverState>) -> Arc<ObserverState> {
        self.0.observer.get_or_init(|| state).clone()
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> FromIterator<(K, Value)> for Record
where
    K: Into<Arc<str>>,
{
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let record = Record::new();
        {
            let mut slots = record.0.slots.lock();
            for (key, value) in iter {
                slots.insert(
                    key.into(),
                    Slot::Data {
                        value,
                        configurable: true,
                    },
                );
            }
        }
        record
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("keys", &self.keys())
            .field("observed", &self.0.observer.get().is_some())
            .finish()
    }
}
