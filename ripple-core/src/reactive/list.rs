//! Lists
//!
//! Index access into a list cannot be intercepted the way a record key can,
//! so a list reports changes at the level of its structure instead. Every
//! mutating method below, once the list is observed:
//!
//! 1. performs the ordinary operation and keeps its ordinary result,
//! 2. observes any composite values it inserted,
//! 3. notifies the list's self Dep.
//!
//! On an unobserved list the same methods are plain vector operations.
//! [`List::resize`] and reads are never intercepted.

use std::cmp::Ordering as CmpOrdering;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use super::observer::{observe, ObserverState};
use super::value::Value;

struct ListInner {
    items: Mutex<Vec<Value>>,
    observer: OnceLock<Arc<ObserverState>>,
}

/// An ordered composite value.
#[derive(Clone)]
pub struct List(Arc<ListInner>);

impl List {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::from(Vec::new())
    }

    /// Element at `index`, if in bounds. Not tracked.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.items.lock().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.items.lock().clone()
    }

    /// Set the length, padding with `Null` or truncating. Not intercepted.
    pub fn resize(&self, len: usize) {
        self.0.items.lock().resize(len, Value::Null);
    }

    /// Append a value and return the new length.
    pub fn push(&self, value: Value) -> usize {
        let len = {
            let mut items = self.0.items.lock();
            items.push(value.clone());
            items.len()
        };
        self.mutated(&[value]);
        len
    }

    /// Remove and return the last value.
    pub fn pop(&self) -> Option<Value> {
        let removed = self.0.items.lock().pop();
        self.mutated(&[]);
        removed
    }

    /// Prepend a value and return the new length.
    pub fn unshift(&self, value: Value) -> usize {
        let len = {
            let mut items = self.0.items.lock();
            items.insert(0, value.clone());
            items.len()
        };
        self.mutated(&[value]);
        len
    }

    /// Remove and return the first value.
    pub fn shift(&self) -> Option<Value> {
        let removed = {
            let mut items = self.0.items.lock();
            (!items.is_empty()).then(|| items.remove(0))
        };
        self.mutated(&[]);
        removed
    }

    /// Remove `delete_count` values starting at `start`, insert `insert` in
    /// their place, and return the removed values.
    ///
    /// `start` past the end appends; `delete_count` is clamped to what is
    /// available.
    pub fn splice<I>(&self, start: usize, delete_count: usize, insert: I) -> Vec<Value>
    where
        I: IntoIterator<Item = Value>,
    {
        let inserted: Vec<Value> = insert.into_iter().collect();
        let removed = {
            let mut items = self.0.items.lock();
            let start = start.min(items.len());
            let end = start.saturating_add(delete_count).min(items.len());
            items
                .splice(start..end, inserted.iter().cloned())
                .collect()
        };
        self.mutated(&inserted);
        removed
    }

    /// Sort in place with `compare`. The sort is stable.
    pub fn sort_by<F>(&self, mut compare: F)
    where
        F: FnMut(&Value, &Value) -> CmpOrdering,
    {
        // The comparator may read this list, so it runs on a copy.
        let mut items = self.to_vec();
        items.sort_by(|a, b| compare(a, b));
        *self.0.items.lock() = items;
        self.mutated(&[]);
    }

    /// Reverse in place.
    pub fn reverse(&self) {
        self.0.items.lock().reverse();
        self.mutated(&[]);
    }

    fn mutated(&self, inserted: &[Value]) {
        let Some(state) = self.observer_state() else {
            return;
        };
        for value in inserted {
            observe(value, false);
        }
        state.dep().notify();
    }

    /// Whether two handles refer to the same list.
    pub fn ptr_eq(&self, other: &List) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn observer_state(&self) -> Option<Arc<ObserverState>> {
        self.0.observer.get().cloned()
    }

    pub(crate) fn attach_observer(&self, state: Arc<ObserverState>) -> Arc<ObserverState> {
        self.0.observer.get_or_init(|| state).clone()
    }
}

impl Default for List {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<Value>> for List {
    fn from(items: Vec<Value>) -> Self {
        Self(Arc::new(ListInner {
            items: Mutex::new(items),
            observer: OnceLock::new(),
        }))
    }
}

impl FromIterator<Value> for List {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl std::fmt::Debug for List {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("List")
            .field("len", &self.len())
            .field("observed", &self.0.observer.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(list: &List) -> Vec<f64> {
        list.to_vec().iter().filter_map(Value::as_number).collect()
    }

    fn list_of(values: &[i32]) -> List {
        values.iter().copied().map(Value::from).collect()
    }

    #[test]
    fn mutators_return_ordinary_results() {
        let list = list_of(&[1, 2]);

        assert_eq!(list.push(3.into()), 3);
        assert_eq!(list.unshift(0.into()), 4);
        assert_eq!(list.pop(), Some(Value::from(3)));
        assert_eq!(list.shift(), Some(Value::from(0)));
        assert_eq!(numbers(&list), vec![1.0, 2.0]);
    }

    #[test]
    fn pop_and_shift_on_empty_list() {
        let list = List::new();
        assert_eq!(list.pop(), None);
        assert_eq!(list.shift(), None);
    }

    #[test]
    fn splice_clamps_bounds() {
        let list = list_of(&[1, 2, 3]);

        let removed = list.splice(1, 10, [Value::from(9)]);
        assert_eq!(removed, vec![Value::from(2), Value::from(3)]);
        assert_eq!(numbers(&list), vec![1.0, 9.0]);

        let removed = list.splice(99, 1, [Value::from(4)]);
        assert!(removed.is_empty());
        assert_eq!(numbers(&list), vec![1.0, 9.0, 4.0]);
    }

    #[test]
    fn sort_and_reverse() {
        let list = list_of(&[3, 1, 2]);

        list.sort_by(|a, b| {
            a.as_number()
                .partial_cmp(&b.as_number())
                .unwrap_or(CmpOrdering::Equal)
        });
        assert_eq!(numbers(&list), vec![1.0, 2.0, 3.0]);

        list.reverse();
        assert_eq!(numbers(&list), vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn resize_pads_with_null() {
        let list = list_of(&[1]);
        list.resize(3);
        assert_eq!(list.len(), 3);
        assert_eq!(list.get(2), Some(Value::Null));

        list.resize(0);
        assert!(list.is_empty());
    }
}
