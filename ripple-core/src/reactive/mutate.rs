//! Structural Mutation
//!
//! A reactive property only exists for keys present when the record was
//! observed, so adding or deleting a key cannot be seen through any key's
//! Dep. [`set`] and [`delete`] make those changes visible by notifying the
//! *parent's* self Dep, which every reader of the parent joined at read time.
//!
//! For lists both route through the intercepted [`List::splice`], so list
//! readers are notified the same way a `push` would notify them.
//!
//! [`List::splice`]: super::List::splice

use super::observer::{define_reactive, Observer, ReactiveOptions};
use super::record::Record;
use super::value::{Key, Value};

/// Lists never grow past this length.
const MAX_LIST_LEN: usize = u32::MAX as usize;

/// Set `key` on `target` to `value`, adding the key reactively if needed.
///
/// Returns `value`.
pub fn set(target: &Value, key: impl Into<Key>, value: Value) -> Value {
    let key = key.into();

    match target {
        Value::List(list) => match key.as_index() {
            Some(index) if index >= MAX_LIST_LEN => {
                dev_warn!(index, "list index out of range");
            }
            Some(index) => {
                list.resize(list.len().max(index));
                list.splice(index, 1, [value.clone()]);
            }
            None => dev_warn!(?key, "cannot set a non-index key on a list"),
        },
        Value::Record(record) => set_on_record(record, &key.as_name(), value.clone()),
        other => dev_warn!(
            kind = other.kind(),
            "cannot set reactive property on null or primitive value"
        ),
    }

    value
}

fn set_on_record(record: &Record, key: &str, value: Value) {
    if record.contains_key(key) {
        record.set(key, value);
        return;
    }

    let observer = Observer::of(&Value::Record(record.clone()));
    if record.is_host() || observer.as_ref().is_some_and(|ob| ob.root_count() > 0) {
        dev_warn!(
            key,
            "avoid adding reactive properties to a host instance or its root data at runtime; \
             declare it upfront instead"
        );
        return;
    }

    let Some(observer) = observer else {
        record.set(key, value);
        return;
    };

    if define_reactive(record, key, Some(value), ReactiveOptions::default()) {
        observer.dep().notify();
    }
}

/// Delete `key` from `target`, notifying readers of `target` if it is
/// observed.
pub fn delete(target: &Value, key: impl Into<Key>) {
    let key = key.into();

    match target {
        Value::List(list) => match key.as_index() {
            Some(index) => {
                list.splice(index, 1, std::iter::empty());
            }
            None => dev_warn!(?key, "cannot delete a non-index key from a list"),
        },
        Value::Record(record) => delete_from_record(record, &key.as_name()),
        other => dev_warn!(
            kind = other.kind(),
            "cannot delete reactive property on null or primitive value"
        ),
    }
}

fn delete_from_record(record: &Record, key: &str) {
    if !record.contains_key(key) {
        return;
    }

    let observer = Observer::of(&Value::Record(record.clone()));
    if record.is_host() || observer.as_ref().is_some_and(|ob| ob.root_count() > 0) {
        dev_warn!(
            key,
            "avoid deleting properties on a host instance or its root data; set it to null instead"
        );
        return;
    }

    // A non-configurable key stays put, but readers are still told.
    record.remove(key);

    if let Some(observer) = observer {
        observer.dep().notify();
    }
}
