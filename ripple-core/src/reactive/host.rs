//! Subscriber Hosts
//!
//! A [`Host`] is the object whose state the rendering layer reads: an
//! instance record with one proxy accessor per data key, forwarding to the
//! host's root data record. The root data is observed with its root count
//! bumped, which is what makes [`set`](super::set) and
//! [`delete`](super::delete) refuse to add or remove top-level keys at
//! runtime.

use std::sync::Arc;

use super::observer::{observe, Observer};
use super::record::{Accessor, Record};
use super::value::Value;

/// A subscriber host and its root data.
#[derive(Clone, Debug)]
pub struct Host {
    instance: Record,
    data: Record,
}

impl Host {
    /// Build a host around `data`, observing it as root data.
    pub fn new(data: Record) -> Self {
        let observer = observe(&Value::Record(data.clone()), true);
        if observer.is_none() {
            tracing::debug!("host data left unobserved");
        }

        let instance = Record::new_host();
        for key in data.keys() {
            proxy(&instance, &data, key);
        }

        Self { instance, data }
    }

    /// The instance record, as a value.
    pub fn instance(&self) -> Value {
        Value::Record(self.instance.clone())
    }

    /// The root data record.
    pub fn data(&self) -> &Record {
        &self.data
    }

    /// The root data's observer, if it was observed.
    pub fn observer(&self) -> Option<Observer> {
        Observer::of(&Value::Record(self.data.clone()))
    }

    /// Read a key through the instance.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.instance.get(key)
    }

    /// Write a key through the instance.
    pub fn set(&self, key: &str, value: Value) {
        self.instance.set(key, value);
    }
}

/// Forward `target.key` to `source.key`.
fn proxy(target: &Record, source: &Record, key: Arc<str>) {
    let (read, write) = (source.clone(), source.clone());
    let (read_key, write_key) = (key.clone(), key.clone());

    let accessor = Accessor::new()
        .with_getter(move || read.get(&read_key).unwrap_or_default())
        .with_setter(move |value| write.set(&write_key, value));

    target.define_accessor(&key, accessor);
}
