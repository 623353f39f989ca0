//! Values
//!
//! Everything the engine can hold is a [`Value`]. Its variant is fixed when
//! the value is built, so deciding whether something is composite (and thus
//! observable) is a plain match on the variant.
//!
//! Composites ([`Record`] and [`List`]) are shared handles: cloning the value
//! aliases the same storage, and equality between composites is identity.

use std::any::Any;
use std::borrow::Cow;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::error::{Error, Result};

use super::context::untracked;
use super::list::List;
use super::record::Record;

/// A value stored in observed state.
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value. Also fills holes when a list grows.
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(Arc<str>),
    Record(Record),
    List(List),
    /// An internal marker value, such as a render node. Logically immutable
    /// and never observed.
    Opaque(Opaque),
}

impl Value {
    /// Parse JSON into a fresh, unobserved value tree.
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: serde_json::Value = serde_json::from_str(json)?;
        Ok(parsed.into())
    }

    /// Snapshot the value as JSON without registering any dependency.
    ///
    /// Opaque values encode as `null`.
    pub fn to_json(&self) -> serde_json::Value {
        untracked(|| self.snapshot())
    }

    fn snapshot(&self) -> serde_json::Value {
        match self {
            Value::Null | Value::Opaque(_) => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Record(record) => serde_json::Value::Object(
                record
                    .entries()
                    .into_iter()
                    .map(|(key, value)| (key.to_string(), value.snapshot()))
                    .collect(),
            ),
            Value::List(list) => {
                serde_json::Value::Array(list.to_vec().iter().map(Value::snapshot).collect())
            }
        }
    }

    /// Whether the value is a record or a list.
    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Record(_) | Value::List(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Record(_) => "record",
            Value::List(_) => "list",
            Value::Opaque(_) => "opaque",
        }
    }
}

/// Strict equality, except that NaN equals NaN.
///
/// Composites and opaque values compare by identity.
pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Record(x), Value::Record(y)) => x.ptr_eq(y),
        (Value::List(x), Value::List(y)) => x.ptr_eq(y),
        (Value::Opaque(x), Value::Opaque(y)) => x.ptr_eq(y),
        _ => false,
    }
}

impl PartialEq for Value {
    /// Same as [`same_value`].
    fn eq(&self, other: &Self) -> bool {
        same_value(self, other)
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Record(record) => std::fmt::Debug::fmt(record, f),
            Value::List(list) => std::fmt::Debug::fmt(list, f),
            Value::Opaque(opaque) => std::fmt::Debug::fmt(opaque, f),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null | Value::Opaque(_) => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Record(record) => {
                let entries = untracked(|| record.entries());
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in &entries {
                    map.serialize_entry(key.as_ref(), value)?;
                }
                map.end()
            }
            Value::List(list) => {
                let items = list.to_vec();
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in &items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.into()),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Record(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl From<List> for Value {
    fn from(list: List) -> Self {
        Value::List(list)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(List::from(items))
    }
}

impl From<Opaque> for Value {
    fn from(opaque: Opaque) -> Self {
        Value::Opaque(opaque)
    }
}

impl TryFrom<Value> for Record {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Record(record) => Ok(record),
            other => Err(Error::NotComposite {
                expected: "record",
                found: other.kind(),
            }),
        }
    }
}

impl TryFrom<Value> for List {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::List(list) => Ok(list),
            other => Err(Error::NotComposite {
                expected: "list",
                found: other.kind(),
            }),
        }
    }
}

/// A framework-internal object carried through state untouched.
#[derive(Clone)]
pub struct Opaque(Arc<dyn Any + Send + Sync>);

impl Opaque {
    pub fn new<T: Any + Send + Sync>(inner: T) -> Self {
        Self(Arc::new(inner))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }

    pub fn ptr_eq(&self, other: &Opaque) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Opaque {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Opaque(..)")
    }
}

/// A property key: a record key or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Index(usize),
    Name(Arc<str>),
}

impl Key {
    /// The key as a valid list index: a number, or a name that parses as
    /// a finite, non-negative whole number (`"1"`, `"01"` and `"1.0"` all
    /// name index 1).
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(index) => Some(*index),
            Key::Name(name) => {
                let number: f64 = name.trim().parse().ok()?;
                let whole = number.is_finite() && number >= 0.0 && number.fract() == 0.0;
                whole.then_some(number as usize)
            }
        }
    }

    /// The key as a record key. Indices spell themselves in decimal.
    pub fn as_name(&self) -> Cow<'_, str> {
        match self {
            Key::Index(index) => Cow::Owned(index.to_string()),
            Key::Name(name) => Cow::Borrowed(name.as_ref()),
        }
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.into())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name.into())
    }
}

impl From<Arc<str>> for Key {
    fn from(name: Arc<str>) -> Self {
        Key::Name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_equals_itself() {
        let nan = Value::from(f64::NAN);
        assert!(same_value(&nan, &Value::Number(f64::NAN)));
        assert!(!same_value(&nan, &Value::from(0.0)));
    }

    #[test]
    fn composites_compare_by_identity() {
        let a = Value::from_json(r#"{"x": 1}"#).unwrap();
        let b = Value::from_json(r#"{"x": 1}"#).unwrap();
        assert!(same_value(&a, &a.clone()));
        assert!(!same_value(&a, &b));
    }

    #[test]
    fn mixed_kinds_are_never_equal() {
        assert!(!same_value(&Value::from(1), &Value::from("1")));
        assert!(!same_value(&Value::Null, &Value::from(false)));
    }

    #[test]
    fn json_round_trip_preserves_key_order() {
        let value = Value::from_json(r#"{"b": [1, true, null], "a": "x"}"#).unwrap();
        let record = value.as_record().unwrap();
        assert_eq!(record.keys(), vec![Arc::<str>::from("b"), Arc::from("a")]);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"{"b":[1.0,true,null],"a":"x"}"#
        );
    }

    #[test]
    fn key_index_parsing() {
        assert_eq!(Key::from(3).as_index(), Some(3));
        assert_eq!(Key::from("12").as_index(), Some(12));
        assert_eq!(Key::from("-1").as_index(), None);
        assert_eq!(Key::from("01").as_index(), Some(1));
        assert_eq!(Key::from("1.0").as_index(), Some(1));
        assert_eq!(Key::from("1.5").as_index(), None);
        assert_eq!(Key::from("NaN").as_index(), None);
        assert_eq!(Key::from("inf").as_index(), None);
        assert_eq!(Key::from("").as_index(), None);
        assert_eq!(Key::from("name").as_index(), None);
        assert_eq!(Key::from(7).as_name(), "7");
    }

    #[test]
    fn try_from_reports_found_kind() {
        let err = Record::try_from(Value::from(1)).unwrap_err();
        assert_eq!(err.to_string(), "expected a record, found number");
        assert!(List::try_from(Value::List(List::new())).is_ok());
    }
}
