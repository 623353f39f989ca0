//! Tests that change process-wide configuration.
//!
//! They live in their own test binary and run as one test so that no other
//! test observes a half-changed configuration.

use ripple_core::reactive::{observe, set, Record, Value};
use ripple_core::Config;

#[test]
fn global_switches() {
    // Server rendering: nothing new is observed.
    Config::update(|config| config.server_rendering = true);
    let value = Value::from_json(r#"{"a": {"b": 1}}"#).unwrap();
    assert!(observe(&value, false).is_none());

    // Already-observed values keep their observer under the gate.
    Config::update(|config| config.server_rendering = false);
    let observed = observe(&value, false).unwrap();
    Config::update(|config| config.server_rendering = true);
    assert!(observe(&value, false).unwrap().ptr_eq(&observed));

    // Warnings off: refused mutations stay refused, just silently.
    Config::from_json(r#"{ "warnings": false }"#).unwrap().install();
    assert!(!Config::current().warnings);
    let root = Value::from_json(r#"{"a": 1}"#).unwrap();
    observe(&root, true);
    set(&root, "b", 2.into());
    assert!(!Record::try_from(root).unwrap().contains_key("b"));

    Config::default().install();
    assert_eq!(Config::current(), Config::default());
}
