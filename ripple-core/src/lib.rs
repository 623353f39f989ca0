//! Ripple Core
//!
//! This crate provides transparent, fine-grained dependency tracking for
//! plain data. It implements:
//!
//! - Observation of records and lists, recursively and idempotently
//! - Per-key reactive properties that record readers and notify on writes
//! - Structural change notification for lists and for keys added or removed
//!   at runtime
//! - A thread-local active-subscriber stack and a subscriber registry
//!
//! Scheduling of re-runs is left to subscribers: the engine calls
//! [`Subscriber::update`](reactive::Subscriber::update) synchronously and
//! expects batching, if any, to happen there.
//!
//! # Architecture
//!
//! - `reactive`: values, observation, Deps, and subscribers
//! - `config`: process-wide switches (warnings, server rendering gate)
//! - `error`: the crate's error type
//!
//! # Example
//!
//! ```rust,ignore
//! use ripple_core::reactive::{observe, ReactiveContext, Runtime, FnSubscriber, Value};
//!
//! let state = Value::from_json(r#"{"a": 1}"#)?;
//! observe(&state, false);
//! let record = state.as_record().unwrap();
//!
//! let subscriber = Arc::new(FnSubscriber::new(|| println!("a changed")));
//! let _handle = Runtime::register(subscriber.clone());
//!
//! ReactiveContext::scope(subscriber.id(), || record.get("a"));
//! record.set("a", 2.into()); // prints "a changed"
//! record.set("a", 2.into()); // same value: nothing
//! ```

/// Emit a development warning when warnings are enabled.
macro_rules! dev_warn {
    ($($arg:tt)*) => {{
        if $crate::config::warnings_enabled() {
            ::tracing::warn!($($arg)*);
        }
    }};
}

pub mod config;
pub mod error;
pub mod reactive;

pub use config::Config;
pub use error::{Error, Result};
