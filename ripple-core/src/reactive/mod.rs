//! Reactive Core
//!
//! This module implements transparent dependency tracking over plain
//! records and lists. Nothing subscribes explicitly: a computation's
//! dependencies are whatever it read while it was the active subscriber.
//!
//! # Concepts
//!
//! ## Dep
//!
//! A [`Dep`] is a set of subscribers interested in one slot of state. Each
//! reactive key owns one, and each observed composite owns a "self" Dep for
//! changes to its structure.
//!
//! ## Observer
//!
//! [`observe`] wraps a record or list (and, transitively, everything it
//! contains). Records get a reactive getter/setter per key; lists notify
//! their self Dep from every mutating method.
//!
//! ## Structural changes
//!
//! Adding or deleting a record key cannot be intercepted through a key that
//! does not exist yet. [`set`] and [`delete`] perform such changes and
//! notify the parent's self Dep.
//!
//! ## Subscribers
//!
//! Anything implementing [`Subscriber`] can be the active reader.
//! [`ReactiveContext`] holds the active subscriber on a thread-local stack;
//! [`Runtime`] resolves subscriber IDs when a Dep notifies. [`Watcher`] is
//! the ready-made subscriber that re-runs a closure.
//!
//! # Example
//!
//! ```rust,ignore
//! use ripple_core::reactive::{observe, set, Value, Watcher};
//!
//! let state = Value::from_json(r#"{"user": {"name": "Ada"}}"#)?;
//! observe(&state, false);
//! let root = state.as_record().unwrap().clone();
//!
//! let watcher = Watcher::new(move || {
//!     let user = root.get("user").unwrap();
//!     println!("{:?}", user.as_record().unwrap().get("email"));
//! });
//!
//! let user = state.as_record().unwrap().get("user").unwrap();
//! set(&user, "email", "ada@example.com".into()); // watcher re-runs
//! ```

mod context;
mod dep;
mod host;
mod list;
mod mutate;
mod observer;
mod record;
mod runtime;
mod subscriber;
mod value;
mod watcher;

pub use context::{should_observe, untracked, without_observing, ObservingGuard, ReactiveContext};
pub use dep::{Dep, DepId};
pub use host::Host;
pub use list::List;
pub use mutate::{delete, set};
pub use observer::{
    define_reactive, observe, track, Composite, CustomSetter, Observer, ReactiveOptions,
};
pub use record::{Accessor, Getter, Record, Setter};
pub use runtime::{ReactiveHandle, Runtime};
pub use subscriber::{FnSubscriber, Subscriber, SubscriberId};
pub use value::{same_value, Key, Opaque, Value};
pub use watcher::Watcher;
