//! Reflex Core
//!
//! This crate provides a minimal reactive-state engine. Given plain data, it
//! tracks which watchers read which properties and re-runs those watchers
//! when the properties they depend on change.
//!
//! It implements:
//!
//! - Deep observation of plain data into reactive objects and arrays
//! - Per-property dependency tracking with automatic collection
//! - Watchers over dotted paths or arbitrary getters
//! - Opt-in notification for array mutations
//! - A debouncer for rate-limiting host-side work
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Reactive values, dependencies, watchers and the context stack
//! - `path`: Compilation of dotted paths into accessors
//! - `debounce`: Tokio-based debouncing utility
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use reflex_core::{make_reactive, watch, ReactiveValue};
//! use serde_json::json;
//!
//! let state = make_reactive(json!({"user": {"name": "Ada"}}));
//! let names = Rc::new(RefCell::new(Vec::new()));
//! let sink = names.clone();
//!
//! let _watcher = watch(&state, "user.name", move |new, _old| {
//!     sink.borrow_mut().push(new.to_string());
//! })
//! .unwrap();
//!
//! // Replacing the nested object makes the new object reactive too.
//! let root = state.as_object().unwrap();
//! root.set("user", json!({"name": "Grace"}));
//! root.get_untracked("user").as_object().unwrap().set("name", "Linus");
//!
//! assert_eq!(*names.borrow(), vec!["Grace", "Linus"]);
//! ```

pub mod debounce;
pub mod path;
pub mod reactive;

mod error;

pub use debounce::Debouncer;
pub use error::{Error, Result};
pub use path::CompiledPath;
pub use reactive::{
    watch, watch_fn, wrap_array_methods, Dependency, ObservedArray, ObservedObject,
    ReactiveContext, ReactiveValue, WatchTarget, Watcher,
};

/// Make plain data reactive, recursively.
///
/// Objects and arrays in the result are shared handles; clone them to keep
/// access to the observed state.
pub fn make_reactive(value: serde_json::Value) -> ReactiveValue {
    reactive::observe(value)
}
