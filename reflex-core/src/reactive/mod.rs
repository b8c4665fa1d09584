//! Reactive Core
//!
//! This module implements the observe/track/notify engine: reactive values,
//! the dependencies guarding them, and the watchers that react to them.
//!
//! # Concepts
//!
//! ## Reactive values
//!
//! Plain data is observed by converting it into a [`ReactiveValue`]. Objects
//! become [`ObservedObject`]s whose properties each own a [`Dependency`];
//! arrays become [`ObservedArray`]s with one dependency for the whole array.
//!
//! ## Watchers
//!
//! A [`Watcher`] evaluates a path or getter against a context value. While it
//! evaluates, every reactive read subscribes it to the corresponding
//! dependency. A later write notifies those dependencies, which re-run the
//! watcher and pass `(new, old)` to its callback.
//!
//! # Implementation Notes
//!
//! Reads are attributed through a thread-local stack of evaluating watchers
//! (see [`ReactiveContext`]). All state is `Rc`-based and confined to the
//! thread that created it; notification is synchronous on the writer's stack.

mod array;
mod context;
mod dependency;
mod object;
mod observe;
mod value;
mod watcher;

pub use array::{wrap_array_methods, ObservedArray};
pub use context::ReactiveContext;
pub use dependency::{DepId, Dependency};
pub use object::ObservedObject;
pub use observe::observe;
pub use value::ReactiveValue;
pub use watcher::{watch, watch_fn, Callback, Getter, WatchTarget, Watcher, WatcherId};
