//! Watcher Implementation
//!
//! A Watcher binds a context value and a read (a path string or a getter
//! closure) to a callback.
//!
//! # How Watchers Work
//!
//! 1. On construction the read is evaluated once inside a reactive context.
//!    Every reactive property it touches registers the watcher with its
//!    dependency, which establishes the initial subscriptions.
//!
//! 2. When a dependency notifies, the watcher re-evaluates the read
//!    (collecting any new dependencies) and calls the callback with the new
//!    and previous values.
//!
//! 3. Updates are synchronous: there is no batching, and every notification
//!    runs the callback, even when the re-evaluated value is unchanged.
//!
//! # Subscriptions
//!
//! A watcher subscribes to each dependency at most once, keyed by the
//! dependency's ID. The subscription set only grows across evaluations: a
//! property that is no longer read keeps notifying the watcher. Disposing the
//! watcher (or dropping its handle) removes it from every dependency.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::context::ReactiveContext;
use super::dependency::{DepId, DepInner, Dependency};
use super::value::ReactiveValue;
use crate::error::{Error, Result};
use crate::path::{self, CompiledPath};

/// Counter for generating unique watcher IDs.
static WATCHER_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatcherId(u64);

impl WatcherId {
    fn next() -> Self {
        Self(WATCHER_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A read function evaluated against the watcher's context.
pub type Getter = Box<dyn Fn(&ReactiveValue) -> ReactiveValue>;

/// Called with `(new_value, old_value)` after each re-evaluation.
///
/// The context is not passed as a receiver. A callback that needs it
/// captures a clone of the context handle, which shares state with
/// [`Watcher::context`].
pub type Callback = Box<dyn Fn(&ReactiveValue, &ReactiveValue)>;

/// What a watcher reads: a dotted path or an arbitrary getter.
pub enum WatchTarget {
    /// Dotted path, compiled with [`path::compile`].
    Path(String),
    /// Closure receiving the context as its only argument.
    Getter(Getter),
}

impl WatchTarget {
    pub fn path(path: impl Into<String>) -> Self {
        WatchTarget::Path(path.into())
    }

    pub fn getter<F>(getter: F) -> Self
    where
        F: Fn(&ReactiveValue) -> ReactiveValue + 'static,
    {
        WatchTarget::Getter(Box::new(getter))
    }
}

impl From<&str> for WatchTarget {
    fn from(path: &str) -> Self {
        WatchTarget::Path(path.to_owned())
    }
}

impl From<String> for WatchTarget {
    fn from(path: String) -> Self {
        WatchTarget::Path(path)
    }
}

impl fmt::Debug for WatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchTarget::Path(path) => f.debug_tuple("Path").field(path).finish(),
            WatchTarget::Getter(_) => f.write_str("Getter(..)"),
        }
    }
}

/// The resolved read of a watcher.
enum Accessor {
    Path(CompiledPath),
    Getter(Getter),
}

impl Accessor {
    fn call(&self, context: &ReactiveValue) -> ReactiveValue {
        match self {
            Accessor::Path(path) => path.resolve(context),
            Accessor::Getter(getter) => getter(context),
        }
    }
}

pub(crate) struct WatcherInner {
    id: WatcherId,

    /// Shared with the caller; getters receive it as their argument.
    context: ReactiveValue,

    accessor: Accessor,

    callback: Callback,

    /// Dependencies subscribed to, keyed by ID. Held weakly so a watcher
    /// does not keep dead properties alive.
    deps: RefCell<IndexMap<DepId, Weak<DepInner>>>,

    /// Value from the most recent `run` (or construction).
    value: RefCell<ReactiveValue>,

    disposed: Cell<bool>,

    /// Number of evaluations of the accessor.
    run_count: Cell<usize>,
}

impl WatcherInner {
    pub(crate) fn id(&self) -> WatcherId {
        self.id
    }

    /// Evaluate the accessor with this watcher as the active watcher.
    fn get(self: &Rc<Self>) -> ReactiveValue {
        let _ctx = ReactiveContext::enter(Rc::clone(self));
        let value = self.accessor.call(&self.context);
        self.run_count.set(self.run_count.get() + 1);
        value
    }

    fn run(self: &Rc<Self>) {
        if self.disposed.get() {
            return;
        }

        let new_value = self.get();
        let old_value = self.value.replace(new_value.clone());
        (self.callback)(&new_value, &old_value);
    }

    pub(crate) fn update(self: &Rc<Self>) {
        trace!(watcher = self.id.0, "update");
        self.run();
    }

    pub(crate) fn add_dep(self: &Rc<Self>, dep: &Dependency) {
        if self.disposed.get() {
            return;
        }

        let id = dep.id();
        let inserted = {
            let mut deps = self.deps.borrow_mut();
            if deps.contains_key(&id) {
                false
            } else {
                deps.insert(id, dep.downgrade());
                true
            }
        };

        if inserted {
            dep.register_inner(self);
        }
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }

        let deps = std::mem::take(&mut *self.deps.borrow_mut());
        for (_, dep) in deps {
            if let Some(dep) = dep.upgrade() {
                Dependency::from_inner(dep).remove(self.id);
            }
        }

        debug!(watcher = self.id.0, "watcher disposed");
    }
}

/// An evaluated read bound to a callback, re-run whenever a dependency changes.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// use reflex_core::{make_reactive, watch, ReactiveValue};
/// use serde_json::json;
///
/// let state = make_reactive(json!({"a": 1}));
/// let seen = Rc::new(RefCell::new(None));
/// let sink = seen.clone();
///
/// let _watcher = watch(&state, "a", move |new, old| {
///     *sink.borrow_mut() = Some((new.clone(), old.clone()));
/// })
/// .unwrap();
///
/// state.as_object().unwrap().set("a", 2);
/// assert_eq!(
///     *seen.borrow(),
///     Some((ReactiveValue::from(2), ReactiveValue::from(1)))
/// );
/// ```
#[must_use = "dropping a Watcher disposes it"]
pub struct Watcher {
    inner: Rc<WatcherInner>,
}

impl Watcher {
    /// Create a watcher and evaluate it once to collect its dependencies.
    ///
    /// Fails with [`Error::UnresolvablePath`] when `target` is a path that
    /// does not compile.
    pub fn new<F>(
        context: impl Into<ReactiveValue>,
        target: impl Into<WatchTarget>,
        callback: F,
    ) -> Result<Self>
    where
        F: Fn(&ReactiveValue, &ReactiveValue) + 'static,
    {
        let accessor = match target.into() {
            WatchTarget::Path(source) => match path::compile(&source) {
                Some(compiled) => Accessor::Path(compiled),
                None => return Err(Error::unresolvable_path(source)),
            },
            WatchTarget::Getter(getter) => Accessor::Getter(getter),
        };

        Ok(Self::build(context.into(), accessor, Box::new(callback)))
    }

    fn build(context: ReactiveValue, accessor: Accessor, callback: Callback) -> Self {
        let inner = Rc::new(WatcherInner {
            id: WatcherId::next(),
            context,
            accessor,
            callback,
            deps: RefCell::new(IndexMap::new()),
            value: RefCell::new(ReactiveValue::Undefined),
            disposed: Cell::new(false),
            run_count: Cell::new(0),
        });

        let value = inner.get();
        *inner.value.borrow_mut() = value;

        debug!(
            watcher = inner.id.0,
            dependencies = inner.deps.borrow().len(),
            "watcher created"
        );

        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Rc<WatcherInner> {
        &self.inner
    }

    pub fn id(&self) -> WatcherId {
        self.inner.id
    }

    /// The context the read is evaluated against.
    pub fn context(&self) -> &ReactiveValue {
        &self.inner.context
    }

    /// The value from the most recent evaluation.
    pub fn value(&self) -> ReactiveValue {
        self.inner.value.borrow().clone()
    }

    /// Evaluate the read now, collecting dependencies.
    ///
    /// The stored value is not replaced and the callback is not called.
    pub fn get(&self) -> ReactiveValue {
        self.inner.get()
    }

    /// Re-evaluate, store the new value and call the callback.
    pub fn run(&self) {
        self.inner.run();
    }

    /// Called by dependencies on change. Same as [`Watcher::run`].
    pub fn update(&self) {
        self.inner.update();
    }

    /// Subscribe to `dep` unless already subscribed.
    pub fn add_dep(&self, dep: &Dependency) {
        self.inner.add_dep(dep);
    }

    /// Unsubscribe from every dependency. The watcher never runs again.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Number of distinct dependencies subscribed to.
    pub fn dependency_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    /// Number of times the read has been evaluated.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Watch `target` on `context`, calling `callback` on every change.
pub fn watch<F>(
    context: impl Into<ReactiveValue>,
    target: impl Into<WatchTarget>,
    callback: F,
) -> Result<Watcher>
where
    F: Fn(&ReactiveValue, &ReactiveValue) + 'static,
{
    Watcher::new(context, target, callback)
}

/// Watch the result of `getter`. Never fails, since no path is compiled.
pub fn watch_fn<G, F>(context: impl Into<ReactiveValue>, getter: G, callback: F) -> Watcher
where
    G: Fn(&ReactiveValue) -> ReactiveValue + 'static,
    F: Fn(&ReactiveValue, &ReactiveValue) + 'static,
{
    Watcher::build(
        context.into(),
        Accessor::Getter(Box::new(getter)),
        Box::new(callback),
    )
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn counter() -> (Rc<Cell<usize>>, impl Fn(&ReactiveValue, &ReactiveValue) + 'static) {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        (calls, move |_: &ReactiveValue, _: &ReactiveValue| {
            counter.set(counter.get() + 1)
        })
    }

    #[test]
    fn watcher_evaluates_on_creation() {
        let state = ReactiveValue::from(json!({"a": {"b": 7}}));
        let (calls, callback) = counter();

        let watcher = Watcher::new(&state, "a.b", callback).unwrap();

        assert_eq!(watcher.value(), ReactiveValue::from(7));
        assert_eq!(watcher.run_count(), 1);
        assert_eq!(watcher.dependency_count(), 2);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn unresolvable_path_is_rejected() {
        let state = ReactiveValue::from(json!({"a": 1}));
        let err = Watcher::new(&state, "a()", |_, _| {}).unwrap_err();

        assert!(matches!(err, Error::UnresolvablePath { ref path } if path == "a()"));
    }

    #[test]
    fn repeated_reads_subscribe_once() {
        let state = ReactiveValue::from(json!({"a": 2}));
        let (calls, callback) = counter();

        let watcher = watch_fn(
            &state,
            |ctx| {
                let a = ctx.property("a").as_f64().unwrap_or(0.0);
                let again = ctx.property("a").as_f64().unwrap_or(0.0);
                ReactiveValue::from(a + again)
            },
            callback,
        );

        assert_eq!(watcher.dependency_count(), 1);
        assert_eq!(watcher.value(), ReactiveValue::from(4));

        state.as_object().unwrap().set("a", 5);
        assert_eq!(calls.get(), 1);
        assert_eq!(watcher.value(), ReactiveValue::from(10));
    }

    #[test]
    fn run_shifts_value_to_old() {
        let state = ReactiveValue::from(json!({"n": 1}));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();

        let watcher = Watcher::new(&state, "n", move |new, old| {
            sink.borrow_mut().push((new.clone(), old.clone()));
        })
        .unwrap();

        let obj = state.as_object().unwrap();
        obj.set("n", 2);
        obj.set("n", 3);

        assert_eq!(
            *seen.borrow(),
            vec![
                (ReactiveValue::from(2), ReactiveValue::from(1)),
                (ReactiveValue::from(3), ReactiveValue::from(2)),
            ]
        );
        assert_eq!(watcher.value(), ReactiveValue::from(3));
    }

    #[test]
    fn manual_run_fires_callback_even_without_change() {
        let state = ReactiveValue::from(json!({"n": 1}));
        let (calls, callback) = counter();
        let watcher = Watcher::new(&state, "n", callback).unwrap();

        watcher.run();
        watcher.update();

        assert_eq!(calls.get(), 2);
        assert_eq!(watcher.run_count(), 3);
    }

    #[test]
    fn get_does_not_store_or_notify() {
        let state = ReactiveValue::from(json!({"n": 1}));
        let (calls, callback) = counter();
        let watcher = Watcher::new(&state, "n", callback).unwrap();

        assert_eq!(watcher.get(), ReactiveValue::from(1));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn dispose_unsubscribes_everywhere() {
        let state = ReactiveValue::from(json!({"a": 1, "b": 2}));
        let obj = state.as_object().unwrap().clone();
        let (calls, callback) = counter();

        let watcher = watch_fn(
            &state,
            |ctx| {
                ctx.property("a");
                ctx.property("b")
            },
            callback,
        );

        let dep_a = obj.dependency("a").unwrap();
        assert_eq!(dep_a.subscriber_count(), 1);

        watcher.dispose();
        assert!(watcher.is_disposed());
        assert_eq!(watcher.dependency_count(), 0);
        assert_eq!(dep_a.subscriber_count(), 0);
        assert_eq!(obj.dependency("b").unwrap().subscriber_count(), 0);

        obj.set("a", 10);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn dropping_handle_stops_notifications() {
        let state = ReactiveValue::from(json!({"a": 1}));
        let obj = state.as_object().unwrap().clone();
        let (calls, callback) = counter();

        let watcher = Watcher::new(&state, "a", callback).unwrap();
        drop(watcher);

        obj.set("a", 2);
        assert_eq!(calls.get(), 0);
        assert_eq!(obj.dependency("a").unwrap().subscriber_count(), 0);
    }

    #[test]
    fn stale_dependencies_keep_notifying() {
        let state = ReactiveValue::from(json!({"flag": true, "a": 1, "b": 2}));
        let obj = state.as_object().unwrap().clone();
        let (calls, callback) = counter();

        let watcher = watch_fn(
            &state,
            |ctx| {
                if ctx.property("flag").is_truthy() {
                    ctx.property("a")
                } else {
                    ctx.property("b")
                }
            },
            callback,
        );
        assert_eq!(watcher.dependency_count(), 2);

        obj.set("flag", false);
        assert_eq!(watcher.dependency_count(), 3);
        assert_eq!(calls.get(), 1);

        // `a` is no longer read, but the subscription remains.
        obj.set("a", 100);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn callback_reads_context_through_captured_handle() {
        let state = ReactiveValue::from(json!({"a": 1, "b": 10}));
        let obj = state.as_object().unwrap().clone();
        let sums = Rc::new(RefCell::new(Vec::new()));

        let context = state.clone();
        let sink = sums.clone();
        let watcher = Watcher::new(&state, "a", move |new, _| {
            let b = context.property("b").as_f64().unwrap_or(0.0);
            sink.borrow_mut().push(new.as_f64().unwrap_or(0.0) + b);
        })
        .unwrap();

        assert!(watcher.context().as_object().unwrap().ptr_eq(&obj));

        obj.set("a", 2);
        assert_eq!(*sums.borrow(), vec![12.0]);
        // Reads from the callback run outside the evaluation and do not subscribe.
        assert_eq!(watcher.dependency_count(), 1);
    }
}
