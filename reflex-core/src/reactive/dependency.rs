//! Dependencies
//!
//! A Dependency is the registry of watchers interested in one reactive
//! property (or one observed array). Reading the property registers the
//! evaluating watcher; writing it notifies every registered watcher.
//!
//! Dependencies only hold weak references to watchers. A watcher whose handle
//! has been dropped is skipped and pruned on the next notification.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use super::context::ReactiveContext;
use super::watcher::{Watcher, WatcherId, WatcherInner};

/// Counter for generating unique dependency IDs. Starts at 1.
static DEP_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a dependency.
///
/// IDs are process-unique and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepId(u64);

impl DepId {
    fn next() -> Self {
        Self(DEP_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

pub(crate) struct DepInner {
    id: DepId,
    /// Subscribers in subscription order.
    subs: RefCell<Vec<Weak<WatcherInner>>>,
}

/// Registry of watchers interested in one reactive location.
///
/// Cloning a `Dependency` yields another handle to the same registry.
#[derive(Clone)]
pub struct Dependency {
    inner: Rc<DepInner>,
}

impl Dependency {
    /// Create a dependency with a fresh ID.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DepInner {
                id: DepId::next(),
                subs: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> DepId {
        self.inner.id
    }

    /// Record interest of the active watcher, if any.
    ///
    /// De-duplication happens in the watcher, see [`Watcher::add_dep`].
    pub fn depend(&self) {
        ReactiveContext::track(self);
    }

    /// Append `watcher` to the subscriber list unconditionally.
    pub fn register(&self, watcher: &Watcher) {
        self.register_inner(watcher.inner());
    }

    pub(crate) fn register_inner(&self, watcher: &Rc<WatcherInner>) {
        trace!(dep = self.inner.id.0, watcher = watcher.id().raw(), "register");
        self.inner.subs.borrow_mut().push(Rc::downgrade(watcher));
    }

    /// Remove every subscription held by the watcher with `id`.
    pub(crate) fn remove(&self, id: WatcherId) {
        self.inner
            .subs
            .borrow_mut()
            .retain(|sub| sub.upgrade().is_some_and(|w| w.id() != id));
    }

    /// Run `update` on every live subscriber, in subscription order.
    ///
    /// Subscribers added while notifying are not visited in this pass. A
    /// panicking subscriber aborts the pass and unwinds to the writer.
    pub fn notify(&self) {
        let snapshot: Vec<Weak<WatcherInner>> = {
            let mut subs = self.inner.subs.borrow_mut();
            subs.retain(|sub| sub.strong_count() > 0);
            subs.clone()
        };

        trace!(dep = self.inner.id.0, subscribers = snapshot.len(), "notify");

        for sub in snapshot {
            if let Some(watcher) = sub.upgrade() {
                watcher.update();
            }
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subs
            .borrow()
            .iter()
            .filter(|sub| sub.strong_count() > 0)
            .count()
    }

    pub(crate) fn downgrade(&self) -> Weak<DepInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn from_inner(inner: Rc<DepInner>) -> Self {
        Self { inner }
    }
}

impl Default for Dependency {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("id", &self.inner.id)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{ReactiveValue, WatchTarget};
    use std::cell::Cell;

    /// Watcher that depends on nothing and counts its callback invocations.
    fn counting_watcher() -> (Watcher, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let watcher = Watcher::new(
            ReactiveValue::Null,
            WatchTarget::getter(|_| ReactiveValue::Null),
            move |_, _| counter.set(counter.get() + 1),
        )
        .unwrap();
        (watcher, calls)
    }

    #[test]
    fn dependency_ids_are_unique_and_increasing() {
        let d1 = Dependency::new();
        let d2 = Dependency::new();
        let d3 = Dependency::new();

        assert!(d1.id().raw() >= 1);
        assert!(d1.id() < d2.id());
        assert!(d2.id() < d3.id());
    }

    #[test]
    fn register_does_not_deduplicate() {
        let dep = Dependency::new();
        let (watcher, calls) = counting_watcher();

        dep.register(&watcher);
        dep.register(&watcher);
        assert_eq!(dep.subscriber_count(), 2);

        dep.notify();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn notify_runs_subscribers_in_order() {
        let dep = Dependency::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let watchers: Vec<Watcher> = (0..3)
            .map(|i| {
                let order = order.clone();
                Watcher::new(
                    ReactiveValue::Null,
                    WatchTarget::getter(|_| ReactiveValue::Null),
                    move |_, _| order.borrow_mut().push(i),
                )
                .unwrap()
            })
            .collect();

        for watcher in &watchers {
            dep.register(watcher);
        }
        dep.notify();

        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn dropped_watchers_are_pruned() {
        let dep = Dependency::new();
        let (watcher, calls) = counting_watcher();

        dep.register(&watcher);
        drop(watcher);

        assert_eq!(dep.subscriber_count(), 0);
        dep.notify();
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn depend_outside_evaluation_is_a_no_op() {
        let dep = Dependency::new();
        dep.depend();
        assert_eq!(dep.subscriber_count(), 0);
    }
}
