//! Reactive Context
//!
//! The reactive context is the active-watcher register: it records which
//! watcher is currently evaluating, so that property reads can be attributed
//! to it.
//!
//! # Implementation
//!
//! We use a thread-local stack. Evaluating a watcher pushes it onto the
//! stack; the returned guard pops it when dropped, including during unwinding
//! from a panicking getter. Nested evaluations (a getter that constructs or
//! re-runs another watcher) therefore restore the outer watcher afterwards.
//!
//! An untracked frame pushes an empty entry, hiding any outer watcher.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use super::dependency::Dependency;
use super::watcher::{WatcherId, WatcherInner};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the reactive context stack.
struct ContextEntry {
    /// The evaluating watcher, or `None` for an untracked frame.
    watcher: Option<Rc<WatcherInner>>,
}

/// Guard that pops the context when dropped.
///
/// The guard is neither `Send` nor `Sync`: it must be dropped on the thread
/// whose stack it pushed onto.
pub struct ReactiveContext {
    watcher_id: Option<WatcherId>,
    _not_send: PhantomData<*const ()>,
}

impl ReactiveContext {
    /// Enter a tracking context for the given watcher.
    pub(crate) fn enter(watcher: Rc<WatcherInner>) -> Self {
        let watcher_id = Some(watcher.id());
        Self::push(Some(watcher), watcher_id)
    }

    fn enter_untracked() -> Self {
        Self::push(None, None)
    }

    fn push(watcher: Option<Rc<WatcherInner>>, watcher_id: Option<WatcherId>) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry { watcher });
        });

        Self {
            watcher_id,
            _not_send: PhantomData,
        }
    }

    /// Run `f` without collecting dependencies for any outer watcher.
    pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
        let _ctx = Self::enter_untracked();
        f()
    }

    /// Check if a watcher is currently collecting dependencies.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .is_some_and(|entry| entry.watcher.is_some())
        })
    }

    /// Get the ID of the watcher currently collecting dependencies, if any.
    pub fn current_watcher() -> Option<WatcherId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|entry| entry.watcher.as_ref().map(|w| w.id()))
        })
    }

    /// Number of frames on this thread's stack.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }

    /// Attribute a read of `dep` to the active watcher, if there is one.
    pub(crate) fn track(dep: &Dependency) {
        // Clone out of the stack first: `add_dep` may re-enter the register.
        let current = CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|entry| entry.watcher.clone())
        });

        if let Some(watcher) = current {
            watcher.add_dep(dep);
        }
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = CONTEXT_STACK.with(|stack| stack.borrow_mut().pop());

        if let Some(entry) = popped {
            debug_assert_eq!(
                entry.watcher.as_ref().map(|w| w.id()),
                self.watcher_id,
                "ReactiveContext mismatch: expected {:?}",
                self.watcher_id,
            );
        }
    }
}
