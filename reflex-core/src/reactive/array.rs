//! Observed Arrays
//!
//! An `ObservedArray` is a shared element vector with a single
//! [`Dependency`] covering the array as a whole. Elements are always
//! reactive values, so anything inserted is deep-observed.
//!
//! Mutation notification is opt-in: after [`wrap_array_methods`], every
//! mutating operation (`push`, `pop`, `shift`, `unshift`, `splice`, `sort`,
//! `reverse`, and `set`, which is a one-element splice) notifies the array's
//! dependency once after the mutation. Without it the same operations mutate
//! silently. Return values are the same either way.
//!
//! Tracked reads (`get`, `len`, `to_vec`, `to_json`) subscribe the active
//! watcher to the array's dependency.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use serde::ser::{Serialize, SerializeSeq, Serializer};
use tracing::trace;

use super::context::ReactiveContext;
use super::dependency::Dependency;
use super::value::ReactiveValue;
use crate::error::{Error, Result};

struct ArrayInner {
    items: RefCell<Vec<ReactiveValue>>,
    dep: Dependency,
    /// Set by `wrap_array_methods`.
    intercepted: Cell<bool>,
}

/// Shared handle to an array of reactive values.
#[derive(Clone)]
pub struct ObservedArray {
    inner: Rc<ArrayInner>,
}

/// Opt `array` into mutation notification.
pub fn wrap_array_methods(array: &ObservedArray) {
    array.intercept();
}

impl ObservedArray {
    /// Create an empty array.
    pub fn new() -> Self {
        Self::from_values(Vec::new())
    }

    /// Create an array from already-reactive values.
    pub fn from_values(items: Vec<ReactiveValue>) -> Self {
        Self {
            inner: Rc::new(ArrayInner {
                items: RefCell::new(items),
                dep: Dependency::new(),
                intercepted: Cell::new(false),
            }),
        }
    }

    /// Route mutating operations through the array's dependency.
    pub fn intercept(&self) {
        self.inner.intercepted.set(true);
    }

    pub fn is_intercepted(&self) -> bool {
        self.inner.intercepted.get()
    }

    /// The dependency notified on mutation.
    pub fn dependency(&self) -> &Dependency {
        &self.inner.dep
    }

    /// Whether both handles refer to the same array.
    pub fn ptr_eq(&self, other: &ObservedArray) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn mutated(&self, method: &'static str) {
        if self.inner.intercepted.get() {
            trace!(method, dep = self.inner.dep.id().raw(), "array mutated");
            self.inner.dep.notify();
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Element at `index`, or `Undefined` when out of range.
    pub fn get(&self, index: usize) -> ReactiveValue {
        self.inner.dep.depend();
        self.get_untracked(index)
    }

    pub fn get_untracked(&self, index: usize) -> ReactiveValue {
        self.inner
            .items
            .borrow()
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.dep.depend();
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone of the current elements.
    pub fn to_vec(&self) -> Vec<ReactiveValue> {
        self.inner.dep.depend();
        self.inner.items.borrow().clone()
    }

    /// Plain JSON snapshot. `Undefined` elements become null.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.to_vec().iter().map(ReactiveValue::to_json).collect())
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Append `value`. Returns the new length.
    pub fn push(&self, value: impl Into<ReactiveValue>) -> usize {
        let value = value.into();
        let len = {
            let mut items = self.inner.items.borrow_mut();
            items.push(value);
            items.len()
        };
        self.mutated("push");
        len
    }

    /// Remove the last element.
    pub fn pop(&self) -> Option<ReactiveValue> {
        let popped = self.inner.items.borrow_mut().pop();
        self.mutated("pop");
        popped
    }

    /// Remove the first element.
    pub fn shift(&self) -> Option<ReactiveValue> {
        let shifted = {
            let mut items = self.inner.items.borrow_mut();
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        };
        self.mutated("shift");
        shifted
    }

    /// Insert `value` at the front. Returns the new length.
    pub fn unshift(&self, value: impl Into<ReactiveValue>) -> usize {
        let value = value.into();
        let len = {
            let mut items = self.inner.items.borrow_mut();
            items.insert(0, value);
            items.len()
        };
        self.mutated("unshift");
        len
    }

    /// Remove `delete_count` elements from `start` and insert `items` there.
    ///
    /// A negative `start` counts back from the end; both bounds are clamped
    /// to the array. Returns the removed elements.
    pub fn splice<I>(&self, start: isize, delete_count: usize, items: I) -> Vec<ReactiveValue>
    where
        I: IntoIterator,
        I::Item: Into<ReactiveValue>,
    {
        let inserted: Vec<ReactiveValue> = items.into_iter().map(Into::into).collect();
        let removed = {
            let mut current = self.inner.items.borrow_mut();
            let len = current.len();
            let start = if start < 0 {
                len.saturating_sub(start.unsigned_abs())
            } else {
                (start as usize).min(len)
            };
            let end = start + delete_count.min(len - start);
            let removed: Vec<ReactiveValue> = current.splice(start..end, inserted).collect();
            removed
        };
        self.mutated("splice");
        removed
    }

    /// Replace the element at `index`, returning the previous one.
    pub fn set(&self, index: usize, value: impl Into<ReactiveValue>) -> Result<ReactiveValue> {
        let len = self.inner.items.borrow().len();
        if index >= len {
            return Err(Error::index_out_of_bounds(index, len));
        }

        let value: ReactiveValue = value.into();
        let mut removed = self.splice(index as isize, 1, [value]);
        Ok(removed.pop().unwrap_or_default())
    }

    /// Sort with the default ordering: `Undefined` last, everything else by
    /// comparing string conversions. The sort is stable.
    pub fn sort(&self) -> ObservedArray {
        self.sort_by(default_order)
    }

    /// Sort with a comparator. The sort is stable.
    ///
    /// The array keeps its previous order until the sort completes, so a
    /// panicking `compare` leaves it unchanged.
    pub fn sort_by<F>(&self, mut compare: F) -> ObservedArray
    where
        F: FnMut(&ReactiveValue, &ReactiveValue) -> Ordering,
    {
        let mut items = self.inner.items.borrow().clone();
        items.sort_by(&mut compare);
        *self.inner.items.borrow_mut() = items;
        self.mutated("sort");
        self.clone()
    }

    /// Reverse in place.
    pub fn reverse(&self) -> ObservedArray {
        self.inner.items.borrow_mut().reverse();
        self.mutated("reverse");
        self.clone()
    }
}

fn default_order(a: &ReactiveValue, b: &ReactiveValue) -> Ordering {
    match (a.is_undefined(), b.is_undefined()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let (a, b) = (a.to_string(), b.to_string());
            a.encode_utf16().cmp(b.encode_utf16())
        }
    }
}

impl Default for ObservedArray {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Into<ReactiveValue>> FromIterator<V> for ObservedArray {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::from_values(iter.into_iter().map(Into::into).collect())
    }
}

impl Serialize for ObservedArray {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let items = self.to_vec();
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in &items {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

impl fmt::Debug for ObservedArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items = ReactiveContext::untracked(|| self.to_vec());
        f.debug_list().entries(items.iter()).finish()
    }
}
