//! Observed Objects
//!
//! An `ObservedObject` is a shared, insertion-ordered map whose every entry
//! is a reactive property: a value slot paired with its own [`Dependency`].
//!
//! - Reading a property inside a watcher evaluation subscribes the watcher.
//! - Writing a property with a strictly different value stores it and
//!   notifies the property's subscribers synchronously. Values arriving as
//!   plain data are deep-observed on the way in.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::trace;

use super::context::ReactiveContext;
use super::dependency::Dependency;
use super::value::ReactiveValue;

/// A value slot bound to a dependency.
struct ReactiveProperty {
    slot: RefCell<ReactiveValue>,
    dep: Dependency,
}

impl ReactiveProperty {
    fn new(initial: ReactiveValue) -> Self {
        Self {
            slot: RefCell::new(initial),
            dep: Dependency::new(),
        }
    }

    fn get(&self) -> ReactiveValue {
        self.dep.depend();
        self.slot.borrow().clone()
    }

    fn get_untracked(&self) -> ReactiveValue {
        self.slot.borrow().clone()
    }

    /// Returns whether the value changed.
    fn set(&self, value: ReactiveValue) -> bool {
        if self.slot.borrow().strictly_equals(&value) {
            return false;
        }

        // The slot must not stay borrowed: subscribers read it back.
        *self.slot.borrow_mut() = value;
        self.dep.notify();
        true
    }
}

/// Shared handle to an object whose properties are reactive.
///
/// Cloning the handle does not copy the object.
#[derive(Clone, Default)]
pub struct ObservedObject {
    props: Rc<RefCell<IndexMap<String, Rc<ReactiveProperty>>>>,
}

impl ObservedObject {
    /// Create an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind every member of a plain JSON object, observing nested values.
    pub fn from_map(map: serde_json::Map<String, serde_json::Value>) -> Self {
        map.into_iter().collect()
    }

    fn property(&self, key: &str) -> Option<Rc<ReactiveProperty>> {
        self.props.borrow().get(key).cloned()
    }

    /// Read `key`, subscribing the active watcher to it.
    ///
    /// Unknown keys read as `Undefined` and are not tracked.
    pub fn get(&self, key: &str) -> ReactiveValue {
        match self.property(key) {
            Some(prop) => prop.get(),
            None => ReactiveValue::Undefined,
        }
    }

    /// Read `key` without dependency collection.
    pub fn get_untracked(&self, key: &str) -> ReactiveValue {
        match self.property(key) {
            Some(prop) => prop.get_untracked(),
            None => ReactiveValue::Undefined,
        }
    }

    /// Write `key`.
    ///
    /// Notifies subscribers only if the new value is strictly different from
    /// the current one. Writing an unknown key defines a new reactive
    /// property without notifying anyone.
    pub fn set(&self, key: &str, value: impl Into<ReactiveValue>) {
        let value = value.into();
        match self.property(key) {
            Some(prop) => {
                if prop.set(value) {
                    trace!(key, "property changed");
                }
            }
            None => self.define(key, value),
        }
    }

    /// Bind `key` as a reactive property holding `value`.
    ///
    /// An existing binding for `key` is replaced along with its dependency;
    /// watchers subscribed to the old binding are no longer notified by it.
    pub fn define(&self, key: impl Into<String>, value: impl Into<ReactiveValue>) {
        let key = key.into();
        trace!(key = key.as_str(), "define reactive property");
        let prop = Rc::new(ReactiveProperty::new(value.into()));
        self.props.borrow_mut().insert(key, prop);
    }

    /// The dependency guarding `key`, if the key is bound.
    pub fn dependency(&self, key: &str) -> Option<Dependency> {
        self.property(key).map(|prop| prop.dep.clone())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.props.borrow().contains_key(key)
    }

    /// Keys in insertion order. Not tracked.
    pub fn keys(&self) -> Vec<String> {
        self.props.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.props.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.borrow().is_empty()
    }

    /// Whether both handles refer to the same object.
    pub fn ptr_eq(&self, other: &ObservedObject) -> bool {
        Rc::ptr_eq(&self.props, &other.props)
    }

    /// Snapshot every property, reading through the tracked getters.
    pub fn entries(&self) -> Vec<(String, ReactiveValue)> {
        let props: Vec<(String, Rc<ReactiveProperty>)> = self
            .props
            .borrow()
            .iter()
            .map(|(key, prop)| (key.clone(), Rc::clone(prop)))
            .collect();

        props
            .into_iter()
            .map(|(key, prop)| (key, prop.get()))
            .collect()
    }

    /// Plain JSON snapshot. `Undefined` members are omitted.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .entries()
            .into_iter()
            .filter(|(_, value)| !value.is_undefined())
            .map(|(key, value)| (key, value.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}

impl<K, V> FromIterator<(K, V)> for ObservedObject
where
    K: Into<String>,
    V: Into<ReactiveValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let object = ObservedObject::new();
        for (key, value) in iter {
            object.define(key, value);
        }
        object
    }
}

impl Serialize for ObservedObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries: Vec<_> = self
            .entries()
            .into_iter()
            .filter(|(_, value)| !value.is_undefined())
            .collect();

        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in &entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl fmt::Debug for ObservedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = ReactiveContext::untracked(|| self.entries());
        f.debug_map()
            .entries(entries.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}
