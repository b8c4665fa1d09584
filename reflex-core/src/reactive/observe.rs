//! Deep Observation
//!
//! Walks plain data and rebuilds it out of reactive containers: every object
//! becomes an [`ObservedObject`] whose keys are bound as reactive properties,
//! every array an [`ObservedArray`] whose elements are observed in turn.
//!
//! Observation does not opt arrays into mutation notification; see
//! [`wrap_array_methods`](super::wrap_array_methods).
//!
//! Plain data is a tree, so the walk always terminates. Values that are
//! already reactive are never walked again.

use serde_json::Value;

use super::array::ObservedArray;
use super::object::ObservedObject;
use super::value::ReactiveValue;

/// Make `value` reactive, recursively.
pub fn observe(value: Value) -> ReactiveValue {
    match value {
        Value::Null => ReactiveValue::Null,
        Value::Bool(b) => ReactiveValue::Bool(b),
        Value::Number(n) => ReactiveValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        Value::String(s) => ReactiveValue::String(s),
        Value::Array(items) => {
            ReactiveValue::Array(ObservedArray::from_values(items.into_iter().map(observe).collect()))
        }
        Value::Object(map) => ReactiveValue::Object(ObservedObject::from_map(map)),
    }
}
