//! Reactive Values
//!
//! `ReactiveValue` is the tagged union every piece of observed state is made
//! of: primitives are stored inline, while objects and arrays are shared
//! handles whose contents are reactive.
//!
//! # Equality
//!
//! Change detection uses strict inequality:
//!
//! - Primitives compare by value. Numbers use IEEE comparison, so `NaN` is
//!   never equal to itself and writing `NaN` over `NaN` counts as a change.
//! - Objects and arrays compare by handle identity. Two structurally equal
//!   objects are still different values.
//!
//! `PartialEq` follows the same rules.
//!
//! # Conversion
//!
//! Converting plain data (`serde_json::Value`) into a `ReactiveValue` is deep
//! observation: every nested object becomes an [`ObservedObject`] and every
//! nested array an [`ObservedArray`].

use std::fmt;

use serde::ser::{Serialize, Serializer};

use super::array::ObservedArray;
use super::context::ReactiveContext;
use super::object::ObservedObject;
use super::observe::observe;

/// A value held by reactive state.
#[derive(Clone, Default)]
pub enum ReactiveValue {
    /// Absent value: unknown key, out-of-range index or short-circuited path.
    #[default]
    Undefined,
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Number (always `f64`).
    Number(f64),
    /// String.
    String(String),
    /// Shared handle to an observed object.
    Object(ObservedObject),
    /// Shared handle to an observed array.
    Array(ObservedArray),
}

impl ReactiveValue {
    /// Strict equality: by value for primitives, by identity for containers.
    pub fn strictly_equals(&self, other: &ReactiveValue) -> bool {
        match (self, other) {
            (ReactiveValue::Undefined, ReactiveValue::Undefined) => true,
            (ReactiveValue::Null, ReactiveValue::Null) => true,
            (ReactiveValue::Bool(a), ReactiveValue::Bool(b)) => a == b,
            (ReactiveValue::Number(a), ReactiveValue::Number(b)) => a == b,
            (ReactiveValue::String(a), ReactiveValue::String(b)) => a == b,
            (ReactiveValue::Object(a), ReactiveValue::Object(b)) => a.ptr_eq(b),
            (ReactiveValue::Array(a), ReactiveValue::Array(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Truthiness: `undefined`, `null`, `false`, `0`, `NaN` and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            ReactiveValue::Undefined | ReactiveValue::Null => false,
            ReactiveValue::Bool(b) => *b,
            ReactiveValue::Number(n) => *n != 0.0 && !n.is_nan(),
            ReactiveValue::String(s) => !s.is_empty(),
            ReactiveValue::Object(_) | ReactiveValue::Array(_) => true,
        }
    }

    /// Read a named property, tracking the read.
    ///
    /// Objects look the key up. Arrays accept a decimal index or `length`.
    /// Every other value has no properties and yields `Undefined`.
    pub fn property(&self, key: &str) -> ReactiveValue {
        match self {
            ReactiveValue::Object(object) => object.get(key),
            ReactiveValue::Array(array) => {
                if key == "length" {
                    ReactiveValue::Number(array.len() as f64)
                } else {
                    // Only canonical indices: "01" or "+1" name no element.
                    match key.parse::<usize>() {
                        Ok(index) if index.to_string() == key => array.get(index),
                        _ => ReactiveValue::Undefined,
                    }
                }
            }
            _ => ReactiveValue::Undefined,
        }
    }

    /// Name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            ReactiveValue::Undefined => "undefined",
            ReactiveValue::Null => "null",
            ReactiveValue::Bool(_) => "boolean",
            ReactiveValue::Number(_) => "number",
            ReactiveValue::String(_) => "string",
            ReactiveValue::Object(_) => "object",
            ReactiveValue::Array(_) => "array",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, ReactiveValue::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ReactiveValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ReactiveValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ReactiveValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ReactiveValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObservedObject> {
        match self {
            ReactiveValue::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ObservedArray> {
        match self {
            ReactiveValue::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Snapshot into plain JSON, reading every property along the way.
    ///
    /// Inside a watcher evaluation this subscribes to the whole graph.
    /// `Undefined` object members are omitted; non-finite numbers become null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ReactiveValue::Undefined | ReactiveValue::Null => serde_json::Value::Null,
            ReactiveValue::Bool(b) => serde_json::Value::Bool(*b),
            ReactiveValue::Number(n) => number_to_json(*n),
            ReactiveValue::String(s) => serde_json::Value::String(s.clone()),
            ReactiveValue::Object(object) => object.to_json(),
            ReactiveValue::Array(array) => array.to_json(),
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Format a number the way script string conversion does: shortest
/// round-trip digits, with exponent notation outside `[1e-6, 1e21)`.
fn format_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n.is_infinite() {
        f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n == 0.0 {
        f.write_str("0")
    } else if (1e-6..1e21).contains(&n.abs()) {
        write!(f, "{}", n)
    } else {
        let exponential = format!("{:e}", n);
        match exponential.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => write!(f, "{}e+{}", mantissa, exp),
            _ => f.write_str(&exponential),
        }
    }
}

/// String conversion: `undefined`, `null`, `true`, `42`, `a,b`, `[object Object]`.
///
/// Array elements are read untracked.
impl fmt::Display for ReactiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReactiveValue::Undefined => f.write_str("undefined"),
            ReactiveValue::Null => f.write_str("null"),
            ReactiveValue::Bool(b) => write!(f, "{}", b),
            ReactiveValue::Number(n) => format_number(*n, f),
            ReactiveValue::String(s) => f.write_str(s),
            ReactiveValue::Object(_) => f.write_str("[object Object]"),
            ReactiveValue::Array(array) => {
                let items = ReactiveContext::untracked(|| array.to_vec());
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    // Nullish elements join as empty strings.
                    if !matches!(item, ReactiveValue::Undefined | ReactiveValue::Null) {
                        write!(f, "{}", item)?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for ReactiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReactiveValue::Undefined => f.write_str("Undefined"),
            ReactiveValue::Null => f.write_str("Null"),
            ReactiveValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            ReactiveValue::Number(n) => f.debug_tuple("Number").field(n).finish(),
            ReactiveValue::String(s) => f.debug_tuple("String").field(s).finish(),
            ReactiveValue::Object(object) => fmt::Debug::fmt(object, f),
            ReactiveValue::Array(array) => fmt::Debug::fmt(array, f),
        }
    }
}

impl PartialEq for ReactiveValue {
    fn eq(&self, other: &Self) -> bool {
        self.strictly_equals(other)
    }
}

impl Serialize for ReactiveValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ReactiveValue::Undefined | ReactiveValue::Null => serializer.serialize_unit(),
            ReactiveValue::Bool(b) => serializer.serialize_bool(*b),
            ReactiveValue::Number(n) => number_to_json(*n).serialize(serializer),
            ReactiveValue::String(s) => serializer.serialize_str(s),
            ReactiveValue::Object(object) => object.serialize(serializer),
            ReactiveValue::Array(array) => array.serialize(serializer),
        }
    }
}

// ----------------------------------------------------------------------------
// Conversions
// ----------------------------------------------------------------------------

impl From<serde_json::Value> for ReactiveValue {
    fn from(value: serde_json::Value) -> Self {
        observe(value)
    }
}

impl From<bool> for ReactiveValue {
    fn from(b: bool) -> Self {
        ReactiveValue::Bool(b)
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ReactiveValue {
                fn from(n: $ty) -> Self {
                    ReactiveValue::Number(n as f64)
                }
            }
        )*
    };
}

impl_from_number!(f64, f32, i32, i64, u32, u64, usize);

impl From<&str> for ReactiveValue {
    fn from(s: &str) -> Self {
        ReactiveValue::String(s.to_owned())
    }
}

impl From<String> for ReactiveValue {
    fn from(s: String) -> Self {
        ReactiveValue::String(s)
    }
}

impl From<ObservedObject> for ReactiveValue {
    fn from(object: ObservedObject) -> Self {
        ReactiveValue::Object(object)
    }
}

impl From<&ObservedObject> for ReactiveValue {
    fn from(object: &ObservedObject) -> Self {
        ReactiveValue::Object(object.clone())
    }
}

impl From<ObservedArray> for ReactiveValue {
    fn from(array: ObservedArray) -> Self {
        ReactiveValue::Array(array)
    }
}

impl From<&ObservedArray> for ReactiveValue {
    fn from(array: &ObservedArray) -> Self {
        ReactiveValue::Array(array.clone())
    }
}

impl From<&ReactiveValue> for ReactiveValue {
    fn from(value: &ReactiveValue) -> Self {
        value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nan_is_not_strictly_equal_to_itself() {
        let nan = ReactiveValue::from(f64::NAN);
        assert!(!nan.strictly_equals(&nan.clone()));
        assert_ne!(nan, ReactiveValue::Number(f64::NAN));
    }

    #[test]
    fn containers_compare_by_identity() {
        let a = ReactiveValue::from(json!({"x": 1}));
        let b = ReactiveValue::from(json!({"x": 1}));

        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn truthiness_follows_script_rules() {
        for falsy in [
            ReactiveValue::Undefined,
            ReactiveValue::Null,
            ReactiveValue::from(false),
            ReactiveValue::from(0),
            ReactiveValue::from(f64::NAN),
            ReactiveValue::from(""),
        ] {
            assert!(!falsy.is_truthy(), "{:?} should be falsy", falsy);
        }

        assert!(ReactiveValue::from(json!({})).is_truthy());
        assert!(ReactiveValue::from(json!([])).is_truthy());
        assert!(ReactiveValue::from("0").is_truthy());
    }

    #[test]
    fn display_matches_string_conversion() {
        assert_eq!(ReactiveValue::from(3).to_string(), "3");
        assert_eq!(ReactiveValue::from(1.5).to_string(), "1.5");
        assert_eq!(ReactiveValue::from(-0.0).to_string(), "0");
        assert_eq!(ReactiveValue::from(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(ReactiveValue::from(json!([1, null, "a"])).to_string(), "1,,a");
        assert_eq!(ReactiveValue::from(json!({"a": 1})).to_string(), "[object Object]");
    }

    #[test]
    fn display_switches_to_exponent_outside_decimal_range() {
        assert_eq!(ReactiveValue::from(1e20).to_string(), "100000000000000000000");
        assert_eq!(ReactiveValue::from(1e21).to_string(), "1e+21");
        assert_eq!(ReactiveValue::from(-1.5e22).to_string(), "-1.5e+22");
        assert_eq!(ReactiveValue::from(0.000001).to_string(), "0.000001");
        assert_eq!(ReactiveValue::from(1e-7).to_string(), "1e-7");
        assert_eq!(ReactiveValue::from(2.5e-8).to_string(), "2.5e-8");
    }

    #[test]
    fn non_canonical_index_names_no_element() {
        let value = ReactiveValue::from(json!([10, 20]));

        assert!(value.property("01").is_undefined());
        assert!(value.property("+1").is_undefined());
        assert!(value.property(" 1").is_undefined());
        assert_eq!(value.property("0"), ReactiveValue::from(10));
    }

    #[test]
    fn array_properties_by_index_and_length() {
        let value = ReactiveValue::from(json!([10, 20]));

        assert_eq!(value.property("1"), ReactiveValue::from(20));
        assert_eq!(value.property("length"), ReactiveValue::from(2));
        assert!(value.property("2").is_undefined());
        assert!(value.property("x").is_undefined());
        assert!(ReactiveValue::from("abc").property("length").is_undefined());
    }

    #[test]
    fn json_snapshot_keeps_shape() {
        let source = json!({"a": {"b": [1, 2.5, "c", true, null]}, "d": 0});
        let value = ReactiveValue::from(source.clone());

        assert_eq!(value.to_json(), source);
        assert_eq!(serde_json::to_value(&value).unwrap(), source);
    }
}
