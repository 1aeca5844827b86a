//! Document model for nestdb
//!
//! The whole database is one schemaless value tree: a root object whose
//! fields hold arbitrarily nested [`Value`]s. The serde representation is
//! untagged, so values serialize to and from plain JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A JSON object: field name to value.
///
/// Field names are unique within one object; insertion order carries no
/// meaning.
pub type Object = BTreeMap<String, Value>;

/// A schemaless JSON-like value.
///
/// The integer variants are tried before `Float` during deserialization so
/// integer-valued JSON numbers keep their exact representation across a
/// round trip; `Uint` catches integers above `i64::MAX`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer number
    Int(i64),
    /// Integer number beyond the `i64` range
    Uint(u64),
    /// Floating-point number
    Float(f64),
    /// String value
    String(String),
    /// Array of values
    Array(Vec<Value>),
    /// Object with string keys
    Object(Object),
}

impl Value {
    /// An empty object value.
    pub fn empty_object() -> Self {
        Value::Object(Object::new())
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if value is an object
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Get as string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Uint(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// Get as object reference
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Get as mutable object reference
    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::Uint(u)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(arr: Vec<Value>) -> Self {
        Value::Array(arr)
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(json: &str) -> Value {
        let value: Value = serde_json::from_str(json).unwrap();
        let encoded = serde_json::to_string(&value).unwrap();
        assert_eq!(encoded, json);
        value
    }

    #[test]
    fn test_scalar_round_trips() {
        assert_eq!(round_trip("null"), Value::Null);
        assert_eq!(round_trip("true"), Value::Bool(true));
        assert_eq!(round_trip("42"), Value::Int(42));
        assert_eq!(round_trip("1.5"), Value::Float(1.5));
        assert_eq!(round_trip("\"hello\""), Value::String("hello".into()));
    }

    #[test]
    fn test_integers_stay_integers() {
        // 5 must not come back as 5.0
        let value: Value = serde_json::from_str("5").unwrap();
        assert_eq!(value, Value::Int(5));
        assert_eq!(serde_json::to_string(&value).unwrap(), "5");
    }

    #[test]
    fn test_big_integers_stay_exact() {
        // above i64::MAX the u64 variant catches the number losslessly
        assert_eq!(
            round_trip("18446744073709551615"),
            Value::Uint(u64::MAX)
        );
        assert_eq!(round_trip("9223372036854775807"), Value::Int(i64::MAX));
    }

    #[test]
    fn test_nested_round_trip() {
        let value = round_trip(r#"{"a":{"b":[1,2,{"c":null}]},"d":"x"}"#);
        let a = value.as_object().unwrap().get("a").unwrap();
        assert!(a.is_object());
    }

    #[test]
    fn test_object_accessors() {
        let mut value = Value::empty_object();
        value
            .as_object_mut()
            .unwrap()
            .insert("k".to_string(), Value::from(7i64));
        assert_eq!(
            value.as_object().unwrap().get("k").and_then(Value::as_i64),
            Some(7)
        );
        assert!(Value::Null.as_object().is_none());
    }
}
