//! Key addressing and path resolution
//!
//! A [`Key`] names either a top-level field or an ordered path of field
//! names descending through nested objects. The resolver functions here are
//! pure tree operations over a root [`Object`]; the caller (the store) owns
//! all locking.

use crate::document::{Object, Value};
use serde::{Deserialize, Serialize};

/// Address of a field inside the document.
///
/// On the wire this is either a JSON string (`"name"`) or an array of
/// strings (`["a","b","c"]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    /// A single top-level field name.
    Field(String),
    /// An ordered path of field names from the root.
    Path(Vec<String>),
}

impl Key {
    /// A path of zero segments addresses nothing; request validation
    /// rejects it before dispatch.
    pub fn is_empty(&self) -> bool {
        match self {
            Key::Field(_) => false,
            Key::Path(segments) => segments.is_empty(),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Field(name.to_string())
    }
}

impl<const N: usize> From<[&str; N]> for Key {
    fn from(segments: [&str; N]) -> Self {
        Key::Path(segments.iter().map(|s| s.to_string()).collect())
    }
}

/// Resolve `key` for reading.
///
/// Walking off the path (a missing name, or a non-object value where more
/// path remains) yields `None`; callers cannot distinguish wrong shape from
/// absence.
pub fn get<'a>(root: &'a Object, key: &Key) -> Option<&'a Value> {
    match key {
        Key::Field(name) => root.get(name),
        Key::Path(segments) => {
            let (first, rest) = segments.split_first()?;
            let mut current = root.get(first)?;
            for segment in rest {
                current = current.as_object()?.get(segment)?;
            }
            Some(current)
        }
    }
}

/// Resolve `key` for writing and set the final field to `value`.
///
/// Missing or non-object intermediates are replaced with fresh empty
/// objects, so a scalar sitting mid-path is silently overwritten and the
/// operation never fails for a non-empty key.
pub fn set(root: &mut Object, key: &Key, value: Value) {
    match key {
        Key::Field(name) => {
            root.insert(name.clone(), value);
        }
        Key::Path(segments) => {
            let Some((last, parents)) = segments.split_last() else {
                return;
            };
            let mut current = root;
            for segment in parents {
                let slot = current
                    .entry(segment.clone())
                    .or_insert_with(Value::empty_object);
                if !slot.is_object() {
                    *slot = Value::empty_object();
                }
                current = match slot {
                    Value::Object(obj) => obj,
                    _ => unreachable!("slot was just normalized to an object"),
                };
            }
            current.insert(last.clone(), value);
        }
    }
}

/// Remove the field addressed by `key`, walking intermediates exactly as
/// [`get`] does. Returns whether a field was actually removed.
pub fn remove(root: &mut Object, key: &Key) -> bool {
    match key {
        Key::Field(name) => root.remove(name).is_some(),
        Key::Path(segments) => {
            let Some((last, parents)) = segments.split_last() else {
                return false;
            };
            let mut current = root;
            for segment in parents {
                current = match current.get_mut(segment) {
                    Some(Value::Object(obj)) => obj,
                    _ => return false,
                };
            }
            current.remove(last).is_some()
        }
    }
}
