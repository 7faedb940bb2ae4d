//! The dynamic value model.
//!
//! Deferred values materialize into [`Value`], a small sum type covering the
//! shapes a resource provider can produce: scalars, arrays, and string-keyed
//! records. One extra variant, [`Value::Unknown`], is the sentinel for a
//! position whose contents will only be determined in a later execution
//! phase. A value that transitively contains the sentinel is, as a whole,
//! not yet known.
//!
//! The model intentionally has a single bottom value: [`Value::Null`] stands
//! in for both "null" and "absent", the same collapse `serde_json::Value`
//! makes.

use std::collections::BTreeMap;

use serde_json::Number;

/// A materialized (or partially materialized) dynamic value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A position whose contents are not determined in the current phase.
    Unknown,
    /// The absent value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number, with JSON semantics.
    Number(Number),
    /// A string.
    String(String),
    /// An ordered sequence of values.
    Array(Vec<Value>),
    /// A string-keyed record with deterministic key order.
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Builds an array value from anything yielding values.
    pub fn array(items: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    /// Builds a record value from key/value pairs.
    pub fn object<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns `true` if this value is the unknown sentinel itself.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    /// Returns `true` if the unknown sentinel appears anywhere in this
    /// value's transitive structure.
    #[must_use]
    pub fn contains_unknown(&self) -> bool {
        match self {
            Value::Unknown => true,
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => false,
            Value::Array(items) => items.iter().any(Value::contains_unknown),
            Value::Object(entries) => entries.values().any(Value::contains_unknown),
        }
    }

    /// Returns a short name for this value's shape, for error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Unknown => "unknown",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Returns the string slice if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean if this is a boolean value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the number as an `i64` if it is representable as one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Returns the array items if this is an array value.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the record entries if this is a record value.
    #[must_use]
    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// Coerces this value to the string form used by string-assembling
    /// combinators.
    ///
    /// Strings render verbatim, numbers and booleans in their canonical
    /// display form, `Null` as `"null"`, and composites as their JSON
    /// encoding. The unknown sentinel renders as an opaque placeholder; it
    /// never reaches user-facing strings because a value containing it is
    /// not known.
    #[must_use]
    pub fn coerce_string(&self) -> String {
        match self {
            Value::Unknown => "<unknown>".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::Array(_) | Value::Object(_) => self
                .to_json()
                .map(|json| json.to_string())
                .unwrap_or_else(|| "<unknown>".to_string()),
        }
    }

    /// Converts this value to its JSON image.
    ///
    /// Returns `None` if the unknown sentinel appears anywhere in the
    /// structure; an unknown value has no JSON image.
    #[must_use]
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Value::Unknown => None,
            Value::Null => Some(serde_json::Value::Null),
            Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
            Value::Number(n) => Some(serde_json::Value::Number(n.clone())),
            Value::String(s) => Some(serde_json::Value::String(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(Value::to_json)
                .collect::<Option<Vec<_>>>()
                .map(serde_json::Value::Array),
            Value::Object(entries) => entries
                .iter()
                .map(|(k, v)| v.to_json().map(|j| (k.clone(), j)))
                .collect::<Option<serde_json::Map<_, _>>>()
                .map(serde_json::Value::Object),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(Number::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(Number::from(value))
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Number(Number::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        // Non-finite numbers have no JSON image; they collapse to Null the
        // way JSON encoding collapses them.
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::Object(entries)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
