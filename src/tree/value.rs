//! Typed leaf values for the attribute tree.

use std::collections::BTreeMap;

use serde::Serialize;

/// A value stored in the attribute tree: a string, integer, boolean, or
/// nested mapping. Mappings are ordered so identical trees serialize
/// byte-identically regardless of insertion order.
///
/// The tree itself is type-agnostic storage; each plugin owns the type of
/// each path it provides and no coercion happens between writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Str(String),
    Map(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    /// An empty mapping — "checked, nothing found", as opposed to an
    /// absent path ("not checked").
    pub fn map() -> Self {
        AttributeValue::Map(BTreeMap::new())
    }

    /// The string content, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The integer content, if this is an integer value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The boolean content, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The nested mapping, if this is a map value.
    pub fn as_map(&self) -> Option<&BTreeMap<String, AttributeValue>> {
        match self {
            AttributeValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a direct child by segment name, if this is a map value.
    pub fn get(&self, segment: &str) -> Option<&AttributeValue> {
        self.as_map().and_then(|m| m.get(segment))
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Str(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Str(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        AttributeValue::Int(n)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}
