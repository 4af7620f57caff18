//! Property values.
//!
//! Every property of an artifact or decorator is a [`Value`]: a closed sum
//! type over the kinds the workspace model uses. Typed access goes through
//! [`FromValue`], which never panics on a kind mismatch.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::artifact::ArtifactId;

/// A property value.
///
/// `Reference` stores the id of another live artifact instead of the artifact
/// itself, so snapshots never embed a second copy of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Reference(ArtifactId),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Reference(_) => "reference",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Visit every artifact reference held by this value, including nested ones.
    pub fn for_each_reference(&self, f: &mut impl FnMut(ArtifactId)) {
        match self {
            Self::Reference(id) => f(*id),
            Self::List(items) => items.iter().for_each(|v| v.for_each_reference(f)),
            Self::Map(entries) => entries.values().for_each(|v| v.for_each_reference(f)),
            _ => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Reference(id) => write!(f, "@{id}"),
            Self::List(items) => write!(f, "[{} items]", items.len()),
            Self::Map(entries) => write!(f, "{{{} entries}}", entries.len()),
        }
    }
}

/// Conversion out of a [`Value`].
///
/// Returns `None` when the value holds a different kind.
pub trait FromValue: Sized {
    /// Kind name reported in `TypeMismatch` errors.
    const KIND: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for bool {
    const KIND: &'static str = "bool";
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    const KIND: &'static str = "int";
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    const KIND: &'static str = "float";
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl FromValue for String {
    const KIND: &'static str = "text";
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl FromValue for ArtifactId {
    const KIND: &'static str = "reference";
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Reference(id) => Some(*id),
            _ => None,
        }
    }
}

impl FromValue for Vec<Value> {
    const KIND: &'static str = "list";
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::List(items) => Some(items.clone()),
            _ => None,
        }
    }
}

impl FromValue for BTreeMap<String, Value> {
    const KIND: &'static str = "map";
    fn from_value(value: &Value) -> Option<Self> {
        value.as_map().cloned()
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<ArtifactId> for Value {
    fn from(v: ArtifactId) -> Self {
        Self::Reference(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Self::Map(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_conversion_rejects_other_kinds() {
        assert_eq!(String::from_value(&Value::from("x")), Some("x".to_string()));
        assert_eq!(String::from_value(&Value::Int(3)), None);
        assert_eq!(bool::from_value(&Value::Text("true".into())), None);
    }

    #[test]
    fn int_widens_to_float() {
        assert_eq!(f64::from_value(&Value::Int(2)), Some(2.0));
    }

    #[test]
    fn nested_references_are_visited() {
        let a = ArtifactId::new();
        let b = ArtifactId::new();
        let mut map = BTreeMap::new();
        map.insert("target".to_string(), Value::Reference(b));
        let value = Value::List(vec![Value::Reference(a), Value::Map(map)]);

        let mut seen = Vec::new();
        value.for_each_reference(&mut |id| seen.push(id));
        assert_eq!(seen, vec![a, b]);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_string(&Value::Int(7)).unwrap();
        assert_eq!(json, r#"{"kind":"int","value":7}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::Int(7));
    }
}
