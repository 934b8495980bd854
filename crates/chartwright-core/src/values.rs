//! Values documents with insert-only overrides
//!
//! A [`ValueDocument`] is the nested configuration tree every chart is
//! rendered against. Keys are kept sorted so serialized documents are stable
//! across runs.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CoreError, Result};

/// A single configuration value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Value>),
    Map(ValueDocument),
}

impl Value {
    /// Null, an empty list or an empty document
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::List(items) => items.is_empty(),
            Value::Map(doc) => doc.is_empty(),
            _ => false,
        }
    }

    pub fn as_document(&self) -> Option<&ValueDocument> {
        match self {
            Value::Map(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Convert to a JSON value (for schema validation)
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => JsonValue::Number(n.clone()),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(doc) => doc.to_json(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => Value::Number(n),
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(map) => Value::Map(ValueDocument(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            )),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! value_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Number(Number::from(n))
                }
            }
        )*
    };
}

value_from_int!(i32, i64, u16, u32, u64);

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

impl From<ValueDocument> for Value {
    fn from(doc: ValueDocument) -> Self {
        Value::Map(doc)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => items.serialize(serializer),
            Value::Map(doc) => doc.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(Value::from)
    }
}

/// Nested key/value configuration document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueDocument(BTreeMap<String, Value>);

impl ValueDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert, used by the values synthesis
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert or replace a top-level key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Get a value by dotted path (e.g. `image.tag`)
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = current.as_document()?.get(segment)?;
        }
        Some(current)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Remove null values, empty lists and empty documents
    ///
    /// Nested documents are compacted first, so a document that only held
    /// empty containers disappears as well.
    pub fn compact(&mut self) {
        self.0.retain(|_, value| {
            if let Value::Map(doc) = value {
                doc.compact();
            }
            !value.is_empty()
        });
    }

    /// Consuming variant of [`ValueDocument::compact`]
    pub fn compacted(mut self) -> Self {
        self.compact();
        self
    }

    /// Apply an insert-only override
    ///
    /// Intermediate documents along the path are created as needed. Fails if
    /// the terminal key already holds a value or an intermediate segment is
    /// not a document.
    pub fn apply_override(&mut self, o: &Override) -> Result<()> {
        let segments: Vec<&str> = o.path.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return Ok(());
        };

        let mut current = &mut self.0;
        for segment in parents {
            let entry = current
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Map(ValueDocument::new()));
            current = match entry {
                Value::Map(doc) => &mut doc.0,
                other => {
                    return Err(CoreError::OverrideConflict {
                        path: o.path.clone(),
                        existing: other.clone(),
                    });
                }
            };
        }

        if let Some(existing) = current.get(*last) {
            return Err(CoreError::OverrideConflict {
                path: o.path.clone(),
                existing: existing.clone(),
            });
        }

        current.insert((*last).to_string(), o.value.clone());
        Ok(())
    }

    /// Parse a document from YAML; an empty file is an empty document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        match serde_yaml::from_str::<Value>(yaml)? {
            Value::Map(doc) => Ok(doc),
            Value::Null => Ok(Self::new()),
            other => Err(CoreError::InvalidArchive {
                message: format!("values document must be a mapping, got {}", other),
            }),
        }
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl FromIterator<(String, Value)> for ValueDocument {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for ValueDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ValueDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Map(doc) => Ok(doc),
            Value::Null => Ok(Self::new()),
            other => Err(serde::de::Error::custom(format!(
                "expected a mapping, got {}",
                other
            ))),
        }
    }
}

/// Insert-only value contributed under a dotted path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Override {
    pub path: String,
    pub value: Value,
}

impl Override {
    pub fn new(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Move this override under `<prefix>.`
    pub fn prefixed(&self, prefix: &str) -> Self {
        Self {
            path: format!("{}.{}", prefix, self.path),
            value: self.value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ValueDocument {
        ValueDocument::from_yaml(
            r#"
image:
  repository: nginx
  tag: ""
environment: {}
secrets: []
ingress:
  enabled: false
nested:
  empty:
    deeper: {}
  kept: 1
nothing: null
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_compact_removes_empty_containers() {
        let doc = sample().compacted();

        assert!(doc.get("environment").is_none());
        assert!(doc.get("secrets").is_none());
        assert!(doc.get("nothing").is_none());
        assert!(doc.get_path("nested.empty").is_none());
        assert_eq!(doc.get_path("nested.kept"), Some(&Value::from(1)));
        // Empty strings and false are values, not empty containers
        assert_eq!(doc.get_path("image.tag"), Some(&Value::from("")));
        assert_eq!(doc.get_path("ingress.enabled"), Some(&Value::from(false)));
    }

    #[test]
    fn test_compact_is_idempotent() {
        let once = sample().compacted();
        let twice = once.clone().compacted();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_override_creates_intermediate_documents() {
        let mut doc = ValueDocument::new();
        doc.apply_override(&Override::new("postgresql.primary.persistence.size", "10Gi"))
            .unwrap();

        assert_eq!(
            doc.get_path("postgresql.primary.persistence.size"),
            Some(&Value::from("10Gi"))
        );
    }

    #[test]
    fn test_override_is_insert_only() {
        let mut doc = ValueDocument::new();
        let o = Override::new("auth.password", "secret");

        doc.apply_override(&o).unwrap();
        let err = doc.apply_override(&o).unwrap_err();

        match err {
            CoreError::OverrideConflict { path, existing } => {
                assert_eq!(path, "auth.password");
                assert_eq!(existing, Value::from("secret"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_override_through_scalar_conflicts() {
        let mut doc = ValueDocument::new().with("architecture", "standalone");
        let err = doc
            .apply_override(&Override::new("architecture.mode", "replication"))
            .unwrap_err();
        assert!(matches!(err, CoreError::OverrideConflict { .. }));
    }

    #[test]
    fn test_override_single_segment() {
        let mut doc = ValueDocument::new();
        doc.apply_override(&Override::new("architecture", "standalone"))
            .unwrap();
        assert_eq!(doc.get("architecture"), Some(&Value::from("standalone")));
    }

    #[test]
    fn test_prefixed_override() {
        let o = Override::new("primary.persistence.size", "10Gi").prefixed("postgresql");
        assert_eq!(o.path, "postgresql.primary.persistence.size");
    }

    #[test]
    fn test_yaml_round_trip_keeps_numbers() {
        let doc = ValueDocument::new()
            .with("replicaCount", 3)
            .with("ratio", 0.5)
            .with("name", "web");
        let yaml = doc.to_yaml().unwrap();
        let parsed = ValueDocument::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_empty_yaml_is_empty_document() {
        assert!(ValueDocument::from_yaml("").unwrap().is_empty());
    }
}
