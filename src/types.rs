//! Core types shared by the mapping engine, change detector and repositories.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// An application record stored through a repository.
///
/// Entities are plain data. Their serde representation must be a record whose
/// keys are the names in [`Entity::FIELDS`]; `None` values may serialize as
/// `null` or be skipped, both are treated as absent.
///
/// Fields mapped as [`PropertyType::Date`] must serialize as RFC 3339
/// timestamps with an offset, as `chrono::DateTime<Utc>` does. `NaiveDate`
/// and `NaiveDateTime` fields fail to map even when the backend's
/// [`DateFormat`](crate::mapping::DateFormat) stores only a calendar date.
pub trait Entity:
    Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug + Send + Sync + 'static
{
    /// Every field name of the entity, in declaration order.
    const FIELDS: &'static [&'static str];

    /// Identity assigned by the backend. `None` until the entity is created.
    fn id(&self) -> Option<&str>;
}

/// Coercion rule applied to a field crossing the entity/resource boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    String,
    Number,
    Boolean,
    Date,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyType::String => "string",
            PropertyType::Number => "number",
            PropertyType::Boolean => "boolean",
            PropertyType::Date => "date",
        };
        f.write_str(name)
    }
}

/// Backend-native representation of an entity: resource key to raw value.
///
/// Key order is preserved, so adapters that care about column order (rows,
/// CSV-like payloads) see fields in mapping order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource(Map<String, Value>);

impl Resource {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Value stored under `key`. A stored `null` is reported as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Identity stored under `key`, rendered as text.
    ///
    /// Numeric identities (row numbers and the like) are accepted.
    pub fn identity(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Resource {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Resource {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
