//! Declarative field mappings and their construction-time validation.

use crate::error::MappingError;
use crate::types::{Entity, PropertyType};
use chrono::format::{Item, StrftimeItems};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::marker::PhantomData;

/// How one entity field maps to one resource field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMapping {
    /// Resource key the field is stored under.
    pub to: String,

    /// Coercion rule.
    #[serde(rename = "type")]
    pub ty: PropertyType,

    /// Absent values are allowed in both directions.
    #[serde(default)]
    pub optional: bool,
}

impl PropertyMapping {
    pub fn new(to: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            to: to.into(),
            ty,
            optional: false,
        }
    }

    pub fn string(to: impl Into<String>) -> Self {
        Self::new(to, PropertyType::String)
    }

    pub fn number(to: impl Into<String>) -> Self {
        Self::new(to, PropertyType::Number)
    }

    pub fn boolean(to: impl Into<String>) -> Self {
        Self::new(to, PropertyType::Boolean)
    }

    pub fn date(to: impl Into<String>) -> Self {
        Self::new(to, PropertyType::Date)
    }

    /// Mark the field optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Canonical date/time representation used by a backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// RFC 3339 text in UTC with a `Z` suffix.
    #[default]
    Rfc3339,

    /// Integer milliseconds since the Unix epoch.
    UnixMillis,

    /// strftime pattern, interpreted as UTC.
    Custom(String),
}

/// Field-by-field mapping for entity type `T`.
///
/// Construct with [`EntityMapping::builder`] or [`EntityMapping::from_json`];
/// both validate the mapping against `T::FIELDS`. Immutable afterwards.
#[derive(Clone, Debug)]
pub struct EntityMapping<T> {
    /// Mapped properties in `T::FIELDS` order.
    properties: IndexMap<String, PropertyMapping>,
    identity: String,
    date_format: DateFormat,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> EntityMapping<T> {
    pub fn builder() -> EntityMappingBuilder<T> {
        EntityMappingBuilder::new()
    }

    /// Parse and validate a mapping from its JSON form.
    ///
    /// ```ignore
    /// {
    ///   "identity": "id",
    ///   "date_format": "rfc3339",
    ///   "fields": {
    ///     "id":    { "to": "id",      "type": "string", "optional": true },
    ///     "title": { "to": "summary", "type": "string" }
    ///   }
    /// }
    /// ```
    pub fn from_json(json: &str) -> Result<Self, MappingError> {
        let config: MappingConfig =
            serde_json::from_str(json).map_err(|e| MappingError::Config(e.to_string()))?;

        let mut builder = Self::builder()
            .date_format(config.date_format)
            .allow_aliasing(config.allow_aliasing);
        if let Some(identity) = config.identity {
            builder = builder.identity(identity);
        }
        for (name, property) in config.fields {
            builder = builder.field(name, property);
        }
        builder.build()
    }

    /// Mapping for an entity field.
    pub fn property(&self, field: &str) -> Option<&PropertyMapping> {
        self.properties.get(field)
    }

    /// All mapped properties, in entity field order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &PropertyMapping)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entity field carrying identity.
    pub fn identity_field(&self) -> &str {
        &self.identity
    }

    /// Resource key carrying identity.
    pub fn resource_identity_key(&self) -> &str {
        // Validated at build time.
        self.properties
            .get(&self.identity)
            .map(|p| p.to.as_str())
            .unwrap_or(self.identity.as_str())
    }

    pub fn date_format(&self) -> &DateFormat {
        &self.date_format
    }
}

/// Serialized form accepted by [`EntityMapping::from_json`].
#[derive(Debug, Deserialize)]
struct MappingConfig {
    #[serde(default)]
    identity: Option<String>,
    #[serde(default)]
    date_format: DateFormat,
    #[serde(default)]
    allow_aliasing: bool,
    fields: IndexMap<String, PropertyMapping>,
}

/// Builder for [`EntityMapping`].
pub struct EntityMappingBuilder<T> {
    fields: Vec<(String, PropertyMapping)>,
    identity: String,
    date_format: DateFormat,
    allow_aliasing: bool,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> EntityMappingBuilder<T> {
    fn new() -> Self {
        Self {
            fields: Vec::new(),
            identity: "id".to_string(),
            date_format: DateFormat::default(),
            allow_aliasing: false,
            _entity: PhantomData,
        }
    }

    pub fn field(mut self, name: impl Into<String>, mapping: PropertyMapping) -> Self {
        self.fields.push((name.into(), mapping));
        self
    }

    /// Entity field carrying identity (default `"id"`).
    pub fn identity(mut self, name: impl Into<String>) -> Self {
        self.identity = name.into();
        self
    }

    pub fn date_format(mut self, format: DateFormat) -> Self {
        self.date_format = format;
        self
    }

    /// Let several fields target the same resource key.
    pub fn allow_aliasing(mut self, allow: bool) -> Self {
        self.allow_aliasing = allow;
        self
    }

    pub fn build(self) -> Result<EntityMapping<T>, MappingError> {
        let mut by_name: HashMap<String, PropertyMapping> = HashMap::new();
        for (name, mapping) in self.fields {
            if !T::FIELDS.contains(&name.as_str()) {
                return Err(MappingError::UnknownField(name));
            }
            if by_name.contains_key(&name) {
                return Err(MappingError::Config(format!("field `{name}` is mapped twice")));
            }
            by_name.insert(name, mapping);
        }

        let mut properties = IndexMap::with_capacity(T::FIELDS.len());
        for &field in T::FIELDS {
            let mapping = by_name
                .remove(field)
                .ok_or_else(|| MappingError::UnmappedField(field.to_string()))?;
            properties.insert(field.to_string(), mapping);
        }

        if !self.allow_aliasing {
            let mut targets: HashMap<&str, &str> = HashMap::new();
            for (name, mapping) in &properties {
                if let Some(first) = targets.insert(mapping.to.as_str(), name.as_str()) {
                    return Err(MappingError::DuplicateTarget {
                        to: mapping.to.clone(),
                        first: first.to_string(),
                        second: name.clone(),
                    });
                }
            }
        }

        match properties.get(&self.identity) {
            None => {
                return Err(MappingError::InvalidIdentity {
                    field: self.identity,
                    reason: "not a mapped field".into(),
                })
            }
            Some(p) if p.ty != PropertyType::String => {
                return Err(MappingError::InvalidIdentity {
                    field: self.identity,
                    reason: format!("identity must be typed string, found {}", p.ty),
                })
            }
            Some(_) => {}
        }

        if let DateFormat::Custom(pattern) = &self.date_format {
            if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
                return Err(MappingError::Config(format!(
                    "invalid date pattern `{pattern}`"
                )));
            }
        }

        Ok(EntityMapping {
            properties,
            identity: self.identity,
            date_format: self.date_format,
            _entity: PhantomData,
        })
    }
}
