//! Error types for mapping and repository operations.

use crate::types::PropertyType;
use std::fmt;
use thiserror::Error;

/// Which way a value was travelling when a mapping failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Entity field to resource field.
    ToResource,
    /// Resource field to entity field.
    FromResource,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ToResource => write!(f, "to_resource"),
            Direction::FromResource => write!(f, "from_resource"),
        }
    }
}

/// Errors raised by the mapping engine and by mapping validation.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("missing required field `{field}` ({direction})")]
    MissingRequiredField { field: String, direction: Direction },

    #[error("cannot coerce field `{field}` to {expected} ({direction}): {reason}")]
    CoercionFailure {
        field: String,
        direction: Direction,
        expected: PropertyType,
        reason: String,
    },

    #[error("entity does not serialize to a record: {0}")]
    NotARecord(String),

    #[error("failed to build entity from mapped fields: {0}")]
    Deserialize(String),

    #[error("entity field `{0}` has no mapping")]
    UnmappedField(String),

    #[error("mapping names unknown entity field `{0}`")]
    UnknownField(String),

    #[error("resource key `{to}` is targeted by both `{first}` and `{second}`")]
    DuplicateTarget {
        to: String,
        first: String,
        second: String,
    },

    #[error("invalid identity field `{field}`: {reason}")]
    InvalidIdentity { field: String, reason: String },

    #[error("invalid mapping configuration: {0}")]
    Config(String),
}

impl MappingError {
    /// The entity field this error concerns, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            MappingError::MissingRequiredField { field, .. }
            | MappingError::CoercionFailure { field, .. }
            | MappingError::InvalidIdentity { field, .. } => Some(field),
            MappingError::UnmappedField(field) | MappingError::UnknownField(field) => Some(field),
            _ => None,
        }
    }

    /// The direction that failed, for per-value errors.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            MappingError::MissingRequiredField { direction, .. }
            | MappingError::CoercionFailure { direction, .. } => Some(*direction),
            _ => None,
        }
    }
}

/// Errors reported by a backend adapter.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("resource already exists: {0}")]
    Conflict(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Main error type for repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("entity has no assigned identity")]
    MissingIdentity,

    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("unknown entity field: {0}")]
    UnknownField(String),

    #[error(transparent)]
    Backend(BackendError),
}

impl From<BackendError> for RepositoryError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::NotFound(id) => RepositoryError::NotFound(id),
            other => RepositoryError::Backend(other),
        }
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
