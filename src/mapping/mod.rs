//! Mapping engine: typed entity fields to backend-native resource fields.
//!
//! A mapping declares, for every entity field, the resource key it lives
//! under, its coercion type and whether it may be absent:
//!
//! ```ignore
//! let mapping = EntityMapping::<Todo>::builder()
//!     .field("id", PropertyMapping::string("id").optional())
//!     .field("title", PropertyMapping::string("summary"))
//!     .field("done", PropertyMapping::boolean("status"))
//!     .build()?;
//!
//! let resource = mapping.to_resource(&todo)?;
//! let back: Todo = mapping.from_resource(&resource)?;
//! ```

pub mod coerce;
mod definition;
mod engine;

pub use definition::{DateFormat, EntityMapping, EntityMappingBuilder, PropertyMapping};
pub use engine::{field_value, from_resource, to_resource};
