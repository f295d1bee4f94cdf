//! Entity ⇄ resource translation.

use super::coerce;
use super::definition::EntityMapping;
use crate::error::{Direction, MappingError};
use crate::types::{Entity, Resource};
use serde_json::{Map, Value};

/// Convert an entity to its resource representation.
///
/// Absent optional fields are omitted from the resource entirely. The first
/// failing field aborts the conversion; no partial resource is returned.
pub fn to_resource<T: Entity>(entity: &T, mapping: &EntityMapping<T>) -> Result<Resource, MappingError> {
    let fields = entity_record(entity)?;
    let mut resource = Resource::new();

    for (name, property) in mapping.properties() {
        match present(fields.get(name)) {
            Some(value) => {
                let coerced = coerce::to_resource_value(value, property.ty, mapping.date_format())
                    .map_err(|reason| MappingError::CoercionFailure {
                        field: name.to_string(),
                        direction: Direction::ToResource,
                        expected: property.ty,
                        reason,
                    })?;
                resource.insert(property.to.clone(), coerced);
            }
            None if property.optional => {}
            None => {
                return Err(MappingError::MissingRequiredField {
                    field: name.to_string(),
                    direction: Direction::ToResource,
                })
            }
        }
    }

    Ok(resource)
}

/// Convert a resource back into an entity.
pub fn from_resource<T: Entity>(resource: &Resource, mapping: &EntityMapping<T>) -> Result<T, MappingError> {
    let mut fields = Map::new();

    for (name, property) in mapping.properties() {
        match resource.get(&property.to) {
            Some(value) => {
                let coerced = coerce::from_resource_value(value, property.ty, mapping.date_format())
                    .map_err(|reason| MappingError::CoercionFailure {
                        field: name.to_string(),
                        direction: Direction::FromResource,
                        expected: property.ty,
                        reason,
                    })?;
                fields.insert(name.to_string(), coerced);
            }
            None if property.optional => {}
            None => {
                return Err(MappingError::MissingRequiredField {
                    field: name.to_string(),
                    direction: Direction::FromResource,
                })
            }
        }
    }

    serde_json::from_value(Value::Object(fields)).map_err(|e| MappingError::Deserialize(e.to_string()))
}

/// Serialized value of one entity field, `None` when absent.
pub fn field_value<T: Entity>(entity: &T, field: &str) -> Result<Option<Value>, MappingError> {
    let mut fields = entity_record(entity)?;
    Ok(fields.remove(field).filter(|v| !v.is_null()))
}

fn entity_record<T: Entity>(entity: &T) -> Result<Map<String, Value>, MappingError> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(MappingError::NotARecord(format!("serialized to {other}"))),
        Err(e) => Err(MappingError::NotARecord(e.to_string())),
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

impl<T: Entity> EntityMapping<T> {
    /// See [`to_resource`].
    pub fn to_resource(&self, entity: &T) -> Result<Resource, MappingError> {
        to_resource(entity, self)
    }

    /// See [`from_resource`].
    pub fn from_resource(&self, resource: &Resource) -> Result<T, MappingError> {
        from_resource(resource, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{DateFormat, PropertyMapping};
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Event {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        summary: String,
        attendees: u32,
        confirmed: bool,
        starts_at: DateTime<Utc>,
        notes: Option<String>,
    }

    impl Entity for Event {
        const FIELDS: &'static [&'static str] =
            &["id", "summary", "attendees", "confirmed", "starts_at", "notes"];

        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }
    }

    fn mapping(format: DateFormat) -> EntityMapping<Event> {
        EntityMapping::builder()
            .field("id", PropertyMapping::string("eventId").optional())
            .field("summary", PropertyMapping::string("title"))
            .field("attendees", PropertyMapping::number("guests"))
            .field("confirmed", PropertyMapping::boolean("status"))
            .field("starts_at", PropertyMapping::date("start"))
            .field("notes", PropertyMapping::string("description").optional())
            .date_format(format)
            .build()
            .unwrap()
    }

    fn event() -> Event {
        Event {
            id: None,
            summary: "Standup".into(),
            attendees: 4,
            confirmed: true,
            starts_at: Utc.with_ymd_and_hms(2024, 5, 6, 9, 30, 0).unwrap(),
            notes: None,
        }
    }

    #[test]
    fn test_to_resource_renames_and_omits_absent_optionals() {
        let resource = to_resource(&event(), &mapping(DateFormat::Rfc3339)).unwrap();
        assert_eq!(
            serde_json::to_value(&resource).unwrap(),
            json!({
                "title": "Standup",
                "guests": 4,
                "status": true,
                "start": "2024-05-06T09:30:00Z"
            })
        );
        assert!(!resource.contains_key("eventId"));
        assert!(!resource.contains_key("description"));
    }

    #[test]
    fn test_round_trip_with_identity() {
        let mapping = mapping(DateFormat::UnixMillis);
        let mut original = event();
        original.id = Some("evt-9".into());
        original.notes = Some("bring coffee".into());

        let resource = mapping.to_resource(&original).unwrap();
        assert_eq!(resource.get("start"), Some(&json!(1714987800000i64)));
        assert_eq!(mapping.from_resource(&resource).unwrap(), original);
    }

    #[test]
    fn test_from_resource_coerces_text_cells() {
        let resource = Resource::new()
            .with("eventId", "7")
            .with("title", "Retro")
            .with("guests", "12")
            .with("status", "FALSE")
            .with("start", "2024-05-06T15:00:00Z");

        let event = from_resource(&resource, &mapping(DateFormat::Rfc3339)).unwrap();
        assert_eq!(event.id.as_deref(), Some("7"));
        assert_eq!(event.attendees, 12);
        assert!(!event.confirmed);
        assert_eq!(event.notes, None);
    }

    #[test]
    fn test_missing_required_field() {
        let resource = Resource::new().with("title", "Retro").with("guests", 1);
        let err = from_resource(&resource, &mapping(DateFormat::Rfc3339)).unwrap_err();
        assert!(matches!(
            err,
            MappingError::MissingRequiredField { ref field, direction: Direction::FromResource }
                if field == "confirmed"
        ));
    }

    #[test]
    fn test_coercion_failure_reports_field() {
        let resource = Resource::new()
            .with("title", "Retro")
            .with("guests", "a dozen")
            .with("status", true)
            .with("start", "2024-05-06T15:00:00Z");
        let err = from_resource(&resource, &mapping(DateFormat::Rfc3339)).unwrap_err();
        assert_eq!(err.field(), Some("attendees"));
        assert_eq!(err.direction(), Some(Direction::FromResource));
    }

    #[test]
    fn test_null_resource_value_is_absent() {
        let resource = Resource::new()
            .with("title", "Retro")
            .with("guests", 2)
            .with("status", true)
            .with("start", "2024-05-06T15:00:00Z")
            .with("description", Value::Null);
        let event = from_resource(&resource, &mapping(DateFormat::Rfc3339)).unwrap();
        assert_eq!(event.notes, None);
    }

    #[test]
    fn test_field_value() {
        let value = field_value(&event(), "summary").unwrap();
        assert_eq!(value, Some(json!("Standup")));
        assert_eq!(field_value(&event(), "notes").unwrap(), None);
    }
}
