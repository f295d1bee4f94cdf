//! Per-type value coercion between entity and resource representations.
//!
//! Entity-side values are what serde produces for the entity: text, numbers,
//! booleans, and RFC 3339 text for `chrono` timestamps. Date fields must be
//! offset-aware on the entity side (`DateTime<Utc>`, `DateTime<FixedOffset>`);
//! naive dates and datetimes are rejected rather than guessed at.
//! Resource-side values are whatever the backend stores; dates follow the
//! backend's [`DateFormat`].
//!
//! Errors are plain reasons; the engine attaches field and direction.

use super::definition::DateFormat;
use crate::types::PropertyType;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Number, Value};
use std::fmt::Write;

/// Entity value to resource value.
pub fn to_resource_value(
    value: &Value,
    ty: PropertyType,
    format: &DateFormat,
) -> Result<Value, String> {
    match (ty, value) {
        (PropertyType::String, Value::String(_))
        | (PropertyType::Number, Value::Number(_))
        | (PropertyType::Boolean, Value::Bool(_)) => Ok(value.clone()),
        (PropertyType::Date, Value::String(text)) => {
            let at = DateTime::parse_from_rfc3339(text)
                .map_err(|e| {
                    format!("malformed timestamp `{text}`: {e}; date fields must hold RFC 3339 timestamps with an offset")
                })?
                .with_timezone(&Utc);
            render_date(at, format)
        }
        (ty, other) => Err(format!("expected {ty}, found {}", kind(other))),
    }
}

/// Resource value to entity value.
pub fn from_resource_value(
    value: &Value,
    ty: PropertyType,
    format: &DateFormat,
) -> Result<Value, String> {
    match ty {
        PropertyType::String => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            other => Err(format!("{} is not representable as text", kind(other))),
        },
        PropertyType::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(text) => parse_number(text).map(Value::Number),
            other => Err(format!("expected number, found {}", kind(other))),
        },
        PropertyType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(text) => parse_bool(text).map(Value::Bool),
            other => Err(format!("ambiguous boolean representation: {other}")),
        },
        PropertyType::Date => {
            let at = parse_date(value, format)?;
            Ok(Value::String(at.to_rfc3339_opts(SecondsFormat::AutoSi, true)))
        }
    }
}

fn parse_number(text: &str) -> Result<Number, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("empty text is not a number".into());
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Ok(Number::from(i));
    }
    if let Ok(u) = trimmed.parse::<u64>() {
        return Ok(Number::from(u));
    }
    let float = trimmed
        .parse::<f64>()
        .map_err(|_| format!("non-numeric text `{text}`"))?;
    Number::from_f64(float).ok_or_else(|| format!("numeric overflow in `{text}`"))
}

fn parse_bool(text: &str) -> Result<bool, String> {
    match text {
        "true" | "TRUE" => Ok(true),
        "false" | "FALSE" => Ok(false),
        _ => Err(format!("unrecognized boolean `{text}`")),
    }
}

fn render_date(at: DateTime<Utc>, format: &DateFormat) -> Result<Value, String> {
    match format {
        DateFormat::Rfc3339 => Ok(Value::String(at.to_rfc3339_opts(SecondsFormat::AutoSi, true))),
        DateFormat::UnixMillis => Ok(Value::from(at.timestamp_millis())),
        DateFormat::Custom(pattern) => {
            let mut out = String::new();
            write!(out, "{}", at.format(pattern))
                .map_err(|_| format!("cannot render date with pattern `{pattern}`"))?;
            Ok(Value::String(out))
        }
    }
}

fn parse_date(value: &Value, format: &DateFormat) -> Result<DateTime<Utc>, String> {
    match (format, value) {
        (DateFormat::Rfc3339, Value::String(text)) => DateTime::parse_from_rfc3339(text)
            .map(|at| at.with_timezone(&Utc))
            .map_err(|e| format!("malformed date `{text}`: {e}")),
        (DateFormat::UnixMillis, Value::Number(n)) => {
            let millis = n
                .as_i64()
                .ok_or_else(|| format!("timestamp {n} is not an integer"))?;
            from_millis(millis)
        }
        (DateFormat::UnixMillis, Value::String(text)) => {
            let millis = text
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("malformed timestamp `{text}`"))?;
            from_millis(millis)
        }
        (DateFormat::Custom(pattern), Value::String(text)) => {
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
                return Ok(Utc.from_utc_datetime(&naive));
            }
            NaiveDate::parse_from_str(text, pattern)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
                .ok_or_else(|| format!("`{text}` does not match pattern `{pattern}`"))
        }
        (_, other) => Err(format!("unparseable date representation: {other}")),
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>, String> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| format!("timestamp {millis} out of range"))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "text",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
