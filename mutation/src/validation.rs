//! Attribute validation helpers for mutation operations.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value as Json;
use strata_core::{EntityId, Fields, TypeId, Value};
use strata_registry::{AttrDef, Registry, ScalarType};

use crate::error::{MutationError, MutationResult};

/// Coerce a JSON value to the declared type of `attr`.
///
/// JSON null is accepted for every attribute; required-ness is checked
/// separately. Array attributes take a JSON array of element values.
pub fn coerce_attr(type_name: &str, attr: &AttrDef, json: &Json) -> MutationResult<Value> {
    if json.is_null() {
        return Ok(Value::Null);
    }
    if attr.list {
        let Json::Array(items) = json else {
            return Err(invalid_attr_type(type_name, attr, json));
        };
        return items
            .iter()
            .map(|item| coerce_element(type_name, attr, item))
            .collect::<MutationResult<Vec<_>>>()
            .map(Value::List);
    }
    coerce_element(type_name, attr, json)
}

/// Coerce one scalar (or one array element) of `attr`.
pub fn coerce_element(type_name: &str, attr: &AttrDef, json: &Json) -> MutationResult<Value> {
    coerce_scalar(attr.scalar, json).ok_or_else(|| invalid_attr_type(type_name, attr, json))
}

/// Coerce a JSON value to a scalar type. Returns None on mismatch.
pub fn coerce_scalar(scalar: ScalarType, json: &Json) -> Option<Value> {
    match (scalar, json) {
        (_, Json::Null) => Some(Value::Null),
        (ScalarType::String, Json::String(s)) => Some(Value::String(s.clone())),
        (ScalarType::Bool, Json::Bool(b)) => Some(Value::Bool(*b)),
        (ScalarType::Int, Json::Number(n)) => n.as_i64().map(Value::Int).or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| Value::Int(f as i64))
        }),
        (ScalarType::Float, Json::Number(n)) => n.as_f64().map(Value::Float),
        (ScalarType::Date, Json::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .map(Value::Date),
        (ScalarType::DateTime, Json::String(s)) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| Value::Timestamp(t.with_timezone(&Utc))),
        (ScalarType::DateTime, Json::Number(n)) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(Value::Timestamp),
        (ScalarType::Id, json) => parse_id(json).map(Value::Ref),
        _ => None,
    }
}

/// Parse an entity id given as a decimal string or a non-negative number.
pub fn parse_id(json: &Json) -> Option<EntityId> {
    match json {
        Json::String(s) => s.parse().ok(),
        Json::Number(n) => n.as_u64().map(EntityId::new),
        _ => None,
    }
}

fn invalid_attr_type(type_name: &str, attr: &AttrDef, json: &Json) -> MutationError {
    let expected = if attr.list {
        format!("[{}]", attr.scalar.name())
    } else {
        attr.scalar.name().to_string()
    };
    MutationError::validation(format!(
        "invalid value for {}.{}: expected {}, got {}",
        type_name,
        attr.name,
        expected,
        json_type_name(json)
    ))
}

/// Name of a JSON value's kind, for error messages.
pub fn json_type_name(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

/// Check that all required attributes are present and non-null.
pub fn check_required_attributes(
    registry: &Registry,
    type_name: &str,
    type_id: TypeId,
    fields: &Fields,
) -> MutationResult<()> {
    for attr_def in registry.all_attrs(type_id) {
        if !attr_def.required {
            continue;
        }
        let present = fields.get(&attr_def.name).map(|v| !v.is_null()).unwrap_or(false);
        if !present {
            return Err(MutationError::validation(format!(
                "missing required field {}.{}",
                type_name, attr_def.name
            )));
        }
    }
    Ok(())
}

/// Reject writes that set a required attribute to null.
pub fn check_required_not_null(
    registry: &Registry,
    type_name: &str,
    type_id: TypeId,
    changes: &Fields,
) -> MutationResult<()> {
    for (name, value) in changes {
        if !value.is_null() {
            continue;
        }
        if registry.get_attr(type_id, name).map(|a| a.required).unwrap_or(false) {
            return Err(MutationError::validation(format!(
                "cannot set required field {}.{} to null",
                type_name, name
            )));
        }
    }
    Ok(())
}

/// Apply default values to missing attributes.
pub fn apply_defaults(registry: &Registry, type_id: TypeId, fields: &mut Fields) {
    for attr_def in registry.all_attrs(type_id) {
        if fields.get(&attr_def.name).map(Value::is_null).unwrap_or(true) {
            if let Some(default) = &attr_def.default {
                fields.insert(attr_def.name.clone(), default.clone());
            }
        }
    }
}
