// ── Strict JSON field readers ──
//
// Shared by every section decoder. Each reader returns `Ok(None)` for an
// absent key and `SchemaError::WrongType` for a present key of the wrong
// JSON type. `null` counts as present.

use serde_json::{Map, Value};

use crate::error::SchemaError;

pub(crate) type Object = Map<String, Value>;

/// Path label used for the payload root in error messages.
pub(crate) const ROOT: &str = "<root>";

pub(crate) fn join(path: &str, key: &str) -> String {
    if path.is_empty() || path == ROOT {
        key.to_owned()
    } else {
        format!("{path}.{key}")
    }
}

/// Human-readable JSON type name for error messages.
pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(n) if n.is_i64() => "an integer",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub(crate) fn wrong_type(path: &str, expected: &'static str, found: &Value) -> SchemaError {
    SchemaError::WrongType {
        path: path.to_owned(),
        expected,
        found: kind(found),
    }
}

pub(crate) fn object<'a>(value: &'a Value, path: &str) -> Result<&'a Object, SchemaError> {
    value
        .as_object()
        .ok_or_else(|| wrong_type(path, "an object", value))
}

pub(crate) fn integer(value: &Value, path: &str) -> Result<i64, SchemaError> {
    value
        .as_i64()
        .ok_or_else(|| wrong_type(path, "an integer", value))
}

pub(crate) fn bool_field(obj: &Object, key: &str, path: &str) -> Result<Option<bool>, SchemaError> {
    obj.get(key)
        .map(|v| v.as_bool().ok_or_else(|| wrong_type(&join(path, key), "a boolean", v)))
        .transpose()
}

pub(crate) fn int_field(obj: &Object, key: &str, path: &str) -> Result<Option<i64>, SchemaError> {
    obj.get(key)
        .map(|v| integer(v, &join(path, key)))
        .transpose()
}

pub(crate) fn str_field<'a>(
    obj: &'a Object,
    key: &str,
    path: &str,
) -> Result<Option<&'a str>, SchemaError> {
    obj.get(key)
        .map(|v| v.as_str().ok_or_else(|| wrong_type(&join(path, key), "a string", v)))
        .transpose()
}

/// Overwrite `slot` with a present string field.
pub(crate) fn merge_string(
    slot: &mut String,
    obj: &Object,
    key: &str,
    path: &str,
) -> Result<(), SchemaError> {
    if let Some(value) = str_field(obj, key, path)? {
        value.clone_into(slot);
    }
    Ok(())
}
