//! Serialization codec: [`ServiceError`] ⇄ plain transport record.
//!
//! Records are camelCase JSON objects:
//!
//! ```json
//! {
//!   "id": "0190…", "errorType": "ValidationError", "statusCode": 422,
//!   "level": "normal", "message": "Email is invalid",
//!   "code": null, "property": "email", "redirect": null,
//!   "hideStack": false, "stack": "ValidationError: Email is invalid\n    at …"
//! }
//! ```
//!
//! Decoding never fails on an unknown `errorType`: it falls back to
//! `InternalServerError`, so peers on different registry versions interoperate.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::error::ServiceError;
use crate::kind::{ErrorKind, Level};

/// Errors from turning text or untyped JSON into a [`ServiceError`].
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid error record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected an error record object, found {found}")]
    NotARecord { found: &'static str },
}

// ─── ErrorRecord ──────────────────────────────────────────────────────────────

/// The transport-safe shape of a [`ServiceError`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub id: String,
    /// Kept as a string so records from newer producers still decode.
    pub error_type: String,
    pub status_code: u16,
    pub level: Level,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<Value>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub property: Option<String>,
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hide_stack: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub metadata: BTreeMap<String, Value>,
}

/// Peers may send `null` for optional fields; read it as the default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Convert an instance to its record. `stack` is dropped when `hide_stack` is set.
pub fn serialize(err: &ServiceError) -> ErrorRecord {
    ErrorRecord {
        id: err.id.clone(),
        error_type: err.error_type.name().to_string(),
        status_code: err.status_code,
        level: err.level,
        message: err.message.clone(),
        context: err.context.clone(),
        help: err.help.clone(),
        error_details: err.error_details.clone(),
        code: err.code.clone(),
        property: err.property.clone(),
        redirect: err.redirect.clone(),
        hide_stack: err.hide_stack,
        stack: if err.hide_stack { None } else { err.stack.clone() },
        metadata: err.metadata.clone(),
    }
}

/// Rebuild an instance from a record, field for field. Nothing is re-derived
/// from kind defaults and the id is preserved.
pub fn deserialize(record: ErrorRecord) -> ServiceError {
    let error_type = ErrorKind::resolve(&record.error_type);
    tracing::debug!(id = %record.id, error_type = %error_type, "decoded error record");
    ServiceError {
        id: record.id,
        error_type,
        status_code: record.status_code,
        level: record.level,
        message: record.message,
        context: record.context,
        help: record.help,
        error_details: record.error_details,
        code: record.code,
        property: record.property,
        redirect: record.redirect,
        hide_stack: record.hide_stack,
        stack: record.stack,
        metadata: record.metadata,
    }
}

impl From<ServiceError> for ErrorRecord {
    fn from(err: ServiceError) -> Self {
        serialize(&err)
    }
}

impl From<ErrorRecord> for ServiceError {
    fn from(record: ErrorRecord) -> Self {
        deserialize(record)
    }
}

// ─── JSON helpers ─────────────────────────────────────────────────────────────

pub fn to_value(err: &ServiceError) -> Result<Value, CodecError> {
    Ok(serde_json::to_value(serialize(err))?)
}

pub fn to_json(err: &ServiceError) -> Result<String, CodecError> {
    Ok(serde_json::to_string(&serialize(err))?)
}

pub fn to_json_pretty(err: &ServiceError) -> Result<String, CodecError> {
    Ok(serde_json::to_string_pretty(&serialize(err))?)
}

pub fn from_value(value: Value) -> Result<ServiceError, CodecError> {
    if !value.is_object() {
        return Err(CodecError::NotARecord {
            found: json_type_name(&value),
        });
    }
    let record: ErrorRecord = serde_json::from_value(value)?;
    Ok(deserialize(record))
}

pub fn from_json(text: &str) -> Result<ServiceError, CodecError> {
    from_value(serde_json::from_str(text)?)
}

// ─── Structural check ─────────────────────────────────────────────────────────

/// Returns `true` if `candidate` has the structure of a serialized
/// [`ServiceError`] record.
///
/// Unknown `errorType` names still count: they decode with a fallback.
pub fn is_taxonomy_error(candidate: &Value) -> bool {
    let Some(obj) = candidate.as_object() else {
        return false;
    };

    let required = has_str(obj, "id")
        && has_str(obj, "errorType")
        && has_str(obj, "message")
        && obj
            .get("statusCode")
            .and_then(Value::as_u64)
            .is_some_and(|s| s <= u64::from(u16::MAX))
        && obj
            .get("level")
            .and_then(Value::as_str)
            .is_some_and(|l| l.parse::<Level>().is_ok());
    if !required {
        return false;
    }

    let nullable_str = |key: &str| obj.get(key).map_or(true, |v| v.is_null() || v.is_string());
    nullable_str("code")
        && nullable_str("property")
        && nullable_str("redirect")
        && nullable_str("help")
        && nullable_str("stack")
        && obj.get("hideStack").map_or(true, |v| v.is_null() || v.is_boolean())
        && obj.get("metadata").map_or(true, |v| v.is_null() || v.is_object())
}

fn has_str(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).is_some_and(Value::is_string)
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
