//! Construction options for [`ServiceError`](crate::ServiceError).

use serde::Deserialize;
use serde_json::Value;
use std::panic::Location;
use thiserror::Error;

use crate::codec::json_type_name;
use crate::kind::{ErrorKind, Level};
use crate::wrap::{self, SourceError};

/// Programmer misuse detected while building an error.
///
/// Not part of the taxonomy: these signal a broken call site, never a
/// runtime service condition.
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error(
        "errors must be built from an options record, not a bare string (got {0:?}); \
         e.g. ErrorOptions::new().message(\"...\")"
    )]
    BareString(String),

    #[error("options must be a record, found {found}")]
    NotARecord { found: &'static str },

    #[error("invalid options record: {0}")]
    InvalidOptions(#[source] serde_json::Error),
}

/// Caller-supplied overrides. Every field is optional; absent fields keep
/// the kind defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorOptions {
    pub id: Option<String>,
    pub status_code: Option<u16>,
    pub level: Option<Level>,
    pub context: Option<Value>,
    pub help: Option<String>,
    /// Reclassify the instance. Only `errorType`/`name` change; status,
    /// level and message stay those of the constructing kind.
    pub error_type: Option<ErrorKind>,
    pub error_details: Option<Value>,
    pub code: Option<String>,
    pub property: Option<String>,
    pub redirect: Option<String>,
    pub message: Option<String>,
    pub hide_stack: Option<bool>,
    /// Foreign error to absorb. In JSON this may be a record or a bare message.
    #[serde(deserialize_with = "wrap::deserialize_source")]
    pub err: Option<SourceError>,
}

impl ErrorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options arriving as untyped JSON.
    ///
    /// `null` is treated as an empty record. A bare string is rejected with
    /// [`ConstructionError::BareString`].
    pub fn from_value(value: Value) -> Result<Self, ConstructionError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::String(s) => Err(ConstructionError::BareString(s)),
            Value::Object(_) => {
                serde_json::from_value(value).map_err(ConstructionError::InvalidOptions)
            }
            other => Err(ConstructionError::NotARecord {
                found: json_type_name(&other),
            }),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    pub fn context(mut self, context: impl Into<Value>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn error_type(mut self, kind: ErrorKind) -> Self {
        self.error_type = Some(kind);
        self
    }

    pub fn error_details(mut self, details: impl Into<Value>) -> Self {
        self.error_details = Some(details.into());
        self
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    pub fn redirect(mut self, redirect: impl Into<String>) -> Self {
        self.redirect = Some(redirect.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn hide_stack(mut self, hide: bool) -> Self {
        self.hide_stack = Some(hide);
        self
    }

    /// Absorb `source` into the error being built.
    ///
    /// A source without a stack (e.g. a promoted plain string) gets one
    /// pointing at this call.
    #[track_caller]
    pub fn wrap(mut self, source: impl Into<SourceError>) -> Self {
        let mut source = source.into();
        if source.stack.is_none() {
            source.stack = Some(wrap::promoted_stack(&source, Location::caller()));
        }
        self.err = Some(source);
        self
    }
}
