//! Wrap/merge engine: absorb a foreign error into a typed [`ServiceError`].
//!
//! Merge rules, per source property:
//! 1. `errorType`, `name`, `statusCode`, `message`, `level` are never inherited
//! 2. `code` is taken only when the target has none
//! 3. `stack` is appended: `target + "\n\n" + source`
//! 4. `errorDetails` is never inherited
//! 5. everything else (including metadata entries) fills only empty target slots

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::io;
use std::panic::Location;

use crate::error::ServiceError;

/// Name given to errors promoted from a plain message.
pub const GENERIC_NAME: &str = "Error";

// ─── SourceError ──────────────────────────────────────────────────────────────

/// A foreign error, reduced to the bounded set of properties the merge
/// engine knows how to read. Unrecognised properties land in `metadata`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide_stack: Option<bool>,
    #[serde(flatten)]
    pub metadata: BTreeMap<String, Value>,
}

impl SourceError {
    /// A generic error carrying only a message.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            name: Some(GENERIC_NAME.to_string()),
            message: message.into(),
            ..Default::default()
        }
    }

    /// Attach a custom property, e.g. one a library hung off its error.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Capture any `std::error::Error`, recording its `source()` chain as
    /// the stack text.
    pub fn from_std(err: &(dyn StdError + 'static)) -> Self {
        let message = err.to_string();
        let mut stack = format!("{GENERIC_NAME}: {message}");
        let mut cause = err.source();
        while let Some(inner) = cause {
            stack.push_str("\nCaused by: ");
            stack.push_str(&inner.to_string());
            cause = inner.source();
        }
        Self {
            name: Some(GENERIC_NAME.to_string()),
            message,
            stack: Some(stack),
            ..Default::default()
        }
    }

    /// Capture an I/O error with an errno-style `code` where one applies.
    pub fn from_io(err: &io::Error) -> Self {
        let mut source = Self::from_std(err)
            .with_metadata("ioKind", format!("{:?}", err.kind()));
        source.code = errno_code(err.kind()).map(str::to_string);
        if let Some(raw) = err.raw_os_error() {
            source.metadata.insert("errno".to_string(), Value::from(raw));
        }
        source
    }
}

fn errno_code(kind: io::ErrorKind) -> Option<&'static str> {
    use io::ErrorKind::*;
    Some(match kind {
        NotFound => "ENOENT",
        PermissionDenied => "EACCES",
        AlreadyExists => "EEXIST",
        ConnectionRefused => "ECONNREFUSED",
        ConnectionReset => "ECONNRESET",
        TimedOut => "ETIMEDOUT",
        AddrInUse => "EADDRINUSE",
        BrokenPipe => "EPIPE",
        _ => return None,
    })
}

impl From<&str> for SourceError {
    fn from(message: &str) -> Self {
        Self::from_message(message)
    }
}

impl From<String> for SourceError {
    fn from(message: String) -> Self {
        Self::from_message(message)
    }
}

impl From<io::Error> for SourceError {
    fn from(err: io::Error) -> Self {
        Self::from_io(&err)
    }
}

impl From<&ServiceError> for SourceError {
    fn from(err: &ServiceError) -> Self {
        Self {
            name: Some(err.name().to_string()),
            error_type: Some(err.name().to_string()),
            status_code: Some(err.status_code),
            level: Some(err.level.as_str().to_string()),
            message: err.message.clone(),
            code: err.code.clone(),
            stack: err.stack.clone(),
            id: Some(err.id().to_string()),
            context: err.context.clone(),
            help: err.help.clone(),
            error_details: err.error_details.clone(),
            property: err.property.clone(),
            redirect: err.redirect.clone(),
            hide_stack: Some(err.hide_stack),
            metadata: err.metadata.clone(),
        }
    }
}

impl From<ServiceError> for SourceError {
    fn from(err: ServiceError) -> Self {
        Self::from(&err)
    }
}

/// `err` in an options record: either a full error record or a bare message.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSource {
    Message(String),
    Record(SourceError),
}

pub(crate) fn deserialize_source<'de, D>(deserializer: D) -> Result<Option<SourceError>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawSource>::deserialize(deserializer)?;
    Ok(raw.map(|r| match r {
        RawSource::Message(m) => SourceError::from_message(m),
        RawSource::Record(s) => s,
    }))
}

pub(crate) fn promoted_stack(source: &SourceError, at: &Location<'_>) -> String {
    format!(
        "{}: {}\n    at {}:{}:{}",
        source.name.as_deref().unwrap_or(GENERIC_NAME),
        source.message,
        at.file(),
        at.line(),
        at.column()
    )
}

// ─── Merge ────────────────────────────────────────────────────────────────────

/// Merge `source` into `target`. Consumes the source; nothing is aliased.
pub(crate) fn merge(target: &mut ServiceError, source: SourceError) {
    let SourceError {
        name,
        error_type: _,
        status_code: _,
        level: _,
        message: _,
        code,
        stack,
        id,
        context,
        help,
        error_details: _,
        property,
        redirect,
        hide_stack,
        metadata,
    } = source;

    tracing::debug!(
        id = %target.id,
        error_type = %target.error_type,
        source = name.as_deref().unwrap_or(GENERIC_NAME),
        "merging wrapped error"
    );

    if target.code.is_none() {
        target.code = code;
    }

    if let Some(source_stack) = stack {
        match target.stack.as_mut() {
            Some(own) => {
                own.push_str("\n\n");
                own.push_str(&source_stack);
            }
            None => target.stack = Some(source_stack),
        }
    }

    if target.id.is_empty() {
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            target.id = id;
        }
    }
    fill_value(&mut target.context, context);
    fill_string(&mut target.help, help);
    fill_string(&mut target.property, property);
    fill_string(&mut target.redirect, redirect);
    if !target.hide_stack {
        target.hide_stack = hide_stack.unwrap_or(false);
    }

    for (key, value) in metadata {
        match target.metadata.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => {
                if is_empty_value(slot.get()) {
                    slot.insert(value);
                }
            }
        }
    }
}

fn fill_string(slot: &mut Option<String>, incoming: Option<String>) {
    if slot.as_deref().map_or(true, str::is_empty) {
        if let Some(v) = incoming.filter(|v| !v.is_empty()) {
            *slot = Some(v);
        }
    }
}

fn fill_value(slot: &mut Option<Value>, incoming: Option<Value>) {
    if slot.as_ref().map_or(true, is_empty_value) {
        if let Some(v) = incoming.filter(|v| !is_empty_value(v)) {
            *slot = Some(v);
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{ErrorKind, Level};
    use crate::options::ErrorOptions;
    use serde_json::json;

    fn not_found(opts: ErrorOptions) -> ServiceError {
        ServiceError::new(ErrorKind::NotFoundError, opts)
    }

    #[test]
    fn takes_source_code_when_unset() {
        let src = SourceError::from_message("missing").with_code("ENOENT");
        let err = not_found(ErrorOptions::new().wrap(src));
        assert_eq!(err.code.as_deref(), Some("ENOENT"));
    }

    #[test]
    fn explicit_code_beats_source_code() {
        let src = SourceError::from_message("missing").with_code("ENOENT");
        let err = not_found(ErrorOptions::new().code("CUSTOM").wrap(src));
        assert_eq!(err.code.as_deref(), Some("CUSTOM"));
    }

    #[test]
    fn classification_is_never_inherited() {
        let src = SourceError {
            name: Some("Ignored".into()),
            error_type: Some("Ignored".into()),
            status_code: Some(599),
            level: Some("critical".into()),
            message: "library blew up".into(),
            ..Default::default()
        };
        let err = not_found(ErrorOptions::new().wrap(src));
        assert_eq!(err.error_type(), ErrorKind::NotFoundError);
        assert_eq!(err.name(), "NotFoundError");
        assert_eq!(err.status_code, 404);
        assert_eq!(err.level, Level::Normal);
        assert_eq!(err.message, "Resource could not be found.");
    }

    #[test]
    fn stacks_are_concatenated_in_order() {
        let src = SourceError::from_message("inner").with_stack("Error: inner\n    at lib.rs:1:1");
        let err = not_found(ErrorOptions::new().wrap(src));
        let stack = err.stack.as_deref().unwrap();
        let (own, wrapped) = stack.split_once("\n\n").unwrap();
        assert!(own.starts_with("NotFoundError: Resource could not be found."));
        assert_eq!(wrapped, "Error: inner\n    at lib.rs:1:1");
    }

    #[test]
    fn other_properties_fill_only_empty_slots() {
        let src = SourceError {
            message: "x".into(),
            help: Some("from source".into()),
            property: Some("source_field".into()),
            redirect: Some("/login".into()),
            context: Some(json!("source context")),
            ..Default::default()
        };
        let err = not_found(ErrorOptions::new().help("own help").wrap(src));
        assert_eq!(err.help.as_deref(), Some("own help"));
        assert_eq!(err.property.as_deref(), Some("source_field"));
        assert_eq!(err.redirect.as_deref(), Some("/login"));
        assert_eq!(err.context, Some(json!("source context")));
    }

    #[test]
    fn error_details_are_never_inherited() {
        let src = SourceError {
            message: "x".into(),
            error_details: Some(json!({"rule": "min"})),
            ..Default::default()
        };
        let err = not_found(ErrorOptions::new().wrap(src));
        assert_eq!(err.error_details, None);
    }

    #[test]
    fn id_is_kept() {
        let src = SourceError {
            message: "x".into(),
            id: Some("foreign-id".into()),
            ..Default::default()
        };
        let err = not_found(ErrorOptions::new().id("own-id").wrap(src));
        assert_eq!(err.id(), "own-id");
    }

    #[test]
    fn metadata_merges_per_key() {
        let src = SourceError::from_message("x")
            .with_metadata("syscall", "open")
            .with_metadata("path", "/etc/app.toml");
        let mut opts = ErrorOptions::new();
        opts.err = Some(src);
        let err = not_found(opts);
        assert_eq!(err.metadata.get("syscall"), Some(&json!("open")));
        assert_eq!(err.metadata.get("path"), Some(&json!("/etc/app.toml")));
    }

    #[test]
    fn hide_stack_is_sticky() {
        let src = SourceError {
            message: "x".into(),
            hide_stack: Some(true),
            ..Default::default()
        };
        let err = not_found(ErrorOptions::new().wrap(src));
        assert!(err.hide_stack);
    }

    #[test]
    fn io_errors_get_errno_codes() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "config missing");
        let src = SourceError::from_io(&io_err);
        assert_eq!(src.code.as_deref(), Some("ENOENT"));
        assert_eq!(src.message, "config missing");
        assert_eq!(src.metadata.get("ioKind"), Some(&json!("NotFound")));

        let other = io::Error::new(io::ErrorKind::Other, "?");
        assert_eq!(SourceError::from_io(&other).code, None);
    }

    #[test]
    fn std_error_chain_is_recorded() {
        #[derive(Debug)]
        struct Outer(io::Error);
        impl std::fmt::Display for Outer {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("loading settings")
            }
        }
        impl StdError for Outer {
            fn source(&self) -> Option<&(dyn StdError + 'static)> {
                Some(&self.0)
            }
        }

        let err = Outer(io::Error::new(io::ErrorKind::Other, "disk on fire"));
        let src = SourceError::from_std(&err);
        assert_eq!(src.message, "loading settings");
        assert_eq!(
            src.stack.as_deref(),
            Some("Error: loading settings\nCaused by: disk on fire")
        );
    }
}
