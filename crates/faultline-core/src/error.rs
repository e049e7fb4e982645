//! The service error instance and its construction algorithm.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::Location;

use crate::codec::ErrorRecord;
use crate::id::next_id;
use crate::kind::{ErrorKind, KindDefaults, Level, BASE_DEFAULTS};
use crate::options::{ConstructionError, ErrorOptions};
use crate::wrap;

/// A structured, wire-transportable service error.
///
/// `id` and `error_type` are fixed once construction finishes; every
/// other field may be adjusted afterwards (e.g. attaching `context`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ErrorRecord", from = "ErrorRecord")]
pub struct ServiceError {
    pub(crate) id: String,
    pub(crate) error_type: ErrorKind,
    pub status_code: u16,
    pub level: Level,
    pub message: String,
    /// Free-form diagnostic context (string or object).
    pub context: Option<Value>,
    pub help: Option<String>,
    /// Structured payload, e.g. validation detail. Never inherited from a
    /// wrapped error.
    pub error_details: Option<Value>,
    /// Machine-readable short code.
    pub code: Option<String>,
    /// Offending field, if any.
    pub property: Option<String>,
    pub redirect: Option<String>,
    /// When set, `stack` is left out of serialized records.
    pub hide_stack: bool,
    /// Construction site trace, extended by wrapped errors. `None` only for
    /// instances decoded from a record that carried no stack.
    pub stack: Option<String>,
    /// Custom properties absorbed from wrapped errors.
    pub metadata: BTreeMap<String, Value>,
}

impl ServiceError {
    /// Build an error of `kind`: defaults, then overrides, then the wrapped
    /// error (if any).
    #[track_caller]
    pub fn new(kind: ErrorKind, options: ErrorOptions) -> Self {
        Self::build(kind, kind.defaults(), options, Location::caller())
    }

    /// Build an error of the base kind (500 / normal, classified as
    /// `InternalServerError`).
    #[track_caller]
    pub fn base(options: ErrorOptions) -> Self {
        Self::build(
            ErrorKind::InternalServerError,
            &BASE_DEFAULTS,
            options,
            Location::caller(),
        )
    }

    /// Build from untyped JSON options. Bare strings and other non-records
    /// are rejected as misuse.
    #[track_caller]
    pub fn from_options_value(kind: ErrorKind, options: Value) -> Result<Self, ConstructionError> {
        let options = ErrorOptions::from_value(options)?;
        Ok(Self::build(kind, kind.defaults(), options, Location::caller()))
    }

    fn build(
        kind: ErrorKind,
        defaults: &KindDefaults,
        options: ErrorOptions,
        location: &Location<'_>,
    ) -> Self {
        let mut err = Self {
            id: next_id(),
            error_type: kind,
            status_code: defaults.status_code,
            level: defaults.level,
            message: defaults.message.to_string(),
            context: None,
            help: None,
            error_details: None,
            code: None,
            property: None,
            redirect: None,
            hide_stack: false,
            stack: None,
            metadata: BTreeMap::new(),
        };

        let ErrorOptions {
            id,
            status_code,
            level,
            context,
            help,
            error_type,
            error_details,
            code,
            property,
            redirect,
            message,
            hide_stack,
            err: source,
        } = options;

        if let Some(id) = id {
            err.id = id;
        }
        if let Some(status_code) = status_code {
            err.status_code = status_code;
        }
        if let Some(level) = level {
            err.level = level;
        }
        if let Some(context) = context.filter(|v| !v.is_null()) {
            err.context = Some(context);
        }
        if help.is_some() {
            err.help = help;
        }
        if let Some(error_type) = error_type {
            err.error_type = error_type;
        }
        err.error_details = error_details.filter(|v| !v.is_null());
        err.code = code;
        err.property = property;
        err.redirect = redirect;
        if let Some(message) = message {
            err.message = message;
        }
        err.hide_stack = hide_stack.unwrap_or(false);

        err.stack = Some(format!(
            "{}: {}\n    at {}:{}:{}",
            err.name(),
            err.message,
            location.file(),
            location.line(),
            location.column()
        ));

        if let Some(mut source) = source {
            if source.stack.is_none() {
                source.stack = Some(wrap::promoted_stack(&source, location));
            }
            wrap::merge(&mut err, source);
        }

        tracing::trace!(id = %err.id, error_type = %err.error_type, status = err.status_code, "error constructed");
        err
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn error_type(&self) -> ErrorKind {
        self.error_type
    }

    /// Same as the `error_type` wire name.
    pub fn name(&self) -> &'static str {
        self.error_type.name()
    }

    pub fn is_critical(&self) -> bool {
        self.level == Level::Critical
    }

    /// Attach or replace diagnostic context after construction. A JSON
    /// `null` clears it.
    pub fn with_context(mut self, context: impl Into<Value>) -> Self {
        self.context = Some(context.into()).filter(|v| !v.is_null());
        self
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), self.message)
    }
}

impl std::error::Error for ServiceError {}

// ─── Per-kind constructors ────────────────────────────────────────────────────

macro_rules! kind_constructors {
    ($($fn_name:ident => $kind:ident),* $(,)?) => {
        impl ServiceError {
            $(
                #[doc = concat!("Build a `", stringify!($kind), "`.")]
                #[track_caller]
                pub fn $fn_name(options: ErrorOptions) -> Self {
                    Self::new(ErrorKind::$kind, options)
                }
            )*
        }
    };
}

kind_constructors! {
    internal_server => InternalServerError,
    incorrect_usage => IncorrectUsageError,
    not_found => NotFoundError,
    bad_request => BadRequestError,
    unauthorized => UnauthorizedError,
    password_reset_required => PasswordResetRequiredError,
    no_permission => NoPermissionError,
    validation => ValidationError,
    unsupported_media_type => UnsupportedMediaTypeError,
    too_many_requests => TooManyRequestsError,
    maintenance => MaintenanceError,
    method_not_allowed => MethodNotAllowedError,
    request_entity_too_large => RequestEntityTooLargeError,
    token_revocation => TokenRevocationError,
    version_mismatch => VersionMismatchError,
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_kind_gets_its_defaults() {
        for kind in ErrorKind::ALL {
            let err = ServiceError::new(kind, ErrorOptions::new());
            let d = kind.defaults();
            assert_eq!(err.status_code, d.status_code, "{kind}");
            assert_eq!(err.level, d.level, "{kind}");
            assert_eq!(err.message, d.message, "{kind}");
            assert_eq!(err.error_type(), kind);
            assert_eq!(err.name(), kind.name());
            assert!(!err.id().is_empty());
            assert_eq!(err.code, None);
            assert_eq!(err.property, None);
            assert_eq!(err.redirect, None);
            assert!(!err.hide_stack);
        }
    }

    #[test]
    fn base_kind_is_normal_internal_error() {
        let err = ServiceError::base(ErrorOptions::new());
        assert_eq!(err.error_type(), ErrorKind::InternalServerError);
        assert_eq!(err.status_code, 500);
        assert_eq!(err.level, Level::Normal);

        let typed = ServiceError::internal_server(ErrorOptions::new());
        assert_eq!(typed.level, Level::Critical);
    }

    #[test]
    fn overrides_apply_after_defaults() {
        let err = ServiceError::validation(
            ErrorOptions::new()
                .id("fixed-id")
                .status_code(400)
                .level(Level::Critical)
                .message("Email is invalid")
                .property("email")
                .help("Use a valid address")
                .context(json!({"input": "not-an-email"}))
                .error_details(json!([{"rule": "format"}]))
                .redirect("/signup")
                .hide_stack(true),
        );
        assert_eq!(err.id(), "fixed-id");
        assert_eq!(err.status_code, 400);
        assert_eq!(err.level, Level::Critical);
        assert_eq!(err.message, "Email is invalid");
        assert_eq!(err.property.as_deref(), Some("email"));
        assert_eq!(err.help.as_deref(), Some("Use a valid address"));
        assert_eq!(err.context, Some(json!({"input": "not-an-email"})));
        assert_eq!(err.error_details, Some(json!([{"rule": "format"}])));
        assert_eq!(err.redirect.as_deref(), Some("/signup"));
        assert!(err.hide_stack);
    }

    #[test]
    fn error_type_override_only_reclassifies() {
        let err = ServiceError::not_found(ErrorOptions::new().error_type(ErrorKind::NoPermissionError));
        assert_eq!(err.name(), "NoPermissionError");
        assert_eq!(err.status_code, 404);
        assert_eq!(err.message, "Resource could not be found.");
    }

    #[test]
    fn stack_points_at_call_site() {
        let err = ServiceError::not_found(ErrorOptions::new().message("no post"));
        let stack = err.stack.as_deref().unwrap();
        assert!(stack.starts_with("NotFoundError: no post\n    at "));
        assert!(stack.contains("error.rs"), "{stack}");
    }

    #[test]
    fn bare_string_options_are_misuse() {
        let res = ServiceError::from_options_value(ErrorKind::ValidationError, json!("oops"));
        assert!(matches!(res, Err(ConstructionError::BareString(_))));

        let ok = ServiceError::from_options_value(
            ErrorKind::ValidationError,
            json!({"message": "Email is invalid", "property": "email"}),
        )
        .unwrap();
        assert_eq!(ok.status_code, 422);
        assert_eq!(ok.property.as_deref(), Some("email"));
    }

    #[test]
    fn bare_string_err_in_json_options_keeps_its_stack() {
        let err = ServiceError::from_options_value(
            ErrorKind::NotFoundError,
            json!({"err": "socket hang up"}),
        )
        .unwrap();
        let stack = err.stack.as_deref().unwrap();
        let (own, wrapped) = stack.split_once("\n\n").unwrap();
        assert!(own.starts_with("NotFoundError: Resource could not be found."));
        assert!(wrapped.starts_with("Error: socket hang up\n    at "), "{wrapped}");
        assert!(wrapped.contains("error.rs"), "{wrapped}");
        assert_eq!(err.message, "Resource could not be found.");
    }

    #[test]
    fn null_context_and_details_are_absent() {
        let err = ServiceError::not_found(
            ErrorOptions::new()
                .context(Value::Null)
                .error_details(Value::Null),
        );
        assert_eq!(err.context, None);
        assert_eq!(err.error_details, None);
        assert_eq!(err.clone().with_context(Value::Null).context, None);

        let back = crate::codec::from_json(&crate::codec::to_json(&err).unwrap()).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn display_and_std_error() {
        let err = ServiceError::unauthorized(ErrorOptions::new());
        assert_eq!(
            err.to_string(),
            "UnauthorizedError: You are not authorised to make this request."
        );
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(err);
        assert!(boxed.to_string().starts_with("UnauthorizedError"));
    }

    #[test]
    fn context_can_be_attached_later() {
        let err = ServiceError::maintenance(ErrorOptions::new()).with_context("nightly migration");
        assert_eq!(err.context, Some(json!("nightly migration")));
    }
}
