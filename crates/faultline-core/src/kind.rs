//! Error kind registry: the closed set of error kinds and their defaults.
//!
//! The registry is a static table: every [`ErrorKind`] maps to exactly one
//! [`KindDefaults`] record that never changes at runtime, so lookups are
//! lock-free and safe from any thread.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─── Level ────────────────────────────────────────────────────────────────────

/// Severity of an error instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Normal,
    Critical,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "critical" => Ok(Self::Critical),
            other => Err(UnknownLevel(other.to_string())),
        }
    }
}

/// Returned when parsing a level name that is neither `normal` nor `critical`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown level: {0}")]
pub struct UnknownLevel(pub String);

// ─── KindDefaults ─────────────────────────────────────────────────────────────

/// Default properties applied to every new instance of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindDefaults {
    /// HTTP-style status code.
    pub status_code: u16,
    pub level: Level,
    /// User-facing default message.
    pub message: &'static str,
}

const INTERNAL_MESSAGE: &str = "The server has encountered an error.";

/// Defaults of the base kind, used when an error is constructed without
/// choosing a concrete kind. Same classification as `InternalServerError`
/// but at `normal` severity.
pub const BASE_DEFAULTS: KindDefaults = KindDefaults {
    status_code: 500,
    level: Level::Normal,
    message: INTERNAL_MESSAGE,
};

// ─── ErrorKind ────────────────────────────────────────────────────────────────

/// The closed taxonomy of service error kinds.
///
/// Variant names are the wire names (`"NotFoundError"`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorKind {
    InternalServerError,
    IncorrectUsageError,
    NotFoundError,
    BadRequestError,
    UnauthorizedError,
    PasswordResetRequiredError,
    NoPermissionError,
    ValidationError,
    UnsupportedMediaTypeError,
    TooManyRequestsError,
    MaintenanceError,
    MethodNotAllowedError,
    RequestEntityTooLargeError,
    TokenRevocationError,
    VersionMismatchError,
}

/// `(kind, defaults)` in declaration order. Indexed by `kind as usize`.
static REGISTRY: [(ErrorKind, KindDefaults); 15] = [
    (ErrorKind::InternalServerError, KindDefaults {
        status_code: 500,
        level: Level::Critical,
        message: INTERNAL_MESSAGE,
    }),
    (ErrorKind::IncorrectUsageError, KindDefaults {
        status_code: 400,
        level: Level::Critical,
        message: "We detected a misuse. Please read the stack trace.",
    }),
    (ErrorKind::NotFoundError, KindDefaults {
        status_code: 404,
        level: Level::Normal,
        message: "Resource could not be found.",
    }),
    (ErrorKind::BadRequestError, KindDefaults {
        status_code: 400,
        level: Level::Normal,
        message: "The request could not be understood.",
    }),
    (ErrorKind::UnauthorizedError, KindDefaults {
        status_code: 401,
        level: Level::Normal,
        message: "You are not authorised to make this request.",
    }),
    (ErrorKind::PasswordResetRequiredError, KindDefaults {
        status_code: 401,
        level: Level::Normal,
        message: "As a security precaution, your password must be reset. Click \"Forgot?\" to receive an email with instructions.",
    }),
    (ErrorKind::NoPermissionError, KindDefaults {
        status_code: 403,
        level: Level::Normal,
        message: "You do not have permission to perform this request.",
    }),
    (ErrorKind::ValidationError, KindDefaults {
        status_code: 422,
        level: Level::Normal,
        message: "The request failed validation.",
    }),
    (ErrorKind::UnsupportedMediaTypeError, KindDefaults {
        status_code: 415,
        level: Level::Normal,
        message: "The media in the request is not supported by the server.",
    }),
    (ErrorKind::TooManyRequestsError, KindDefaults {
        status_code: 429,
        level: Level::Normal,
        message: "Server has received too many similar requests in a short space of time.",
    }),
    (ErrorKind::MaintenanceError, KindDefaults {
        status_code: 503,
        level: Level::Normal,
        message: "The server is temporarily down for maintenance.",
    }),
    (ErrorKind::MethodNotAllowedError, KindDefaults {
        status_code: 405,
        level: Level::Normal,
        message: "Method not allowed for resource.",
    }),
    (ErrorKind::RequestEntityTooLargeError, KindDefaults {
        status_code: 413,
        level: Level::Normal,
        message: "Request was too big for the server to handle.",
    }),
    (ErrorKind::TokenRevocationError, KindDefaults {
        status_code: 503,
        level: Level::Normal,
        message: "Token is no longer available.",
    }),
    (ErrorKind::VersionMismatchError, KindDefaults {
        status_code: 400,
        level: Level::Normal,
        message: "Requested version does not match server version.",
    }),
];

impl ErrorKind {
    /// Every kind, in registry order.
    pub const ALL: [ErrorKind; 15] = [
        Self::InternalServerError,
        Self::IncorrectUsageError,
        Self::NotFoundError,
        Self::BadRequestError,
        Self::UnauthorizedError,
        Self::PasswordResetRequiredError,
        Self::NoPermissionError,
        Self::ValidationError,
        Self::UnsupportedMediaTypeError,
        Self::TooManyRequestsError,
        Self::MaintenanceError,
        Self::MethodNotAllowedError,
        Self::RequestEntityTooLargeError,
        Self::TokenRevocationError,
        Self::VersionMismatchError,
    ];

    /// The wire name of this kind (also used as the instance `name`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::InternalServerError => "InternalServerError",
            Self::IncorrectUsageError => "IncorrectUsageError",
            Self::NotFoundError => "NotFoundError",
            Self::BadRequestError => "BadRequestError",
            Self::UnauthorizedError => "UnauthorizedError",
            Self::PasswordResetRequiredError => "PasswordResetRequiredError",
            Self::NoPermissionError => "NoPermissionError",
            Self::ValidationError => "ValidationError",
            Self::UnsupportedMediaTypeError => "UnsupportedMediaTypeError",
            Self::TooManyRequestsError => "TooManyRequestsError",
            Self::MaintenanceError => "MaintenanceError",
            Self::MethodNotAllowedError => "MethodNotAllowedError",
            Self::RequestEntityTooLargeError => "RequestEntityTooLargeError",
            Self::TokenRevocationError => "TokenRevocationError",
            Self::VersionMismatchError => "VersionMismatchError",
        }
    }

    /// The registered defaults for this kind.
    pub fn defaults(&self) -> &'static KindDefaults {
        &REGISTRY[*self as usize].1
    }

    /// Returns `true` if this kind defaults to `critical` severity.
    pub fn is_critical(&self) -> bool {
        self.defaults().level == Level::Critical
    }

    /// Look up a kind by its wire name.
    pub fn lookup(name: &str) -> Option<ErrorKind> {
        REGISTRY.iter().map(|(k, _)| *k).find(|k| k.name() == name)
    }

    /// Resolve a kind name coming from external input.
    ///
    /// Unknown names resolve to `InternalServerError`; the producer may run
    /// a newer registry than ours.
    pub fn resolve(name: &str) -> ErrorKind {
        match Self::lookup(name) {
            Some(kind) => kind,
            None => {
                tracing::warn!(
                    error_type = name,
                    "unknown error kind, falling back to InternalServerError"
                );
                Self::InternalServerError
            }
        }
    }
}

impl Default for ErrorKind {
    fn default() -> Self {
        Self::InternalServerError
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ErrorKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::lookup(s).ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Returned by the strict [`FromStr`] parse of a kind name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown error kind: {0}")]
pub struct UnknownKind(pub String);

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_indexed_by_discriminant() {
        for kind in ErrorKind::ALL {
            assert_eq!(REGISTRY[kind as usize].0, kind);
        }
    }

    #[test]
    fn names_roundtrip_through_lookup() {
        for kind in ErrorKind::ALL {
            assert_eq!(ErrorKind::lookup(kind.name()), Some(kind));
            assert_eq!(kind.name().parse::<ErrorKind>(), Ok(kind));
        }
    }

    #[test]
    fn serde_name_matches_wire_name() {
        for kind in ErrorKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
        }
    }

    #[test]
    fn known_defaults() {
        let d = ErrorKind::ValidationError.defaults();
        assert_eq!(d.status_code, 422);
        assert_eq!(d.level, Level::Normal);
        assert_eq!(d.message, "The request failed validation.");

        assert_eq!(ErrorKind::NotFoundError.defaults().status_code, 404);
        assert_eq!(ErrorKind::TooManyRequestsError.defaults().status_code, 429);
        assert_eq!(ErrorKind::TokenRevocationError.defaults().status_code, 503);
    }

    #[test]
    fn critical_kinds() {
        let critical: Vec<_> = ErrorKind::ALL.iter().filter(|k| k.is_critical()).collect();
        assert_eq!(
            critical,
            vec![&ErrorKind::InternalServerError, &ErrorKind::IncorrectUsageError]
        );
    }

    #[test]
    fn unknown_name_falls_back() {
        assert_eq!(ErrorKind::lookup("TotallyUnknownKind"), None);
        assert_eq!(
            ErrorKind::resolve("TotallyUnknownKind"),
            ErrorKind::InternalServerError
        );
        assert!("TotallyUnknownKind".parse::<ErrorKind>().is_err());
    }

    #[test]
    fn level_parse_and_display() {
        assert_eq!("critical".parse::<Level>(), Ok(Level::Critical));
        assert_eq!(Level::Normal.to_string(), "normal");
        assert!("warning".parse::<Level>().is_err());
    }
}
