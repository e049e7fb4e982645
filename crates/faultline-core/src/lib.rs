//! faultline-core: a typed, wire-transportable service error taxonomy.
//!
//! This crate defines:
//! - [`ErrorKind`]: the closed set of error kinds and their registered defaults
//! - [`ServiceError`]: an error instance, built from [`ErrorOptions`]
//! - [`SourceError`]: a foreign error that can be wrapped into a typed one
//! - [`codec`]: serialize/deserialize to a transport-safe [`ErrorRecord`]
//!
//! # Quick Start
//!
//! ```rust
//! use faultline_core::{codec, ErrorOptions, ServiceError};
//!
//! let err = ServiceError::validation(
//!     ErrorOptions::new().property("email").message("Email is invalid"),
//! );
//! assert_eq!(err.status_code, 422);
//!
//! let json = codec::to_json(&err).unwrap();
//! let back = codec::from_json(&json).unwrap();
//! assert_eq!(back, err);
//! ```

pub mod codec;
pub mod error;
pub mod id;
pub mod kind;
pub mod options;
pub mod wrap;

pub use codec::{is_taxonomy_error, CodecError, ErrorRecord};
pub use error::ServiceError;
pub use kind::{ErrorKind, KindDefaults, Level};
pub use options::{ConstructionError, ErrorOptions};
pub use wrap::SourceError;
