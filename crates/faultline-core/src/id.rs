//! Identity generator for error instances.

use uuid::Uuid;

/// Produce a fresh, time-ordered error id (UUIDv7, hyphenated lowercase).
///
/// Safe to call from any number of threads; no caller-side coordination.
pub fn next_id() -> String {
    Uuid::now_v7().to_string()
}
