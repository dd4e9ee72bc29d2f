//! # Core Type Definitions
//!
//! This module contains the shared types of the Albumin core:
//! - Content keys (`ContentKey`)
//! - Error types (`AlbuminError`)
//!
//! Types that belong to one component (evidence, wire messages, record
//! values) live next to that component.

use crate::evidence::Evidence;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// CONTENT KEY
// =============================================================================

/// Stable identifier derived from file content.
///
/// Produced by an external content-addressing collaborator and used as the
/// primary lookup key into the metadata record store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentKey(pub String);

impl ContentKey {
    /// Create a new key from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Albumin core.
///
/// - Evidence-level failures (`InvalidEvidence`) are filtered by callers
/// - Key-level conflicts and protocol failures abort a reconciliation pass
/// - The core never panics; all errors are returned
#[derive(Debug, Error)]
pub enum AlbuminError {
    /// The evidence method is not ranked or its value is not a timestamp.
    #[error("Invalid evidence: {0}")]
    InvalidEvidence(String),

    /// Two equally trusted observations disagree for one key.
    #[error("Conflicting evidence for {key}: {first} vs {second}")]
    Conflict {
        key: ContentKey,
        first: Evidence,
        second: Evidence,
    },

    /// Attempted to write or delete a service-maintained field.
    #[error("Field {field} is maintained by the metadata service")]
    ImmutableField { field: String },

    /// A conceptually single-valued field holds (or would hold) several values.
    #[error("Field {field} of {key} holds {count} values, expected one")]
    MultipleValues {
        key: ContentKey,
        field: String,
        count: usize,
    },

    /// The metadata service answered with something that is not a response.
    #[error("Protocol error: {message} (raw response: {raw:?})")]
    Protocol { message: String, raw: String },

    /// Graceful shutdown exceeded its bound and killing was not allowed.
    #[error("Metadata service (pid {pid}) did not exit within {waited:?}")]
    Timeout { pid: u32, waited: Duration },

    /// The session was used after it was stopped.
    #[error("Metadata session is stopped")]
    SessionStopped,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AlbuminError {
    /// Build a protocol error carrying the offending raw line.
    pub(crate) fn protocol(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
            raw: raw.into(),
        }
    }
}

impl From<std::io::Error> for AlbuminError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
