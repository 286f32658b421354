//! Result and error types for magic-mock.
//!
//! The interception core itself never fails. These errors come from the typed
//! helpers layered on top of it: strict navigation, value conversion and
//! option loading.

use crate::key::Key;
use thiserror::Error;

/// Result type for magic-mock operations
pub type MockResult<T> = Result<T, MockError>;

/// Errors that can occur in magic-mock
#[derive(Debug, Error)]
pub enum MockError {
    /// Navigation reached a key that was explicitly deleted
    #[error("Member '{key}' was deleted")]
    Deleted {
        /// Deleted key
        key: Key,
    },

    /// Navigation reached a member holding a primitive instead of a node
    #[error("Member '{key}' is {found}, not a mock node")]
    NotANode {
        /// Key that was resolved
        key: Key,
        /// Kind of value found there
        found: &'static str,
    },

    /// Navigation tried to step through the reserved meta-key
    #[error("Member '{key}' is the reserved meta-key")]
    MetaKey {
        /// The meta-key
        key: Key,
    },

    /// A value could not be converted to the requested Rust type
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Requested type
        expected: &'static str,
        /// Kind of value found
        found: &'static str,
    },

    /// Option file is unusable
    #[error("Invalid mock options: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}
