//! Error Types
//!
//! Only programmer misuse escapes the runtime as a hard failure. Everything
//! that happens on the data path (persistence, submission, validation) is
//! recovered where it occurs and reported through `tracing` instead.

use thiserror::Error;

/// Misuse of the store API.
///
/// This is the only error kind the runtime returns to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidOperation {
    /// Selectors are derived, read-only views.
    #[error("cannot set value on a selector")]
    SetOnSelector,

    /// A named store with this name is already registered.
    #[error("store with name \"{name}\" already exists")]
    StoreExists { name: String },

    /// No named store with this name is registered.
    #[error("store with name \"{name}\" not found")]
    StoreNotFound { name: String },

    /// The named store exists but holds a different value type.
    #[error("store with name \"{name}\" does not hold values of type {expected}")]
    StoreTypeMismatch {
        name: String,
        expected: &'static str,
    },
}

/// Failure reported by a [`KeyValueStorage`](crate::store::KeyValueStorage) backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("storage error for key \"{key}\": {message}")]
pub struct StorageError {
    pub key: String,
    pub message: String,
}

impl StorageError {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Failure inside the persistence middleware.
///
/// Never returned to callers; logged and swallowed so the store keeps
/// operating on its in-memory value.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to decode persisted value for key \"{key}\": {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode value for key \"{key}\": {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Error type a form submit handler may return.
pub type SubmitError = Box<dyn std::error::Error + Send + Sync>;
