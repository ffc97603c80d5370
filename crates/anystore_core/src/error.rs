//! Error types for AnyStore core.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend, lock or cipher error.
    #[error("storage error: {0}")]
    Storage(#[from] anystore_storage::StorageError),

    /// Snapshot encoding error.
    #[error("codec error: {0}")]
    Codec(#[from] anystore_codec::CodecError),

    /// Persistence is enabled but no file is configured.
    #[error("persistence enabled but no persistence file is set")]
    NotConfigured,

    /// A stash key was empty.
    #[error("stash key must not be empty")]
    EmptyKey,

    /// Nothing is stored under the key.
    #[error("key not found: {key}")]
    NotFound {
        /// The missing key.
        key: String,
    },

    /// A stashed value could not be converted.
    #[error("serialization error: {message}")]
    Serialization {
        /// What went wrong.
        message: String,
    },
}

impl StoreError {
    /// Creates a not-found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}
