//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while reading, writing or ciphering a snapshot file.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The encryption key is not 16, 24 or 32 bytes long.
    #[error("invalid key length {actual}: AES keys are 16, 24 or 32 bytes")]
    InvalidKeyLength {
        /// Length of the rejected key.
        actual: usize,
    },

    /// The key text is not valid base64.
    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    /// Ciphertext too short to contain its IV (and tag).
    #[error("ciphertext too short: {len} bytes, need at least {min}")]
    ShortInput {
        /// Length of the input.
        len: usize,
        /// Minimum acceptable length.
        min: usize,
    },

    /// The authentication tag of an authenticated file did not verify.
    #[error("authentication failed: wrong key or tampered file")]
    AuthenticationFailed,

    /// The cross-process lock could not be acquired.
    #[error("failed to lock {path}: {source}")]
    Lock {
        /// Path of the lock file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Fewer bytes reached the temporary file than were handed in.
    #[error("short write to {path}: expected {expected} bytes")]
    ShortWrite {
        /// Path of the temporary file.
        path: PathBuf,
        /// Number of bytes that should have been written.
        expected: usize,
    },

    /// The operating system random number generator kept failing.
    #[error("randomness unavailable: {0}")]
    RandomnessUnavailable(String),
}

impl StorageError {
    /// Creates a lock error for `path`.
    pub fn lock(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Lock {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the error came from the cipher layer rather than I/O.
    #[must_use]
    pub fn is_cipher_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidKeyLength { .. } | Self::ShortInput { .. } | Self::AuthenticationFailed
        )
    }
}
