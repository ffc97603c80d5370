//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while encoding or decoding values and snapshots.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input ended in the middle of an item.
    #[error("unexpected end of input at byte {position}")]
    UnexpectedEof {
        /// Offset at which more bytes were expected.
        position: usize,
    },

    /// Bytes remained after the top-level item was decoded.
    #[error("{remaining} trailing bytes after top-level item")]
    TrailingBytes {
        /// Number of unconsumed bytes.
        remaining: usize,
    },

    /// The top-level item of a snapshot was not a map.
    #[error("snapshot must be a CBOR map, found {found}")]
    NotAMap {
        /// Kind of the item actually found.
        found: &'static str,
    },

    /// Float values are not part of the canonical encoding.
    #[error("float values are not supported")]
    FloatForbidden,

    /// Indefinite-length items are not part of the canonical encoding.
    #[error("indefinite-length items are not supported")]
    IndefiniteLength,

    /// A text string was not valid UTF-8.
    #[error("invalid UTF-8 in text string")]
    InvalidUtf8,

    /// The encoding was valid CBOR but not canonical.
    #[error("non-canonical encoding: {reason}")]
    NonCanonical {
        /// What rule was violated.
        reason: &'static str,
    },

    /// A CBOR construct outside the supported subset.
    #[error("unsupported CBOR item: {what}")]
    Unsupported {
        /// Description of the item.
        what: String,
    },

    /// A length exceeds the codec's limits, when declared by the input or
    /// held by a value being encoded.
    #[error("declared length {claimed} exceeds limit {limit}")]
    SizeLimitExceeded {
        /// Length claimed by the input.
        claimed: u64,
        /// Maximum accepted length.
        limit: u64,
    },

    /// Nesting is deeper than the codec accepts.
    #[error("nesting depth exceeds {limit}")]
    TooDeep {
        /// Maximum accepted depth.
        limit: usize,
    },
}

impl CodecError {
    /// Creates an unsupported-item error.
    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported { what: what.into() }
    }
}
