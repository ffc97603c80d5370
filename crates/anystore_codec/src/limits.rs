//! Bounds shared by the encoder and the decoder.
//!
//! Both sides enforce the same numbers, so every value that can be written
//! can be read back.

/// Maximum element count for arrays and maps, against allocation attacks.
pub const MAX_CONTAINER_ELEMENTS: u64 = 16 * 1024 * 1024;

/// Maximum byte/text string length.
pub const MAX_BYTES_LENGTH: u64 = 256 * 1024 * 1024;

/// Maximum nesting of arrays and maps inside one value.
pub const MAX_DEPTH: usize = 128;
