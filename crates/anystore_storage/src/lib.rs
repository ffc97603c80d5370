//! # AnyStore Storage
//!
//! Where snapshot bytes live, and how they are protected.
//!
//! - [`SnapshotBackend`] - a blob replaced atomically, with an exclusive
//!   writer lock
//! - [`FileBackend`] - temp file, fsync, rename, directory fsync; `flock` on
//!   `<path>.lock` across processes
//! - [`InMemoryBackend`] - for tests
//! - [`SnapshotCipher`] - AES-CFB with a random IV, optionally followed by an
//!   HMAC-SHA256 tag
//!
//! Backends do not interpret the bytes they hold. Encoding is done by
//! `anystore_codec`, encryption by this crate's [`cipher`] functions.
//!
//! ## Example
//!
//! ```rust
//! use anystore_storage::{EncryptionKey, InMemoryBackend, SnapshotBackend, SnapshotCipher};
//!
//! let cipher = SnapshotCipher::new(EncryptionKey::generate().unwrap());
//! let backend = InMemoryBackend::new();
//!
//! backend.replace(&cipher.seal(b"hello").unwrap()).unwrap();
//! assert_eq!(cipher.open(&backend.read().unwrap()).unwrap(), b"hello");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
pub mod cipher;
mod error;
mod file;
mod key;
mod memory;
mod random;

pub use backend::{ExclusiveLock, SnapshotBackend};
pub use cipher::{
    decrypt, decrypt_authenticated, encrypt, encrypt_authenticated, SnapshotCipher, IV_SIZE,
    TAG_SIZE,
};
pub use error::{StorageError, StorageResult};
pub use file::{FileBackend, StagedWrite, LOCK_SUFFIX};
pub use key::{EncryptionKey, DEFAULT_ENCRYPTION_KEY, KEY_SIZES, MAX_KEY_SIZE};
pub use memory::InMemoryBackend;
pub use random::{fill_random, RANDOM_RETRIES};
