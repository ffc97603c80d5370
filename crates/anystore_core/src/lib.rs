//! # AnyStore Core
//!
//! A key/value store of dynamically typed [`Value`]s that can be shared
//! between threads, and between processes through an encrypted file.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Store / Unlocked        (KeyValue, run)     │
//! ├──────────────────────────────────────────────┤
//! │  SnapshotCell            Arc<Snapshot>, CoW  │
//! ├──────────────────────────────────────────────┤
//! │  PersistenceEngine       reconcile, save     │
//! ├──────────────────────────────────────────────┤
//! │  SnapshotCipher          AES-CFB (+HMAC)     │
//! │  SnapshotBackend         rename, flock       │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! - Readers never see a half-built snapshot: every write publishes a new
//!   one.
//! - With persistence enabled the file is the source of truth. A write
//!   re-reads it under a cross-process lock, applies its change and
//!   atomically replaces it, so concurrent writers never lose each other's
//!   keys.
//! - [`KeyValue::run`] executes a batch under a single hold of the write
//!   lock.
//!
//! ## Example
//!
//! ```rust,no_run
//! use anystore_core::{Config, KeyValue, Store, StoreResult, Value};
//!
//! fn main() -> StoreResult<()> {
//!     let store = Store::open(Config::new().persistence(true).path("~/.config/demo/demo.db"))?;
//!
//!     store.store("hello", "world")?;
//!     store.run(|kv| {
//!         let n = kv.load("counter")?.and_then(|v| v.as_integer()).unwrap_or(0);
//!         kv.store("counter", n + 1)
//!     })?;
//!
//!     assert_eq!(store.load("hello")?, Some(Value::from("world")));
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod persist;
mod snapshot;
pub mod stash;
mod store;

pub use config::{resolve_home, Config, DEFAULT_PERSISTENCE_FILE};
pub use error::{StoreError, StoreResult};
pub use persist::PersistenceEngine;
pub use snapshot::{Change, Snapshot};
pub use stash::{stash, unstash, unstash_or, StashConfig};
pub use store::{KeyValue, Store, Unlocked};

pub use anystore_codec::{CodecError, Value, ValueMap};
pub use anystore_storage::{
    EncryptionKey, FileBackend, InMemoryBackend, SnapshotBackend, SnapshotCipher,
    DEFAULT_ENCRYPTION_KEY,
};
