//! # AnyStore Testkit
//!
//! Test utilities for AnyStore.
//!
//! This crate provides:
//! - Store fixtures backed by temporary directories
//! - Property-based test generators using proptest
//! - A crash-injecting backend and a recovery harness
//!
//! ## Usage
//!
//! ```rust
//! use anystore_core::KeyValue;
//! use anystore_testkit::prelude::*;
//!
//! with_temp_file_store(|fixture| {
//!     fixture.store("hello", "world").unwrap();
//!     assert_eq!(fixture.reopen().len().unwrap(), 1);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
