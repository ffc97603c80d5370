//! CLI command implementations.

pub mod delete;
pub mod get;
pub mod json;
pub mod list;
pub mod new_key;
pub mod set;

use anystore_core::{Config, Store};
use std::path::PathBuf;

/// The store a command operates on.
#[derive(Debug, Clone)]
pub struct Target {
    /// Persistence file, possibly starting with `~/`.
    pub file: PathBuf,
    /// Base64 key text, if given.
    pub key: Option<String>,
    /// Whether the file carries an authentication tag.
    pub authenticated: bool,
}

impl Target {
    /// Opens a persisted store on the target file.
    pub fn open(&self) -> Result<Store, Box<dyn std::error::Error>> {
        let mut config = Config::new()
            .persistence(true)
            .path(&self.file)
            .authenticated(self.authenticated);
        if let Some(key) = &self.key {
            config = config.encryption_key_base64(key)?;
        }
        Ok(Store::open(config)?)
    }
}
