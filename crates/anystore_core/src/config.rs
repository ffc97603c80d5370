//! Store configuration.

use crate::error::{StoreError, StoreResult};
use anystore_storage::{EncryptionKey, SnapshotCipher, StorageError};
use std::io;
use std::path::{Path, PathBuf};

/// Conventional location of a persistence file. A leading `~/` is resolved
/// against the user's home directory.
pub const DEFAULT_PERSISTENCE_FILE: &str = "~/.config/anystore/anystore.db";

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether operations go through the persistence file.
    pub persist: bool,

    /// The persistence file. May start with `~/`.
    pub path: Option<PathBuf>,

    /// Encryption key. `None` selects the insecure default key.
    pub encryption_key: Option<EncryptionKey>,

    /// Whether files carry an HMAC-SHA256 tag.
    pub authenticated: bool,

    /// Whether missing parent directories of `path` are created.
    pub create_dirs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            persist: false,
            path: None,
            encryption_key: None,
            authenticated: false,
            create_dirs: true,
        }
    }
}

impl Config {
    /// Creates a configuration with default values: in-memory only,
    /// default key, plain file format.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether persistence is enabled.
    #[must_use]
    pub const fn persistence(mut self, value: bool) -> Self {
        self.persist = value;
        self
    }

    /// Sets the persistence file.
    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the encryption key.
    #[must_use]
    pub fn encryption_key(mut self, key: EncryptionKey) -> Self {
        self.encryption_key = Some(key);
        self
    }

    /// Sets the encryption key from its base64 text.
    ///
    /// # Errors
    ///
    /// Fails if the text is not a valid key.
    pub fn encryption_key_base64(self, text: &str) -> StoreResult<Self> {
        Ok(self.encryption_key(EncryptionKey::from_base64(text)?))
    }

    /// Sets whether files carry an authentication tag.
    #[must_use]
    pub const fn authenticated(mut self, value: bool) -> Self {
        self.authenticated = value;
        self
    }

    /// Sets whether missing parent directories are created.
    #[must_use]
    pub const fn create_dirs(mut self, value: bool) -> Self {
        self.create_dirs = value;
        self
    }

    /// The cipher described by this configuration.
    pub(crate) fn cipher(&self) -> StoreResult<SnapshotCipher> {
        let key = match &self.encryption_key {
            Some(key) => key.clone(),
            None => EncryptionKey::insecure_default()?,
        };
        Ok(if self.authenticated {
            SnapshotCipher::authenticated(key)
        } else {
            SnapshotCipher::new(key)
        })
    }
}

/// Resolves a leading `~/` against the home directory.
///
/// # Errors
///
/// Fails if the path needs the home directory and it cannot be determined.
pub fn resolve_home(path: &Path) -> StoreResult<PathBuf> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };

    let home = dirs::home_dir().ok_or_else(|| {
        StoreError::Storage(StorageError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            "cannot resolve ~: home directory unknown",
        )))
    })?;
    Ok(home.join(rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(!config.persist);
        assert!(config.path.is_none());
        assert!(config.encryption_key.is_none());
        assert!(!config.authenticated);
        assert!(config.create_dirs);
    }

    #[test]
    fn builder_pattern() {
        let key = EncryptionKey::from_bytes(&[3; 16]).unwrap();
        let config = Config::new()
            .persistence(true)
            .path("/tmp/store.db")
            .encryption_key(key.clone())
            .authenticated(true)
            .create_dirs(false);

        assert!(config.persist);
        assert_eq!(config.path.as_deref(), Some(Path::new("/tmp/store.db")));
        assert_eq!(config.encryption_key, Some(key));
        assert!(config.authenticated);
        assert!(!config.create_dirs);
        assert!(config.cipher().unwrap().is_authenticated());
    }

    #[test]
    fn default_key_when_unset() {
        let cipher = Config::new().cipher().unwrap();
        assert_eq!(cipher.key(), &EncryptionKey::insecure_default().unwrap());
        assert!(!cipher.is_authenticated());
    }

    #[test]
    fn bad_key_text_rejected() {
        assert!(Config::new().encryption_key_base64("AAAA").is_err());
    }

    #[test]
    fn resolve_home_only_touches_tilde_prefix() {
        assert_eq!(
            resolve_home(Path::new("/abs/file.db")).unwrap(),
            PathBuf::from("/abs/file.db")
        );
        assert_eq!(
            resolve_home(Path::new("rel/~file.db")).unwrap(),
            PathBuf::from("rel/~file.db")
        );
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                resolve_home(Path::new("~/.config/x.db")).unwrap(),
                home.join(".config/x.db")
            );
        }
    }
}
