//! Keeping one serializable value under one key of a persisted store.
//!
//! Values are encoded with `ciborium` and stored as [`Value::Bytes`], so any
//! `serde` type works, floats included.

use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::store::{KeyValue, Store};
use anystore_codec::Value;
use anystore_storage::EncryptionKey;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;

/// Where and under which key a value is stashed.
#[derive(Debug, Clone)]
pub struct StashConfig {
    /// The persistence file. May start with `~/`.
    pub path: PathBuf,
    /// Encryption key. `None` selects the insecure default key.
    pub encryption_key: Option<EncryptionKey>,
    /// Text key the value is stored under.
    pub key: String,
}

impl StashConfig {
    /// Creates a configuration using the default key.
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            encryption_key: None,
            key: key.into(),
        }
    }

    /// Sets the encryption key.
    #[must_use]
    pub fn encryption_key(mut self, key: EncryptionKey) -> Self {
        self.encryption_key = Some(key);
        self
    }

    fn open(&self) -> StoreResult<Store> {
        if self.key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        let mut config = Config::new().persistence(true).path(&self.path);
        config.encryption_key = self.encryption_key.clone();
        Store::open(config)
    }
}

/// Serializes `thing` and stores it under `config.key`.
///
/// # Errors
///
/// Fails with [`StoreError::EmptyKey`], [`StoreError::Serialization`], or
/// any error of [`KeyValue::store`].
pub fn stash<T: Serialize + ?Sized>(config: &StashConfig, thing: &T) -> StoreResult<()> {
    let store = config.open()?;
    let mut bytes = Vec::new();
    ciborium::into_writer(thing, &mut bytes)
        .map_err(|e| StoreError::serialization(format!("encoding {}: {e}", config.key)))?;
    store.store(config.key.as_str(), bytes)?;
    tracing::debug!(key = %config.key, path = %config.path.display(), "stashed value");
    Ok(())
}

/// Loads the value stashed under `config.key`.
///
/// # Errors
///
/// Fails with [`StoreError::NotFound`] if nothing is stashed, and
/// [`StoreError::Serialization`] if the stored value does not decode as `T`.
pub fn unstash<T: DeserializeOwned>(config: &StashConfig) -> StoreResult<T> {
    let store = config.open()?;
    match store.load(config.key.as_str())? {
        Some(value) => decode(&config.key, &value),
        None => Err(StoreError::not_found(config.key.clone())),
    }
}

/// Like [`unstash`], returning `default` if nothing is stashed.
///
/// # Errors
///
/// See [`unstash`]; absence is not an error.
pub fn unstash_or<T: DeserializeOwned>(config: &StashConfig, default: T) -> StoreResult<T> {
    match unstash(config) {
        Err(StoreError::NotFound { .. }) => Ok(default),
        other => other,
    }
}

fn decode<T: DeserializeOwned>(key: &str, value: &Value) -> StoreResult<T> {
    let bytes = value.as_bytes().ok_or_else(|| {
        StoreError::serialization(format!("{key} holds {}, not stashed bytes", value.kind()))
    })?;
    ciborium::from_reader(bytes)
        .map_err(|e| StoreError::serialization(format!("decoding {key}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Settings {
        name: String,
        retries: u32,
        ratio: f64,
        tags: Vec<String>,
    }

    fn sample() -> Settings {
        Settings {
            name: "Alice".into(),
            retries: 3,
            ratio: 0.75,
            tags: vec!["a".into(), "b".into()],
        }
    }

    #[test]
    fn stash_then_unstash() {
        let dir = tempdir().unwrap();
        let config = StashConfig::new(dir.path().join("stash.db"), "settings");

        stash(&config, &sample()).unwrap();
        assert_eq!(unstash::<Settings>(&config).unwrap(), sample());
    }

    #[test]
    fn missing_value() {
        let dir = tempdir().unwrap();
        let config = StashConfig::new(dir.path().join("stash.db"), "settings");

        assert!(matches!(
            unstash::<Settings>(&config),
            Err(StoreError::NotFound { key }) if key == "settings"
        ));

        let mut fallback = sample();
        fallback.retries = 9;
        assert_eq!(unstash_or(&config, fallback.clone()).unwrap(), fallback);
    }

    #[test]
    fn empty_key_rejected() {
        let dir = tempdir().unwrap();
        let config = StashConfig::new(dir.path().join("stash.db"), "");
        assert!(matches!(stash(&config, &1u8), Err(StoreError::EmptyKey)));
        assert!(matches!(unstash::<u8>(&config), Err(StoreError::EmptyKey)));
    }

    #[test]
    fn non_bytes_value_is_serialization_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stash.db");
        let store = Store::open(Config::new().persistence(true).path(&path)).unwrap();
        store.store("settings", "plain text").unwrap();

        let config = StashConfig::new(&path, "settings");
        assert!(matches!(
            unstash::<Settings>(&config),
            Err(StoreError::Serialization { .. })
        ));
    }

    #[test]
    fn stash_respects_key() {
        let dir = tempdir().unwrap();
        let key = EncryptionKey::generate().unwrap();
        let config = StashConfig::new(dir.path().join("stash.db"), "n").encryption_key(key);
        stash(&config, &42i64).unwrap();

        let wrong = StashConfig::new(dir.path().join("stash.db"), "n");
        assert!(unstash::<i64>(&wrong).is_err());
        assert_eq!(unstash::<i64>(&config).unwrap(), 42);
    }
}
