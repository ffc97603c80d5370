//! Test fixtures and store helpers.

use anystore_core::{Config, Store};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// File name used for fixture stores.
pub const FIXTURE_FILE: &str = "anystore.db";

/// A store with automatic cleanup of its directory.
pub struct TestStore {
    /// The store instance.
    pub store: Store,
    config: Config,
    path: Option<PathBuf>,
    /// Kept alive to prevent cleanup.
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates an in-memory store.
    pub fn memory() -> Self {
        let config = Config::new();
        Self {
            store: Store::open(config.clone()).expect("Failed to open in-memory store"),
            config,
            path: None,
            _temp_dir: None,
        }
    }

    /// Creates a persisted store in a fresh temporary directory.
    pub fn file() -> Self {
        Self::file_with(|config| config)
    }

    /// Creates a persisted store, letting `adjust` change the configuration.
    /// Persistence and path are set before `adjust` runs.
    pub fn file_with(adjust: impl FnOnce(Config) -> Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join(FIXTURE_FILE);
        let config = adjust(Config::new().persistence(true).path(&path));

        Self {
            store: Store::open(config.clone()).expect("Failed to open file store"),
            config,
            path: Some(path),
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the persistence file if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Opens a second, independent store with the fixture's configuration.
    /// For file fixtures it shares the file; for memory fixtures it starts
    /// empty.
    pub fn reopen(&self) -> Store {
        Store::open(self.config.clone()).expect("Failed to reopen store")
    }
}

impl std::ops::Deref for TestStore {
    type Target = Store;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary in-memory store.
///
/// # Example
///
/// ```rust
/// use anystore_core::KeyValue;
/// use anystore_testkit::with_temp_store;
///
/// with_temp_store(|store| {
///     store.store("k", 1).unwrap();
///     assert!(store.has_key("k"));
/// });
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&Store) -> R,
{
    let fixture = TestStore::memory();
    f(&fixture)
}

/// Runs a test with a temporary persisted store.
pub fn with_temp_file_store<F, R>(f: F) -> R
where
    F: FnOnce(&TestStore) -> R,
{
    let fixture = TestStore::file();
    f(&fixture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anystore_core::{EncryptionKey, KeyValue, Value};

    #[test]
    fn memory_fixture_has_no_file() {
        let fixture = TestStore::memory();
        assert!(fixture.path().is_none());
        assert!(!fixture.is_persistent());
    }

    #[test]
    fn file_fixture_reopens_with_same_key() {
        let key = EncryptionKey::generate().unwrap();
        let fixture = TestStore::file_with(|c| c.encryption_key(key.clone()).authenticated(true));
        fixture.store("k", "v").unwrap();
        assert!(fixture.path().unwrap().is_file());

        let reopened = fixture.reopen();
        assert_eq!(reopened.encryption_key(), key);
        assert_eq!(reopened.load("k").unwrap(), Some(Value::from("v")));
    }

    #[test]
    fn helpers_pass_the_store() {
        let n = with_temp_store(|store| {
            store.store(1, 2).unwrap();
            store.len().unwrap()
        });
        assert_eq!(n, 1);

        with_temp_file_store(|fixture| {
            fixture.store("a", 1).unwrap();
            assert_eq!(fixture.reopen().load("a").unwrap(), Some(Value::from(1)));
        });
    }
}
