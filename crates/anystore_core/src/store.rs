//! The store façade, its non-locking batch view, and the shared operation set.

use crate::config::{resolve_home, Config};
use crate::error::{StoreError, StoreResult};
use crate::persist::PersistenceEngine;
use crate::snapshot::{Change, Snapshot, SnapshotCell};
use anystore_codec::Value;
use anystore_storage::{EncryptionKey, FileBackend, SnapshotBackend, SnapshotCipher};
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Operations shared by [`Store`] and the [`Unlocked`] view handed to batches.
pub trait KeyValue {
    /// Returns true if `key` is present.
    ///
    /// A failure to read the persistence file is logged and the answer comes
    /// from the last published snapshot.
    fn has_key(&self, key: impl Into<Value>) -> bool;

    /// The value under `key`, or `None`.
    ///
    /// # Errors
    ///
    /// Fails if persistence is enabled and the file cannot be read.
    fn load(&self, key: impl Into<Value>) -> StoreResult<Option<Value>>;

    /// Inserts or replaces `key`.
    ///
    /// # Errors
    ///
    /// Fails if persistence is enabled and the file cannot be updated. The
    /// in-memory snapshot is then unchanged.
    fn store(&self, key: impl Into<Value>, value: impl Into<Value>) -> StoreResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// See [`KeyValue::store`].
    fn delete(&self, key: impl Into<Value>) -> StoreResult<()>;

    /// Number of entries.
    ///
    /// # Errors
    ///
    /// See [`KeyValue::load`].
    fn len(&self) -> StoreResult<usize>;

    /// Returns true if there are no entries.
    ///
    /// # Errors
    ///
    /// See [`KeyValue::load`].
    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// All keys, in canonical order.
    ///
    /// # Errors
    ///
    /// See [`KeyValue::load`].
    fn keys(&self) -> StoreResult<Vec<Value>>;

    /// Runs `batch` while holding the process-local write lock.
    ///
    /// `batch` receives an [`Unlocked`] view whose operations do not lock.
    /// Its result is returned unchanged; writes it made before failing are
    /// kept. Calling the locking [`Store`] from inside `batch` deadlocks.
    ///
    /// # Errors
    ///
    /// Returns whatever `batch` returns.
    fn run<F, T, E>(&self, batch: F) -> Result<T, E>
    where
        F: FnOnce(&Unlocked<'_>) -> Result<T, E>;
}

#[derive(Debug)]
struct Settings {
    cipher: SnapshotCipher,
    backend: Option<Arc<dyn SnapshotBackend>>,
    create_dirs: bool,
}

/// A key/value store of [`Value`]s, optionally mirrored to an encrypted file.
///
/// Reads clone the current snapshot without locking. Writes serialize on a
/// process-local mutex, build a new snapshot and publish it. With
/// persistence enabled, every operation first reconciles with the file, and
/// writes replace the file under a cross-process lock, so several processes
/// can share one file.
///
/// # Example
///
/// ```rust
/// use anystore_core::{Config, KeyValue, Store, Value};
///
/// let store = Store::open(Config::new()).unwrap();
/// store.store("hello", "world").unwrap();
/// assert_eq!(store.load("hello").unwrap(), Some(Value::from("world")));
/// assert_eq!(store.len().unwrap(), 1);
/// ```
#[derive(Debug)]
pub struct Store {
    snapshot: SnapshotCell,
    write_lock: Mutex<()>,
    persist: AtomicBool,
    settings: RwLock<Settings>,
}

impl Store {
    /// Opens a store. The file, if any, is not touched until first use.
    ///
    /// # Errors
    ///
    /// Fails if the key is invalid, `~` cannot be resolved, or parent
    /// directories cannot be created.
    pub fn open(config: Config) -> StoreResult<Self> {
        let backend = match &config.path {
            Some(path) => Some(file_backend(path, config.create_dirs)?),
            None => None,
        };
        Self::build(&config, backend)
    }

    /// Opens a store on an explicit backend, ignoring `config.path`.
    ///
    /// # Errors
    ///
    /// Fails if the key is invalid.
    pub fn with_backend(config: Config, backend: Arc<dyn SnapshotBackend>) -> StoreResult<Self> {
        Self::build(&config, Some(backend))
    }

    fn build(config: &Config, backend: Option<Arc<dyn SnapshotBackend>>) -> StoreResult<Self> {
        let cipher = config.cipher()?;
        tracing::debug!(
            persist = config.persist,
            path = ?backend.as_ref().and_then(|b| b.path().map(Path::to_path_buf)),
            authenticated = cipher.is_authenticated(),
            "opening store"
        );

        Ok(Self {
            snapshot: SnapshotCell::default(),
            write_lock: Mutex::new(()),
            persist: AtomicBool::new(config.persist),
            settings: RwLock::new(Settings {
                cipher,
                backend,
                create_dirs: config.create_dirs,
            }),
        })
    }

    /// Turns persistence on.
    pub fn enable_persistence(&self) -> &Self {
        self.persist.store(true, Ordering::Release);
        self
    }

    /// Turns persistence off. The store keeps the last snapshot it saw.
    pub fn disable_persistence(&self) -> &Self {
        self.persist.store(false, Ordering::Release);
        self
    }

    /// Whether operations go through the persistence file.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.persist.load(Ordering::Acquire)
    }

    /// The encryption key in use.
    #[must_use]
    pub fn encryption_key(&self) -> EncryptionKey {
        self.settings.read().cipher.key().clone()
    }

    /// The persistence file, if one is set and file-backed.
    #[must_use]
    pub fn path(&self) -> Option<PathBuf> {
        self.settings
            .read()
            .backend
            .as_ref()
            .and_then(|b| b.path().map(Path::to_path_buf))
    }

    /// Points the store at another persistence file.
    ///
    /// Waits for in-flight writes. The snapshot is not reloaded until the
    /// next operation.
    ///
    /// # Errors
    ///
    /// Fails if `~` cannot be resolved or directories cannot be created.
    pub fn set_path(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let _guard = self.write_lock.lock();
        let mut settings = self.settings.write();
        settings.backend = Some(file_backend(path.as_ref(), settings.create_dirs)?);
        Ok(())
    }

    /// Replaces the encryption key, keeping the file format.
    ///
    /// Existing files written with the old key become unreadable.
    pub fn set_encryption_key(&self, key: EncryptionKey) {
        let _guard = self.write_lock.lock();
        let mut settings = self.settings.write();
        settings.cipher = if settings.cipher.is_authenticated() {
            SnapshotCipher::authenticated(key)
        } else {
            SnapshotCipher::new(key)
        };
    }

    fn unlocked(&self) -> Unlocked<'_> {
        Unlocked { store: self }
    }

    fn engine(&self) -> StoreResult<PersistenceEngine> {
        let settings = self.settings.read();
        let backend = settings.backend.clone().ok_or(StoreError::NotConfigured)?;
        Ok(PersistenceEngine::new(backend, settings.cipher.clone()))
    }

    /// Reads the current snapshot, from the file when persisting.
    ///
    /// Takes no lock. The file snapshot is published only if no write was
    /// published while it was being read, so a slow reader never rolls the
    /// store back.
    fn current(&self) -> StoreResult<Arc<Snapshot>> {
        if !self.is_persistent() {
            return Ok(self.snapshot.load());
        }
        let seen = self.snapshot.generation();
        let fresh = Arc::new(Snapshot::from(self.engine()?.reconcile_from_file()?));
        self.snapshot.publish_if_unchanged(seen, Arc::clone(&fresh));
        Ok(fresh)
    }

    /// Caller holds the write lock.
    fn apply_locked(&self, change: Change) -> StoreResult<()> {
        let next = if self.is_persistent() {
            Snapshot::from(self.engine()?.reconcile_and_save(&change)?)
        } else {
            change.check_encodable()?;
            self.snapshot.load().with_change(&change)
        };
        self.snapshot.publish(Arc::new(next));
        Ok(())
    }

    fn has_key_in(&self, current: StoreResult<Arc<Snapshot>>, key: &Value) -> bool {
        match current {
            Ok(snapshot) => snapshot.contains(key),
            Err(e) => {
                tracing::warn!(error = %e, "has_key could not reconcile, using last snapshot");
                self.snapshot.load().contains(key)
            }
        }
    }
}

fn file_backend(path: &Path, create_dirs: bool) -> StoreResult<Arc<dyn SnapshotBackend>> {
    let path = resolve_home(path)?;
    let backend = if create_dirs {
        FileBackend::open_with_create_dirs(path)?
    } else {
        FileBackend::new(path)
    };
    Ok(Arc::new(backend))
}

impl KeyValue for Store {
    fn has_key(&self, key: impl Into<Value>) -> bool {
        self.has_key_in(self.current(), &key.into())
    }

    fn load(&self, key: impl Into<Value>) -> StoreResult<Option<Value>> {
        Ok(self.current()?.get(&key.into()).cloned())
    }

    fn store(&self, key: impl Into<Value>, value: impl Into<Value>) -> StoreResult<()> {
        let _guard = self.write_lock.lock();
        self.apply_locked(Change::Upsert {
            key: key.into(),
            value: value.into(),
        })
    }

    fn delete(&self, key: impl Into<Value>) -> StoreResult<()> {
        let _guard = self.write_lock.lock();
        self.apply_locked(Change::Remove { key: key.into() })
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.current()?.len())
    }

    fn keys(&self) -> StoreResult<Vec<Value>> {
        Ok(self.current()?.keys())
    }

    fn run<F, T, E>(&self, batch: F) -> Result<T, E>
    where
        F: FnOnce(&Unlocked<'_>) -> Result<T, E>,
    {
        let _guard = self.write_lock.lock();
        batch(&self.unlocked())
    }
}

/// The view of a [`Store`] inside [`KeyValue::run`].
///
/// Its operations assume the write lock is already held. It can only be
/// obtained from `run`, and cannot outlive the batch.
#[derive(Debug, Clone, Copy)]
pub struct Unlocked<'a> {
    store: &'a Store,
}

impl Unlocked<'_> {
    /// See [`Store::is_persistent`].
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.store.is_persistent()
    }
}

impl KeyValue for Unlocked<'_> {
    fn has_key(&self, key: impl Into<Value>) -> bool {
        self.store.has_key_in(self.store.current(), &key.into())
    }

    fn load(&self, key: impl Into<Value>) -> StoreResult<Option<Value>> {
        Ok(self.store.current()?.get(&key.into()).cloned())
    }

    fn store(&self, key: impl Into<Value>, value: impl Into<Value>) -> StoreResult<()> {
        self.store.apply_locked(Change::Upsert {
            key: key.into(),
            value: value.into(),
        })
    }

    fn delete(&self, key: impl Into<Value>) -> StoreResult<()> {
        self.store.apply_locked(Change::Remove { key: key.into() })
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.store.current()?.len())
    }

    fn keys(&self) -> StoreResult<Vec<Value>> {
        Ok(self.store.current()?.keys())
    }

    fn run<F, T, E>(&self, batch: F) -> Result<T, E>
    where
        F: FnOnce(&Unlocked<'_>) -> Result<T, E>,
    {
        batch(self)
    }
}
