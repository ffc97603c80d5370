//! Reconciling snapshots with the persistence file.
//!
//! The file is the source of truth. Reads decrypt and decode it whole;
//! writes do so under the cross-process lock, apply one [`Change`] on top of
//! what they found, and atomically replace the file.

use crate::error::StoreResult;
use crate::snapshot::Change;
use anystore_codec::{deserialize_map, serialize_map, ValueMap};
use anystore_storage::{SnapshotBackend, SnapshotCipher};
use std::sync::Arc;

/// A backend paired with the cipher protecting it.
#[derive(Debug, Clone)]
pub struct PersistenceEngine {
    backend: Arc<dyn SnapshotBackend>,
    cipher: SnapshotCipher,
}

impl PersistenceEngine {
    /// Creates an engine.
    pub fn new(backend: Arc<dyn SnapshotBackend>, cipher: SnapshotCipher) -> Self {
        Self { backend, cipher }
    }

    /// The backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn SnapshotBackend> {
        &self.backend
    }

    /// Reads the mapping stored in the file.
    ///
    /// A missing or empty file holds the empty mapping. No cross-process
    /// lock is taken: the file is only ever replaced by rename, so the read
    /// sees one complete version.
    ///
    /// # Errors
    ///
    /// Returns I/O, cipher or codec errors.
    pub fn reconcile_from_file(&self) -> StoreResult<ValueMap> {
        let raw = self.backend.read()?;
        if raw.is_empty() {
            return Ok(ValueMap::new());
        }

        let plain = self.cipher.open(&raw)?;
        let map = deserialize_map(&plain)?;
        tracing::debug!(
            path = ?self.backend.path(),
            bytes = raw.len(),
            entries = map.len(),
            "reconciled snapshot from file"
        );
        Ok(map)
    }

    /// Merges `change` into the file's current mapping and replaces the file.
    ///
    /// Holds the backend's exclusive lock from before the read until after
    /// the rename, so concurrent writers in other processes are applied one
    /// after the other and none loses the other's keys. Returns the mapping
    /// now in the file.
    ///
    /// # Errors
    ///
    /// Returns lock, I/O, cipher or codec errors. A change the codec cannot
    /// encode fails here, before anything is written. On error the file is
    /// left as it was.
    pub fn reconcile_and_save(&self, change: &Change) -> StoreResult<ValueMap> {
        let _lock = self.backend.lock_exclusive()?;

        let mut map = self.reconcile_from_file()?;
        change.apply(&mut map);

        let sealed = self.cipher.seal(&serialize_map(&map)?)?;
        self.backend.replace(&sealed)?;

        tracing::debug!(
            path = ?self.backend.path(),
            key = ?change.key(),
            bytes = sealed.len(),
            entries = map.len(),
            "committed snapshot"
        );
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use anystore_codec::limits::MAX_DEPTH;
    use anystore_codec::{CodecError, Value};
    use anystore_storage::{EncryptionKey, InMemoryBackend, StorageError};

    fn engine(backend: Arc<InMemoryBackend>) -> PersistenceEngine {
        let key = EncryptionKey::from_bytes(&[9; 32]).unwrap();
        PersistenceEngine::new(backend, SnapshotCipher::new(key))
    }

    #[test]
    fn empty_backend_is_empty_map() {
        let engine = engine(Arc::new(InMemoryBackend::new()));
        assert!(engine.reconcile_from_file().unwrap().is_empty());
    }

    #[test]
    fn save_merges_with_file_content() {
        let backend = Arc::new(InMemoryBackend::new());
        let a = engine(Arc::clone(&backend));
        let b = engine(Arc::clone(&backend));

        a.reconcile_and_save(&Change::Upsert {
            key: Value::from("from-a"),
            value: Value::from(1),
        })
        .unwrap();
        let merged = b
            .reconcile_and_save(&Change::Upsert {
                key: Value::from("from-b"),
                value: Value::from(2),
            })
            .unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(a.reconcile_from_file().unwrap(), merged);
        assert_eq!(backend.replacements(), 2);
    }

    #[test]
    fn file_is_encrypted() {
        let backend = Arc::new(InMemoryBackend::new());
        engine(Arc::clone(&backend))
            .reconcile_and_save(&Change::Upsert {
                key: Value::from("secret-key"),
                value: Value::from("secret-value"),
            })
            .unwrap();

        let raw = backend.data();
        let needle = b"secret";
        assert!(!raw.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn wrong_key_fails_to_decode() {
        let backend = Arc::new(InMemoryBackend::new());
        let key = EncryptionKey::from_bytes(&[9; 32]).unwrap();
        PersistenceEngine::new(backend.clone(), SnapshotCipher::authenticated(key))
            .reconcile_and_save(&Change::Upsert {
                key: Value::from("k"),
                value: Value::from("v"),
            })
            .unwrap();

        let other = PersistenceEngine::new(
            backend,
            SnapshotCipher::authenticated(EncryptionKey::from_bytes(&[1; 16]).unwrap()),
        );
        assert!(matches!(
            other.reconcile_from_file(),
            Err(StoreError::Storage(StorageError::AuthenticationFailed))
        ));
    }

    #[test]
    fn garbage_file_is_a_codec_error() {
        let key = EncryptionKey::from_bytes(&[9; 32]).unwrap();
        let cipher = SnapshotCipher::new(key);
        // A valid ciphertext of something that is not a map.
        let sealed = cipher.seal(&[0x80]).unwrap();
        let backend = Arc::new(InMemoryBackend::with_data(sealed));

        assert!(matches!(
            engine(backend).reconcile_from_file(),
            Err(StoreError::Codec(_))
        ));
    }

    #[test]
    fn unencodable_change_leaves_file_alone() {
        let backend = Arc::new(InMemoryBackend::new());
        let engine = engine(Arc::clone(&backend));
        engine
            .reconcile_and_save(&Change::Upsert {
                key: Value::from("good"),
                value: Value::from(1),
            })
            .unwrap();
        let before = backend.data();

        let deep = (0..=MAX_DEPTH).fold(Value::Null, |inner, _| Value::Array(vec![inner]));
        let result = engine.reconcile_and_save(&Change::Upsert {
            key: Value::from("deep"),
            value: deep,
        });
        assert!(matches!(
            result,
            Err(StoreError::Codec(CodecError::TooDeep { .. }))
        ));

        assert_eq!(backend.data(), before);
        assert_eq!(backend.replacements(), 1);
        assert_eq!(engine.reconcile_from_file().unwrap().len(), 1);
    }
}
