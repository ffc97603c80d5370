//! In-memory snapshot backend for testing.

use crate::backend::{ExclusiveLock, SnapshotBackend};
use crate::error::StorageResult;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A snapshot blob held in memory.
///
/// The exclusive lock is a process-local mutex, so this backend is only
/// shared between threads.
///
/// # Example
///
/// ```rust
/// use anystore_storage::{InMemoryBackend, SnapshotBackend};
///
/// let backend = InMemoryBackend::new();
/// assert!(backend.read().unwrap().is_empty());
/// backend.replace(b"blob").unwrap();
/// assert_eq!(backend.read().unwrap(), b"blob");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<Vec<u8>>,
    lock: Arc<Mutex<()>>,
    replacements: AtomicU64,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend holding `data`.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
            ..Self::default()
        }
    }

    /// Returns a copy of the blob.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    /// Number of successful `replace` calls.
    #[must_use]
    pub fn replacements(&self) -> u64 {
        self.replacements.load(Ordering::Acquire)
    }
}

impl SnapshotBackend for InMemoryBackend {
    fn read(&self) -> StorageResult<Vec<u8>> {
        Ok(self.data())
    }

    fn replace(&self, data: &[u8]) -> StorageResult<()> {
        *self.data.write() = data.to_vec();
        self.replacements.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn lock_exclusive(&self) -> StorageResult<ExclusiveLock> {
        Ok(ExclusiveLock::local(self.lock.lock_arc()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn starts_empty() {
        let backend = InMemoryBackend::new();
        assert!(backend.read().unwrap().is_empty());
        assert_eq!(backend.replacements(), 0);
        assert_eq!(backend.path(), None);
    }

    #[test]
    fn replace_overwrites() {
        let backend = InMemoryBackend::with_data(b"old".to_vec());
        assert_eq!(backend.read().unwrap(), b"old");
        backend.replace(b"new").unwrap();
        assert_eq!(backend.data(), b"new");
        assert_eq!(backend.replacements(), 1);
    }

    #[test]
    fn lock_is_exclusive_across_threads() {
        let backend = Arc::new(InMemoryBackend::new());
        let guard = backend.lock_exclusive().unwrap();

        let other = Arc::clone(&backend);
        let handle = thread::spawn(move || {
            let _guard = other.lock_exclusive().unwrap();
            other.replace(b"second").unwrap();
        });

        thread::sleep(Duration::from_millis(50));
        backend.replace(b"first").unwrap();
        drop(guard);
        handle.join().unwrap();

        assert_eq!(backend.data(), b"second");
    }
}
