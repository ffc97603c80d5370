//! Snapshot backend trait definition.

use crate::error::StorageResult;
use fs2::FileExt;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::RawMutex;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Where an encrypted snapshot lives.
///
/// Backends are **opaque blob stores**: they hold one byte sequence and
/// know nothing about encryption or encoding.
///
/// # Invariants
///
/// - `read` returns the bytes of the last successful `replace`, or an empty
///   vector if nothing was ever written
/// - `replace` is all-or-nothing: a reader sees the old or the new bytes,
///   never a mix, even if the process dies halfway
/// - `lock_exclusive` excludes other holders of the same backend location,
///   including holders in other processes where the backend supports it
///
/// # Implementors
///
/// - [`super::FileBackend`] - A file replaced by atomic rename, locked with `flock`
/// - [`super::InMemoryBackend`] - For testing
pub trait SnapshotBackend: Send + Sync + fmt::Debug {
    /// Reads the whole snapshot blob. A missing blob reads as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn read(&self) -> StorageResult<Vec<u8>>;

    /// Atomically replaces the whole blob with `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data could not be made durable. The previous
    /// blob is then left untouched.
    fn replace(&self, data: &[u8]) -> StorageResult<()>;

    /// Blocks until the exclusive writer lock is held.
    ///
    /// The lock is released when the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::Lock`] if the lock cannot be taken.
    fn lock_exclusive(&self) -> StorageResult<ExclusiveLock>;

    /// Location of the blob, if it lives on disk.
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// Guard for a backend's exclusive writer lock.
pub struct ExclusiveLock {
    inner: LockInner,
}

enum LockInner {
    File { file: File, path: PathBuf },
    Local(ArcMutexGuard<RawMutex, ()>),
}

impl ExclusiveLock {
    /// Wraps a lock file on which `flock` is already held.
    pub(crate) fn file(file: File, path: PathBuf) -> Self {
        Self {
            inner: LockInner::File { file, path },
        }
    }

    /// Wraps a held in-process mutex guard.
    pub(crate) fn local(guard: ArcMutexGuard<RawMutex, ()>) -> Self {
        Self {
            inner: LockInner::Local(guard),
        }
    }

    /// The lock file, for file-backed locks.
    #[must_use]
    pub fn lock_path(&self) -> Option<&Path> {
        match &self.inner {
            LockInner::File { path, .. } => Some(path),
            LockInner::Local(_) => None,
        }
    }
}

impl Drop for ExclusiveLock {
    fn drop(&mut self) {
        if let LockInner::File { file, path } = &self.inner {
            if let Err(e) = FileExt::unlock(file) {
                tracing::warn!(path = %path.display(), error = %e, "failed to release lock");
            } else {
                tracing::trace!(path = %path.display(), "lock released");
            }
        }
    }
}

impl fmt::Debug for ExclusiveLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            LockInner::File { path, .. } => f.debug_struct("ExclusiveLock").field("path", path).finish(),
            LockInner::Local(_) => f.debug_struct("ExclusiveLock").field("path", &"<memory>").finish(),
        }
    }
}
