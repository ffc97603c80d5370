//! File-based snapshot backend.

use crate::backend::{ExclusiveLock, SnapshotBackend};
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Random characters in a temporary file name.
const TEMP_RAND_LEN: usize = 10;

/// Suffix of the sibling lock file.
pub const LOCK_SUFFIX: &str = ".lock";

/// A snapshot stored in a single file.
///
/// # Durability
///
/// `replace` writes a temporary file in the same directory, syncs it,
/// renames it over the target and then syncs the directory. The target is
/// never written in place, so readers see either the previous or the new
/// file.
///
/// # Locking
///
/// Writers serialize on an advisory `flock` of the sibling `<path>.lock`,
/// which works across processes. The lock file carries no data.
///
/// # Example
///
/// ```no_run
/// use anystore_storage::{FileBackend, SnapshotBackend};
///
/// let backend = FileBackend::new("/tmp/anystore.db");
/// let _guard = backend.lock_exclusive().unwrap();
/// backend.replace(b"encrypted snapshot").unwrap();
/// assert_eq!(backend.read().unwrap(), b"encrypted snapshot");
/// ```
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileBackend {
    /// Creates a backend for `path`. No file is touched until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_path = path.clone().into_os_string();
        lock_path.push(LOCK_SUFFIX);
        Self {
            path,
            lock_path: PathBuf::from(lock_path),
        }
    }

    /// Creates a backend, creating the parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn open_with_create_dirs(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let backend = Self::new(path);
        if let Some(parent) = backend.parent_dir() {
            fs::create_dir_all(parent)?;
        }
        Ok(backend)
    }

    /// Path of the lock file.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Writes `data` to a synced temporary file next to the target.
    ///
    /// Nothing is visible at the target until [`StagedWrite::commit`]. A
    /// staged write that is dropped removes its temporary file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ShortWrite`] if the data did not fit, or an
    /// I/O error.
    pub fn stage(&self, data: &[u8]) -> StorageResult<StagedWrite> {
        let dir = self.parent_dir().unwrap_or_else(|| Path::new("."));
        let prefix = format!(
            "{}.",
            self.path
                .file_name()
                .map_or_else(|| "snapshot".into(), |n| n.to_string_lossy())
        );

        let existing = fs::metadata(&self.path).ok().map(|meta| meta.permissions());

        // tempfile retries on name collisions.
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).rand_bytes(TEMP_RAND_LEN);
        if existing.is_none() {
            if let Some(permissions) = new_file_permissions() {
                builder.permissions(permissions);
            }
        }
        let mut temp = builder.tempfile_in(dir)?;

        // Keep the permissions of the file being replaced.
        if let Some(permissions) = existing {
            fs::set_permissions(temp.path(), permissions)?;
        }

        temp.as_file_mut().write_all(data).map_err(|e| {
            if e.kind() == io::ErrorKind::WriteZero {
                StorageError::ShortWrite {
                    path: temp.path().to_path_buf(),
                    expected: data.len(),
                }
            } else {
                StorageError::Io(e)
            }
        })?;
        temp.as_file().sync_all()?;

        Ok(StagedWrite {
            temp,
            target: self.path.clone(),
        })
    }

    fn parent_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }
}

impl SnapshotBackend for FileBackend {
    fn read(&self) -> StorageResult<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn replace(&self, data: &[u8]) -> StorageResult<()> {
        self.stage(data)?.commit()
    }

    fn lock_exclusive(&self) -> StorageResult<ExclusiveLock> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| StorageError::lock(&self.lock_path, e))?;

        tracing::trace!(path = %self.lock_path.display(), "waiting for lock");
        FileExt::lock_exclusive(&file).map_err(|e| StorageError::lock(&self.lock_path, e))?;
        tracing::trace!(path = %self.lock_path.display(), "lock acquired");

        Ok(ExclusiveLock::file(file, self.lock_path.clone()))
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// A fully written, synced temporary file waiting to replace its target.
#[derive(Debug)]
pub struct StagedWrite {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedWrite {
    /// Path of the temporary file.
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Renames the temporary file over the target and syncs the directory.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the rename fails, in which case the temporary
    /// file is removed and the target is untouched.
    pub fn commit(self) -> StorageResult<()> {
        let target = self.target;
        self.temp.persist(&target).map_err(|e| {
            tracing::warn!(path = %target.display(), error = %e.error, "rename failed, discarding temp file");
            StorageError::Io(e.error)
        })?;
        sync_parent(&target)
    }

    /// Keeps the temporary file on disk without renaming it, as a process
    /// dying right before the rename would. Returns its path.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be detached.
    pub fn abandon(self) -> StorageResult<PathBuf> {
        let (_, path) = self.temp.keep().map_err(|e| StorageError::Io(e.error))?;
        Ok(path)
    }
}

/// Mode for a snapshot file that does not exist yet: 0o666, which the OS
/// narrows by the umask as for any newly created file.
#[cfg(unix)]
fn new_file_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o666))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<fs::Permissions> {
    None
}

/// Fsyncs the directory holding `path` so a rename is durable.
///
/// On Windows directories cannot be opened for syncing and NTFS journals
/// metadata, so this is a no-op there.
#[cfg(unix)]
fn sync_parent(path: &Path) -> StorageResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> StorageResult<()> {
    Ok(())
}
