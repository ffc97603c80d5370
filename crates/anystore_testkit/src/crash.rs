//! Crash testing for AnyStore writes.
//!
//! A [`CrashingBackend`] wraps a real [`FileBackend`] and, when armed, stops
//! a write at a chosen [`CrashPoint`], leaving the disk exactly as a process
//! dying at that moment would. The harness then checks that the target file
//! is byte-identical to before and still decodes to the old content.
//!
//! ## Usage
//!
//! ```rust
//! use anystore_testkit::crash::{CrashPoint, CrashRecoveryHarness};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let harness = CrashRecoveryHarness::new(dir.path());
//! let result = harness.run(CrashPoint::AfterStageBeforeRename);
//! assert!(result.passed, "{result:?}");
//! ```

use anystore_core::{Config, KeyValue, Store, Value};
use anystore_storage::{ExclusiveLock, FileBackend, SnapshotBackend, StorageError, StorageResult};
use parking_lot::Mutex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Points at which a write can be interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashPoint {
    /// Before anything is written.
    BeforeStage,
    /// After the temporary file is written and synced, before the rename.
    AfterStageBeforeRename,
}

impl CrashPoint {
    /// All crash points.
    pub const ALL: [CrashPoint; 2] = [CrashPoint::BeforeStage, CrashPoint::AfterStageBeforeRename];
}

/// A file backend whose next `replace` can be made to fail mid-way.
#[derive(Debug)]
pub struct CrashingBackend {
    inner: FileBackend,
    armed: AtomicBool,
    point: CrashPoint,
    crashes: AtomicUsize,
    orphans: Mutex<Vec<PathBuf>>,
}

impl CrashingBackend {
    /// Wraps a file backend at `path`, disarmed.
    pub fn new(path: impl Into<PathBuf>, point: CrashPoint) -> Self {
        Self {
            inner: FileBackend::new(path),
            armed: AtomicBool::new(false),
            point,
            crashes: AtomicUsize::new(0),
            orphans: Mutex::new(Vec::new()),
        }
    }

    /// Makes the next `replace` crash.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Number of simulated crashes so far.
    pub fn crashes(&self) -> usize {
        self.crashes.load(Ordering::SeqCst)
    }

    /// Temporary files left behind by crashes.
    pub fn orphans(&self) -> Vec<PathBuf> {
        self.orphans.lock().clone()
    }
}

impl SnapshotBackend for CrashingBackend {
    fn read(&self) -> StorageResult<Vec<u8>> {
        self.inner.read()
    }

    fn replace(&self, data: &[u8]) -> StorageResult<()> {
        if !self.armed.swap(false, Ordering::SeqCst) {
            return self.inner.replace(data);
        }

        self.crashes.fetch_add(1, Ordering::SeqCst);
        if self.point == CrashPoint::AfterStageBeforeRename {
            let orphan = self.inner.stage(data)?.abandon()?;
            self.orphans.lock().push(orphan);
        }
        Err(StorageError::Io(io::Error::other(format!(
            "simulated crash at {:?}",
            self.point
        ))))
    }

    fn lock_exclusive(&self) -> StorageResult<ExclusiveLock> {
        self.inner.lock_exclusive()
    }

    fn path(&self) -> Option<&Path> {
        SnapshotBackend::path(&self.inner)
    }
}

/// Result of a crash recovery test.
#[derive(Debug, Clone)]
pub struct CrashRecoveryResult {
    /// Whether the test passed.
    pub passed: bool,
    /// The crash point exercised.
    pub point: CrashPoint,
    /// Entries expected after recovery.
    pub expected_entries: usize,
    /// Entries found after recovery.
    pub actual_entries: usize,
    /// What went wrong, if anything.
    pub error: Option<String>,
}

impl CrashRecoveryResult {
    fn pass(point: CrashPoint, entries: usize) -> Self {
        Self {
            passed: true,
            point,
            expected_entries: entries,
            actual_entries: entries,
            error: None,
        }
    }

    fn fail(point: CrashPoint, expected: usize, actual: usize, error: impl Into<String>) -> Self {
        Self {
            passed: false,
            point,
            expected_entries: expected,
            actual_entries: actual,
            error: Some(error.into()),
        }
    }
}

/// Drives a write into a crash and verifies the aftermath.
#[derive(Debug)]
pub struct CrashRecoveryHarness {
    dir: PathBuf,
    committed: usize,
}

impl CrashRecoveryHarness {
    /// Creates a harness writing into `dir`, committing ten entries before
    /// the crash.
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            committed: 10,
        }
    }

    /// Sets how many entries are committed before the crash.
    #[must_use]
    pub fn committed(mut self, n: usize) -> Self {
        self.committed = n;
        self
    }

    /// Commits some entries, crashes the next write at `point`, and checks
    /// the file and a freshly opened store.
    pub fn run(&self, point: CrashPoint) -> CrashRecoveryResult {
        let path = self.dir.join(format!("crash-{point:?}.db"));
        let backend = Arc::new(CrashingBackend::new(&path, point));
        let store = match Store::with_backend(Config::new().persistence(true), backend.clone()) {
            Ok(store) => store,
            Err(e) => return CrashRecoveryResult::fail(point, self.committed, 0, e.to_string()),
        };

        for i in 0..self.committed {
            if let Err(e) = store.store(format!("key-{i}"), i as i64) {
                return CrashRecoveryResult::fail(point, self.committed, i, e.to_string());
            }
        }
        let before = fs::read(&path).unwrap_or_default();

        backend.arm();
        if store.store("lost", "never committed").is_ok() {
            return CrashRecoveryResult::fail(point, self.committed, 0, "write did not crash");
        }
        if store.has_key("lost") {
            return CrashRecoveryResult::fail(point, self.committed, 0, "crashed write was published");
        }

        let after = fs::read(&path).unwrap_or_default();
        if after != before {
            return CrashRecoveryResult::fail(point, self.committed, 0, "target file changed");
        }

        let recovered = match Store::open(Config::new().persistence(true).path(&path)) {
            Ok(store) => store,
            Err(e) => return CrashRecoveryResult::fail(point, self.committed, 0, e.to_string()),
        };
        let actual = match recovered.len() {
            Ok(n) => n,
            Err(e) => return CrashRecoveryResult::fail(point, self.committed, 0, e.to_string()),
        };
        if actual != self.committed {
            return CrashRecoveryResult::fail(point, self.committed, actual, "entry count changed");
        }
        if recovered.load("lost").ok().flatten().is_some() {
            return CrashRecoveryResult::fail(point, self.committed, actual, "lost entry appeared");
        }
        if self.committed > 0
            && recovered.load("key-0").ok().flatten() != Some(Value::Integer(0))
        {
            return CrashRecoveryResult::fail(point, self.committed, actual, "committed entry differs");
        }

        CrashRecoveryResult::pass(point, actual)
    }

    /// Runs every crash point.
    pub fn run_all(&self) -> Vec<CrashRecoveryResult> {
        CrashPoint::ALL.iter().map(|p| self.run(*p)).collect()
    }
}
