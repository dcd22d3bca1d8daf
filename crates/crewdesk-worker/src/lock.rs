//! Cross-process advisory lock.
//!
//! Worker loops run in independently forked processes, so no in-memory
//! primitive can serialize them; the one thing they share is the filesystem.
//! Each pass takes an exclusive `flock` on a well-known path and releases it
//! before sleeping, which bounds the extra latency any one process adds to
//! roughly one poll interval.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::trace;

use crate::error::WorkerResult;

/// Handle on the shared lock path. Cheap to clone; the lock itself lives in
/// the kernel, keyed by the open file.
#[derive(Debug, Clone)]
pub struct WorkerLock {
    path: PathBuf,
}

impl WorkerLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until this process holds the exclusive lock.
    ///
    /// The returned guard releases on drop, so every exit path out of a pass
    /// (success, error, panic unwind) releases the lock.
    pub fn acquire(&self) -> WorkerResult<LockGuard> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .open(&self.path)?;
        file.lock_exclusive()?;
        trace!(path = %self.path.display(), "acquired worker lock");
        Ok(LockGuard { file })
    }
}

/// Scoped ownership of the advisory lock.
pub struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}
