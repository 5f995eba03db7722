//! Build lock: serializes builds of the same project.
//!
//! A long-running server and a one-shot command working on the same project
//! must not write generated resources at the same time. The lock is an
//! advisory exclusive lock on a file in the project root; the file's content
//! is irrelevant.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use parking_lot::{Mutex, MutexGuard};

use crate::config::LockMode;
use crate::error::{BuildError, BuildResult};

/// Lock file name, placed in the project working directory.
pub const LOCK_FILE_NAME: &str = ".strata_build.lock";

/// Exclusive build lock for one project.
#[derive(Debug)]
pub struct BuildLock {
    path: PathBuf,
    mode: LockMode,
    in_process: Mutex<()>,
}

impl BuildLock {
    pub fn new(working_dir: &Path, mode: LockMode) -> Self {
        Self {
            path: working_dir.join(LOCK_FILE_NAME),
            mode,
            in_process: Mutex::new(()),
        }
    }

    /// Location of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Block until the lock is acquired.
    ///
    /// The lock is held until the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Lock`] if the lock file cannot be opened or
    /// locked.
    pub fn lock(&self) -> BuildResult<BuildLockGuard<'_>> {
        let held = match self.mode {
            LockMode::InProcess => Held::InProcess(self.in_process.lock()),
            LockMode::File => Held::File(self.lock_file()?),
        };
        tracing::debug!(path = %self.path.display(), mode = ?self.mode, "Build lock acquired");
        Ok(BuildLockGuard {
            held,
            path: &self.path,
        })
    }

    fn lock_file(&self) -> BuildResult<File> {
        let lock_error = |source: io::Error| BuildError::Lock {
            path: self.path.clone(),
            source,
        };

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(lock_error)?;

        loop {
            match FileExt::lock_exclusive(&file) {
                Ok(()) => return Ok(file),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(lock_error(e)),
            }
        }
    }
}

enum Held<'a> {
    File(File),
    InProcess(MutexGuard<'a, ()>),
}

/// Releases the build lock when dropped.
pub struct BuildLockGuard<'a> {
    held: Held<'a>,
    path: &'a Path,
}

impl std::fmt::Debug for BuildLockGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildLockGuard")
            .field("path", &self.path)
            .finish()
    }
}

impl Drop for BuildLockGuard<'_> {
    fn drop(&mut self) {
        if let Held::File(file) = &self.held {
            // Closing the descriptor releases the lock anyway.
            if let Err(e) = FileExt::unlock(file) {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to release build lock"
                );
            }
        }
        tracing::debug!(path = %self.path.display(), "Build lock released");
    }
}
