//! Error types for filesystem lookups and filesystem composition.
//!
//! Two error families:
//!
//! - [`FsError`] is returned by every [`FileSystem`](crate::fs::FileSystem)
//!   operation. A missing file is an ordinary outcome and is classified by
//!   [`FsError::is_not_found`], so callers can fall through to the next layer
//!   on absence while still surfacing real I/O failures.
//! - [`BuildError`] is returned while composing the filesystems. These are
//!   fatal: a build aborts on the first one.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for filesystem operations.
pub type FsResult<T> = Result<T, FsError>;

/// Result type for filesystem composition.
pub type BuildResult<T> = Result<T, BuildError>;

/// Errors returned by filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    /// No layer provides the requested path.
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The path resolves through a symbolic link that the filesystem refuses
    /// to follow. Reported as absence to callers.
    #[error("symlink not followed: {}", path.display())]
    SymlinkDenied { path: PathBuf },

    /// A directory operation was attempted on a file.
    #[error("not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    /// A file operation was attempted on a directory.
    #[error("is a directory: {}", path.display())]
    IsADirectory { path: PathBuf },

    /// A write was attempted on a read-only filesystem.
    #[error("read-only filesystem: {}", path.display())]
    ReadOnly { path: PathBuf },

    /// A root mapping could not be constructed.
    #[error("invalid root mapping {from:?} -> {}: {reason}", to.display())]
    InvalidMapping {
        from: String,
        to: PathBuf,
        reason: String,
    },

    /// Any other I/O failure. Never retried.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Create a not-found error for the given path.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Classify an I/O error, mapping `ErrorKind::NotFound` to [`FsError::NotFound`].
    ///
    /// `ENOTDIR` (a path component is a regular file) is absence as well.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound
            || source.raw_os_error() == Some(libc::ENOTDIR)
        {
            Self::not_found(path)
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Returns `true` if the path is absent from the filesystem.
    ///
    /// A denied symlink counts as absent: the target is never exposed.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::SymlinkDenied { .. })
    }

    /// Returns `true` if the error is a rejected symlink.
    pub fn is_symlink_denied(&self) -> bool {
        matches!(self, Self::SymlinkDenied { .. })
    }

    /// Returns `true` if the filesystem refused a write.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::ReadOnly { .. })
    }
}

/// Errors that abort building the source filesystems.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A mount's include or exclude glob did not compile.
    #[error("invalid file filter {pattern:?} on mount {target:?} of module {module:?}: {source}")]
    InvalidFilter {
        module: String,
        target: String,
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// A mount declaration could not be turned into a root mapping.
    #[error("invalid mount {target:?} in module {module:?}: {reason}")]
    Mount {
        module: String,
        target: String,
        reason: String,
    },

    /// A filesystem failed while the module's layers were being assembled.
    #[error("create filesystem for module {module:?}: {source}")]
    Filesystem {
        module: String,
        #[source]
        source: FsError,
    },

    /// Invalid site configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Failed to read a configuration or manifest file.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The module manifest is not valid JSON for a module list.
    #[error("invalid module manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The build lock could not be acquired.
    #[error("failed to acquire build lock {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A filename could not be placed below any project content directory.
    #[error("could not determine content directory for {}", .0.display())]
    ContentDir(PathBuf),
}

impl BuildError {
    /// Returns `true` if this error originates from a mount declaration.
    pub fn is_mount_error(&self) -> bool {
        matches!(self, Self::InvalidFilter { .. } | Self::Mount { .. })
    }
}
