//! CLI error type.

use std::fmt;
use std::io;

use strata::{BuildError, FsError};

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration, manifest or mount errors while building the filesystems.
    Build(BuildError),
    /// A lookup failed for a reason other than absence.
    Fs(FsError),
    /// The requested path or resource does not exist.
    NotFound(String),
    /// Invalid command-line input.
    Usage(String),
    /// Writing output failed.
    Io(io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Build(e) => write!(f, "{}", e),
            CliError::Fs(e) => write!(f, "{}", e),
            CliError::NotFound(what) => write!(f, "not found: {}", what),
            CliError::Usage(msg) => write!(f, "{}", msg),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Build(e) => Some(e),
            CliError::Fs(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::NotFound(_) | CliError::Usage(_) => None,
        }
    }
}

impl From<BuildError> for CliError {
    fn from(e: BuildError) -> Self {
        CliError::Build(e)
    }
}

impl From<FsError> for CliError {
    fn from(e: FsError) -> Self {
        if e.is_not_found() {
            CliError::NotFound(e.to_string())
        } else {
            CliError::Fs(e)
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::NotFound(_) => 1,
            CliError::Usage(_) => 2,
            CliError::Build(_) | CliError::Fs(_) | CliError::Io(_) => 3,
        }
    }
}
