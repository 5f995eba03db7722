//! Placeholder layer for components no module contributes to.

use std::path::Path;

use super::{normalize, FileMeta, FileSystem};
use crate::error::{FsError, FsResult};

/// A filesystem with an empty root directory and nothing else.
///
/// Appended to overlay stacks that would otherwise have no layers, so that
/// consumers never need to special-case "no mounts".
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyFs;

impl EmptyFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for EmptyFs {
    fn name(&self) -> &'static str {
        "empty"
    }

    fn stat(&self, path: &Path) -> FsResult<FileMeta> {
        if normalize(path).as_os_str().is_empty() {
            Ok(FileMeta::virtual_dir(Path::new("")))
        } else {
            Err(FsError::not_found(path))
        }
    }

    fn read_dir(&self, path: &Path) -> FsResult<Vec<FileMeta>> {
        if normalize(path).as_os_str().is_empty() {
            Ok(Vec::new())
        } else {
            Err(FsError::not_found(path))
        }
    }
}
