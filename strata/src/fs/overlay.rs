//! Ordered stack of filesystem layers.

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use super::{EmptyFs, FileMeta, FileSystem, FsHandle};
use crate::error::{FsError, FsResult};

/// How directory listings from several layers are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirsMerger {
    /// An entry from an earlier layer hides every later entry with the same
    /// name.
    #[default]
    Shadow,
    /// Directories merge by name; files merge by name and language, so the
    /// same file in two languages is listed twice.
    Language,
}

impl DirsMerger {
    fn key(&self, entry: &FileMeta) -> (String, String) {
        let lang = match self {
            DirsMerger::Language if !entry.is_dir() => entry.lang().to_string(),
            _ => String::new(),
        };
        (entry.name().to_string(), lang)
    }
}

/// Layers consulted in order; the first layer providing a path wins.
///
/// [`OverlayFs::append`] returns a new overlay and never mutates the receiver,
/// so stacks can be shared while the next one is being built.
#[derive(Debug, Clone, Default)]
pub struct OverlayFs {
    layers: Vec<FsHandle>,
    first_writable: bool,
    merger: DirsMerger,
}

impl OverlayFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send writes to the first layer instead of rejecting them.
    pub fn with_first_writable(mut self, writable: bool) -> Self {
        self.first_writable = writable;
        self
    }

    pub fn with_merger(mut self, merger: DirsMerger) -> Self {
        self.merger = merger;
        self
    }

    /// A copy of this overlay with `layer` added at the lowest precedence.
    pub fn append(&self, layer: FsHandle) -> Self {
        let mut next = self.clone();
        next.layers.push(layer);
        next
    }

    /// Substitute an empty layer when nothing was appended.
    pub fn or_empty(self) -> Self {
        if self.layers.is_empty() {
            self.append(Arc::new(EmptyFs::new()))
        } else {
            self
        }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[FsHandle] {
        &self.layers
    }

    fn writable(&self, path: &Path) -> FsResult<&FsHandle> {
        match self.layers.first() {
            Some(layer) if self.first_writable => Ok(layer),
            _ => Err(FsError::ReadOnly {
                path: path.to_path_buf(),
            }),
        }
    }
}

impl FileSystem for OverlayFs {
    fn name(&self) -> &'static str {
        "overlay"
    }

    fn stat(&self, path: &Path) -> FsResult<FileMeta> {
        for layer in &self.layers {
            match layer.stat(path) {
                Err(e) if e.is_not_found() => continue,
                result => return result,
            }
        }
        Err(FsError::not_found(path))
    }

    fn read_dir(&self, path: &Path) -> FsResult<Vec<FileMeta>> {
        let mut found = false;
        let mut seen = HashSet::new();
        let mut merged = Vec::new();

        for layer in &self.layers {
            let entries = match layer.read_dir(path) {
                Ok(entries) => entries,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };
            found = true;
            for entry in entries {
                if seen.insert(self.merger.key(&entry)) {
                    merged.push(entry);
                }
            }
        }

        if !found {
            return Err(FsError::not_found(path));
        }

        merged.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(merged)
    }

    fn open(&self, path: &Path) -> FsResult<File> {
        for layer in &self.layers {
            match layer.open(path) {
                Err(e) if e.is_not_found() => continue,
                result => return result,
            }
        }
        Err(FsError::not_found(path))
    }

    fn create(&self, path: &Path) -> FsResult<File> {
        self.writable(path)?.create(path)
    }

    fn create_dir_all(&self, path: &Path) -> FsResult<()> {
        self.writable(path)?.create_dir_all(path)
    }
}
