//! Filesystem capability and its layer implementations.
//!
//! Every layer implements [`FileSystem`]: `stat`, `read_dir` and `open`, plus
//! optional writes. Layers fall into two groups:
//!
//! - **Plain layers** ([`OsFs`], [`BasePathFs`], [`NoSymlinkFs`], [`EmptyFs`])
//!   return [`FileMeta`] without mount metadata.
//! - **Root-mapped layers** ([`RootMappingFs`], [`SliceFs`]) attach the
//!   [`RootMapping`] that produced each entry, so callers can read the owning
//!   module, language, weight and mount root of a file.
//!
//! [`OverlayFs`] stacks any of them with first-match-wins semantics.

mod basepath;
mod empty;
mod nosymlink;
mod os;
mod overlay;
mod rootmapping;
mod slice;

use std::fs::File;
use std::io::{self, Write};
use std::path::{Component as PathComponent, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

pub use basepath::BasePathFs;
pub use empty::EmptyFs;
pub use nosymlink::NoSymlinkFs;
pub use os::OsFs;
pub use overlay::{DirsMerger, OverlayFs};
pub use rootmapping::{RootMapping, RootMappingFs, Weight};
pub use slice::SliceFs;

use crate::error::{FsError, FsResult};

/// Shared handle to a filesystem layer.
pub type FsHandle = Arc<dyn FileSystem>;

/// The capability every filesystem layer provides.
///
/// Paths are interpreted by each implementation: physical layers expect
/// absolute host paths, virtual layers expect slash-separated relative paths
/// such as `layouts/_default/single.html`.
pub trait FileSystem: std::fmt::Debug + Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Look up a file or directory.
    fn stat(&self, path: &Path) -> FsResult<FileMeta>;

    /// Look up a path without following a final symbolic link.
    ///
    /// Only physical layers can tell the difference; everything else
    /// behaves like [`FileSystem::stat`].
    fn symlink_stat(&self, path: &Path) -> FsResult<FileMeta> {
        self.stat(path)
    }

    /// List a directory. Entries are sorted by name unless the layer
    /// documents otherwise.
    fn read_dir(&self, path: &Path) -> FsResult<Vec<FileMeta>>;

    /// Open a file for reading.
    fn open(&self, path: &Path) -> FsResult<File> {
        let meta = self.stat(path)?;
        if meta.is_dir() {
            return Err(FsError::IsADirectory {
                path: path.to_path_buf(),
            });
        }
        File::open(meta.filename()).map_err(|e| FsError::from_io(meta.filename(), e))
    }

    /// Create or truncate a file for writing.
    fn create(&self, path: &Path) -> FsResult<File> {
        Err(FsError::ReadOnly {
            path: path.to_path_buf(),
        })
    }

    /// Create a directory and all missing parents.
    fn create_dir_all(&self, path: &Path) -> FsResult<()> {
        Err(FsError::ReadOnly {
            path: path.to_path_buf(),
        })
    }
}

/// Metadata for a file or directory returned by a [`FileSystem`].
#[derive(Debug, Clone)]
pub struct FileMeta {
    name: String,
    filename: PathBuf,
    is_dir: bool,
    is_symlink: bool,
    len: u64,
    modified: SystemTime,
    mapping: Option<Arc<RootMapping>>,
}

impl FileMeta {
    /// Build metadata from a host `std::fs::Metadata`.
    pub fn from_std(filename: &Path, md: &std::fs::Metadata) -> Self {
        Self {
            name: file_name(filename),
            filename: filename.to_path_buf(),
            is_dir: md.is_dir(),
            is_symlink: md.file_type().is_symlink(),
            len: if md.is_dir() { 0 } else { md.len() },
            modified: md.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            mapping: None,
        }
    }

    /// A directory that only exists in the virtual namespace, e.g. `content`
    /// when the only mount targets `content/blog`.
    pub fn virtual_dir(path: &Path) -> Self {
        Self {
            name: file_name(path),
            filename: PathBuf::new(),
            is_dir: true,
            is_symlink: false,
            len: 0,
            modified: SystemTime::UNIX_EPOCH,
            mapping: None,
        }
    }

    /// Entry name in the namespace it was looked up in.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical filename on the host. Empty for virtual directories.
    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn is_symlink(&self) -> bool {
        self.is_symlink
    }

    /// Size in bytes (0 for directories).
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    /// The root mapping this entry was resolved through, if any.
    pub fn mapping(&self) -> Option<&Arc<RootMapping>> {
        self.mapping.as_ref()
    }

    /// Language of the owning mount; empty for plain layers and for mounts
    /// that apply to every language.
    pub fn lang(&self) -> &str {
        self.mapping.as_deref().map_or("", |m| m.lang())
    }

    /// Weight of the owning mount.
    pub fn weight(&self) -> Option<Weight> {
        self.mapping.as_deref().map(|m| m.weight())
    }

    /// Whether the owning module is watched for changes.
    pub fn watch(&self) -> bool {
        self.mapping.as_deref().is_some_and(|m| m.watch())
    }

    /// Path identifier of the owning module.
    pub fn module(&self) -> &str {
        self.mapping.as_deref().map_or("", |m| m.module())
    }

    /// Whether the owning module is the main project.
    pub fn is_project(&self) -> bool {
        self.mapping.as_deref().is_some_and(|m| m.is_project())
    }

    /// Mount root inside the component, e.g. `blog` for target `content/blog`.
    pub fn mount_root(&self) -> &str {
        self.mapping.as_deref().map_or("", |m| m.mount_root())
    }

    pub(crate) fn with_name(mut self, name: String) -> Self {
        self.name = name;
        self
    }

    pub(crate) fn with_mapping(mut self, mapping: Arc<RootMapping>) -> Self {
        self.mapping = Some(mapping);
        self
    }
}

/// One physical directory contributing to a component, in precedence order.
///
/// `fs` is the physical filesystem the directory was resolved through, so
/// that further lookups below it keep the module's symlink policy.
#[derive(Debug, Clone)]
pub struct SourceDir {
    pub meta: FileMeta,
    pub fs: FsHandle,
}

impl SourceDir {
    pub fn new(meta: FileMeta, fs: FsHandle) -> Self {
        Self { meta, fs }
    }

    /// Physical directory on the host.
    pub fn filename(&self) -> &Path {
        self.meta.filename()
    }
}

/// Normalize a virtual path: drop root and `.` components, resolve `..`
/// without ever climbing above the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for part in path.components() {
        match part {
            PathComponent::Normal(name) => out.push(name),
            PathComponent::ParentDir => {
                out.pop();
            }
            PathComponent::RootDir | PathComponent::CurDir | PathComponent::Prefix(_) => {}
        }
    }
    out
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Visit every file below `root`, depth first, in name order.
pub fn walk_files<F>(fs: &dyn FileSystem, root: &Path, visit: &mut F) -> FsResult<()>
where
    F: FnMut(&Path, &FileMeta) -> FsResult<()>,
{
    let meta = fs.stat(root)?;
    if !meta.is_dir() {
        return visit(root, &meta);
    }

    for entry in fs.read_dir(root)? {
        let path = root.join(entry.name());
        if entry.is_dir() {
            walk_files(fs, &path, visit)?;
        } else {
            visit(&path, &entry)?;
        }
    }
    Ok(())
}

/// Write every file below `root` with its physical filename.
///
/// Debugging aid: shows which physical file wins for each virtual path.
pub fn print_fs<W: Write>(fs: &dyn FileSystem, root: &Path, w: &mut W) -> FsResult<()> {
    walk_files(fs, root, &mut |path, meta| {
        writeln!(
            w,
            "    {:?} {:?}",
            path.display().to_string(),
            meta.filename().display().to_string()
        )
        .map_err(|e: io::Error| FsError::from_io(path, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/content/blog")), PathBuf::from("content/blog"));
        assert_eq!(normalize(Path::new("./a/./b")), PathBuf::from("a/b"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("b"));
        assert_eq!(normalize(Path::new("")), PathBuf::new());
    }

    #[test]
    fn test_virtual_dir_has_no_mapping() {
        let meta = FileMeta::virtual_dir(Path::new("content"));
        assert_eq!(meta.name(), "content");
        assert!(meta.is_dir());
        assert_eq!(meta.lang(), "");
        assert!(meta.weight().is_none());
        assert!(!meta.watch());
    }

    #[test]
    fn test_print_fs_lists_files() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("a")).unwrap();
        std::fs::write(temp.path().join("a/one.txt"), b"1").unwrap();
        std::fs::write(temp.path().join("two.txt"), b"2").unwrap();

        let fs = BasePathFs::new(Arc::new(OsFs::new()), temp.path());
        let mut out = Vec::new();
        print_fs(&fs, Path::new(""), &mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("a/one.txt"));
        assert!(out.contains("two.txt"));
    }
}
