//! Symlink-rejecting decorator.
//!
//! Dependency modules and every static mount are read through this layer so
//! that no module can reach outside its declared directory via a link.
//! Rejected paths are reported as absent.

use std::fs::File;
use std::path::{Path, PathBuf};

use super::{FileMeta, FileSystem, FsHandle};
use crate::error::{FsError, FsResult};

/// Wraps a physical filesystem and refuses to follow symbolic links.
///
/// Links are checked on the looked-up path itself and on every ancestor
/// below `root`. Ancestors above `root` are not inspected: they belong to
/// the host layout, not to the module.
#[derive(Debug, Clone)]
pub struct NoSymlinkFs {
    inner: FsHandle,
    root: PathBuf,
    allow_files: bool,
}

impl NoSymlinkFs {
    /// Create a decorator rejecting every symlink below `root`.
    pub fn new(inner: FsHandle, root: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            root: root.into(),
            allow_files: false,
        }
    }

    /// Tolerate symlinked files; symlinked directories are still rejected.
    pub fn allow_files(mut self, allow: bool) -> Self {
        self.allow_files = allow;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn permitted(&self, meta: &FileMeta) -> bool {
        !meta.is_symlink() || (self.allow_files && !meta.is_dir())
    }

    fn deny(&self, path: &Path) -> FsError {
        tracing::warn!(path = %path.display(), root = %self.root.display(), "Refusing to follow symlink");
        FsError::SymlinkDenied {
            path: path.to_path_buf(),
        }
    }

    fn check_ancestors(&self, path: &Path) -> FsResult<()> {
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return Ok(());
        };

        let mut current = self.root.clone();
        let mut parts = rel.components().peekable();
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                break;
            }
            current.push(part);
            let meta = self.inner.symlink_stat(&current)?;
            if meta.is_symlink() {
                return Err(self.deny(&current));
            }
        }
        Ok(())
    }

    fn checked_stat(&self, path: &Path) -> FsResult<FileMeta> {
        self.check_ancestors(path)?;
        let meta = self.inner.symlink_stat(path)?;
        if !self.permitted(&meta) {
            return Err(self.deny(path));
        }
        Ok(meta)
    }
}

impl FileSystem for NoSymlinkFs {
    fn name(&self) -> &'static str {
        "nosymlink"
    }

    fn stat(&self, path: &Path) -> FsResult<FileMeta> {
        self.checked_stat(path)
    }

    fn symlink_stat(&self, path: &Path) -> FsResult<FileMeta> {
        self.checked_stat(path)
    }

    fn read_dir(&self, path: &Path) -> FsResult<Vec<FileMeta>> {
        let dir = self.checked_stat(path)?;
        if !dir.is_dir() {
            return Err(FsError::NotADirectory {
                path: path.to_path_buf(),
            });
        }

        let entries = self.inner.read_dir(path)?;
        Ok(entries
            .into_iter()
            .filter(|e| {
                let ok = self.permitted(e);
                if !ok {
                    tracing::warn!(
                        path = %e.filename().display(),
                        "Cannot follow symlink outside of the module root; skipping"
                    );
                }
                ok
            })
            .collect())
    }

    fn create(&self, path: &Path) -> FsResult<File> {
        self.check_ancestors(path)?;
        self.inner.create(path)
    }

    fn create_dir_all(&self, path: &Path) -> FsResult<()> {
        self.check_ancestors(path)?;
        self.inner.create_dir_all(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::OsFs;
    use std::os::unix::fs::symlink;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        module: PathBuf,
    }

    /// module/
    ///   layouts/page.html
    ///   layouts/linked.html -> ../../outside/secret.html
    ///   linkdir -> ../outside
    /// outside/secret.html
    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let module = temp.path().join("module");
        let outside = temp.path().join("outside");
        std::fs::create_dir_all(module.join("layouts")).unwrap();
        std::fs::create_dir_all(&outside).unwrap();
        std::fs::write(module.join("layouts/page.html"), b"page").unwrap();
        std::fs::write(outside.join("secret.html"), b"secret").unwrap();
        symlink(outside.join("secret.html"), module.join("layouts/linked.html")).unwrap();
        symlink(&outside, module.join("linkdir")).unwrap();
        Fixture {
            _temp: temp,
            module,
        }
    }

    #[test]
    fn test_regular_files_pass() {
        let f = fixture();
        let fs = NoSymlinkFs::new(Arc::new(OsFs::new()), &f.module);
        assert!(fs.stat(&f.module.join("layouts/page.html")).is_ok());
    }

    #[test]
    fn test_symlinked_file_rejected() {
        let f = fixture();
        let fs = NoSymlinkFs::new(Arc::new(OsFs::new()), &f.module);
        let err = fs.stat(&f.module.join("layouts/linked.html")).unwrap_err();
        assert!(err.is_symlink_denied());
        assert!(err.is_not_found());
    }

    #[test]
    fn test_symlinked_file_allowed_when_configured() {
        let f = fixture();
        let fs = NoSymlinkFs::new(Arc::new(OsFs::new()), &f.module).allow_files(true);
        let meta = fs.stat(&f.module.join("layouts/linked.html")).unwrap();
        assert_eq!(meta.len(), 6);
    }

    #[test]
    fn test_unfollowable_links_are_not_files() {
        let f = fixture();
        let static_dir = f.module.join("static");
        std::fs::create_dir_all(&static_dir).unwrap();
        symlink(static_dir.join("nowhere.ico"), static_dir.join("dangling.ico")).unwrap();
        symlink(static_dir.join("loop.ico"), static_dir.join("loop.ico")).unwrap();

        let fs = NoSymlinkFs::new(Arc::new(OsFs::new()), &f.module).allow_files(true);
        let err = fs.stat(&static_dir.join("dangling.ico")).unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_symlink_denied());

        let err = fs.stat(&static_dir.join("loop.ico")).unwrap_err();
        assert!(matches!(err, FsError::Io { .. }));
    }

    #[test]
    fn test_symlinked_directory_always_rejected() {
        let f = fixture();
        let fs = NoSymlinkFs::new(Arc::new(OsFs::new()), &f.module).allow_files(true);
        assert!(fs.stat(&f.module.join("linkdir")).unwrap_err().is_not_found());
        // Traversing through the linked directory is rejected too.
        assert!(fs
            .stat(&f.module.join("linkdir/secret.html"))
            .unwrap_err()
            .is_symlink_denied());
    }

    #[test]
    fn test_read_dir_skips_links() {
        let f = fixture();
        let fs = NoSymlinkFs::new(Arc::new(OsFs::new()), &f.module);
        let names: Vec<_> = fs
            .read_dir(&f.module.join("layouts"))
            .unwrap()
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(names, vec!["page.html"]);

        let root: Vec<_> = fs
            .read_dir(&f.module)
            .unwrap()
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(root, vec!["layouts"]);
    }
}
