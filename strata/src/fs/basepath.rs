//! Prefixing decorator.

use std::fs::File;
use std::path::{Path, PathBuf};

use super::{normalize, FileMeta, FileSystem, FsHandle};
use crate::error::FsResult;

/// Resolves every path below a fixed base path of an inner filesystem.
///
/// Used both over physical layers (a module directory) and over virtual ones
/// (scoping the mounts overlay to `layouts`). Input paths are normalized
/// first, so `..` can never climb above the base.
#[derive(Debug, Clone)]
pub struct BasePathFs {
    inner: FsHandle,
    base: PathBuf,
}

impl BasePathFs {
    pub fn new(inner: FsHandle, base: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            base: base.into(),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn real_path(&self, path: &Path) -> PathBuf {
        let rel = normalize(path);
        if rel.as_os_str().is_empty() {
            self.base.clone()
        } else {
            self.base.join(rel)
        }
    }

    fn rename(meta: FileMeta, path: &Path) -> FileMeta {
        let name = normalize(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        meta.with_name(name)
    }
}

impl FileSystem for BasePathFs {
    fn name(&self) -> &'static str {
        "basepath"
    }

    fn stat(&self, path: &Path) -> FsResult<FileMeta> {
        let meta = self.inner.stat(&self.real_path(path))?;
        Ok(Self::rename(meta, path))
    }

    fn symlink_stat(&self, path: &Path) -> FsResult<FileMeta> {
        let meta = self.inner.symlink_stat(&self.real_path(path))?;
        Ok(Self::rename(meta, path))
    }

    fn read_dir(&self, path: &Path) -> FsResult<Vec<FileMeta>> {
        self.inner.read_dir(&self.real_path(path))
    }

    fn open(&self, path: &Path) -> FsResult<File> {
        self.inner.open(&self.real_path(path))
    }

    fn create(&self, path: &Path) -> FsResult<File> {
        self.inner.create(&self.real_path(path))
    }

    fn create_dir_all(&self, path: &Path) -> FsResult<()> {
        self.inner.create_dir_all(&self.real_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::OsFs;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_resolves_below_base() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("layouts/_default")).unwrap();
        std::fs::write(temp.path().join("layouts/_default/single.html"), b"x").unwrap();

        let fs = BasePathFs::new(Arc::new(OsFs::new()), temp.path().join("layouts"));
        let meta = fs.stat(Path::new("/_default/single.html")).unwrap();
        assert_eq!(
            meta.filename(),
            temp.path().join("layouts/_default/single.html")
        );
        assert_eq!(meta.name(), "single.html");
    }

    #[test]
    fn test_parent_components_stay_inside_base() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("base")).unwrap();
        std::fs::write(temp.path().join("secret.txt"), b"x").unwrap();

        let fs = BasePathFs::new(Arc::new(OsFs::new()), temp.path().join("base"));
        assert!(fs.stat(Path::new("../secret.txt")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_writes_pass_through() {
        let temp = TempDir::new().unwrap();
        let fs = BasePathFs::new(Arc::new(OsFs::new()), temp.path());
        fs.create(Path::new("gen/images/a.png")).unwrap();
        assert!(temp.path().join("gen/images/a.png").exists());
    }
}
