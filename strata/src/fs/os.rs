//! Host filesystem layer.

use std::fs::{self, File};
use std::path::Path;

use super::{FileMeta, FileSystem};
use crate::error::{FsError, FsResult};

/// The host filesystem, addressed by absolute paths.
///
/// Symbolic links are followed by [`FileSystem::stat`] and flagged by
/// [`FileSystem::symlink_stat`], which still reports the target's kind and
/// size. A link that cannot be followed is an error in both: not-found when
/// dangling, [`FsError::Io`] for loops. Directory entries carry the followed
/// metadata with the symlink flag of the entry itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl OsFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for OsFs {
    fn name(&self) -> &'static str {
        "os"
    }

    fn stat(&self, path: &Path) -> FsResult<FileMeta> {
        let md = fs::metadata(path).map_err(|e| FsError::from_io(path, e))?;
        Ok(FileMeta::from_std(path, &md))
    }

    fn symlink_stat(&self, path: &Path) -> FsResult<FileMeta> {
        let md = fs::symlink_metadata(path).map_err(|e| FsError::from_io(path, e))?;
        if md.file_type().is_symlink() {
            let target = fs::metadata(path).map_err(|e| FsError::from_io(path, e))?;
            let mut meta = FileMeta::from_std(path, &target);
            meta.is_symlink = true;
            return Ok(meta);
        }
        Ok(FileMeta::from_std(path, &md))
    }

    fn read_dir(&self, path: &Path) -> FsResult<Vec<FileMeta>> {
        let md = fs::metadata(path).map_err(|e| FsError::from_io(path, e))?;
        if !md.is_dir() {
            return Err(FsError::NotADirectory {
                path: path.to_path_buf(),
            });
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(path).map_err(|e| FsError::from_io(path, e))? {
            let entry = entry.map_err(|e| FsError::from_io(path, e))?;
            let entry_path = entry.path();
            match self.symlink_stat(&entry_path) {
                Ok(meta) => entries.push(meta),
                // Removed between listing and stat.
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            }
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn create(&self, path: &Path) -> FsResult<File> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| FsError::from_io(parent, e))?;
        }
        File::create(path).map_err(|e| FsError::from_io(path, e))
    }

    fn create_dir_all(&self, path: &Path) -> FsResult<()> {
        fs::create_dir_all(path).map_err(|e| FsError::from_io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use tempfile::TempDir;

    #[test]
    fn test_stat_and_read_dir() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("b.txt"), b"bb").unwrap();
        std::fs::create_dir(temp.path().join("a")).unwrap();

        let fs = OsFs::new();
        let meta = fs.stat(&temp.path().join("b.txt")).unwrap();
        assert_eq!(meta.name(), "b.txt");
        assert_eq!(meta.len(), 2);
        assert!(!meta.is_dir());

        let entries = fs.read_dir(temp.path()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b.txt"]);
    }

    #[test]
    fn test_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = OsFs::new().stat(&temp.path().join("nope")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_read_dir_on_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("f");
        std::fs::write(&file, b"").unwrap();
        let err = OsFs::new().read_dir(&file).unwrap_err();
        assert!(matches!(err, FsError::NotADirectory { .. }));
    }

    #[test]
    fn test_create_and_open() {
        let temp = TempDir::new().unwrap();
        let fs = OsFs::new();
        let path = temp.path().join("nested/dir/file.txt");

        let mut f = fs.create(&path).unwrap();
        f.write_all(b"hello").unwrap();
        drop(f);

        let mut content = String::new();
        fs.open(&path).unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "hello");
    }

    #[test]
    fn test_symlink_stat_flags_links() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target.txt");
        std::fs::write(&target, b"x").unwrap();
        let link = temp.path().join("link.txt");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let fs = OsFs::new();
        assert!(!fs.stat(&link).unwrap().is_symlink());
        let meta = fs.symlink_stat(&link).unwrap();
        assert!(meta.is_symlink());
        assert!(!meta.is_dir());
    }

    #[test]
    fn test_symlink_stat_dangling_link_is_not_found() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join("dangling.txt");
        std::os::unix::fs::symlink(temp.path().join("nowhere.txt"), &link).unwrap();

        let err = OsFs::new().symlink_stat(&link).unwrap_err();
        assert!(err.is_not_found());

        // Listing skips it like an entry removed mid-listing.
        assert!(OsFs::new().read_dir(temp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_symlink_stat_loop_is_io_error() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join("loop.txt");
        std::os::unix::fs::symlink(&link, &link).unwrap();

        let err = OsFs::new().symlink_stat(&link).unwrap_err();
        assert!(matches!(err, FsError::Io { .. }));
        assert!(!err.is_not_found());
    }
}
