//! Non-shadowing view over a list of source directories.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{normalize, FileMeta, FileSystem, SourceDir};
use crate::error::{FsError, FsResult};

/// Exposes every contributing directory of a component at once.
///
/// Unlike an overlay, listings are not deduplicated: a `data/authors.toml`
/// provided by three modules is listed three times, grouped by directory in
/// precedence order, and each entry carries the weight of its mount. Data and
/// translation loaders use this to merge file contents themselves.
///
/// `stat` still returns the first directory that provides the path.
#[derive(Debug, Clone, Default)]
pub struct SliceFs {
    dirs: Vec<SourceDir>,
}

enum Resolved {
    Physical(PathBuf, PathBuf),
    Virtual(String),
    Miss,
}

impl SliceFs {
    pub fn new(dirs: Vec<SourceDir>) -> Self {
        Self { dirs }
    }

    pub fn dirs(&self) -> &[SourceDir] {
        &self.dirs
    }

    fn resolve(dir: &SourceDir, path: &Path) -> Resolved {
        let root = Path::new(dir.meta.mount_root());
        if let Ok(rest) = path.strip_prefix(root) {
            return Resolved::Physical(dir.filename().join(rest), rest.to_path_buf());
        }
        match root.strip_prefix(path).ok().and_then(|r| r.components().next()) {
            Some(child) => Resolved::Virtual(child.as_os_str().to_string_lossy().into_owned()),
            None => Resolved::Miss,
        }
    }

    fn accepts(dir: &SourceDir, rel: &Path, is_dir: bool) -> bool {
        dir.meta
            .mapping()
            .map_or(true, |m| m.accepts(rel, is_dir))
    }

    fn attach(dir: &SourceDir, meta: FileMeta) -> FileMeta {
        match dir.meta.mapping() {
            Some(m) => meta.with_mapping(Arc::clone(m)),
            None => meta,
        }
    }
}

impl FileSystem for SliceFs {
    fn name(&self) -> &'static str {
        "slice"
    }

    fn stat(&self, path: &Path) -> FsResult<FileMeta> {
        let path = normalize(path);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        for dir in &self.dirs {
            match Self::resolve(dir, &path) {
                Resolved::Physical(physical, rel) => match dir.fs.stat(&physical) {
                    Ok(meta) if Self::accepts(dir, &rel, meta.is_dir()) => {
                        return Ok(Self::attach(dir, meta.with_name(name)));
                    }
                    Ok(_) => continue,
                    Err(e) if e.is_not_found() => continue,
                    Err(e) => return Err(e),
                },
                Resolved::Virtual(_) => return Ok(FileMeta::virtual_dir(&path)),
                Resolved::Miss => continue,
            }
        }

        if path.as_os_str().is_empty() {
            return Ok(FileMeta::virtual_dir(&path));
        }
        Err(FsError::not_found(path))
    }

    /// Entries are grouped by contributing directory, in precedence order,
    /// and sorted by name within each group.
    fn read_dir(&self, path: &Path) -> FsResult<Vec<FileMeta>> {
        let path = normalize(path);
        let mut found = path.as_os_str().is_empty();
        let mut virtual_seen = HashSet::new();
        let mut entries = Vec::new();

        for dir in &self.dirs {
            match Self::resolve(dir, &path) {
                Resolved::Physical(physical, rel) => {
                    if !Self::accepts(dir, &rel, true) {
                        continue;
                    }
                    let listing = match dir.fs.read_dir(&physical) {
                        Ok(listing) => listing,
                        Err(e) if e.is_not_found() => continue,
                        Err(FsError::NotADirectory { .. }) => continue,
                        Err(e) => return Err(e),
                    };
                    found = true;
                    entries.extend(
                        listing
                            .into_iter()
                            .filter(|e| Self::accepts(dir, &rel.join(e.name()), e.is_dir()))
                            .map(|e| Self::attach(dir, e)),
                    );
                }
                Resolved::Virtual(child) => {
                    found = true;
                    if virtual_seen.insert(child.clone()) {
                        entries.push(FileMeta::virtual_dir(Path::new(&child)));
                    }
                }
                Resolved::Miss => {}
            }
        }

        if !found {
            return Err(FsError::not_found(path));
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FsHandle, OsFs, RootMapping, RootMappingFs, Weight};
    use crate::component::Component;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn source_dirs(mappings: Vec<RootMapping>) -> Vec<SourceDir> {
        let os: FsHandle = Arc::new(OsFs::new());
        let fs = RootMappingFs::new(Arc::clone(&os), mappings).unwrap();
        fs.dirs(Component::Data)
            .unwrap()
            .into_iter()
            .map(|meta| SourceDir::new(meta, Arc::clone(&os)))
            .collect()
    }

    #[test]
    fn test_lists_every_contribution() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "site/data/authors.toml", "site");
        write(temp.path(), "theme/data/authors.toml", "theme");
        write(temp.path(), "theme/data/menus.toml", "theme");

        let fs = SliceFs::new(source_dirs(vec![
            RootMapping::new("data", temp.path().join("site/data")).with_weight(Weight::new(0, 0)),
            RootMapping::new("data", temp.path().join("theme/data")).with_weight(Weight::new(1, 0)),
        ]));

        let entries = fs.read_dir(Path::new("")).unwrap();
        let listed: Vec<_> = entries
            .iter()
            .map(|e| (e.name().to_string(), e.weight().unwrap().ordinal()))
            .collect();
        assert_eq!(
            listed,
            vec![
                ("authors.toml".to_string(), 0),
                ("authors.toml".to_string(), 1),
                ("menus.toml".to_string(), 1),
            ]
        );

        let meta = fs.stat(Path::new("authors.toml")).unwrap();
        assert_eq!(meta.filename(), temp.path().join("site/data/authors.toml"));
    }

    #[test]
    fn test_mount_root_is_reapplied() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "extra/people.json", "[]");

        let fs = SliceFs::new(source_dirs(vec![RootMapping::new(
            "data/team",
            temp.path().join("extra"),
        )]));

        let root: Vec<_> = fs
            .read_dir(Path::new(""))
            .unwrap()
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(root, vec!["team"]);
        assert!(fs.stat(Path::new("team")).unwrap().is_dir());

        let meta = fs.stat(Path::new("team/people.json")).unwrap();
        assert_eq!(meta.filename(), temp.path().join("extra/people.json"));
        assert_eq!(meta.mount_root(), "team");
        assert!(fs.stat(Path::new("people.json")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_empty_slice() {
        let fs = SliceFs::default();
        assert!(fs.read_dir(Path::new("")).unwrap().is_empty());
        assert!(fs.stat(Path::new("")).unwrap().is_dir());
        assert!(fs.read_dir(Path::new("x")).unwrap_err().is_not_found());
    }
}
