//! Entry point: the base filesystems of one site.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::collector::FilesystemsCollector;
use crate::component::FOLDER_JS_CONFIG;
use crate::config::Paths;
use crate::error::{BuildError, BuildResult};
use crate::fs::{FileSystem, SourceDir};
use crate::lock::{BuildLock, BuildLockGuard};
use crate::source::SourceFilesystems;

/// The composed filesystems of a site, plus the project build lock.
///
/// Dereferences to [`SourceFilesystems`]. Sites sharing the same modules
/// should share one instance through [`BaseFs::reuse`] rather than each
/// building their own.
#[derive(Debug, Clone)]
pub struct BaseFs {
    sources: Arc<SourceFilesystems>,
    collector: Arc<FilesystemsCollector>,
    working_dir: PathBuf,
    lock: Arc<BuildLock>,
}

impl BaseFs {
    /// Build every filesystem for `paths`.
    ///
    /// # Errors
    ///
    /// Returns the first [`BuildError`] hit while resolving mounts or
    /// composing the overlays; nothing partial is returned.
    pub fn new(paths: &Paths) -> BuildResult<Self> {
        let collector = FilesystemsCollector::build(paths)?;
        let sources = SourceFilesystems::from_collector(&collector);
        Ok(Self {
            sources: Arc::new(sources),
            collector: Arc::new(collector),
            working_dir: paths.working_dir().to_path_buf(),
            lock: Arc::new(BuildLock::new(paths.working_dir(), paths.config().lock_mode())),
        })
    }

    /// Share the filesystems of `other` instead of building new ones.
    ///
    /// The build lock is shared too when both sites live in the same working
    /// directory.
    pub fn reuse(paths: &Paths, other: &BaseFs) -> Self {
        let lock = if other.working_dir == paths.working_dir() {
            Arc::clone(&other.lock)
        } else {
            Arc::new(BuildLock::new(paths.working_dir(), paths.config().lock_mode()))
        };
        tracing::debug!(working_dir = %paths.working_dir().display(), "Reusing source filesystems");
        Self {
            sources: Arc::clone(&other.sources),
            collector: Arc::clone(&other.collector),
            working_dir: paths.working_dir().to_path_buf(),
            lock,
        }
    }

    /// Whether both values share the same composed filesystems.
    pub fn shares_filesystems(&self, other: &BaseFs) -> bool {
        Arc::ptr_eq(&self.collector, &other.collector)
    }

    pub fn collector(&self) -> &FilesystemsCollector {
        &self.collector
    }

    pub fn sources(&self) -> &SourceFilesystems {
        &self.sources
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Block until no other build of this project runs.
    pub fn lock_build(&self) -> BuildResult<BuildLockGuard<'_>> {
        self.lock.lock()
    }

    /// Every contributing directory: archetypes, i18n, data, content, assets,
    /// layouts, then static.
    pub fn all_dirs(&self) -> Vec<&SourceDir> {
        let s = &self.sources;
        [
            s.archetypes.dirs(),
            s.i18n.dirs(),
            s.data.dirs(),
            s.content.dirs(),
            s.assets.dirs(),
            s.layouts.dirs(),
            s.static_dirs.as_slice(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Directories of watched modules, in [`BaseFs::all_dirs`] order.
    pub fn watch_dirs(&self) -> Vec<&SourceDir> {
        self.all_dirs()
            .into_iter()
            .filter(|d| d.meta.watch())
            .collect()
    }

    /// Content-relative path of a physical filename. Filenames outside every
    /// content directory are returned unchanged.
    pub fn rel_content_dir(&self, filename: &Path) -> PathBuf {
        self.sources
            .content
            .make_path_relative(filename)
            .unwrap_or_else(|| filename.to_path_buf())
    }

    /// Place `filename` inside a project content directory.
    ///
    /// Absolute filenames must already be inside one. Relative filenames are
    /// matched against project content directories relative to their module
    /// (`content/posts/a.md`), and otherwise placed in the first project
    /// content directory (`posts/a.md`).
    ///
    /// Returns `(content-relative, absolute)`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::ContentDir`] when no project content directory
    /// fits.
    pub fn abs_project_content_dir(&self, filename: &Path) -> BuildResult<(PathBuf, PathBuf)> {
        let project_dirs = || {
            self.sources
                .content
                .dirs()
                .iter()
                .filter(|d| d.meta.is_project())
        };

        for dir in project_dirs() {
            let dirname = dir.filename();
            if filename.is_absolute() {
                if let Ok(rel) = filename.strip_prefix(dirname) {
                    return Ok((rel.to_path_buf(), filename.to_path_buf()));
                }
                continue;
            }

            let base = dir
                .meta
                .mapping()
                .map(|m| m.to_base_dir().to_path_buf())
                .unwrap_or_default();
            let content_dir = dirname.strip_prefix(&base).unwrap_or(dirname);
            if let Ok(rel) = filename.strip_prefix(content_dir) {
                return Ok((rel.to_path_buf(), dirname.join(rel)));
            }
        }

        if filename.is_relative() {
            if let Some(dir) = project_dirs().next() {
                return Ok((filename.to_path_buf(), dir.filename().join(filename)));
            }
        }

        Err(BuildError::ContentDir(filename.to_path_buf()))
    }

    /// Physical path of a JS tool configuration file such as
    /// `postcss.config.js`: `assets/_jsconfig/<name>` first, then the
    /// working tree.
    pub fn resolve_js_config_file(&self, name: &str) -> Option<PathBuf> {
        let in_assets = Path::new(FOLDER_JS_CONFIG).join(name);
        [
            self.sources.assets.fs().stat(&in_assets),
            self.sources.work.stat(Path::new(name)),
        ]
        .into_iter()
        .flatten()
        .map(|meta| meta.filename().to_path_buf())
        .find(|p| !p.as_os_str().is_empty())
    }
}

impl Deref for BaseFs {
    type Target = SourceFilesystems;

    fn deref(&self) -> &SourceFilesystems {
        &self.sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LockMode, SiteConfig};
    use crate::module::{Module, Mount};
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, rel).unwrap();
    }

    fn fixture() -> (TempDir, Paths) {
        let temp = TempDir::new().unwrap();
        let site = temp.path().join("site");
        let theme = temp.path().join("theme");
        write(&site, "content/posts/a.md");
        write(&site, "docs/intro.md");
        write(&site, "layouts/index.html");
        write(&site, "postcss.config.js");
        write(&theme, "layouts/_default/single.html");
        write(&theme, "assets/_jsconfig/babel.config.js");
        write(&theme, "static/logo.png");

        let modules = vec![
            Module::project(&site).with_mounts(vec![
                Mount::new("content", "content"),
                Mount::new("docs", "content/docs"),
                Mount::new("layouts", "layouts"),
            ]),
            Module::new("theme", &theme).with_watch(false),
        ];
        let config = SiteConfig::new()
            .with_working_dir(&site)
            .with_lock_mode(LockMode::InProcess);
        let paths = Paths::new(config, modules).unwrap();
        (temp, paths)
    }

    #[test]
    fn test_all_and_watch_dirs() {
        let (temp, paths) = fixture();
        let fs = BaseFs::new(&paths).unwrap();

        let all: Vec<_> = fs.all_dirs().iter().map(|d| d.filename().to_path_buf()).collect();
        assert_eq!(
            all,
            vec![
                temp.path().join("site/content"),
                temp.path().join("site/docs"),
                temp.path().join("theme/assets"),
                temp.path().join("site/layouts"),
                temp.path().join("theme/layouts"),
                temp.path().join("theme/static"),
            ]
        );

        let watched: Vec<_> = fs.watch_dirs().iter().map(|d| d.filename().to_path_buf()).collect();
        assert_eq!(
            watched,
            vec![
                temp.path().join("site/content"),
                temp.path().join("site/docs"),
                temp.path().join("site/layouts"),
            ]
        );
    }

    #[test]
    fn test_rel_content_dir() {
        let (temp, paths) = fixture();
        let fs = BaseFs::new(&paths).unwrap();

        assert_eq!(
            fs.rel_content_dir(&temp.path().join("site/docs/intro.md")),
            PathBuf::from("docs/intro.md")
        );
        assert_eq!(
            fs.rel_content_dir(Path::new("posts/a.md")),
            PathBuf::from("posts/a.md")
        );
    }

    #[test]
    fn test_abs_project_content_dir() {
        let (temp, paths) = fixture();
        let fs = BaseFs::new(&paths).unwrap();
        let content = temp.path().join("site/content");

        let (rel, abs) = fs
            .abs_project_content_dir(&content.join("posts/a.md"))
            .unwrap();
        assert_eq!(rel, PathBuf::from("posts/a.md"));
        assert_eq!(abs, content.join("posts/a.md"));

        let (rel, abs) = fs
            .abs_project_content_dir(Path::new("content/posts/new.md"))
            .unwrap();
        assert_eq!(rel, PathBuf::from("posts/new.md"));
        assert_eq!(abs, content.join("posts/new.md"));

        let (rel, abs) = fs.abs_project_content_dir(Path::new("posts/b.md")).unwrap();
        assert_eq!(rel, PathBuf::from("posts/b.md"));
        assert_eq!(abs, content.join("posts/b.md"));

        let err = fs
            .abs_project_content_dir(&temp.path().join("elsewhere/x.md"))
            .unwrap_err();
        assert!(matches!(err, BuildError::ContentDir(_)));
    }

    #[test]
    fn test_resolve_js_config_file() {
        let (temp, paths) = fixture();
        let fs = BaseFs::new(&paths).unwrap();

        assert_eq!(
            fs.resolve_js_config_file("babel.config.js"),
            Some(temp.path().join("theme/assets/_jsconfig/babel.config.js"))
        );
        assert_eq!(
            fs.resolve_js_config_file("postcss.config.js"),
            Some(temp.path().join("site/postcss.config.js"))
        );
        assert_eq!(fs.resolve_js_config_file("missing.js"), None);
    }

    #[test]
    fn test_reuse_shares_filesystems_and_lock() {
        let (_temp, paths) = fixture();
        let first = BaseFs::new(&paths).unwrap();
        let second = BaseFs::reuse(&paths, &first);
        assert!(second.shares_filesystems(&first));

        let guard = first.lock_build().unwrap();
        drop(guard);
        let _guard = second.lock_build().unwrap();
    }

    #[test]
    fn test_work_is_read_only() {
        let (_temp, paths) = fixture();
        let fs = BaseFs::new(&paths).unwrap();
        assert!(fs
            .work
            .create(Path::new("out.txt"))
            .unwrap_err()
            .is_read_only());
    }
}
