//! Category views over the composed filesystems.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::collector::FilesystemsCollector;
use crate::component::Component;
use crate::error::{FsError, FsResult};
use crate::fs::{
    normalize, BasePathFs, EmptyFs, FileMeta, FileSystem, FsHandle, OverlayFs, SliceFs, SourceDir,
};

/// The filesystem of one component plus the physical directories behind it.
///
/// `fs` expects paths relative to the component root (`_default/list.html`
/// for layouts). `dirs` lists the contributing directories from the project
/// down to the last module.
#[derive(Debug, Clone)]
pub struct SourceFilesystem {
    component: Component,
    fs: FsHandle,
    dirs: Vec<SourceDir>,
    publish_folder: String,
}

impl SourceFilesystem {
    pub fn new(component: Component, fs: FsHandle, dirs: Vec<SourceDir>) -> Self {
        Self {
            component,
            fs,
            dirs,
            publish_folder: String::new(),
        }
    }

    /// Publish into a subfolder when syncing to the output directory.
    pub fn with_publish_folder(mut self, folder: impl Into<String>) -> Self {
        self.publish_folder = folder.into();
        self
    }

    pub fn component(&self) -> Component {
        self.component
    }

    pub fn name(&self) -> &'static str {
        self.component.as_str()
    }

    pub fn fs(&self) -> &FsHandle {
        &self.fs
    }

    pub fn dirs(&self) -> &[SourceDir] {
        &self.dirs
    }

    pub fn publish_folder(&self) -> &str {
        &self.publish_folder
    }

    /// Whether the physical `filename` lies inside a contributing directory.
    pub fn contains(&self, filename: &Path) -> bool {
        self.dirs.iter().any(|d| filename.starts_with(d.filename()))
    }

    /// Translate a physical filename to its path inside this component.
    ///
    /// The mount root of the owning directory is re-applied, so a file below
    /// a mount targeting `content/blog` comes back as `blog/...`.
    pub fn make_path_relative(&self, filename: &Path) -> Option<PathBuf> {
        self.dirs.iter().find_map(|d| {
            let rest = filename.strip_prefix(d.filename()).ok()?;
            let root = d.meta.mount_root();
            Some(if root.is_empty() {
                rest.to_path_buf()
            } else {
                Path::new(root).join(rest)
            })
        })
    }

    /// Like [`SourceFilesystem::make_path_relative`], empty when `filename`
    /// is not a member.
    pub fn path(&self, filename: &Path) -> PathBuf {
        self.make_path_relative(filename).unwrap_or_default()
    }

    /// Physical filename of the winning file for `rel`, or `rel` itself when
    /// no layer provides it.
    pub fn real_filename(&self, rel: &Path) -> PathBuf {
        match self.fs.stat(rel) {
            Ok(meta) if !meta.filename().as_os_str().is_empty() => meta.filename().to_path_buf(),
            _ => rel.to_path_buf(),
        }
    }

    /// Physical directories for `from` in every contributing root that has
    /// it, highest precedence first.
    pub fn real_dirs(&self, from: &Path) -> Vec<PathBuf> {
        let from = normalize(from);
        self.dirs
            .iter()
            .filter_map(|d| {
                let rest = from.strip_prefix(d.meta.mount_root()).ok()?;
                let dirname = d.filename().join(rest);
                match d.fs.stat(&dirname) {
                    Ok(meta) if meta.is_dir() => Some(dirname),
                    _ => None,
                }
            })
            .collect()
    }
}

/// Every component view of a site.
#[derive(Debug, Clone)]
pub struct SourceFilesystems {
    pub content: SourceFilesystem,
    pub data: SourceFilesystem,
    pub i18n: SourceFilesystem,
    pub layouts: SourceFilesystem,
    pub archetypes: SourceFilesystem,
    pub assets: SourceFilesystem,

    /// Writable on top of the project's resources directory, with module
    /// resources layered below.
    pub resources_cache: OverlayFs,

    /// Read-only overlay of every module directory, project first.
    pub work: OverlayFs,

    /// One view per language in multihost mode, otherwise one view under the
    /// empty key.
    pub statics: BTreeMap<String, SourceFilesystem>,

    /// Every static directory, across all languages.
    pub static_dirs: Vec<SourceDir>,
}

impl SourceFilesystems {
    /// Wrap the collector's overlays in component views.
    pub fn from_collector(collector: &FilesystemsCollector) -> Self {
        let mounts: FsHandle = Arc::new(collector.mounts().clone());
        let scoped = |component: Component| {
            SourceFilesystem::new(
                component,
                Arc::new(BasePathFs::new(Arc::clone(&mounts), component.as_str())),
                collector.dirs(component).to_vec(),
            )
        };
        let sliced = |component: Component| {
            let dirs = collector.dirs(component).to_vec();
            SourceFilesystem::new(component, Arc::new(SliceFs::new(dirs.clone())), dirs)
        };

        let static_dirs = collector.dirs(Component::Static).to_vec();
        let statics = match collector.static_per_language() {
            Some(per_language) => per_language
                .iter()
                .map(|(lang, overlay)| {
                    let view = SourceFilesystem::new(
                        Component::Static,
                        Arc::new(overlay.clone()),
                        static_dirs.clone(),
                    )
                    .with_publish_folder(lang.clone());
                    (lang.clone(), view)
                })
                .collect(),
            None => {
                let fs = BasePathFs::new(
                    Arc::new(collector.statics().clone()),
                    Component::Static.as_str(),
                );
                let view =
                    SourceFilesystem::new(Component::Static, Arc::new(fs), static_dirs.clone());
                BTreeMap::from([(String::new(), view)])
            }
        };

        Self {
            content: SourceFilesystem::new(
                Component::Content,
                Arc::new(BasePathFs::new(
                    Arc::new(collector.content().clone()),
                    Component::Content.as_str(),
                )),
                collector.dirs(Component::Content).to_vec(),
            ),
            data: sliced(Component::Data),
            i18n: sliced(Component::I18n),
            layouts: scoped(Component::Layouts),
            archetypes: scoped(Component::Archetypes),
            assets: scoped(Component::Assets),
            resources_cache: collector.resources().clone(),
            work: collector.full().clone(),
            statics,
            static_dirs,
        }
    }

    /// The static view for `lang`: the language's own view in multihost
    /// mode, the shared one otherwise.
    pub fn static_view(&self, lang: &str) -> Option<&SourceFilesystem> {
        self.statics.get(lang).or_else(|| self.statics.get(""))
    }

    /// The static filesystem for `lang`; empty when there is none.
    pub fn static_fs(&self, lang: &str) -> FsHandle {
        match self.static_view(lang) {
            Some(view) => Arc::clone(view.fs()),
            None => Arc::new(EmptyFs::new()),
        }
    }

    /// The non-static view of `component`; `None` for static and resources.
    pub fn get(&self, component: Component) -> Option<&SourceFilesystem> {
        match component {
            Component::Content => Some(&self.content),
            Component::Data => Some(&self.data),
            Component::I18n => Some(&self.i18n),
            Component::Layouts => Some(&self.layouts),
            Component::Archetypes => Some(&self.archetypes),
            Component::Assets => Some(&self.assets),
            Component::Static | Component::Resources => None,
        }
    }

    /// Look `name` up in static, then assets, then content.
    ///
    /// Returns the metadata together with the filesystem that had it. A
    /// not-found error is returned only when all three miss; any other error
    /// is returned as soon as it occurs.
    pub fn stat_resource(&self, lang: &str, name: &Path) -> FsResult<(FileMeta, FsHandle)> {
        let candidates = [
            self.static_fs(lang),
            Arc::clone(self.assets.fs()),
            Arc::clone(self.content.fs()),
        ];
        for fs in candidates {
            match fs.stat(name) {
                Ok(meta) => return Ok((meta, fs)),
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            }
        }
        Err(FsError::not_found(name))
    }

    /// Content, static for `lang`, then assets, as one overlay.
    pub fn content_static_asset_fs(&self, lang: &str) -> OverlayFs {
        OverlayFs::new()
            .append(Arc::clone(self.content.fs()))
            .append(self.static_fs(lang))
            .append(Arc::clone(self.assets.fs()))
    }

    /// Whether `filename` belongs to any static view.
    pub fn is_static(&self, filename: &Path) -> bool {
        self.statics.values().any(|s| s.contains(filename))
    }

    pub fn is_content(&self, filename: &Path) -> bool {
        self.content.contains(filename)
    }

    pub fn is_layout(&self, filename: &Path) -> bool {
        self.layouts.contains(filename)
    }

    pub fn is_data(&self, filename: &Path) -> bool {
        self.data.contains(filename)
    }

    pub fn is_asset(&self, filename: &Path) -> bool {
        self.assets.contains(filename)
    }

    pub fn is_i18n(&self, filename: &Path) -> bool {
        self.i18n.contains(filename)
    }

    /// Component of the physical `filename`, checked in the order content,
    /// data, i18n, layouts, archetypes, assets, static.
    pub fn classify(&self, filename: &Path) -> Option<Component> {
        [
            &self.content,
            &self.data,
            &self.i18n,
            &self.layouts,
            &self.archetypes,
            &self.assets,
        ]
        .into_iter()
        .find(|fs| fs.contains(filename))
        .map(SourceFilesystem::component)
        .or_else(|| self.is_static(filename).then_some(Component::Static))
    }

    /// Static-relative path of a physical filename.
    pub fn make_static_path_relative(&self, filename: &Path) -> Option<PathBuf> {
        self.statics
            .values()
            .find_map(|s| s.make_path_relative(filename))
    }

    /// Views relevant for change detection. Static is synced separately.
    pub fn file_systems(&self) -> [&SourceFilesystem; 5] {
        [
            &self.content,
            &self.data,
            &self.i18n,
            &self.layouts,
            &self.archetypes,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Paths, SiteConfig};
    use crate::module::{Module, Mount};
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, rel).unwrap();
    }

    struct Site {
        temp: TempDir,
        sources: SourceFilesystems,
    }

    impl Site {
        fn site(&self, rel: &str) -> PathBuf {
            self.temp.path().join("site").join(rel)
        }

        fn theme(&self, rel: &str) -> PathBuf {
            self.temp.path().join("theme").join(rel)
        }
    }

    fn build() -> Site {
        let temp = TempDir::new().unwrap();
        let site = temp.path().join("site");
        let theme = temp.path().join("theme");
        write(&site, "content/posts/hello.md");
        write(&site, "blogsrc/first.md");
        write(&site, "static/favicon.ico");
        write(&site, "assets/css/main.css");
        write(&theme, "layouts/_default/single.html");
        write(&theme, "data/menu.toml");
        write(&theme, "i18n/en.toml");
        write(&theme, "assets/favicon.ico");
        write(&theme, "assets/js/app.js");

        let modules = vec![
            Module::project(&site).with_mounts(vec![
                Mount::new("content", "content"),
                Mount::new("blogsrc", "content/blog"),
                Mount::new("static", "static"),
                Mount::new("assets", "assets"),
            ]),
            Module::new("theme", &theme),
        ];
        let paths = Paths::new(SiteConfig::new().with_working_dir(&site), modules).unwrap();
        let collector = FilesystemsCollector::build(&paths).unwrap();
        Site {
            sources: SourceFilesystems::from_collector(&collector),
            temp,
        }
    }

    #[test]
    fn test_contains_and_path() {
        let s = build();
        let file = s.site("content/posts/hello.md");
        assert!(s.sources.is_content(&file));
        assert_eq!(s.sources.content.path(&file), PathBuf::from("posts/hello.md"));

        let blog = s.site("blogsrc/first.md");
        assert!(s.sources.is_content(&blog));
        assert_eq!(s.sources.content.path(&blog), PathBuf::from("blog/first.md"));

        assert!(!s.sources.is_layout(&file));
        assert_eq!(s.sources.layouts.path(&file), PathBuf::new());
    }

    #[test]
    fn test_real_filename_and_dirs() {
        let s = build();
        assert_eq!(
            s.sources.content.real_filename(Path::new("blog/first.md")),
            s.site("blogsrc/first.md")
        );
        assert_eq!(
            s.sources.content.real_filename(Path::new("missing.md")),
            PathBuf::from("missing.md")
        );

        assert_eq!(
            s.sources.assets.real_dirs(Path::new("js")),
            vec![s.theme("assets/js")]
        );
        assert_eq!(
            s.sources.content.real_dirs(Path::new("blog")),
            vec![s.site("blogsrc")]
        );
    }

    #[test]
    fn test_stat_resource_order() {
        let s = build();

        // Static beats assets.
        let (meta, _) = s.sources.stat_resource("en", Path::new("favicon.ico")).unwrap();
        assert_eq!(meta.filename(), s.site("static/favicon.ico"));

        let (meta, _) = s.sources.stat_resource("en", Path::new("css/main.css")).unwrap();
        assert_eq!(meta.filename(), s.site("assets/css/main.css"));

        let (meta, _) = s
            .sources
            .stat_resource("en", Path::new("posts/hello.md"))
            .unwrap();
        assert_eq!(meta.filename(), s.site("content/posts/hello.md"));

        assert!(s
            .sources
            .stat_resource("en", Path::new("nowhere.txt"))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_stat_resource_skips_dangling_static_link() {
        let s = build();
        write(&s.theme(""), "assets/touch.png");
        std::os::unix::fs::symlink(s.site("static/nowhere.png"), s.site("static/touch.png"))
            .unwrap();

        let (meta, _) = s.sources.stat_resource("en", Path::new("touch.png")).unwrap();
        assert_eq!(meta.filename(), s.theme("assets/touch.png"));
    }

    #[test]
    fn test_stat_resource_stops_on_io_error() {
        let s = build();
        write(&s.theme(""), "assets/loop.png");
        std::os::unix::fs::symlink(s.site("static/loop.png"), s.site("static/loop.png")).unwrap();

        let err = s
            .sources
            .stat_resource("en", Path::new("loop.png"))
            .unwrap_err();
        assert!(matches!(err, FsError::Io { .. }));
    }

    #[test]
    fn test_classify() {
        let s = build();
        assert_eq!(
            s.sources.classify(&s.theme("data/menu.toml")),
            Some(Component::Data)
        );
        assert_eq!(
            s.sources.classify(&s.site("static/favicon.ico")),
            Some(Component::Static)
        );
        assert_eq!(s.sources.classify(&s.site("README.md")), None);
        assert_eq!(
            s.sources.make_static_path_relative(&s.site("static/favicon.ico")),
            Some(PathBuf::from("favicon.ico"))
        );
    }

    #[test]
    fn test_empty_component() {
        let s = build();
        assert!(s.sources.archetypes.dirs().is_empty());
        assert!(s.sources.archetypes.fs().read_dir(Path::new("")).unwrap().is_empty());
        assert!(!s.sources.archetypes.contains(&s.site("archetypes/default.md")));
    }

    #[test]
    fn test_data_lists_without_shadowing() {
        let s = build();
        let entries = s.sources.data.fs().read_dir(Path::new("")).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].module(), "theme");
        assert_eq!(s.sources.file_systems().len(), 5);
    }

    #[test]
    fn test_content_static_asset_fs() {
        let s = build();
        let fs = s.sources.content_static_asset_fs("en");
        assert_eq!(fs.len(), 3);
        assert!(fs.stat(Path::new("js/app.js")).is_ok());
        assert!(fs.stat(Path::new("posts/hello.md")).is_ok());
    }
}
