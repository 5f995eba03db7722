//! Builds the overlay stacks from the resolved modules.
//!
//! One pass over the modules in resolution order. Each module contributes one
//! root-mapped filesystem per mount subset (generic, content, static), its
//! whole directory to the project-wide overlay, and its resources folder to
//! the writable resources cache. Since overlays are first-match-wins, modules
//! resolved earlier shadow later ones.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::component::{Component, FOLDER_RESOURCES};
use crate::config::Paths;
use crate::error::{BuildError, BuildResult, FsError};
use crate::fs::{
    BasePathFs, DirsMerger, FsHandle, NoSymlinkFs, OsFs, OverlayFs, RootMappingFs, SourceDir,
};
use crate::mounts::{resolve_mounts, ModuleMappings};

/// The composed overlay stacks of one configuration generation.
///
/// Immutable once built. Share it between sites with the same physical
/// layout through [`BaseFs::reuse`](crate::base::BaseFs::reuse).
#[derive(Debug, Clone)]
pub struct FilesystemsCollector {
    mounts: OverlayFs,
    content: OverlayFs,
    statics: OverlayFs,
    full: OverlayFs,
    resources: OverlayFs,
    dirs: HashMap<Component, Vec<SourceDir>>,
    static_per_language: Option<BTreeMap<String, OverlayFs>>,
}

impl FilesystemsCollector {
    /// Compose the filesystems for every module of `paths`.
    ///
    /// # Errors
    ///
    /// Any mount or filesystem error aborts the whole build; the error names
    /// the module it occurred in.
    pub fn build(paths: &Paths) -> BuildResult<Self> {
        Self::build_with_source(paths, Arc::new(OsFs::new()))
    }

    /// Like [`FilesystemsCollector::build`] over an explicit physical
    /// filesystem.
    pub fn build_with_source(paths: &Paths, source: FsHandle) -> BuildResult<Self> {
        let resolved = resolve_mounts(paths.modules(), paths.default_content_language())?;

        let static_per_language = paths.is_multihost().then(|| {
            paths
                .languages()
                .into_iter()
                .map(|lang| (lang, OverlayFs::new()))
                .collect::<BTreeMap<_, _>>()
        });

        let mut collector = Self {
            mounts: OverlayFs::new(),
            content: OverlayFs::new().with_merger(DirsMerger::Language),
            statics: OverlayFs::new().with_merger(DirsMerger::Language),
            full: OverlayFs::new(),
            resources: OverlayFs::new().with_first_writable(true),
            dirs: HashMap::new(),
            static_per_language,
        };

        for md in resolved {
            collector.add_module(paths, &source, md)?;
        }

        collector.mounts = collector.mounts.or_empty();
        collector.content = collector.content.or_empty();
        collector.statics = collector.statics.or_empty();
        collector.full = collector.full.or_empty();
        collector.resources = collector.resources.or_empty();
        if let Some(per_language) = collector.static_per_language.as_mut() {
            for overlay in per_language.values_mut() {
                *overlay = std::mem::take(overlay).or_empty();
            }
        }

        tracing::info!(
            modules = paths.modules().len(),
            languages = paths.languages().len(),
            multihost = paths.is_multihost(),
            "Source filesystems built"
        );

        Ok(collector)
    }

    fn add_module(&mut self, paths: &Paths, source: &FsHandle, md: ModuleMappings) -> BuildResult<()> {
        let fs_error = |source: FsError| BuildError::Filesystem {
            module: md.module.clone(),
            source,
        };

        let mod_base: FsHandle = if md.is_project {
            Arc::clone(source)
        } else {
            Arc::new(NoSymlinkFs::new(Arc::clone(source), &md.dir))
        };
        let static_base: FsHandle =
            Arc::new(NoSymlinkFs::new(Arc::clone(&mod_base), &md.dir).allow_files(true));

        let rmfs = RootMappingFs::new(Arc::clone(&mod_base), md.generic.clone()).map_err(fs_error)?;
        let rmfs_content =
            RootMappingFs::new(Arc::clone(&mod_base), md.content.clone()).map_err(fs_error)?;
        let rmfs_static =
            RootMappingFs::new(Arc::clone(&static_base), md.statics.clone()).map_err(fs_error)?;

        self.add_dirs(&rmfs).map_err(fs_error)?;
        self.add_dirs(&rmfs_content).map_err(fs_error)?;
        self.add_dirs(&rmfs_static).map_err(fs_error)?;

        if let Some(per_language) = self.static_per_language.as_mut() {
            for (lang, overlay) in per_language.iter_mut() {
                let lfs = rmfs_static.filter(|rm| rm.lang().is_empty() || rm.lang() == lang);
                let scoped = BasePathFs::new(Arc::new(lfs), Component::Static.as_str());
                *overlay = overlay.append(Arc::new(scoped));
            }
        }

        let resources_dir = if md.is_project {
            paths.abs_resources_dir()
        } else {
            md.abs_path(FOLDER_RESOURCES)
        };

        tracing::debug!(
            module = %md.module,
            ordinal = md.ordinal,
            project = md.is_project,
            resources = %resources_dir.display(),
            "Adding module filesystems"
        );

        self.mounts = self.mounts.append(Arc::new(rmfs));
        self.content = self.content.append(Arc::new(rmfs_content));
        self.statics = self.statics.append(Arc::new(rmfs_static));
        self.full = self
            .full
            .append(Arc::new(BasePathFs::new(Arc::clone(&mod_base), &md.dir)));
        self.resources = self
            .resources
            .append(Arc::new(BasePathFs::new(mod_base, resources_dir)));

        Ok(())
    }

    fn add_dirs(&mut self, rmfs: &RootMappingFs) -> Result<(), FsError> {
        for component in Component::FOLDERS {
            for meta in rmfs.dirs(component)? {
                self.dirs
                    .entry(component)
                    .or_default()
                    .push(SourceDir::new(meta, Arc::clone(rmfs.base())));
            }
        }
        Ok(())
    }

    /// Layouts, data, i18n, archetypes and assets mounts of every module.
    pub fn mounts(&self) -> &OverlayFs {
        &self.mounts
    }

    pub fn content(&self) -> &OverlayFs {
        &self.content
    }

    pub fn statics(&self) -> &OverlayFs {
        &self.statics
    }

    /// Every module directory, unfiltered.
    pub fn full(&self) -> &OverlayFs {
        &self.full
    }

    /// Resources folders; the project's is writable.
    pub fn resources(&self) -> &OverlayFs {
        &self.resources
    }

    /// Existing directories contributing to `component`, highest precedence
    /// first.
    pub fn dirs(&self, component: Component) -> &[SourceDir] {
        self.dirs.get(&component).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Per-language static overlays, present in multihost mode only. Each is
    /// already scoped to the static root.
    pub fn static_per_language(&self) -> Option<&BTreeMap<String, OverlayFs>> {
        self.static_per_language.as_ref()
    }
}
