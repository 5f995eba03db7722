//! Root-mapped filesystem: virtual path prefixes bound to physical directories.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{normalize, FileMeta, FileSystem, FsHandle};
use crate::component::Component;
use crate::error::{FsError, FsResult};
use crate::filter::FilenameFilter;

/// Precedence of a mount, derived from module ordinal and mount index.
///
/// A higher weight wins. Mounts of an earlier-resolved module always outrank
/// those of a later one; within a module, earlier mounts outrank later ones.
/// The encoded [`Weight::value`] is unique per `(ordinal, index)` pair and
/// cannot overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Weight {
    ordinal: u32,
    index: u32,
}

impl Weight {
    pub fn new(ordinal: usize, index: usize) -> Self {
        Self {
            ordinal: u32::try_from(ordinal).unwrap_or(u32::MAX),
            index: u32::try_from(index).unwrap_or(u32::MAX),
        }
    }

    /// Module position in the resolved module list.
    pub fn ordinal(&self) -> usize {
        self.ordinal as usize
    }

    /// Mount position within its module.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Numeric form for structural mergers: higher is stronger.
    pub fn value(&self) -> u64 {
        (u64::from(u32::MAX - self.ordinal) << 32) | u64::from(u32::MAX - self.index)
    }
}

impl Ord for Weight {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value().cmp(&other.value())
    }
}

impl PartialOrd for Weight {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Binding of a virtual path prefix to a physical directory.
///
/// Produced by the mount resolver, immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RootMapping {
    from: PathBuf,
    to: PathBuf,
    to_base_dir: PathBuf,
    module: String,
    is_project: bool,
    watch: bool,
    weight: Weight,
    component: Option<Component>,
    inclusion_filter: Option<FilenameFilter>,
    lang: String,
}

impl RootMapping {
    /// Bind virtual `from` (e.g. `content/blog`) to physical `to`.
    pub fn new(from: impl AsRef<Path>, to: impl Into<PathBuf>) -> Self {
        let from = normalize(from.as_ref());
        let component = Component::from_target(&from.to_string_lossy());
        Self {
            from,
            to: to.into(),
            to_base_dir: PathBuf::new(),
            module: String::new(),
            is_project: false,
            watch: false,
            weight: Weight::new(0, 0),
            component,
            inclusion_filter: None,
            lang: String::new(),
        }
    }

    /// Directory relative source paths were resolved against; empty for
    /// absolute mount sources.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.to_base_dir = dir.into();
        self
    }

    pub fn with_module(mut self, module: impl Into<String>, is_project: bool) -> Self {
        self.module = module.into();
        self.is_project = is_project;
        self
    }

    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    pub fn with_weight(mut self, weight: Weight) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_filter(mut self, filter: Option<FilenameFilter>) -> Self {
        self.inclusion_filter = filter;
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// Virtual target, normalized (`content/blog`).
    pub fn from(&self) -> &Path {
        &self.from
    }

    /// Physical source directory.
    pub fn to(&self) -> &Path {
        &self.to
    }

    pub fn to_base_dir(&self) -> &Path {
        &self.to_base_dir
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn is_project(&self) -> bool {
        self.is_project
    }

    pub fn watch(&self) -> bool {
        self.watch
    }

    pub fn weight(&self) -> Weight {
        self.weight
    }

    /// Classification of the mount, inferred from its target.
    pub fn component(&self) -> Option<Component> {
        self.component
    }

    pub fn inclusion_filter(&self) -> Option<&FilenameFilter> {
        self.inclusion_filter.as_ref()
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Target below its component folder: `blog` for `content/blog`, empty
    /// for `content`.
    pub fn mount_root(&self) -> &str {
        let from = self.from.to_str().unwrap_or_default();
        match self.component {
            Some(c) => from
                .strip_prefix(c.as_str())
                .unwrap_or_default()
                .trim_start_matches('/'),
            None => from,
        }
    }

    /// Whether a path relative to this mount passes its include/exclude filter.
    pub fn accepts(&self, rel: &Path, is_dir: bool) -> bool {
        if rel.as_os_str().is_empty() {
            return true;
        }
        self.inclusion_filter
            .as_ref()
            .map_or(true, |f| f.matches(rel, is_dir))
    }

    fn validate(&self) -> FsResult<()> {
        let reason = if self.from.as_os_str().is_empty() {
            "empty virtual target"
        } else if !self.to.is_absolute() {
            "physical source must be absolute"
        } else {
            return Ok(());
        };
        Err(FsError::InvalidMapping {
            from: self.from.display().to_string(),
            to: self.to.clone(),
            reason: reason.to_string(),
        })
    }
}

/// A virtual filesystem answering lookups through an ordered set of
/// [`RootMapping`]s over a physical base filesystem.
///
/// Mapping order is precedence order: when two mappings provide the same
/// virtual path, the earlier one wins. Directory listings merge all mappings;
/// files are deduplicated by name and language, so mappings for different
/// languages stay side by side.
#[derive(Debug, Clone)]
pub struct RootMappingFs {
    base: FsHandle,
    mappings: Vec<Arc<RootMapping>>,
}

impl RootMappingFs {
    /// Create a root-mapped filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::InvalidMapping`] for an empty target or a relative
    /// physical source.
    pub fn new(base: FsHandle, mappings: Vec<RootMapping>) -> FsResult<Self> {
        for rm in &mappings {
            rm.validate()?;
        }
        Ok(Self {
            base,
            mappings: mappings.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn mappings(&self) -> &[Arc<RootMapping>] {
        &self.mappings
    }

    pub fn base(&self) -> &FsHandle {
        &self.base
    }

    /// A narrower view keeping only the mappings matching `keep`.
    pub fn filter<F>(&self, keep: F) -> Self
    where
        F: Fn(&RootMapping) -> bool,
    {
        Self {
            base: Arc::clone(&self.base),
            mappings: self
                .mappings
                .iter()
                .filter(|rm| keep(rm))
                .cloned()
                .collect(),
        }
    }

    /// Existing physical directories bound to `component`, in mapping order.
    ///
    /// Mount sources that do not exist or are not directories are skipped.
    pub fn dirs(&self, component: Component) -> FsResult<Vec<FileMeta>> {
        let mut dirs = Vec::new();
        for rm in self
            .mappings
            .iter()
            .filter(|rm| rm.component() == Some(component))
        {
            match self.base.stat(rm.to()) {
                Ok(meta) if meta.is_dir() => dirs.push(meta.with_mapping(Arc::clone(rm))),
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(dirs)
    }

    fn is_fixed_root(path: &Path) -> bool {
        let s = path.to_string_lossy();
        s.is_empty() || s.parse::<Component>().is_ok()
    }

    fn matching<'a>(
        &'a self,
        path: &'a Path,
    ) -> impl Iterator<Item = (&'a Arc<RootMapping>, &'a Path)> + 'a {
        self.mappings.iter().filter_map(move |rm| {
            path.strip_prefix(rm.from()).ok().map(|rest| (rm, rest))
        })
    }

    fn virtual_children<'a>(&'a self, path: &'a Path) -> impl Iterator<Item = String> + 'a {
        self.mappings.iter().filter_map(move |rm| {
            let rest = rm.from().strip_prefix(path).ok()?;
            rest.components()
                .next()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
        })
    }
}

impl FileSystem for RootMappingFs {
    fn name(&self) -> &'static str {
        "rootmapping"
    }

    fn stat(&self, path: &Path) -> FsResult<FileMeta> {
        let path = normalize(path);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        for (rm, rest) in self.matching(&path) {
            let physical = if rest.as_os_str().is_empty() {
                rm.to().to_path_buf()
            } else {
                rm.to().join(rest)
            };
            match self.base.stat(&physical) {
                Ok(meta) => {
                    if !rm.accepts(rest, meta.is_dir()) {
                        continue;
                    }
                    return Ok(meta.with_name(name).with_mapping(Arc::clone(rm)));
                }
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            }
        }

        if Self::is_fixed_root(&path) || self.virtual_children(&path).next().is_some() {
            return Ok(FileMeta::virtual_dir(&path));
        }

        Err(FsError::not_found(path))
    }

    fn read_dir(&self, path: &Path) -> FsResult<Vec<FileMeta>> {
        let path = normalize(path);
        let mut entries = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut found = false;

        for (rm, rest) in self.matching(&path) {
            if !rm.accepts(rest, true) {
                continue;
            }
            let physical = rm.to().join(rest);
            let listing = match self.base.read_dir(&physical) {
                Ok(listing) => listing,
                Err(e) if e.is_not_found() => continue,
                Err(FsError::NotADirectory { .. }) => continue,
                Err(e) => return Err(e),
            };
            found = true;

            for entry in listing {
                if !rm.accepts(&rest.join(entry.name()), entry.is_dir()) {
                    continue;
                }
                let lang = if entry.is_dir() { "" } else { rm.lang() };
                if seen.insert((entry.name().to_string(), lang.to_string())) {
                    entries.push(entry.with_mapping(Arc::clone(rm)));
                }
            }
        }

        for child in self.virtual_children(&path) {
            found = true;
            if seen.insert((child.clone(), String::new())) {
                entries.push(FileMeta::virtual_dir(Path::new(&child)));
            }
        }

        if !found && !Self::is_fixed_root(&path) {
            return Err(FsError::not_found(path));
        }

        entries.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(entries)
    }
}
