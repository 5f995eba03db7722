//! Modules and their mount declarations.
//!
//! Module resolution (fetching, version selection, import graph) happens
//! elsewhere. This crate consumes its result: an ordered list of [`Module`]s,
//! the project first, each bound to a physical directory and carrying the
//! mounts it declares. The list can be supplied as a JSON manifest, see
//! [`load_module_manifest`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::error::{BuildError, BuildResult};

/// One mount declaration: bind `source` inside the module to the virtual
/// `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    /// Relative to the module directory, or absolute.
    pub source: String,

    /// Virtual target, e.g. `content` or `static/images`.
    pub target: String,

    /// Language the mount applies to. Empty means every language.
    #[serde(default)]
    pub lang: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_files: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_files: Vec<String>,
}

impl Mount {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            lang: String::new(),
            include_files: Vec::new(),
            exclude_files: Vec::new(),
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_include(mut self, patterns: &[&str]) -> Self {
        self.include_files = patterns.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_exclude(mut self, patterns: &[&str]) -> Self {
        self.exclude_files = patterns.iter().map(|s| s.to_string()).collect();
        self
    }
}

fn default_watch() -> bool {
    true
}

/// A resolved module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Stable identifier, e.g. `github.com/org/theme`.
    pub path: String,

    /// Physical root directory.
    pub dir: PathBuf,

    /// Whether this is the main project rather than a dependency.
    #[serde(default)]
    pub project: bool,

    /// Whether changes below this module should be watched.
    #[serde(default = "default_watch")]
    pub watch: bool,

    #[serde(default)]
    pub mounts: Vec<Mount>,
}

impl Module {
    /// A dependency module with the default mounts.
    pub fn new(path: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dir: dir.into(),
            project: false,
            watch: true,
            mounts: default_mounts(),
        }
    }

    /// The main project with the default mounts.
    pub fn project(dir: impl Into<PathBuf>) -> Self {
        Self {
            project: true,
            ..Self::new("project", dir)
        }
    }

    pub fn with_mounts(mut self, mounts: Vec<Mount>) -> Self {
        self.mounts = mounts;
        self
    }

    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }
}

/// `<component>` to `<component>` for every component folder.
pub fn default_mounts() -> Vec<Mount> {
    Component::FOLDERS
        .iter()
        .map(|c| Mount::new(c.as_str(), c.as_str()))
        .collect()
}

/// Load an ordered module list from a JSON manifest.
///
/// Relative module directories are resolved against the manifest's directory.
/// Modules without mounts get [`default_mounts`]. When no module is flagged as
/// the project, the first one is.
///
/// # Errors
///
/// Returns [`BuildError::ReadFailed`] or [`BuildError::Manifest`] when the
/// file cannot be read or parsed, and [`BuildError::Config`] for an empty
/// list or more than one project.
pub fn load_module_manifest(path: &Path) -> BuildResult<Vec<Module>> {
    let raw = std::fs::read_to_string(path).map_err(|source| BuildError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    parse_module_manifest(&raw, base).map_err(|e| match e {
        ManifestError::Json(source) => BuildError::Manifest {
            path: path.to_path_buf(),
            source,
        },
        ManifestError::Invalid(msg) => BuildError::Config(format!("{}: {}", path.display(), msg)),
    })
}

enum ManifestError {
    Json(serde_json::Error),
    Invalid(String),
}

fn parse_module_manifest(raw: &str, base: &Path) -> Result<Vec<Module>, ManifestError> {
    let mut modules: Vec<Module> = serde_json::from_str(raw).map_err(ManifestError::Json)?;
    if modules.is_empty() {
        return Err(ManifestError::Invalid("module list is empty".to_string()));
    }

    match modules.iter().filter(|m| m.project).count() {
        0 => modules[0].project = true,
        1 => {}
        n => {
            return Err(ManifestError::Invalid(format!(
                "{} modules are flagged as project",
                n
            )))
        }
    }

    for module in &mut modules {
        if module.dir.is_relative() {
            module.dir = base.join(&module.dir);
        }
        if module.mounts.is_empty() {
            module.mounts = default_mounts();
        }
    }

    // The project always resolves first.
    modules.sort_by_key(|m| !m.project);

    tracing::debug!(modules = modules.len(), "Loaded module manifest");
    Ok(modules)
}
