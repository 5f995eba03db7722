//! Site configuration and derived paths.
//!
//! [`SiteConfig`] holds the handful of settings the filesystem composition
//! depends on. It can be built in code with `with_*` setters or loaded from
//! the `[site]` section of an INI file:
//!
//! ```ini
//! [site]
//! default_content_language = en
//! languages = en, fr
//! multihost = true
//! resources_dir = resources
//! build_lock = file
//! ```
//!
//! [`Paths`] binds a configuration to a resolved module list.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;

use crate::component::FOLDER_RESOURCES;
use crate::error::{BuildError, BuildResult};
use crate::module::Module;

/// Default configuration file name in the project root.
pub const CONFIG_FILE_NAME: &str = "strata.ini";

const SECTION: &str = "site";

/// How [`BuildLock`](crate::lock::BuildLock) serializes builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockMode {
    /// Advisory OS lock on a file in the project root; excludes other
    /// processes.
    #[default]
    File,
    /// Mutex local to this process. Used by tests.
    InProcess,
}

impl FromStr for LockMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(LockMode::File),
            "in_process" | "inprocess" | "memory" => Ok(LockMode::InProcess),
            other => Err(format!("unknown build lock mode: {}", other)),
        }
    }
}

/// Site settings relevant to the source filesystems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    working_dir: PathBuf,
    resources_dir: PathBuf,
    default_content_language: String,
    languages: Vec<String>,
    multihost: bool,
    lock_mode: LockMode,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("."),
            resources_dir: PathBuf::from(FOLDER_RESOURCES),
            default_content_language: "en".to_string(),
            languages: Vec::new(),
            multihost: false,
            lock_mode: LockMode::File,
        }
    }
}

impl SiteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project working directory. Relative resource paths resolve against it.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_resources_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resources_dir = dir.into();
        self
    }

    pub fn with_default_content_language(mut self, lang: impl Into<String>) -> Self {
        self.default_content_language = lang.into();
        self
    }

    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Serve each language from its own host with its own static files.
    pub fn with_multihost(mut self, multihost: bool) -> Self {
        self.multihost = multihost;
        self
    }

    pub fn with_lock_mode(mut self, mode: LockMode) -> Self {
        self.lock_mode = mode;
        self
    }

    /// Load the `[site]` section of an INI file.
    ///
    /// The working directory defaults to the file's directory. Missing keys
    /// keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::ReadFailed`] if the file cannot be read and
    /// [`BuildError::Config`] for syntax errors or invalid values.
    pub fn load(path: &Path) -> BuildResult<Self> {
        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(source) => BuildError::ReadFailed {
                path: path.to_path_buf(),
                source,
            },
            e => BuildError::Config(format!("{}: {}", path.display(), e)),
        })?;

        let mut config = Self::new();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            config.working_dir = dir.to_path_buf();
        }

        let Some(site) = ini.section(Some(SECTION)) else {
            tracing::debug!(path = %path.display(), "No [site] section, using defaults");
            return Ok(config);
        };

        if let Some(lang) = site.get("default_content_language") {
            config.default_content_language = lang.trim().to_string();
        }
        if let Some(langs) = site.get("languages") {
            config.languages = langs
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(multihost) = site.get("multihost") {
            config.multihost = parse_bool("multihost", multihost)?;
        }
        if let Some(dir) = site.get("resources_dir") {
            config.resources_dir = PathBuf::from(dir.trim());
        }
        if let Some(dir) = site.get("working_dir") {
            config.working_dir = config.working_dir.join(dir.trim());
        }
        if let Some(mode) = site.get("build_lock") {
            config.lock_mode = mode.parse().map_err(BuildError::Config)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> BuildResult<()> {
        if self.default_content_language.is_empty() {
            return Err(BuildError::Config(
                "default_content_language must not be empty".to_string(),
            ));
        }
        if !self.languages.is_empty() && !self.languages.contains(&self.default_content_language)
        {
            return Err(BuildError::Config(format!(
                "default content language {:?} is not among the configured languages",
                self.default_content_language
            )));
        }
        Ok(())
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn resources_dir(&self) -> &Path {
        &self.resources_dir
    }

    pub fn default_content_language(&self) -> &str {
        &self.default_content_language
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn is_multihost(&self) -> bool {
        self.multihost
    }

    pub fn lock_mode(&self) -> LockMode {
        self.lock_mode
    }

    /// Configured languages with the default content language first.
    pub fn languages_default_first(&self) -> Vec<String> {
        let mut langs = vec![self.default_content_language.clone()];
        langs.extend(
            self.languages
                .iter()
                .filter(|l| **l != self.default_content_language)
                .cloned(),
        );
        langs
    }
}

fn parse_bool(key: &str, value: &str) -> BuildResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(BuildError::Config(format!(
            "{} must be a boolean, got {:?}",
            key, other
        ))),
    }
}

/// A site configuration bound to its resolved modules.
///
/// The first module is the project.
#[derive(Debug, Clone)]
pub struct Paths {
    config: SiteConfig,
    working_dir: PathBuf,
    modules: Vec<Module>,
}

impl Paths {
    /// # Errors
    ///
    /// Returns [`BuildError::Config`] when the configuration is invalid, the
    /// module list is empty, or its first module is not the project.
    pub fn new(config: SiteConfig, modules: Vec<Module>) -> BuildResult<Self> {
        config.validate()?;

        match modules.first() {
            None => return Err(BuildError::Config("no modules".to_string())),
            Some(m) if !m.project => {
                return Err(BuildError::Config(format!(
                    "first module {:?} is not the project",
                    m.path
                )))
            }
            Some(_) => {}
        }
        if modules.iter().skip(1).any(|m| m.project) {
            return Err(BuildError::Config(
                "only the first module may be the project".to_string(),
            ));
        }

        let working_dir = if config.working_dir.is_absolute() {
            config.working_dir.clone()
        } else {
            std::env::current_dir()
                .map_err(|source| BuildError::ReadFailed {
                    path: config.working_dir.clone(),
                    source,
                })?
                .join(&config.working_dir)
        };

        Ok(Self {
            config,
            working_dir,
            modules,
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// The main project module.
    pub fn project(&self) -> &Module {
        &self.modules[0]
    }

    /// Absolute working directory.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Absolute resources directory of the project.
    pub fn abs_resources_dir(&self) -> PathBuf {
        let dir = self.config.resources_dir();
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.working_dir.join(dir)
        }
    }

    pub fn default_content_language(&self) -> &str {
        self.config.default_content_language()
    }

    pub fn languages(&self) -> Vec<String> {
        self.config.languages_default_first()
    }

    pub fn is_multihost(&self) -> bool {
        self.config.is_multihost()
    }
}
