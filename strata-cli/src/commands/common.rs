//! Common types and utilities shared across CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use strata::config::CONFIG_FILE_NAME;
use strata::{load_module_manifest, BaseFs, Component, FsHandle, Module, Paths, SiteConfig};

use crate::error::CliError;

/// Where to find the site, from the global CLI options.
#[derive(Debug, Clone)]
pub struct SiteArgs {
    pub root: PathBuf,
    pub config: Option<PathBuf>,
    pub modules: Option<PathBuf>,
}

impl SiteArgs {
    /// Resolve configuration and modules.
    ///
    /// The configuration defaults to `<root>/strata.ini` when that file
    /// exists. Without a module manifest the root is the only module, with
    /// the default mounts.
    pub fn paths(&self) -> Result<Paths, CliError> {
        let root = absolute(&self.root)?;
        let config_path = self
            .config
            .clone()
            .or_else(|| Some(root.join(CONFIG_FILE_NAME)).filter(|p| p.is_file()));

        let config = match config_path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading site configuration");
                SiteConfig::load(&path)?
            }
            None => SiteConfig::new().with_working_dir(&root),
        };

        let modules = match &self.modules {
            Some(manifest) => load_module_manifest(manifest)?,
            None => vec![Module::project(absolute(config.working_dir())?)],
        };

        Ok(Paths::new(config, modules)?)
    }

    /// Build the site's filesystems.
    pub fn build(&self) -> Result<BaseFs, CliError> {
        Ok(BaseFs::new(&self.paths()?)?)
    }

    /// Build the site's filesystems and resolve `lang`, which falls back to
    /// the default content language when empty.
    pub fn build_for_lang(&self, lang: &str) -> Result<(BaseFs, String), CliError> {
        let paths = self.paths()?;
        let lang = if lang.is_empty() {
            paths.default_content_language().to_string()
        } else if paths.languages().iter().any(|l| l == lang) {
            lang.to_string()
        } else {
            return Err(CliError::Usage(format!("unknown language: {}", lang)));
        };
        Ok((BaseFs::new(&paths)?, lang))
    }
}

/// Parse a component name given on the command line.
pub fn parse_component(name: &str) -> Result<Component, CliError> {
    name.parse::<Component>().map_err(CliError::Usage)
}

/// The composed filesystem of `component`, with static resolved for `lang`.
pub fn component_fs(fs: &BaseFs, component: Component, lang: &str) -> FsHandle {
    match component {
        Component::Static => fs.static_fs(lang),
        Component::Resources => Arc::new(fs.resources_cache.clone()),
        other => match fs.get(other) {
            Some(view) => Arc::clone(view.fs()),
            None => Arc::new(strata::fs::EmptyFs::new()),
        },
    }
}

/// Absolute form of a user-supplied path.
pub fn absolute(path: &Path) -> Result<PathBuf, CliError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_default_to_root_project() {
        let temp = TempDir::new().unwrap();
        let args = SiteArgs {
            root: temp.path().to_path_buf(),
            config: None,
            modules: None,
        };
        let paths = args.paths().unwrap();
        assert_eq!(paths.modules().len(), 1);
        assert_eq!(paths.project().dir, temp.path());
    }

    #[test]
    fn test_paths_pick_up_config_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "[site]\ndefault_content_language = fr\n",
        )
        .unwrap();
        let args = SiteArgs {
            root: temp.path().to_path_buf(),
            config: None,
            modules: None,
        };
        assert_eq!(args.paths().unwrap().default_content_language(), "fr");
    }

    #[test]
    fn test_build_for_lang() {
        let temp = TempDir::new().unwrap();
        let args = SiteArgs {
            root: temp.path().to_path_buf(),
            config: None,
            modules: None,
        };
        let (_fs, lang) = args.build_for_lang("").unwrap();
        assert_eq!(lang, "en");
        assert!(matches!(args.build_for_lang("xx"), Err(CliError::Usage(_))));
    }

    #[test]
    fn test_parse_component() {
        assert_eq!(parse_component("layouts").unwrap(), Component::Layouts);
        assert!(matches!(parse_component("nope"), Err(CliError::Usage(_))));
    }
}
