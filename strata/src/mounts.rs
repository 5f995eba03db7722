//! Mount resolution: module mount declarations to root mappings.
//!
//! Pure path arithmetic. Nothing here touches the filesystem; whether a mount
//! source exists is only discovered when the mappings are queried.

use std::path::{Path, PathBuf};

use crate::component::Component;
use crate::error::{BuildError, BuildResult};
use crate::filter::FilenameFilter;
use crate::fs::{RootMapping, Weight};
use crate::module::{Module, Mount};

/// Root mappings of one module, split by the overlay they feed.
#[derive(Debug, Clone)]
pub struct ModuleMappings {
    /// Module path identifier.
    pub module: String,
    /// Physical module directory.
    pub dir: PathBuf,
    /// Position in the resolved module list.
    pub ordinal: usize,
    pub is_project: bool,
    pub watch: bool,
    /// Layouts, data, i18n, archetypes, assets and unclassified targets.
    pub generic: Vec<RootMapping>,
    pub content: Vec<RootMapping>,
    pub statics: Vec<RootMapping>,
}

impl ModuleMappings {
    /// Make `path` absolute against the module directory.
    pub fn abs_path(&self, path: impl AsRef<Path>) -> PathBuf {
        absolutize(&self.dir, path.as_ref()).1
    }
}

/// `(base, absolute)`: the base is empty when `path` was already absolute.
fn absolutize(dir: &Path, path: &Path) -> (PathBuf, PathBuf) {
    if path.is_absolute() {
        (PathBuf::new(), path.to_path_buf())
    } else {
        (dir.to_path_buf(), dir.join(path))
    }
}

/// Resolve the mounts of every module, in module order.
///
/// The module's position becomes its ordinal; content mounts without a
/// language get `default_content_language`.
///
/// # Errors
///
/// Fails on the first mount with a malformed include/exclude glob, an empty
/// target, or a module directory that is not absolute. The error names the
/// module and the mount target.
pub fn resolve_mounts(
    modules: &[Module],
    default_content_language: &str,
) -> BuildResult<Vec<ModuleMappings>> {
    modules
        .iter()
        .enumerate()
        .map(|(ordinal, module)| resolve_module(ordinal, module, default_content_language))
        .collect()
}

fn resolve_module(
    ordinal: usize,
    module: &Module,
    default_content_language: &str,
) -> BuildResult<ModuleMappings> {
    let mut resolved = ModuleMappings {
        module: module.path.clone(),
        dir: module.dir.clone(),
        ordinal,
        is_project: module.project,
        watch: module.watch,
        generic: Vec::new(),
        content: Vec::new(),
        statics: Vec::new(),
    };

    for (index, mount) in module.mounts.iter().enumerate() {
        let rm = resolve_mount(module, mount, Weight::new(ordinal, index))?;
        match rm.component() {
            Some(Component::Content) => {
                let rm = if rm.lang().is_empty() {
                    rm.with_lang(default_content_language)
                } else {
                    rm
                };
                resolved.content.push(rm);
            }
            Some(Component::Static) => resolved.statics.push(rm),
            _ => resolved.generic.push(rm),
        }
    }

    tracing::debug!(
        module = %module.path,
        ordinal,
        generic = resolved.generic.len(),
        content = resolved.content.len(),
        statics = resolved.statics.len(),
        "Resolved mounts"
    );

    Ok(resolved)
}

fn resolve_mount(module: &Module, mount: &Mount, weight: Weight) -> BuildResult<RootMapping> {
    let mount_error = |reason: &str| BuildError::Mount {
        module: module.path.clone(),
        target: mount.target.clone(),
        reason: reason.to_string(),
    };

    if mount.target.trim_matches('/').is_empty() {
        return Err(mount_error("empty target"));
    }

    let filter = FilenameFilter::new(&mount.include_files, &mount.exclude_files).map_err(
        |(pattern, source)| BuildError::InvalidFilter {
            module: module.path.clone(),
            target: mount.target.clone(),
            pattern,
            source,
        },
    )?;

    let (base, to) = absolutize(&module.dir, Path::new(&mount.source));
    if !to.is_absolute() {
        return Err(mount_error("module directory must be absolute"));
    }

    Ok(RootMapping::new(&mount.target, to)
        .with_base_dir(base)
        .with_module(module.path.clone(), module.project)
        .with_watch(module.watch)
        .with_weight(weight)
        .with_filter(filter)
        .with_lang(mount.lang.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn theme() -> Module {
        Module::new("github.com/org/theme", "/mods/theme").with_mounts(vec![
            Mount::new("layouts", "layouts"),
            Mount::new("/shared/static", "static"),
            Mount::new("content", "content"),
            Mount::new("content/fr", "content").with_lang("fr"),
            Mount::new("misc", "other"),
        ])
    }

    #[test]
    fn test_split_by_component() {
        let resolved = resolve_mounts(&[theme()], "en").unwrap();
        let m = &resolved[0];

        assert_eq!(m.generic.len(), 2);
        assert_eq!(m.content.len(), 2);
        assert_eq!(m.statics.len(), 1);
        assert_eq!(m.generic[1].component(), None);
    }

    #[test]
    fn test_category_needs_whole_segment() {
        // A plain string prefix would file these under content and static.
        let module = Module::new("github.com/org/theme", "/mods/theme").with_mounts(vec![
            Mount::new("drafts", "contentfoo"),
            Mount::new("public", "statically/built"),
            Mount::new("posts", "content/posts"),
        ]);
        let resolved = resolve_mounts(&[module], "en").unwrap();
        let m = &resolved[0];

        assert_eq!(m.generic.len(), 2);
        assert!(m.generic.iter().all(|rm| rm.component().is_none()));
        assert!(m.statics.is_empty());
        assert_eq!(m.content.len(), 1);
        assert_eq!(m.content[0].component(), Some(Component::Content));
    }

    #[test]
    fn test_paths_and_base_dir() {
        let resolved = resolve_mounts(&[theme()], "en").unwrap();
        let m = &resolved[0];

        assert_eq!(m.generic[0].to(), Path::new("/mods/theme/layouts"));
        assert_eq!(m.generic[0].to_base_dir(), Path::new("/mods/theme"));

        // Absolute sources keep their path and get no base directory.
        assert_eq!(m.statics[0].to(), Path::new("/shared/static"));
        assert_eq!(m.statics[0].to_base_dir(), Path::new(""));

        assert_eq!(m.abs_path("resources"), PathBuf::from("/mods/theme/resources"));
    }

    #[test]
    fn test_content_language_defaults() {
        let resolved = resolve_mounts(&[theme()], "en").unwrap();
        let m = &resolved[0];

        assert_eq!(m.content[0].lang(), "en");
        assert_eq!(m.content[1].lang(), "fr");
        // Non-content mounts stay language neutral.
        assert_eq!(m.statics[0].lang(), "");
        assert_eq!(m.generic[0].lang(), "");
    }

    #[test]
    fn test_weights_follow_order() {
        let site = Module::project("/site");
        let resolved = resolve_mounts(&[site, theme()], "en").unwrap();

        let site_layouts = resolved[0]
            .generic
            .iter()
            .find(|rm| rm.component() == Some(Component::Layouts))
            .unwrap();
        let theme_layouts = &resolved[1].generic[0];
        assert!(site_layouts.weight() > theme_layouts.weight());
        assert!(site_layouts.is_project());
        assert!(!theme_layouts.is_project());

        let content = &resolved[1].content;
        assert!(content[0].weight() > content[1].weight());
        assert_eq!(resolved[1].ordinal, 1);
    }

    #[test]
    fn test_bad_glob_names_module_and_target() {
        let module = Module::new("github.com/org/broken", "/mods/broken").with_mounts(vec![
            Mount::new("content", "content").with_include(&["[unclosed"]),
        ]);

        let err = resolve_mounts(&[module], "en").unwrap_err();
        assert!(err.is_mount_error());
        let msg = err.to_string();
        assert!(msg.contains("github.com/org/broken"));
        assert!(msg.contains("content"));
    }

    #[test]
    fn test_empty_target_rejected() {
        let module =
            Module::new("m", "/m").with_mounts(vec![Mount::new("layouts", "/")]);
        let err = resolve_mounts(&[module], "en").unwrap_err();
        assert!(matches!(err, BuildError::Mount { .. }));
    }

    #[test]
    fn test_relative_module_dir_rejected() {
        let module = Module::new("m", "relative/dir");
        assert!(resolve_mounts(&[module], "en")
            .unwrap_err()
            .is_mount_error());
    }
}
