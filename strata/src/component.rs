//! Component folders: the fixed virtual roots every mount is scoped to.

use std::fmt;
use std::str::FromStr;

/// Folder below a module root holding resources generated by earlier builds.
pub const FOLDER_RESOURCES: &str = "resources";

/// Folder below the assets root searched first for JS tool configuration.
pub const FOLDER_JS_CONFIG: &str = "_jsconfig";

/// A virtual root of the composed filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    Content,
    Data,
    I18n,
    Layouts,
    Archetypes,
    Assets,
    Static,
    Resources,
}

impl Component {
    /// Every component, in declaration order.
    pub const ALL: [Component; 8] = [
        Component::Content,
        Component::Data,
        Component::I18n,
        Component::Layouts,
        Component::Archetypes,
        Component::Assets,
        Component::Static,
        Component::Resources,
    ];

    /// Components that get an ordered directory list and a default mount.
    ///
    /// `resources` is excluded: it is layered from fixed module folders rather
    /// than from mounts.
    pub const FOLDERS: [Component; 7] = [
        Component::Archetypes,
        Component::Static,
        Component::Layouts,
        Component::Content,
        Component::Data,
        Component::I18n,
        Component::Assets,
    ];

    /// Folder name of this component.
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Content => "content",
            Component::Data => "data",
            Component::I18n => "i18n",
            Component::Layouts => "layouts",
            Component::Archetypes => "archetypes",
            Component::Assets => "assets",
            Component::Static => "static",
            Component::Resources => "resources",
        }
    }

    /// Infer the component of a mount target such as `content/blog`.
    ///
    /// The target must start with a component name followed by `/` or the
    /// end of the string; `contentfoo` is not a content target.
    pub fn from_target(target: &str) -> Option<Self> {
        let target = target.trim_start_matches('/');
        Self::ALL.into_iter().find(|c| {
            target
                .strip_prefix(c.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Component {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown component folder: {}", s))
    }
}
