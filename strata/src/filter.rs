//! Include/exclude filename filters attached to mounts.
//!
//! Patterns are matched against the path relative to the mount root, with a
//! leading `/` (e.g. `/posts/hello.md`). Matching is case-insensitive and `*`
//! does not cross directory separators; use `**` for that.

use std::path::{Component as PathComponent, Path};

use glob::{MatchOptions, Pattern, PatternError};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A compiled include/exclude filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilenameFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl FilenameFilter {
    /// Compile a filter from include and exclude globs.
    ///
    /// Returns `Ok(None)` when both lists are empty so that unfiltered mounts
    /// carry no filter at all.
    ///
    /// # Errors
    ///
    /// Returns the offending pattern together with the compile error.
    pub fn new(
        include: &[String],
        exclude: &[String],
    ) -> Result<Option<Self>, (String, PatternError)> {
        if include.is_empty() && exclude.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        }))
    }

    /// Check whether a mount-relative path passes the filter.
    ///
    /// Exclusions apply to files and directories. Inclusions apply to files
    /// only, so that directories stay traversable towards included files.
    pub fn matches(&self, rel: &Path, is_dir: bool) -> bool {
        let candidate = slash_path(rel);

        if self
            .exclude
            .iter()
            .any(|p| p.matches_with(&candidate, MATCH_OPTIONS))
        {
            return false;
        }

        if is_dir || self.include.is_empty() {
            return true;
        }

        self.include
            .iter()
            .any(|p| p.matches_with(&candidate, MATCH_OPTIONS))
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>, (String, PatternError)> {
    patterns
        .iter()
        .map(|raw| {
            let normalized = if raw.starts_with('/') {
                raw.clone()
            } else {
                format!("/{}", raw)
            };
            Pattern::new(&normalized).map_err(|e| (raw.clone(), e))
        })
        .collect()
}

/// Render a relative path as `/a/b/c` regardless of the host separator.
fn slash_path(rel: &Path) -> String {
    let mut out = String::new();
    for part in rel.components() {
        if let PathComponent::Normal(name) = part {
            out.push('/');
            out.push_str(&name.to_string_lossy());
        }
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}
