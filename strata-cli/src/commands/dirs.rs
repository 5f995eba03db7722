//! `strata dirs`: list contributing directories.

use std::io::Write;

use strata::fs::SourceDir;
use strata::BaseFs;

use crate::commands::common::{parse_component, SiteArgs};
use crate::error::CliError;

/// Print the physical directories that contribute to the site.
///
/// Without a component every directory is listed in build order. With
/// `watch` only directories of watched modules are listed.
pub fn run(site: &SiteArgs, component: Option<&str>, watch: bool) -> Result<(), CliError> {
    let fs = site.build()?;
    let dirs = select(&fs, component, watch)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for dir in dirs {
        writeln!(out, "{}", format_dir(dir))?;
    }
    Ok(())
}

fn select<'a>(
    fs: &'a BaseFs,
    component: Option<&str>,
    watch: bool,
) -> Result<Vec<&'a SourceDir>, CliError> {
    let dirs: Vec<&SourceDir> = match component {
        Some(name) => fs
            .collector()
            .dirs(parse_component(name)?)
            .iter()
            .collect(),
        None => fs.all_dirs(),
    };
    Ok(dirs
        .into_iter()
        .filter(|d| !watch || d.meta.watch())
        .collect())
}

fn format_dir(dir: &SourceDir) -> String {
    let meta = &dir.meta;
    let mut line = format!("{}\t{}", dir.filename().display(), meta.module());
    if !meta.lang().is_empty() {
        line.push_str(&format!("\tlang={}", meta.lang()));
    }
    if !meta.watch() {
        line.push_str("\tunwatched");
    }
    line
}
