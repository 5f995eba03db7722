//! `strata resolve`: show which physical file wins for a virtual path.

use std::io::Write;
use std::path::Path;

use strata::FileMeta;

use crate::commands::common::{component_fs, parse_component, SiteArgs};
use crate::error::CliError;

/// Resolve `path` inside `component`.
///
/// Files print their physical filename and origin. Directories print one
/// line per merged entry.
pub fn run(site: &SiteArgs, component: &str, path: &Path, lang: &str) -> Result<(), CliError> {
    let component = parse_component(component)?;
    let (fs, lang) = site.build_for_lang(lang)?;
    let view = component_fs(&fs, component, &lang);

    let meta = view.stat(path)?;
    let lines = if meta.is_dir() {
        view.read_dir(path)?.iter().map(describe).collect()
    } else {
        vec![describe(&meta)]
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

/// One tab-separated line: name, physical filename, module, language and
/// weight (`ordinal.index`).
pub fn describe(meta: &FileMeta) -> String {
    let name = if meta.is_dir() {
        format!("{}/", meta.name())
    } else {
        meta.name().to_string()
    };
    let weight = meta
        .weight()
        .map(|w| format!("{}.{}", w.ordinal(), w.index()))
        .unwrap_or_else(|| "-".to_string());
    let lang = if meta.lang().is_empty() { "-" } else { meta.lang() };
    let module = if meta.module().is_empty() {
        "-"
    } else {
        meta.module()
    };
    format!(
        "{}\t{}\t{}\t{}\t{}",
        name,
        meta.filename().display(),
        module,
        lang,
        weight
    )
}
