//! `strata classify`: map physical filenames back to components.

use std::io::Write;
use std::path::{Path, PathBuf};

use strata::{BaseFs, Component};

use crate::commands::common::{absolute, SiteArgs};
use crate::error::CliError;

/// Print the component and virtual path of each filename.
///
/// Filenames outside every component print `-`. The command fails only when
/// none of them could be classified.
pub fn run(site: &SiteArgs, filenames: &[PathBuf]) -> Result<(), CliError> {
    let fs = site.build()?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut found = 0usize;
    for filename in filenames {
        let abs = absolute(filename)?;
        match classify(&fs, &abs) {
            Some((component, rel)) => {
                found += 1;
                writeln!(out, "{}\t{}\t{}", filename.display(), component, rel.display())?;
            }
            None => writeln!(out, "{}\t-", filename.display())?,
        }
    }

    if found == 0 && !filenames.is_empty() {
        return Err(CliError::NotFound(
            "no filename belongs to a component".to_string(),
        ));
    }
    Ok(())
}

fn classify(fs: &BaseFs, filename: &Path) -> Option<(Component, PathBuf)> {
    let component = fs.classify(filename)?;
    let rel = match component {
        Component::Static => fs.make_static_path_relative(filename)?,
        other => fs.get(other)?.make_path_relative(filename)?,
    };
    Some((component, rel))
}
