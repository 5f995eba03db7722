//! `strata tree`: dump every file of a component with its physical origin.

use std::path::Path;

use strata::fs::print_fs;

use crate::commands::common::{component_fs, parse_component, SiteArgs};
use crate::error::CliError;

pub fn run(site: &SiteArgs, component: &str, lang: &str) -> Result<(), CliError> {
    let component = parse_component(component)?;
    let (fs, lang) = site.build_for_lang(lang)?;
    let view = component_fs(&fs, component, &lang);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    print_fs(view.as_ref(), Path::new(""), &mut out)?;
    Ok(())
}
