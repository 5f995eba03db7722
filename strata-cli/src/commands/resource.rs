//! `strata resource`: look a name up in static, assets, then content.

use std::path::Path;

use crate::commands::common::SiteArgs;
use crate::commands::resolve::describe;
use crate::error::CliError;

pub fn run(site: &SiteArgs, name: &Path, lang: &str) -> Result<(), CliError> {
    let (fs, lang) = site.build_for_lang(lang)?;
    let (meta, found_in) = fs.stat_resource(&lang, name)?;
    tracing::debug!(layer = found_in.name(), "Resource found");
    println!("{}", describe(&meta));
    Ok(())
}
