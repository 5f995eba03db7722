//! `strata lock`: take the project build lock.

use std::thread;
use std::time::{Duration, Instant};

use crate::commands::common::SiteArgs;
use crate::error::CliError;

/// Acquire the build lock, hold it for `hold` and release it.
///
/// Useful to check that concurrent builds of the same project wait for each
/// other.
pub fn run(site: &SiteArgs, hold: Duration) -> Result<(), CliError> {
    let fs = site.build()?;

    let started = Instant::now();
    let guard = fs.lock_build()?;
    let waited = started.elapsed();
    tracing::info!(waited_ms = waited.as_millis() as u64, "Build lock acquired");
    println!("locked {} (waited {} ms)", fs.working_dir().display(), waited.as_millis());

    thread::sleep(hold);
    drop(guard);
    println!("released");
    Ok(())
}
