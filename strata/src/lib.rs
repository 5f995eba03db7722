//! Strata - layered source filesystems for static site builds
//!
//! A site is assembled from a project and any number of modules (themes,
//! component libraries). Each module mounts some of its directories into a
//! shared virtual tree of components: `content`, `data`, `i18n`, `layouts`,
//! `archetypes`, `assets`, `static` and `resources`. This crate composes
//! those mounts into overlay filesystems where the project wins over its
//! modules and earlier modules win over later ones, and exposes per-component
//! views that can translate between physical and virtual paths.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use strata::{BaseFs, Module, Paths, SiteConfig};
//!
//! let config = SiteConfig::new().with_working_dir("/srv/site");
//! let modules = vec![
//!     Module::project("/srv/site"),
//!     Module::new("github.com/org/theme", "/srv/themes/theme"),
//! ];
//! let paths = Paths::new(config, modules)?;
//! let fs = BaseFs::new(&paths)?;
//!
//! let layout = fs.layouts.real_filename(Path::new("_default/single.html"));
//! println!("single layout comes from {}", layout.display());
//! # Ok::<(), strata::BuildError>(())
//! ```

pub mod base;
pub mod collector;
pub mod component;
pub mod config;
pub mod error;
pub mod filter;
pub mod fs;
pub mod lock;
pub mod module;
pub mod mounts;
pub mod source;

pub use base::BaseFs;
pub use collector::FilesystemsCollector;
pub use component::Component;
pub use config::{LockMode, Paths, SiteConfig};
pub use error::{BuildError, BuildResult, FsError, FsResult};
pub use fs::{FileMeta, FileSystem, FsHandle};
pub use lock::{BuildLock, BuildLockGuard};
pub use module::{load_module_manifest, Module, Mount};
pub use source::{SourceFilesystem, SourceFilesystems};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
