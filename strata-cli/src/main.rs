//! Strata CLI - inspect the layered source filesystems of a site
//!
//! Builds the filesystems of a project and its modules and answers questions
//! about them: which directories contribute, which physical file wins for a
//! virtual path, and which component a physical file belongs to.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use commands::common::SiteArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "strata")]
#[command(version = strata::VERSION)]
#[command(about = "Inspect the layered source filesystems of a multi-module site", long_about = None)]
struct Cli {
    /// Project root directory
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Site configuration file (defaults to <root>/strata.ini when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON module manifest (defaults to the project alone)
    #[arg(long, global = true)]
    modules: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the physical directories that contribute to the site
    Dirs {
        /// Only list directories of this component (content, layouts, ...)
        component: Option<String>,

        /// Only list directories of watched modules
        #[arg(long)]
        watch: bool,
    },

    /// Show which physical file wins for a virtual path
    Resolve {
        /// Component to look in (content, layouts, static, ...)
        component: String,

        /// Path inside the component; lists the root when omitted
        path: Option<PathBuf>,

        /// Language used to pick the static view (defaults to the content language)
        #[arg(long)]
        lang: Option<String>,
    },

    /// Look a resource up in static, assets, then content
    Resource {
        /// Resource path, e.g. images/logo.png
        name: PathBuf,

        /// Language used to pick the static view (defaults to the content language)
        #[arg(long)]
        lang: Option<String>,
    },

    /// Print the component and virtual path of physical filenames
    Classify {
        /// Filenames to classify
        #[arg(required = true)]
        filenames: Vec<PathBuf>,
    },

    /// Print every file of a component with its physical filename
    Tree {
        /// Component to print
        component: String,

        /// Language used to pick the static view (defaults to the content language)
        #[arg(long)]
        lang: Option<String>,
    },

    /// Acquire the project build lock and hold it for a while
    Lock {
        /// How long to hold the lock, in milliseconds
        #[arg(long, default_value_t = 0)]
        hold_ms: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let site = SiteArgs {
        root: cli.root,
        config: cli.config,
        modules: cli.modules,
    };

    let result = match cli.command {
        Commands::Dirs { component, watch } => {
            commands::dirs::run(&site, component.as_deref(), watch)
        }
        Commands::Resolve {
            component,
            path,
            lang,
        } => commands::resolve::run(&site, &component, &path.unwrap_or_default(), lang_arg(&lang)),
        Commands::Resource { name, lang } => commands::resource::run(&site, &name, lang_arg(&lang)),
        Commands::Classify { filenames } => commands::classify::run(&site, &filenames),
        Commands::Tree { component, lang } => commands::tree::run(&site, &component, lang_arg(&lang)),
        Commands::Lock { hold_ms } => commands::lock::run(&site, Duration::from_millis(hold_ms)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(e),
    }
}

/// Empty selects the default content language.
fn lang_arg(lang: &Option<String>) -> &str {
    lang.as_deref().unwrap_or("")
}

fn report(e: CliError) -> ExitCode {
    eprintln!("Error: {}", e);
    ExitCode::from(e.exit_code())
}

/// Logs go to stderr so command output stays pipeable.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
