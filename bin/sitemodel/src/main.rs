//! Sitemodel CLI
//!
//! Checks and inspects workspace content models.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;

/// Command-line interface for Sitemodel.
#[derive(Parser)]
#[command(
    name = "sitemodel",
    version,
    about = "Resolve and validate workspace content models"
)]
struct Cli {
    /// Path to a resolver settings file
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Resolve and validate a workspace content model
    Check {
        /// Workspace root directory
        workspace: PathBuf,
        /// Workspace key
        #[arg(short, long, default_value = "main")]
        key: String,
    },
    /// Print the field tree of a collection or single as JSON
    Fields {
        /// Workspace root directory
        workspace: PathBuf,
        /// Collection or single key
        key: String,
        /// Workspace key
        #[arg(long, default_value = "main")]
        workspace_key: String,
        /// Show dynamic form fields for items with this search-key value
        #[arg(long)]
        select: Option<String>,
    },
    /// Check every site template under a sites directory
    Corpus {
        /// Directory holding <site>/<workspace>/ template clones
        sites_dir: PathBuf,
        /// Workspace key
        #[arg(short, long, default_value = "main")]
        key: String,
        /// Write renderer fixtures for valid templates to this directory
        #[arg(long)]
        fixtures: Option<PathBuf>,
        /// Fail on skipped templates or unknown field types
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    sitemodel::init_tracing(cli.verbose);
    let settings = sitemodel::load_settings(cli.settings.as_deref())?;

    match cli.command {
        Commands::Check { workspace, key } => {
            sitemodel::cmd::check::run(settings, &workspace, &key)?;
        }
        Commands::Fields {
            workspace,
            key,
            workspace_key,
            select,
        } => {
            sitemodel::cmd::fields::run(
                settings,
                &workspace,
                &key,
                &workspace_key,
                select.as_deref(),
            )?;
        }
        Commands::Corpus {
            sites_dir,
            key,
            fixtures,
            strict,
        } => {
            sitemodel::cmd::corpus::run(settings, &sites_dir, &key, fixtures.as_deref(), strict)?;
        }
    }

    Ok(())
}
