//! Sitemodel CLI Library
//!
//! Command implementations for the `sitemodel` binary, which checks and
//! inspects workspace content models outside the editor.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (check, fields, corpus)

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};

pub mod cmd;

pub use sitemodel_core::{ResolverSettings, WorkspaceConfig};
pub use sitemodel_resolver::ModelLoader;

/// Initialize tracing with the specified verbosity level.
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

/// Resolver settings from an optional file plus `SITEMODEL__*` overrides.
pub fn load_settings(path: Option<&Path>) -> Result<ResolverSettings> {
    let settings = ResolverSettings::load_with_env(path).wrap_err("Failed to load settings")?;
    tracing::debug!(?settings, "resolver settings");
    Ok(settings)
}
