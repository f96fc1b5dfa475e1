//! Check command - resolve and validate a workspace content model

use std::path::Path;

use color_eyre::eyre::{Result, bail};
use sitemodel_core::{ResolverSettings, WorkspaceConfig};
use sitemodel_resolver::{ModelLoader, dynamic_containers};

/// Run the check command.
///
/// Prints a summary of the resolved model, or the first violation.
pub fn run(settings: ResolverSettings, workspace: &Path, workspace_key: &str) -> Result<()> {
    tracing::info!(?workspace, workspace_key, "Checking content model");

    println!("Checking content model in {}...", workspace.display());
    let loader = ModelLoader::new(settings);
    let config = match loader.resolve_workspace(workspace, workspace_key) {
        Ok(config) => {
            println!("  ✓ Content model valid");
            config
        }
        Err(e) => {
            println!("  ✗ {e}");
            bail!("Content model check failed");
        }
    };

    print_summary(&config);
    Ok(())
}

fn print_summary(config: &WorkspaceConfig) {
    println!();
    println!("Summary:");
    println!("  Hugo version: {}", config.hugover);
    println!("  Collections:  {}", config.collections.len());
    println!("  Singles:      {}", config.singles.len());
    println!("  Dynamics:     {}", config.dynamics.len());

    if !config.collections.is_empty() {
        println!();
        println!("Collections:");
        for collection in &config.collections {
            println!(
                "  {} ({} fields, {} -> {})",
                collection.key,
                collection.fields.len(),
                collection.folder,
                collection.data_format()
            );
        }
    }

    if !config.singles.is_empty() {
        println!();
        println!("Singles:");
        for single in &config.singles {
            println!("  {} ({} fields, {})", single.key, single.fields.len(), single.file);
        }
    }

    let dynamic: Vec<_> = config
        .collections
        .iter()
        .map(|c| (c.key.as_str(), c.fields.as_slice()))
        .chain(config.singles.iter().map(|s| (s.key.as_str(), s.fields.as_slice())))
        .flat_map(|(owner, fields)| {
            dynamic_containers(fields)
                .into_iter()
                .map(move |field| (owner, field))
        })
        .collect();
    if !dynamic.is_empty() {
        println!();
        println!("Dynamic forms:");
        for (owner, field) in dynamic {
            println!(
                "  {owner}.{} (selected by {})",
                field.key,
                field.dyn_form_search_key.as_deref().unwrap_or_default()
            );
        }
    }
}
