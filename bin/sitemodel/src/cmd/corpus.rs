//! Corpus command - check every local site template

use std::path::Path;

use color_eyre::eyre::{Result, bail};
use sitemodel_core::ResolverSettings;
use sitemodel_resolver::{
    ModelLoader, TemplateReport, TemplateStatus, corpus::missing_community_templates,
    discover_templates, run_corpus, write_fixtures,
};

/// Corpus totals.
#[derive(Debug, Default, PartialEq, Eq)]
struct CorpusSummary {
    valid: usize,
    skipped: usize,
    unknown_types: usize,
    fixtures: usize,
}

/// Run the corpus command.
///
/// Broken templates are reported and skipped. With `strict`, any skipped
/// template or unknown field type fails the command.
pub fn run(
    settings: ResolverSettings,
    sites_dir: &Path,
    workspace_key: &str,
    fixtures: Option<&Path>,
    strict: bool,
) -> Result<()> {
    tracing::info!(?sites_dir, ?fixtures, strict, "Checking template corpus");

    let templates = discover_templates(sites_dir);
    if templates.is_empty() {
        println!("No templates found in {}", sites_dir.display());
        return Ok(());
    }

    let missing = missing_community_templates(&templates);
    if !missing.is_empty() {
        println!("Community templates not cloned locally:");
        for name in &missing {
            println!("  - {name}");
        }
        println!();
    }

    println!("Checking {} template(s)...", templates.len());
    let loader = ModelLoader::new(settings);
    let reports = run_corpus(&loader, &templates, workspace_key);
    let summary = report(&reports, fixtures)?;

    println!();
    println!("Summary:");
    println!("  Valid:         {}", summary.valid);
    println!("  Skipped:       {}", summary.skipped);
    println!("  Unknown types: {}", summary.unknown_types);
    if let Some(dir) = fixtures {
        println!("  Fixtures:      {} file(s) in {}", summary.fixtures, dir.display());
    }

    if strict && (summary.skipped > 0 || summary.unknown_types > 0) {
        bail!(
            "Corpus check failed: {} skipped template(s), {} unknown field type(s) (strict mode)",
            summary.skipped,
            summary.unknown_types
        );
    }

    Ok(())
}

fn report(reports: &[TemplateReport], fixtures: Option<&Path>) -> Result<CorpusSummary> {
    let mut summary = CorpusSummary::default();

    for report in reports {
        let name = &report.template.name;
        match &report.status {
            TemplateStatus::Valid(config) => {
                summary.valid += 1;
                println!("  ✓ {name} ({} fields)", report.field_count);
                if let Some(dir) = fixtures {
                    summary.fixtures += write_fixtures(dir, name, config)?;
                }
            }
            TemplateStatus::Skipped(message) => {
                summary.skipped += 1;
                println!("  ✗ {name}: {message}");
            }
        }

        for entry in &report.unknown_types {
            summary.unknown_types += 1;
            println!("    ⚠ unknown field type {entry}");
        }
    }

    Ok(summary)
}
