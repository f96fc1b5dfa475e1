//! Template corpus checks and renderer fixtures.
//!
//! A corpus is a directory of locally cloned site templates laid out as
//! `<sites>/<site>/<workspace>/quiqr/model/base.yaml`. Every template is
//! resolved through the same pipeline the editor uses; templates that fail
//! are reported and skipped, never fatal.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use rayon::prelude::*;
use serde_json::Value;
use sitemodel_core::{Field, FieldType, ModelError, Result, WorkspaceConfig};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::loader::ModelLoader;

/// Marker file that makes a workspace directory a template.
const TEMPLATE_MARKER: &str = "quiqr/model/base.yaml";

/// Published community templates, by repository name.
pub const COMMUNITY_TEMPLATES: [&str; 9] = [
    "quiqr-template-bexer-remix",
    "quiqr-template-kitchen-sink",
    "quiqr-paper-themed-template",
    "quiqr-scroll-template",
    "summer-qremix",
    "quiqr-uilite-template",
    "quiqr-hugoconf2022-webslides",
    "quiqr-xmin-template",
    "quiqr-yet-another-gallery-template",
];

/// A site template found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredTemplate {
    /// Site directory name.
    pub name: String,
    /// First workspace of the site that holds a model.
    pub workspace_path: PathBuf,
}

/// Find templates under `sites_dir`, sorted by name.
///
/// Only the first workspace (by name) with a model counts per site. A
/// missing directory yields no templates.
pub fn discover_templates(sites_dir: &Path) -> Vec<DiscoveredTemplate> {
    if !sites_dir.is_dir() {
        debug!(dir = %sites_dir.display(), "no sites directory");
        return Vec::new();
    }

    let templates: Vec<_> = child_dirs(sites_dir)
        .filter_map(|site| {
            let name = site.file_name()?.to_string_lossy().into_owned();
            let workspace_path =
                child_dirs(&site).find(|ws| ws.join(TEMPLATE_MARKER).is_file())?;
            Some(DiscoveredTemplate {
                name,
                workspace_path,
            })
        })
        .collect();

    info!(dir = %sites_dir.display(), count = templates.len(), "discovered templates");
    templates
}

/// Non-hidden subdirectories, sorted by name.
fn child_dirs(dir: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .map(walkdir::DirEntry::into_path)
}

/// Community templates with no local clone.
pub fn missing_community_templates(templates: &[DiscoveredTemplate]) -> Vec<&'static str> {
    COMMUNITY_TEMPLATES
        .into_iter()
        .filter(|name| !templates.iter().any(|t| t.name == *name))
        .collect()
}

/// A field's type tag and its dotted key path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTypeEntry {
    pub field_type: String,
    pub path: String,
}

impl fmt::Display for FieldTypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path, self.field_type)
    }
}

/// Flatten a raw field tree into `(type, path)` entries, depth-first.
///
/// Entries without a string `type` and `key` are skipped along with their
/// children.
pub fn extract_field_types(fields: &[Value], parent: &str) -> Vec<FieldTypeEntry> {
    let mut entries = Vec::new();
    for field in fields {
        let (Some(field_type), Some(key)) = (
            field.get("type").and_then(Value::as_str),
            field.get("key").and_then(Value::as_str),
        ) else {
            continue;
        };

        let path = if parent.is_empty() {
            key.to_string()
        } else {
            format!("{parent}.{key}")
        };
        if let Some(children) = field.get("fields").and_then(Value::as_array) {
            entries.push(FieldTypeEntry {
                field_type: field_type.to_string(),
                path: path.clone(),
            });
            entries.extend(extract_field_types(children, &path));
        } else {
            entries.push(FieldTypeEntry {
                field_type: field_type.to_string(),
                path,
            });
        }
    }
    entries
}

/// Entries whose type is not a registered field type.
pub fn unknown_field_types(entries: &[FieldTypeEntry]) -> Vec<FieldTypeEntry> {
    entries
        .iter()
        .filter(|e| FieldType::from_tag(&e.field_type).is_none())
        .cloned()
        .collect()
}

/// Field types of every collection and single in a raw model, with paths
/// prefixed by the owning key.
pub fn model_field_types(raw: &Value) -> Vec<FieldTypeEntry> {
    ["collections", "singles"]
        .into_iter()
        .filter_map(|key| raw.get(key).and_then(Value::as_array))
        .flatten()
        .filter_map(|node| {
            let key = node.get("key").and_then(Value::as_str)?;
            let fields = node.get("fields").and_then(Value::as_array)?;
            Some(extract_field_types(fields, key))
        })
        .flatten()
        .collect()
}

/// Outcome of resolving one template.
#[derive(Debug)]
pub enum TemplateStatus {
    Valid(Box<WorkspaceConfig>),
    /// Loading or validation failed; holds the error message.
    Skipped(String),
}

/// Corpus result for one template.
#[derive(Debug)]
pub struct TemplateReport {
    pub template: DiscoveredTemplate,
    /// Number of fields found in the raw model.
    pub field_count: usize,
    pub unknown_types: Vec<FieldTypeEntry>,
    pub status: TemplateStatus,
}

impl TemplateReport {
    pub fn is_valid(&self) -> bool {
        matches!(self.status, TemplateStatus::Valid(_))
    }

    pub fn config(&self) -> Option<&WorkspaceConfig> {
        match &self.status {
            TemplateStatus::Valid(config) => Some(config.as_ref()),
            TemplateStatus::Skipped(_) => None,
        }
    }
}

/// Resolve every template in parallel.
///
/// Reports keep the order of `templates`.
pub fn run_corpus(
    loader: &ModelLoader,
    templates: &[DiscoveredTemplate],
    workspace_key: &str,
) -> Vec<TemplateReport> {
    info!(count = templates.len(), "checking template corpus");

    let reports: Vec<_> = templates
        .par_iter()
        .map(|template| check_template(loader, template, workspace_key))
        .collect();

    let valid = reports.iter().filter(|r| r.is_valid()).count();
    info!(
        valid,
        skipped = reports.len() - valid,
        "template corpus checked"
    );
    reports
}

fn check_template(
    loader: &ModelLoader,
    template: &DiscoveredTemplate,
    workspace_key: &str,
) -> TemplateReport {
    let skipped = |error: ModelError, field_count: usize, unknown_types: Vec<FieldTypeEntry>| {
        warn!(template = %template.name, error = %error, "skipping template");
        TemplateReport {
            template: template.clone(),
            field_count,
            unknown_types,
            status: TemplateStatus::Skipped(error.to_string()),
        }
    };

    let raw = match loader.load_config(&template.workspace_path, workspace_key) {
        Ok(raw) => raw,
        Err(e) => return skipped(e, 0, Vec::new()),
    };

    let field_types = model_field_types(&raw);
    let unknown_types = unknown_field_types(&field_types);
    let field_count = field_types.len();

    let resolved = loader
        .validator()
        .and_then(|validator| WorkspaceConfig::from_value_with(&validator, raw));
    match resolved {
        Ok(config) => {
            debug!(template = %template.name, fields = field_count, "template is valid");
            TemplateReport {
                template: template.clone(),
                field_count,
                unknown_types,
                status: TemplateStatus::Valid(Box::new(config)),
            }
        }
        Err(e) => skipped(e, field_count, unknown_types),
    }
}

/// Write `<out_dir>/<template>/<key>.json` with the field tree of every
/// collection and single. Returns the number of files written.
pub fn write_fixtures(out_dir: &Path, template: &str, config: &WorkspaceConfig) -> Result<usize> {
    let dir = out_dir.join(template);
    std::fs::create_dir_all(&dir).map_err(|e| ModelError::io(&dir, e))?;

    let nodes = config
        .collections
        .iter()
        .map(|c| (c.key.as_str(), c.fields.as_slice()))
        .chain(config.singles.iter().map(|s| (s.key.as_str(), s.fields.as_slice())));

    let mut written = 0;
    for (key, fields) in nodes {
        write_fixture(&dir.join(format!("{key}.json")), fields)?;
        written += 1;
    }

    info!(template, dir = %dir.display(), files = written, "wrote fixtures");
    Ok(written)
}

fn write_fixture(path: &Path, fields: &[Field]) -> Result<()> {
    let mut json = serde_json::to_string_pretty(fields)?;
    json.push('\n');
    std::fs::write(path, json).map_err(|e| ModelError::io(path, e))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dirs");
        }
        std::fs::write(path, content).expect("write");
    }

    const VALID_BASE: &str = r#"
hugover: 0.120.0
collections:
  - key: posts
    title: Posts
    folder: content/posts
    extension: md
    dataformat: yaml
    fields:
      - key: title
        type: string
      - key: blocks
        type: accordion
        fields:
          - key: heading
            type: string
singles:
  - key: config
    title: Site config
    file: config.toml
    fields:
      - key: baseURL
        type: string
"#;

    #[test]
    fn test_discover_templates() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let sites = dir.path();
        write(&sites.join("zeta/main").join(TEMPLATE_MARKER), "hugover: x\n");
        write(&sites.join("alpha/b-ws").join(TEMPLATE_MARKER), "hugover: x\n");
        write(&sites.join("alpha/a-ws").join(TEMPLATE_MARKER), "hugover: x\n");
        std::fs::create_dir_all(sites.join("empty/main")).expect("create dirs");
        write(&sites.join(".hidden/main").join(TEMPLATE_MARKER), "hugover: x\n");

        let templates = discover_templates(sites);

        let names: Vec<_> = templates.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["alpha", "zeta"]);
        assert!(templates[0].workspace_path.ends_with("alpha/a-ws"));
    }

    #[test]
    fn test_discover_missing_dir() {
        assert!(discover_templates(Path::new("/nonexistent/sites")).is_empty());
    }

    #[test]
    fn test_missing_community_templates() {
        let found = vec![DiscoveredTemplate {
            name: "summer-qremix".into(),
            workspace_path: PathBuf::from("/sites/summer-qremix/main"),
        }];
        let missing = missing_community_templates(&found);
        assert_eq!(missing.len(), COMMUNITY_TEMPLATES.len() - 1);
        assert!(!missing.contains(&"summer-qremix"));
    }

    #[test]
    fn test_extract_field_types() {
        let fields = json!([
            { "key": "title", "type": "string" },
            { "key": "author", "type": "nest", "fields": [
                { "key": "name", "type": "string" },
                { "type": "string" },
                { "key": "links", "type": "leaf-array", "fields": [
                    { "key": "url", "type": "weird-thing" }
                ]}
            ]},
            "not a field"
        ]);
        let entries = extract_field_types(fields.as_array().expect("list"), "");

        let paths: Vec<_> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["title", "author", "author.name", "author.links", "author.links.url"]);

        let unknown = unknown_field_types(&entries);
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].to_string(), "author.links.url (weird-thing)");
    }

    #[test]
    fn test_run_corpus_skips_broken_templates() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let sites = dir.path();
        write(&sites.join("good/main").join(TEMPLATE_MARKER), VALID_BASE);
        write(
            &sites.join("odd/main").join(TEMPLATE_MARKER),
            &VALID_BASE.replace("type: accordion", "type: carousel"),
        );
        write(&sites.join("torn/main").join(TEMPLATE_MARKER), "hugover: [oops\n");

        let templates = discover_templates(sites);
        let reports = run_corpus(&ModelLoader::default(), &templates, "main");

        assert_eq!(reports.len(), 3);
        let good = &reports[0];
        assert!(good.is_valid());
        assert_eq!(good.field_count, 4);
        assert!(good.unknown_types.is_empty());

        let odd = &reports[1];
        assert!(!odd.is_valid());
        assert_eq!(odd.unknown_types.len(), 1);
        assert_eq!(odd.unknown_types[0].path, "posts.blocks");

        let torn = &reports[2];
        match &torn.status {
            TemplateStatus::Skipped(message) => assert!(message.contains("base.yaml")),
            TemplateStatus::Valid(_) => panic!("malformed template accepted"),
        }
    }

    #[test]
    fn test_write_fixtures() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let sites = dir.path().join("sites");
        write(&sites.join("good/main").join(TEMPLATE_MARKER), VALID_BASE);
        let config = ModelLoader::default()
            .resolve_workspace(&sites.join("good/main"), "main")
            .expect("valid");

        let out = dir.path().join("fixtures");
        let written = write_fixtures(&out, "good", &config).expect("write fixtures");
        assert_eq!(written, 2);

        let posts = std::fs::read_to_string(out.join("good/posts.json")).expect("read");
        let posts: Value = serde_json::from_str(&posts).expect("json");
        assert_eq!(posts[1]["type"], "accordion");
        assert_eq!(posts[1]["fields"][0]["key"], "heading");
        assert!(out.join("good/config.json").is_file());
    }
}
