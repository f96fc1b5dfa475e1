//! Fields command - print the field tree of a collection or single

use std::path::Path;

use color_eyre::eyre::{Result, eyre};
use serde_json::{Map, Value};
use sitemodel_core::{ResolverSettings, WorkspaceConfig};
use sitemodel_resolver::{DynamicForm, ModelLoader, dynamic_containers};

/// Run the fields command.
///
/// Prints the field tree of `key` as JSON. With `select`, prints instead the
/// fields every dynamic form in that tree shows for an item whose search-key
/// value is `select`.
pub fn run(
    settings: ResolverSettings,
    workspace: &Path,
    key: &str,
    workspace_key: &str,
    select: Option<&str>,
) -> Result<()> {
    let output = render(settings, workspace, key, workspace_key, select)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn render(
    settings: ResolverSettings,
    workspace: &Path,
    key: &str,
    workspace_key: &str,
    select: Option<&str>,
) -> Result<Value> {
    tracing::info!(?workspace, key, ?select, "Printing fields");

    let loader = ModelLoader::new(settings);
    let raw = loader.load_config(workspace, workspace_key)?;
    let partials = loader.partials(workspace, &raw);
    let validator = loader.validator()?;
    let config = WorkspaceConfig::from_value_with(&validator, raw)?;

    let fields = config
        .fields_of(key)
        .ok_or_else(|| eyre!("No collection or single with key \"{key}\""))?;

    let Some(select) = select else {
        return Ok(serde_json::to_value(fields)?);
    };

    let mut forms = Map::new();
    for container in dynamic_containers(fields) {
        let Some(mut form) = DynamicForm::new(container, &partials, &validator) else {
            continue;
        };
        let mut item = Map::new();
        item.insert(form.search_key().to_string(), Value::String(select.to_string()));
        let item = Value::Object(item);
        let resolved = form.fields_for(&item)?;
        forms.insert(container.key.clone(), serde_json::to_value(resolved)?);
    }

    if forms.is_empty() {
        tracing::warn!(key, "no dynamic forms in field tree");
    }
    Ok(Value::Object(forms))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const BASE: &str = r#"
hugover: 0.120.0
collections:
  - key: pages
    title: Pages
    folder: content/pages
    extension: md
    dataformat: yaml
    fields:
      - key: title
        type: string
      - key: blocks
        type: accordion
        dynFormSearchKey: block_type
        fields:
          - key: block_type
            type: string
dynamics:
  - key: hero
    fields:
      - key: heading
        type: string
"#;

    fn workspace() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("create temp dir");
        let model = dir.path().join("quiqr/model");
        fs::create_dir_all(&model).expect("create dirs");
        fs::write(model.join("base.yaml"), BASE).expect("write");
        dir
    }

    #[test]
    fn test_static_fields() {
        let dir = workspace();
        let out = render(ResolverSettings::default(), dir.path(), "pages", "main", None)
            .expect("render");
        assert_eq!(out[0]["key"], "title");
        assert_eq!(out[1]["dynFormSearchKey"], "block_type");
    }

    #[test]
    fn test_selected_dynamic_fields() {
        let dir = workspace();
        let out = render(
            ResolverSettings::default(),
            dir.path(),
            "pages",
            "main",
            Some("hero"),
        )
        .expect("render");
        assert_eq!(out["blocks"][1]["key"], "heading");
    }

    #[test]
    fn test_unknown_key() {
        let dir = workspace();
        let err = render(ResolverSettings::default(), dir.path(), "posts", "main", None)
            .expect_err("no such key");
        assert!(err.to_string().contains("posts"));
    }
}
