//! End-to-end tests for the resolver.
//!
//! Each test builds a workspace on disk and runs the full pipeline.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde_json::json;
use sitemodel_core::{FieldType, ModelError, ResolverSettings, ValidationError, validate};
use sitemodel_resolver::{DynamicForm, ModelLoader, dynamic_containers, load_config};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn model(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join("quiqr/model").join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
        fs::write(&path, content).expect("write");
        path
    }
}

const BASE: &str = r#"
hugover: 0.120.0
menu:
  - title: Content
    menuItems:
      - key: posts
collections:
  - key: posts
    title: Posts
    folder: content/posts
    extension: md
    dataformat: yaml
    fields:
      - key: title
        type: string
      - key: draft
        type: boolean
  - key: authors
    title: Authors
    folder: data/authors
    extension: yaml
    fields:
      - key: name
        type: string
singles:
  - key: home
    title: Home
    file: content/_index.md
    dataformat: yaml
    fields:
      - key: intro
        type: markdown
serve:
  - key: default
    config: config.toml
"#;

#[test]
fn test_collection_and_single_counts() {
    let ws = Workspace::new();
    ws.model("base.yaml", BASE);

    let raw = load_config(ws.root(), "main").expect("load");
    assert!(validate(&sitemodel_core::normalize(raw)).is_none());

    let config = ModelLoader::default()
        .resolve_workspace(ws.root(), "main")
        .expect("resolve");
    assert_eq!(config.collections.len(), 2);
    assert_eq!(config.singles.len(), 1);
    assert!(config.collections.iter().all(|c| !c.fields.is_empty()));
    assert!(config.singles.iter().all(|s| !s.fields.is_empty()));
}

#[test]
fn test_includes_are_appended() {
    let ws = Workspace::new();
    ws.model("base.yaml", BASE);
    ws.model(
        "includes/collections.yaml",
        r#"
- key: pages
  title: Pages
  folder: content/pages
  extension: md
  dataformat: toml
  fields:
    - key: title
      type: string
"#,
    );
    ws.model(
        "includes/singles.json",
        r#"{ "singles": [{
            "key": "config",
            "title": "Site config",
            "file": "config.toml",
            "fields": [{ "key": "baseURL", "type": "string" }]
        }] }"#,
    );

    let config = ModelLoader::default()
        .resolve_workspace(ws.root(), "main")
        .expect("resolve");

    let collections: Vec<_> = config.collections.iter().map(|c| c.key.as_str()).collect();
    assert_eq!(collections, ["posts", "authors", "pages"]);
    let singles: Vec<_> = config.singles.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(singles, ["home", "config"]);
}

#[test]
fn test_model_without_collections_normalizes() {
    let ws = Workspace::new();
    ws.model("base.toml", "hugover = \"0.120.0\"\n");

    let config = ModelLoader::default()
        .resolve_workspace(ws.root(), "main")
        .expect("resolve");
    assert!(config.collections.is_empty());
    assert!(config.singles.is_empty());
}

#[test]
fn test_merge_partial_from_partials_dir() {
    let ws = Workspace::new();
    ws.model(
        "base.yaml",
        r#"
hugover: 0.120.0
collections:
  - key: posts
    title: Posts
    folder: content/posts
    extension: md
    dataformat: yaml
    _mergePartial: seo
    fields:
      - key: title
        type: string
"#,
    );
    ws.model(
        "partials/seo.yaml",
        r#"
- key: title
  type: readonly
- key: description
  type: string
"#,
    );

    let config = ModelLoader::default()
        .resolve_workspace(ws.root(), "main")
        .expect("resolve");
    let posts = config.collection("posts").expect("posts");
    let keys: Vec<_> = posts.fields.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(keys, ["title", "description"]);
    assert_eq!(posts.fields[0].field_type, FieldType::String);
    assert!(!posts.extra.contains_key("_mergePartial"));
}

#[test]
fn test_unknown_partial_fails() {
    let ws = Workspace::new();
    ws.model(
        "base.yaml",
        r#"
hugover: 0.120.0
singles:
  - key: home
    title: Home
    file: content/_index.md
    dataformat: yaml
    _mergePartial: nowhere
"#,
    );

    let err = ModelLoader::default()
        .resolve_workspace(ws.root(), "main")
        .expect_err("unknown partial");
    assert!(matches!(err, ModelError::DynamicPartialNotFound { ref name, .. } if name == "nowhere"));
}

#[test]
fn test_select_options_must_resolve() {
    let ws = Workspace::new();
    ws.model(
        "base.yaml",
        r#"
hugover: 0.120.0
collections:
  - key: pages
    title: Pages
    folder: content/pages
    extension: md
    dataformat: yaml
    fields:
      - key: blocks
        type: accordion
        dynFormSearchKey: block_type
        fields:
          - key: block_type
            type: select
            options: [hero, gallery]
dynamics:
  - key: hero
    fields:
      - key: heading
        type: string
"#,
    );

    let err = load_config(ws.root(), "main").expect_err("gallery missing");
    assert_eq!(
        err.to_string(),
        "Dynamic partial \"gallery\" not found (referenced at Collection[key=pages] > Field[key=blocks])"
    );

    ws.model("partials/gallery.yaml", "- key: images\n  type: bundle-manager\n");
    load_config(ws.root(), "main").expect("gallery in partials dir");
}

#[test]
fn test_dynamic_form_end_to_end() {
    let ws = Workspace::new();
    ws.model(
        "base.yaml",
        r#"
hugover: 0.120.0
collections:
  - key: pages
    title: Pages
    folder: content/pages
    extension: md
    dataformat: yaml
    fields:
      - key: blocks
        type: leaf-array
        dynFormSearchKey: block_type
        fields:
          - key: block_type
            type: string
"#,
    );
    ws.model("partials/hero.yaml", "- key: heading\n  type: string\n");

    let loader = ModelLoader::default();
    let raw = loader.load_config(ws.root(), "main").expect("load");
    let partials = loader.partials(ws.root(), &raw);
    let validator = loader.validator().expect("validator");
    let config = loader.resolve_workspace(ws.root(), "main").expect("resolve");

    let pages = config.fields_of("pages").expect("pages");
    let containers = dynamic_containers(pages);
    assert_eq!(containers.len(), 1);

    let mut form = DynamicForm::new(containers[0], &partials, &validator).expect("dynamic");
    let fields = form
        .fields_for(&json!({ "block_type": "hero" }))
        .expect("hero");
    let keys: Vec<_> = fields.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(keys, ["block_type", "heading"]);
}

#[test]
fn test_missing_base_is_io_error() {
    let ws = Workspace::new();
    ws.model("includes/collections.yaml", "[]\n");

    let err = load_config(ws.root(), "main").expect_err("no base");
    assert!(matches!(err, ModelError::Io { .. }));
}

#[test]
fn test_malformed_include_names_file() {
    let ws = Workspace::new();
    ws.model("base.yaml", BASE);
    let include = ws.model("includes/singles.yaml", "- key: [broken\n");

    let err = load_config(ws.root(), "main").expect_err("malformed");
    match err {
        ModelError::Parse { path, message } => {
            assert_eq!(path, include);
            assert!(!message.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_duplicate_title_in_posts() {
    let ws = Workspace::new();
    ws.model(
        "base.yaml",
        &BASE.replace("      - key: draft\n        type: boolean", "      - key: title\n        type: boolean"),
    );

    let err = ModelLoader::default()
        .resolve_workspace(ws.root(), "main")
        .expect_err("duplicate key");
    let ModelError::Invalid(invalid) = err else {
        panic!("expected a validation error");
    };
    assert!(matches!(invalid, ValidationError::FieldKey { .. }));
    let message = invalid.to_string();
    assert!(message.contains("Collection[key=posts]"));
    assert!(message.contains("title"));
}

#[test]
fn test_home_single_without_dataformat() {
    let ws = Workspace::new();
    ws.model("base.yaml", &BASE.replace("    dataformat: yaml\n    fields:\n      - key: intro", "    fields:\n      - key: intro"));

    let err = ModelLoader::default()
        .resolve_workspace(ws.root(), "main")
        .expect_err("content single without dataformat");
    assert!(matches!(err, ModelError::Invalid(ValidationError::FormatConsistency(_))));
}

#[test]
fn test_unknown_field_type_rejected() {
    let ws = Workspace::new();
    ws.model("base.yaml", &BASE.replace("type: markdown", "type: not-a-real-type"));

    let err = ModelLoader::default()
        .resolve_workspace(ws.root(), "main")
        .expect_err("unknown type");
    assert!(matches!(err, ModelError::Invalid(ValidationError::UnknownFieldType { .. })));
}

#[test]
fn test_custom_model_dir() {
    let ws = Workspace::new();
    let path = ws.root().join("model/base.yaml");
    fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
    fs::write(&path, BASE).expect("write");

    let settings = ResolverSettings {
        model_dir: PathBuf::from("model"),
        ..ResolverSettings::default()
    };
    let config = ModelLoader::new(settings)
        .resolve_workspace(ws.root(), "main")
        .expect("resolve");
    assert_eq!(config.collections.len(), 2);
}
