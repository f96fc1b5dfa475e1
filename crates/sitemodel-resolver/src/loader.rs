//! Workspace model loading.
//!
//! Reads the base model file and its include files, appends include items,
//! resolves `_mergePartial` references and checks that every statically
//! referenced dynamic partial exists. The result is a raw, unvalidated
//! value tree; [`ModelLoader::resolve_workspace`] runs the rest of the
//! pipeline.

use std::{
    borrow::Cow,
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use rayon::prelude::*;
use serde_json::{Map, Value};
use sitemodel_core::{
    DataFormats, FormatProvider, ModelError, ResolverSettings, Result, ValidationError, Validator,
    WorkspaceConfig,
};
use tracing::{debug, info, warn};

use crate::partials::{DynamicPartials, InlineDynamics, PartialsChain, PartialsDir};

const BASE_NAME: &str = "base";
const INCLUDE_KEYS: [&str; 2] = ["collections", "singles"];
const MERGE_PARTIAL_KEY: &str = "_mergePartial";
const SEARCH_KEY: &str = "dynFormSearchKey";

/// Load the raw model of a workspace with default settings.
pub fn load_config(workspace: &Path, workspace_key: &str) -> Result<Value> {
    ModelLoader::default().load_config(workspace, workspace_key)
}

/// What a model file contributes to the merged model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Base,
    Include(&'static str),
}

#[derive(Debug)]
struct ModelFile {
    role: Role,
    path: PathBuf,
    ext: String,
}

/// Loads workspace content models from disk.
#[derive(Clone)]
pub struct ModelLoader {
    formats: Arc<dyn FormatProvider>,
    settings: ResolverSettings,
}

impl std::fmt::Debug for ModelLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelLoader")
            .field("formats", &self.formats.all_formats_ext())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new(ResolverSettings::default())
    }
}

impl ModelLoader {
    /// Create a loader for the built-in data formats.
    #[must_use]
    pub fn new(settings: ResolverSettings) -> Self {
        Self::with_formats(Arc::new(DataFormats::new()), settings)
    }

    /// Create a loader backed by another format provider.
    #[must_use]
    pub fn with_formats(formats: Arc<dyn FormatProvider>, settings: ResolverSettings) -> Self {
        Self { formats, settings }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub fn formats(&self) -> &Arc<dyn FormatProvider> {
        &self.formats
    }

    /// Validator bound to this loader's format provider.
    pub fn validator(&self) -> Result<Validator> {
        Ok(Validator::with_provider(self.formats.as_ref())?)
    }

    /// Load, normalize and validate a workspace model.
    pub fn resolve_workspace(&self, workspace: &Path, workspace_key: &str) -> Result<WorkspaceConfig> {
        let raw = self.load_config(workspace, workspace_key)?;
        let validator = self.validator()?;

        WorkspaceConfig::from_value_with(&validator, raw).inspect_err(|e| {
            warn!(workspace = %workspace.display(), error = %e, "content model rejected");
        })
    }

    /// Load the raw model of a workspace.
    ///
    /// The result may lack `collections` or `singles`; normalize before
    /// validating.
    pub fn load_config(&self, workspace: &Path, workspace_key: &str) -> Result<Value> {
        let model_dir = self.settings.model_path(workspace);
        info!(
            workspace = %workspace.display(),
            key = workspace_key,
            "loading content model"
        );

        let files = self.model_files(&model_dir)?;
        debug!(count = files.len(), "found model files");

        // Reads are independent; merging waits for all of them.
        let values = files
            .par_iter()
            .map(|file| self.read_file(file))
            .collect::<Result<Vec<_>>>()?;

        let mut root = Map::new();
        for (file, value) in files.iter().zip(values) {
            match file.role {
                Role::Base => {
                    root = match value {
                        Value::Object(map) => map,
                        _ => {
                            return Err(ModelError::parse(
                                &file.path,
                                "the base model must be a mapping",
                            ));
                        }
                    };
                }
                Role::Include(key) => append_include(&mut root, key, value, &file.path)?,
            }
        }

        let mut config = Value::Object(root);
        let partials = self.partials(workspace, &config);
        merge_partials(&mut config, &partials)?;
        // Inline dynamics are merged now; look them up in their final form.
        let partials = self.partials(workspace, &config);
        check_dynamic_references(&config, &partials)?;

        info!(
            collections = count_items(&config, "collections"),
            singles = count_items(&config, "singles"),
            "content model loaded"
        );
        Ok(config)
    }

    /// Partial registries for a workspace, in lookup order: the model's
    /// inline `dynamics`, the local partials directory, then the external
    /// cache directory unless disabled.
    pub fn partials(&self, workspace: &Path, raw: &Value) -> PartialsChain {
        let mut chain = PartialsChain::new()
            .with(InlineDynamics::from_model(raw))
            .with(PartialsDir::new(
                self.settings.partials_path(workspace),
                Arc::clone(&self.formats),
            ));
        if let Some(cache) = self.settings.active_partial_cache() {
            chain = chain.with(PartialsDir::new(cache, Arc::clone(&self.formats)));
        }
        chain
    }

    fn model_files(&self, model_dir: &Path) -> Result<Vec<ModelFile>> {
        let base = self.locate(model_dir, BASE_NAME).ok_or_else(|| {
            ModelError::io(
                model_dir.join(BASE_NAME),
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!(
                        "no base model file with any of the extensions {}",
                        self.formats.all_formats_ext().join(", ")
                    ),
                ),
            )
        })?;

        let mut files = vec![ModelFile {
            role: Role::Base,
            path: base.0,
            ext: base.1,
        }];

        let includes_dir = model_dir.join(&self.settings.includes_dir);
        for key in INCLUDE_KEYS {
            if let Some((path, ext)) = self.locate(&includes_dir, key) {
                files.push(ModelFile {
                    role: Role::Include(key),
                    path,
                    ext,
                });
            }
        }

        Ok(files)
    }

    /// First `<dir>/<stem>.<ext>` that exists, in provider order.
    fn locate(&self, dir: &Path, stem: &str) -> Option<(PathBuf, String)> {
        self.formats.all_formats_ext().into_iter().find_map(|ext| {
            let path = dir.join(format!("{stem}.{ext}"));
            path.is_file().then(|| (path, ext.to_string()))
        })
    }

    fn read_file(&self, file: &ModelFile) -> Result<Value> {
        debug!(path = %file.path.display(), "reading model file");
        let bytes = std::fs::read(&file.path).map_err(|e| ModelError::io(&file.path, e))?;
        self.formats
            .decode(&file.ext, &bytes)
            .map_err(|e| ModelError::parse(&file.path, e.to_string()))
    }
}

/// Append the items of an include file after the base file's items.
///
/// An include holds the list itself or a mapping with the list under its
/// own key. An empty file contributes nothing.
fn append_include(root: &mut Map<String, Value>, key: &str, value: Value, path: &Path) -> Result<()> {
    let items = match value {
        Value::Null => return Ok(()),
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            None | Some(Value::Null) => return Ok(()),
            Some(_) => {
                return Err(ModelError::parse(path, format!("\"{key}\" must be a list")));
            }
        },
        _ => {
            return Err(ModelError::parse(
                path,
                format!("an include must hold a {key} list or a mapping with one"),
            ));
        }
    };

    debug!(key, count = items.len(), path = %path.display(), "appending include items");
    match root.get_mut(key) {
        Some(Value::Array(existing)) => existing.extend(items),
        None | Some(Value::Null) => {
            root.insert(key.to_string(), Value::Array(items));
        }
        // The validator reports the malformed base entry.
        Some(_) => {}
    }
    Ok(())
}

/// Resolve every `_mergePartial` reference in dynamics, collections and
/// singles, recursively through their field trees.
///
/// Inline `dynamics` entries are merged first, each after the entries it
/// references, and later lookups of an inline name see the merged fields.
pub fn merge_partials(config: &mut Value, partials: &dyn DynamicPartials) -> Result<()> {
    let mut merger = Merger::new(partials);

    if let Some(Value::Array(dynamics)) = config.get_mut("dynamics") {
        merger.merge_dynamics(dynamics)?;
    }

    for (key, label) in [("collections", "Collection"), ("singles", "Single")] {
        let Some(Value::Array(nodes)) = config.get_mut(key) else {
            continue;
        };
        for node in nodes {
            if let Value::Object(map) = node {
                let hint = format!("{label}[key={}]", key_of(map));
                merger.merge_node(map, &hint)?;
            }
        }
    }
    Ok(())
}

/// Resolve `_mergePartial` references inside the field list of partial
/// `name`, as found by a registry at edit time.
pub fn merge_partial_fields(
    name: &str,
    fields: Vec<Value>,
    partials: &dyn DynamicPartials,
) -> Result<Vec<Value>> {
    let mut merger = Merger::new(partials);
    merger.active.push(name.to_string());

    let mut node = Map::new();
    node.insert("fields".to_string(), Value::Array(fields));
    merger.merge_node(&mut node, &format!("Dynamic[key={name}]"))?;

    match node.remove("fields") {
        Some(Value::Array(fields)) => Ok(fields),
        _ => Ok(Vec::new()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeState {
    Pending,
    Active,
    Done,
}

struct Merger<'a> {
    partials: &'a dyn DynamicPartials,
    /// Merged field lists of inline dynamics, by key.
    merged: HashMap<String, Vec<Value>>,
    active: Vec<String>,
}

impl<'a> Merger<'a> {
    fn new(partials: &'a dyn DynamicPartials) -> Self {
        Self {
            partials,
            merged: HashMap::new(),
            active: Vec::new(),
        }
    }

    fn lookup(&self, name: &str) -> Result<Option<Vec<Value>>> {
        match self.merged.get(name) {
            Some(fields) => Ok(Some(fields.clone())),
            None => self.partials.resolve(name),
        }
    }

    fn merge_dynamics(&mut self, dynamics: &mut [Value]) -> Result<()> {
        let index: HashMap<String, usize> = dynamics
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| Some((field_key(entry)?.to_string(), i)))
            .collect();
        let mut state = vec![MergeState::Pending; dynamics.len()];

        for i in 0..dynamics.len() {
            self.merge_dynamic(dynamics, &index, &mut state, i)?;
        }
        Ok(())
    }

    fn merge_dynamic(
        &mut self,
        dynamics: &mut [Value],
        index: &HashMap<String, usize>,
        state: &mut [MergeState],
        i: usize,
    ) -> Result<()> {
        if state[i] == MergeState::Done {
            return Ok(());
        }
        state[i] = MergeState::Active;

        let Value::Object(node) = &dynamics[i] else {
            state[i] = MergeState::Done;
            return Ok(());
        };
        let hint = format!("Dynamic[key={}]", key_of(node));

        let mut references = Vec::new();
        collect_references(node, &mut references);
        for name in references {
            let Some(&j) = index.get(&name) else {
                continue;
            };
            if state[j] == MergeState::Active {
                return Err(ValidationError::Schema(format!(
                    "{hint}: _mergePartial \"{name}\" includes itself."
                ))
                .into());
            }
            self.merge_dynamic(dynamics, index, state, j)?;
        }

        if let Value::Object(node) = &mut dynamics[i] {
            self.merge_node(node, &hint)?;
            if let (Some(key), Some(Value::Array(fields))) = (
                node.get("key").and_then(Value::as_str),
                node.get("fields"),
            ) {
                self.merged.insert(key.to_string(), fields.clone());
            }
        }
        state[i] = MergeState::Done;
        Ok(())
    }

    fn merge_node(&mut self, node: &mut Map<String, Value>, hint: &str) -> Result<()> {
        // A non-string reference stays in place for the validator to reject.
        let reference = match node.get(MERGE_PARTIAL_KEY) {
            Some(Value::String(name)) => Some(name.clone()),
            _ => None,
        };

        if let Some(name) = &reference {
            if self.active.contains(name) {
                return Err(ValidationError::Schema(format!(
                    "{hint}: _mergePartial \"{name}\" includes itself."
                ))
                .into());
            }
            let partial = self
                .lookup(name)?
                .ok_or_else(|| ModelError::partial_not_found(name.as_str(), hint))?;
            let own = match node.remove("fields") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(own)) => own,
                Some(_) => {
                    return Err(ValidationError::Schema(format!(
                        "{hint}: The fields value must be a list."
                    ))
                    .into());
                }
            };
            debug!(partial = %name, node = hint, "merging partial");
            node.remove(MERGE_PARTIAL_KEY);
            node.insert("fields".to_string(), Value::Array(merge_fields(partial, own)));
            self.active.push(name.clone());
        }

        if let Some(Value::Array(children)) = node.get_mut("fields") {
            for child in children {
                if let Value::Object(map) = child {
                    let child_hint = format!("{hint} > Field[key={}]", key_of(map));
                    self.merge_node(map, &child_hint)?;
                }
            }
        }

        if reference.is_some() {
            self.active.pop();
        }
        Ok(())
    }
}

/// Partial fields in their order, each replaced by a node field with the
/// same key, followed by the node's remaining fields.
fn merge_fields(partial: Vec<Value>, mut own: Vec<Value>) -> Vec<Value> {
    let mut merged = Vec::with_capacity(partial.len() + own.len());
    for field in partial {
        let replacement = field_key(&field)
            .and_then(|key| own.iter().position(|f| field_key(f) == Some(key)));
        match replacement {
            Some(index) => merged.push(own.remove(index)),
            None => merged.push(field),
        }
    }
    merged.extend(own);
    merged
}

/// Fail fast on select-style search keys whose options name unknown
/// partials. Free-form search keys are only resolved at edit time.
fn check_dynamic_references(config: &Value, partials: &dyn DynamicPartials) -> Result<()> {
    for (key, label) in [
        ("collections", "Collection"),
        ("singles", "Single"),
        ("dynamics", "Dynamic"),
    ] {
        let nodes = config.get(key).and_then(Value::as_array).into_iter().flatten();
        for node in nodes.filter_map(Value::as_object) {
            let hint = format!("{label}[key={}]", key_of(node));
            check_node_references(node, &hint, partials)?;
        }
    }
    Ok(())
}

fn check_node_references(
    node: &Map<String, Value>,
    hint: &str,
    partials: &dyn DynamicPartials,
) -> Result<()> {
    let children = node.get("fields").and_then(Value::as_array);

    if let (Some(Value::String(search_key)), Some(children)) = (node.get(SEARCH_KEY), children) {
        let options = children
            .iter()
            .find(|child| child.get("key").and_then(Value::as_str) == Some(search_key.as_str()))
            .and_then(|child| child.get("options"))
            .and_then(Value::as_array);

        for name in options.into_iter().flatten().filter_map(option_value) {
            if partials.resolve(&name)?.is_none() {
                return Err(ModelError::partial_not_found(name, hint));
            }
        }
    }

    for child in children.into_iter().flatten().filter_map(Value::as_object) {
        let child_hint = format!("{hint} > Field[key={}]", key_of(child));
        check_node_references(child, &child_hint, partials)?;
    }
    Ok(())
}

/// Every string `_mergePartial` name in a node and its field tree.
fn collect_references(node: &Map<String, Value>, names: &mut Vec<String>) {
    if let Some(Value::String(name)) = node.get(MERGE_PARTIAL_KEY) {
        names.push(name.clone());
    }
    let children = node.get("fields").and_then(Value::as_array).into_iter().flatten();
    for child in children.filter_map(Value::as_object) {
        collect_references(child, names);
    }
}

/// Option entries are plain values or `{ value, text }` mappings. Numbers
/// and booleans name a partial by their text.
fn option_value(option: &Value) -> Option<Cow<'_, str>> {
    match option {
        Value::String(value) => Some(Cow::Borrowed(value.as_str())),
        value @ (Value::Number(_) | Value::Bool(_)) => Some(Cow::Owned(value.to_string())),
        Value::Object(map) => map.get("value").and_then(option_value),
        _ => None,
    }
}

fn field_key(field: &Value) -> Option<&str> {
    field.get("key").and_then(Value::as_str)
}

fn key_of(node: &Map<String, Value>) -> String {
    match node.get("key") {
        Some(Value::String(key)) => key.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn count_items(config: &Value, key: &str) -> usize {
    config.get(key).and_then(Value::as_array).map_or(0, Vec::len)
}
