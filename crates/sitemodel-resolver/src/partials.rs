//! Dynamic partial registries.
//!
//! A dynamic partial is a named, reusable field list. Partials come from the
//! model's own `dynamics` array, from files in the model's partials
//! directory, or from a directory an external cache keeps remote partials in.
//! Registries only read what is there; they never fetch, retry or lock.

use std::{
    collections::HashMap,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use serde_json::Value;
use sitemodel_core::{FormatProvider, ModelError, Result};
use tracing::{debug, trace};

/// Resolves a partial name to its raw field list.
pub trait DynamicPartials: Send + Sync {
    /// `Ok(None)` when this registry has no partial by that name.
    fn resolve(&self, name: &str) -> Result<Option<Vec<Value>>>;
}

/// Partials declared inline under the model's `dynamics` key.
#[derive(Debug, Clone, Default)]
pub struct InlineDynamics {
    partials: HashMap<String, Vec<Value>>,
}

impl InlineDynamics {
    /// Index the `dynamics` array of a raw model.
    ///
    /// Entries without a string `key` or a `fields` list are skipped here;
    /// the validator reports them.
    pub fn from_model(raw: &Value) -> Self {
        let partials = raw
            .get("dynamics")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|entry| {
                let key = entry.get("key")?.as_str()?;
                let fields = entry.get("fields")?.as_array()?;
                Some((key.to_string(), fields.clone()))
            })
            .collect();
        Self { partials }
    }

    pub fn len(&self) -> usize {
        self.partials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partials.is_empty()
    }
}

impl DynamicPartials for InlineDynamics {
    fn resolve(&self, name: &str) -> Result<Option<Vec<Value>>> {
        Ok(self.partials.get(name).cloned())
    }
}

/// Partials stored as `<dir>/<name>.<ext>` files.
///
/// A partial file holds either the field list itself or a mapping with a
/// `fields` list.
#[derive(Clone)]
pub struct PartialsDir {
    dir: PathBuf,
    formats: Arc<dyn FormatProvider>,
}

impl std::fmt::Debug for PartialsDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartialsDir").field("dir", &self.dir).finish()
    }
}

impl PartialsDir {
    pub fn new(dir: impl Into<PathBuf>, formats: Arc<dyn FormatProvider>) -> Self {
        Self {
            dir: dir.into(),
            formats,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn locate(&self, name: &str) -> Option<(PathBuf, String)> {
        self.formats.all_formats_ext().into_iter().find_map(|ext| {
            let path = self.dir.join(format!("{name}.{ext}"));
            path.is_file().then(|| (path, ext.to_string()))
        })
    }
}

impl DynamicPartials for PartialsDir {
    fn resolve(&self, name: &str) -> Result<Option<Vec<Value>>> {
        if !is_plain_name(name) {
            debug!(name, "ignoring partial name that escapes the partials directory");
            return Ok(None);
        }
        let Some((path, ext)) = self.locate(name) else {
            trace!(name, dir = %self.dir.display(), "partial not in directory");
            return Ok(None);
        };

        debug!(name, path = %path.display(), "reading partial");
        let bytes = std::fs::read(&path).map_err(|e| ModelError::io(&path, e))?;
        let value = self
            .formats
            .decode(&ext, &bytes)
            .map_err(|e| ModelError::parse(&path, e.to_string()))?;

        match value {
            Value::Array(fields) => Ok(Some(fields)),
            Value::Object(mut map) => match map.remove("fields") {
                Some(Value::Array(fields)) => Ok(Some(fields)),
                _ => Err(ModelError::parse(&path, "partial mapping has no fields list")),
            },
            _ => Err(ModelError::parse(
                &path,
                "partial must be a list of fields or a mapping with a fields list",
            )),
        }
    }
}

/// Registries consulted in order; the first hit wins.
#[derive(Default)]
pub struct PartialsChain {
    sources: Vec<Box<dyn DynamicPartials>>,
}

impl PartialsChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a registry with lower precedence than those already added.
    #[must_use]
    pub fn with(mut self, source: impl DynamicPartials + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl DynamicPartials for PartialsChain {
    fn resolve(&self, name: &str) -> Result<Option<Vec<Value>>> {
        for source in &self.sources {
            if let Some(fields) = source.resolve(name)? {
                return Ok(Some(fields));
            }
        }
        Ok(None)
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}
