//! Typed workspace model handed to the form renderer.
//!
//! Values of these types only come out of [`WorkspaceConfig::from_value`],
//! which normalizes and validates first, so every invariant the validator
//! enforces holds for them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::Result,
    field::Field,
    normalize::normalize,
    validate::{Validator, is_content_path},
};

/// A resolved, validated workspace content model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Static-site generator version the workspace targets.
    pub hugover: String,

    #[serde(default)]
    pub menu: Vec<Value>,

    #[serde(default)]
    pub collections: Vec<Collection>,

    #[serde(default)]
    pub singles: Vec<Single>,

    #[serde(default)]
    pub dynamics: Vec<DynamicPartial>,

    #[serde(default)]
    pub build: Vec<BuildTarget>,

    #[serde(default)]
    pub serve: Vec<ServeTarget>,
}

/// A repeatable content type, one file per item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub key: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub folder: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itemtitle: Option<String>,
    pub extension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataformat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sortkey: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_preview_icon: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_external_edit_icon: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_index: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_subdirs: Option<bool>,
    #[serde(
        rename = "build_actions",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub build_actions: Vec<Value>,
    pub fields: Vec<Field>,
    /// Keys this model does not interpret, passed through for the renderer.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Collection {
    /// Format of the items' structured data (front matter or whole file).
    pub fn data_format(&self) -> &str {
        self.dataformat.as_deref().unwrap_or(&self.extension)
    }
}

/// A one-off content type backed by exactly one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Single {
    pub key: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataformat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_outer_root_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_preview_icon: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_external_edit_icon: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_save_button: Option<bool>,
    #[serde(
        rename = "build_actions",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub build_actions: Vec<Value>,
    pub fields: Vec<Field>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Single {
    /// Whether the file is a content file (body plus front matter).
    pub fn is_content_file(&self) -> bool {
        is_content_path(&self.file)
    }
}

/// A named field group selected per array item at edit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicPartial {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub fields: Vec<Field>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A site build target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub config: String,
}

/// A preview-server target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServeTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub config: String,
    /// Hide the preview site while serving drafts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hugo_hide_preview_site: Option<bool>,
}

impl WorkspaceConfig {
    /// Normalize, validate and convert a raw model.
    pub fn from_value(raw: Value) -> Result<Self> {
        Self::from_value_with(&Validator::new(), raw)
    }

    /// Same as [`WorkspaceConfig::from_value`] with a specific validator.
    pub fn from_value_with(validator: &Validator, raw: Value) -> Result<Self> {
        let config = normalize(raw);
        validator.check(&config)?;
        Ok(serde_json::from_value(config)?)
    }

    pub fn collection(&self, key: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.key == key)
    }

    pub fn single(&self, key: &str) -> Option<&Single> {
        self.singles.iter().find(|s| s.key == key)
    }

    pub fn dynamic(&self, key: &str) -> Option<&DynamicPartial> {
        self.dynamics.iter().find(|d| d.key == key)
    }

    /// Field tree of the collection or single with this key.
    ///
    /// Collections are searched first.
    pub fn fields_of(&self, key: &str) -> Option<&[Field]> {
        self.collection(key)
            .map(|c| c.fields.as_slice())
            .or_else(|| self.single(key).map(|s| s.fields.as_slice()))
    }
}
