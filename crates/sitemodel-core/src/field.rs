//! Field-type registry and the field tree exchanged with the form renderer.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Whether a field type holds a scalar value or nested fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Scalar input, no children.
    Leaf,
    /// Carries a nested `fields` list.
    Container,
}

/// The closed set of recognized field `type` tags.
///
/// This is the one registry shared by the validator and every consumer that
/// dispatches on a field's type. A tag outside it never reaches the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    // Text
    String,
    Markdown,
    Easymde,
    Readonly,
    Uniq,
    // Numeric
    Number,
    Slider,
    Boolean,
    Date,
    // Selection
    Select,
    SelectFromQuery,
    Chips,
    Color,
    FonticonPicker,
    FontPicker,
    // Image / file
    ImageSelect,
    BundleImageThumbnail,
    // Utility
    Hidden,
    EmptyLine,
    Info,
    Eisenhouwer,
    // Containers
    Accordion,
    Section,
    Nest,
    Pull,
    LeafArray,
    BundleManager,
}

impl FieldType {
    /// Every registered field type.
    pub const ALL: [FieldType; 27] = [
        Self::String,
        Self::Markdown,
        Self::Easymde,
        Self::Readonly,
        Self::Uniq,
        Self::Number,
        Self::Slider,
        Self::Boolean,
        Self::Date,
        Self::Select,
        Self::SelectFromQuery,
        Self::Chips,
        Self::Color,
        Self::FonticonPicker,
        Self::FontPicker,
        Self::ImageSelect,
        Self::BundleImageThumbnail,
        Self::Hidden,
        Self::EmptyLine,
        Self::Info,
        Self::Eisenhouwer,
        Self::Accordion,
        Self::Section,
        Self::Nest,
        Self::Pull,
        Self::LeafArray,
        Self::BundleManager,
    ];

    /// The tag as written in model files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Markdown => "markdown",
            Self::Easymde => "easymde",
            Self::Readonly => "readonly",
            Self::Uniq => "uniq",
            Self::Number => "number",
            Self::Slider => "slider",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Select => "select",
            Self::SelectFromQuery => "select-from-query",
            Self::Chips => "chips",
            Self::Color => "color",
            Self::FonticonPicker => "fonticon-picker",
            Self::FontPicker => "font-picker",
            Self::ImageSelect => "image-select",
            Self::BundleImageThumbnail => "bundle-image-thumbnail",
            Self::Hidden => "hidden",
            Self::EmptyLine => "empty-line",
            Self::Info => "info",
            Self::Eisenhouwer => "eisenhouwer",
            Self::Accordion => "accordion",
            Self::Section => "section",
            Self::Nest => "nest",
            Self::Pull => "pull",
            Self::LeafArray => "leaf-array",
            Self::BundleManager => "bundle-manager",
        }
    }

    /// Look up a tag in the registry.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == tag)
    }

    /// Leaf or container.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Accordion
            | Self::Section
            | Self::Nest
            | Self::Pull
            | Self::LeafArray
            | Self::BundleManager => FieldKind::Container,
            _ => FieldKind::Leaf,
        }
    }

    pub fn is_container(&self) -> bool {
        self.kind() == FieldKind::Container
    }

    /// Whether items of this container may select a dynamic partial.
    pub fn supports_dynamic_form(&self) -> bool {
        matches!(self, Self::Accordion | Self::LeafArray)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node of the editable schema tree.
///
/// The serialized form is `{ type, key, title?, fields?, ...options }`, the
/// shape handed to the renderer and written to fixtures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Key unique among siblings.
    pub key: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Nested fields (containers only in well-formed models).
    #[serde(
        default,
        deserialize_with = "nullable_fields",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub fields: Vec<Field>,

    /// Sibling field whose per-item value selects a dynamic partial.
    #[serde(
        rename = "dynFormSearchKey",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub dyn_form_search_key: Option<String>,

    /// Type-specific options passed through untouched.
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl Field {
    /// Create a bare field with no options.
    pub fn new(key: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            key: key.into(),
            field_type,
            title: None,
            fields: Vec::new(),
            dyn_form_search_key: None,
            options: Map::new(),
        }
    }

    /// Attach nested fields.
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = fields;
        self
    }

    /// Direct child with the given key.
    pub fn child(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn is_container(&self) -> bool {
        self.field_type.is_container()
    }

    /// Visit this field and all descendants depth-first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Field)) {
        visit(self);
        for child in &self.fields {
            child.walk(visit);
        }
    }
}

fn nullable_fields<'de, D>(deserializer: D) -> Result<Vec<Field>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Field>>::deserialize(deserializer)?.unwrap_or_default())
}
