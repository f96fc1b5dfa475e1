//! Schema validation of raw workspace models.
//!
//! The validator is the single gate between author-written model files and
//! the form renderer. It reads a raw value tree and returns the first
//! violation it finds, in this order:
//!
//! 1. top-level shape,
//! 2. each collection, then each single, in array order: its own shape, the
//!    extension/dataformat rule, then a depth-first walk of its field tree,
//! 3. each `dynamics` entry and its field tree.
//!
//! Field violations carry a hint path such as
//! `Collection[key=posts] > Field[key=blocks] > Field[key=button]` so the
//! author can find the node in the source file.

use std::{collections::HashSet, path::Path};

use serde_json::{Map, Value};

use crate::{
    error::ValidationError,
    field::FieldType,
    format::{DataFormats, FormatError, FormatMatchers, FormatProvider},
    normalize::normalize,
};

type Outcome = std::result::Result<(), ValidationError>;

const KEY_MIN: usize = 3;
const KEY_MAX: usize = 90;
const TITLE_MIN: usize = 3;
const TITLE_MAX: usize = 30;
const DESCRIPTION_MAX: usize = 90;
const ITEMTITLE_MIN: usize = 3;
const ITEMTITLE_MAX: usize = 90;
const SORTKEY_MIN: usize = 3;

/// Singles whose `file` starts with one of these are content files.
const CONTENT_PATH_PREFIXES: [&str; 2] = ["content", "quiqr/home"];

const MERGE_PARTIAL_KEY: &str = "_mergePartial";

/// Validate with the built-in data formats.
///
/// Returns `None` when the model is safe to hand to the renderer, otherwise
/// the message describing the first violation.
pub fn validate(config: &Value) -> Option<String> {
    Validator::new().validate(config)
}

/// Workspace model validator bound to a set of format matchers.
#[derive(Debug, Clone)]
pub struct Validator {
    formats: FormatMatchers,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Create a validator for the built-in data formats.
    pub fn new() -> Self {
        Self {
            formats: builtin_matchers(),
        }
    }

    /// Create a validator for another format provider's extensions.
    pub fn with_provider(provider: &dyn FormatProvider) -> Result<Self, FormatError> {
        Ok(Self {
            formats: FormatMatchers::from_provider(provider)?,
        })
    }

    pub fn formats(&self) -> &FormatMatchers {
        &self.formats
    }

    /// String form of [`Validator::check`] over a normalized copy of
    /// `config`, so absent `collections` or `singles` count as empty.
    pub fn validate(&self, config: &Value) -> Option<String> {
        self.check(&normalize(config.clone()))
            .err()
            .map(|e| e.to_string())
    }

    /// Check a normalized model, stopping at the first violation.
    pub fn check(&self, config: &Value) -> Outcome {
        let root = config
            .as_object()
            .ok_or_else(|| ValidationError::schema("The workspace configuration is required."))?;

        check_top_level(root)?;

        for collection in array_items(root, "collections") {
            self.check_collection(collection)?;
        }
        for single in array_items(root, "singles") {
            self.check_single(single)?;
        }
        for dynamic in array_items(root, "dynamics") {
            self.check_dynamic(dynamic)?;
        }

        Ok(())
    }

    /// Walk a field list depth-first.
    ///
    /// Every field must be a mapping with a string key unique among its
    /// siblings, a registered `type`, and consistent container options.
    pub fn check_fields(&self, fields: &Value, hint: &str) -> Outcome {
        let items = fields
            .as_array()
            .ok_or_else(|| ValidationError::schema(format!("{hint}: The fields value must be a list.")))?;

        let mut seen: HashSet<&str> = HashSet::with_capacity(items.len());
        for field in items {
            let Some(node) = field.as_object() else {
                return Err(ValidationError::field_key(hint, "Field without a key is not allowed."));
            };
            let key = match node.get("key") {
                None | Some(Value::Null) => {
                    return Err(ValidationError::field_key(
                        hint,
                        "Field without a key is not allowed.",
                    ));
                }
                Some(Value::String(key)) => key.as_str(),
                Some(_) => return Err(ValidationError::field_key(hint, "Field key must be a string.")),
            };
            if !seen.insert(key) {
                return Err(ValidationError::field_key(
                    hint,
                    format!("The key \"{key}\" is duplicated."),
                ));
            }

            let path = format!("{hint} > Field[key={key}]");
            check_field_node(node, &path)?;

            match node.get("fields") {
                None | Some(Value::Null) => {}
                Some(children) => self.check_fields(children, &path)?,
            }
        }

        Ok(())
    }

    fn check_collection(&self, collection: &Value) -> Outcome {
        let node = collection
            .as_object()
            .ok_or_else(|| ValidationError::schema("The collection configuration is required."))?;
        let key_text = display_key(node);
        let hint = format!("Collection[key={key_text}]");

        Rules::new(node)
            .string("key", Presence::Required, is_valid_key, || {
                format!("The collection key \"{key_text}\" is invalid.")
            })?
            .string("title", Presence::Required, title_len, || {
                "The collection.title value is invalid.".into()
            })?
            .string("description", Presence::Optional, description_len, || {
                "The collection.description value is invalid.".into()
            })?
            .string("folder", Presence::Required, no_traversal, || {
                "The folder value is invalid.".into()
            })?
            .string("itemtitle", Presence::Optional, itemtitle_len, || {
                "The itemtitle value is invalid.".into()
            })?
            .raw_string(
                "extension",
                Presence::Required,
                |ext| self.formats.is_known_format(ext),
                || "The extension value is invalid.".into(),
            )?
            .string("dataformat", Presence::Optional, any, || {
                "The dataformat value is invalid.".into()
            })?
            .string("previewUrlBase", Presence::Optional, any, || {
                "The collection.previewUrlBase value is invalid.".into()
            })?
            .flags(
                "collection",
                &["hidePreviewIcon", "hideExternalEditIcon", "hideIndex", "includeSubdirs"],
            )?
            .list("build_actions", || "The collection.build_actions value is invalid.".into())?
            .fields(&hint)?
            .string("sortkey", Presence::Optional, sortkey_len, || {
                "The sortkey value is invalid.".into()
            })?
            .forbid(MERGE_PARTIAL_KEY, || {
                format!("{hint}: The _mergePartial reference could not be resolved. Check the partial name.")
            })?;

        let extension = node.get("extension").and_then(Value::as_str).unwrap_or_default();
        let dataformat = node.get("dataformat").and_then(Value::as_str);
        if self.formats.is_content_format(extension) {
            self.require_data_format(dataformat)?;
        } else if dataformat.is_some_and(|dataformat| dataformat != extension) {
            return Err(ValidationError::FormatConsistency(
                "The dataformat value does not match the extension value.".into(),
            ));
        }

        self.check_fields(&node["fields"], &hint)
    }

    fn check_single(&self, single: &Value) -> Outcome {
        let node = single
            .as_object()
            .ok_or_else(|| ValidationError::schema("The single configuration is required."))?;
        let key_text = display_key(node);
        let hint = format!("Single[key={key_text}]");

        Rules::new(node)
            .string("key", Presence::Required, is_valid_key, || {
                format!("The single key \"{key_text}\" is invalid.")
            })?
            .string("title", Presence::Required, title_len, || {
                "The singles.title value is invalid.".into()
            })?
            .string("description", Presence::Optional, description_len, || {
                "The singles.description value is invalid.".into()
            })?
            .string("file", Presence::Required, no_traversal, || {
                "The singles.file value is invalid.".into()
            })?
            .string("dataformat", Presence::Optional, any, || {
                "The singles.dataformat value is invalid.".into()
            })?
            .list("build_actions", || "The singles.build_actions value is invalid.".into())?
            .string("previewUrl", Presence::Optional, any, || {
                "The singles.previewUrl value is invalid.".into()
            })?
            .string("pullOuterRootKey", Presence::Optional, any, || {
                "The singles.pullOuterRootKey value is invalid.".into()
            })?
            .flags("singles", &["hidePreviewIcon", "hideExternalEditIcon", "hideSaveButton"])?
            .fields(&hint)?
            .forbid(MERGE_PARTIAL_KEY, || {
                format!("{hint}: The _mergePartial reference could not be resolved. Check the partial name.")
            })?;

        let file = node.get("file").and_then(Value::as_str).unwrap_or_default();
        let dataformat = node.get("dataformat").and_then(Value::as_str);
        if is_content_path(file) {
            self.require_data_format(dataformat)?;
        } else if let Some(dataformat) = dataformat {
            let extension = Path::new(file)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default();
            if dataformat != extension {
                return Err(ValidationError::FormatConsistency(format!(
                    "The dataformat value does not match the file value. {dataformat}"
                )));
            }
        }

        self.check_fields(&node["fields"], &hint)
    }

    fn check_dynamic(&self, dynamic: &Value) -> Outcome {
        let node = dynamic
            .as_object()
            .ok_or_else(|| ValidationError::schema("The dynamics entry configuration is required."))?;
        let key_text = display_key(node);
        let hint = format!("Dynamic[key={key_text}]");

        Rules::new(node)
            .string("key", Presence::Required, any, || {
                format!("The dynamic key \"{key_text}\" is invalid.")
            })?
            .string("title", Presence::Optional, any, || {
                "The dynamics.title value is invalid.".into()
            })?;

        match node.get("fields") {
            Some(fields @ Value::Array(_)) => self.check_fields(fields, &hint),
            _ => Err(ValidationError::schema(format!("{hint}: The fields value is invalid."))),
        }
    }

    fn require_data_format(&self, dataformat: Option<&str>) -> Outcome {
        match dataformat.map(str::trim) {
            Some(format) if self.formats.is_data_format(format) => Ok(()),
            _ => Err(ValidationError::FormatConsistency(
                "The dataformat value is invalid.".into(),
            )),
        }
    }
}

fn builtin_matchers() -> FormatMatchers {
    // The built-in extension list is plain alphanumerics, so the patterns
    // always compile.
    match FormatMatchers::from_provider(&DataFormats) {
        Ok(matchers) => matchers,
        Err(err) => unreachable!("built-in format patterns: {err}"),
    }
}

/// Content-vs-data decision for singles, by plain string prefix on `file`.
pub fn is_content_path(file: &str) -> bool {
    CONTENT_PATH_PREFIXES
        .iter()
        .any(|prefix| file.starts_with(prefix))
}

fn check_top_level(root: &Map<String, Value>) -> Outcome {
    match root.get("hugover") {
        None => return Err(ValidationError::schema("\"hugover\" is required")),
        Some(Value::String(v)) if v.trim().is_empty() => {
            return Err(ValidationError::schema("\"hugover\" is not allowed to be empty"));
        }
        Some(Value::String(_)) => {}
        Some(_) => return Err(ValidationError::schema("\"hugover\" must be a string")),
    }

    expect_list(root, "menu", false)?;
    expect_list(root, "collections", true)?;
    expect_list(root, "singles", true)?;
    expect_list(root, "dynamics", false)?;
    check_targets(root, "build", false)?;
    check_targets(root, "serve", true)
}

fn expect_list(root: &Map<String, Value>, key: &str, required: bool) -> Outcome {
    match root.get(key) {
        None if required => Err(ValidationError::schema(format!("\"{key}\" is required"))),
        None | Some(Value::Array(_)) => Ok(()),
        Some(_) => Err(ValidationError::schema(format!("\"{key}\" must be an array"))),
    }
}

/// `build` and `serve` entries: `{ key?: string, config: string }`.
fn check_targets(root: &Map<String, Value>, key: &str, allow_preview_flag: bool) -> Outcome {
    expect_list(root, key, false)?;
    for (index, target) in array_items(root, key).enumerate() {
        let Some(target) = target.as_object() else {
            return Err(ValidationError::schema(format!("\"{key}[{index}]\" must be an object")));
        };
        match target.get("config") {
            Some(Value::String(_)) => {}
            None => {
                return Err(ValidationError::schema(format!(
                    "\"{key}[{index}].config\" is required"
                )));
            }
            Some(_) => {
                return Err(ValidationError::schema(format!(
                    "\"{key}[{index}].config\" must be a string"
                )));
            }
        }
        if target.get("key").is_some_and(|k| !k.is_string()) {
            return Err(ValidationError::schema(format!(
                "\"{key}[{index}].key\" must be a string"
            )));
        }
        if allow_preview_flag
            && target
                .get("hugoHidePreviewSite")
                .is_some_and(|flag| !flag.is_boolean())
        {
            return Err(ValidationError::schema(format!(
                "\"{key}[{index}].hugoHidePreviewSite\" must be a boolean"
            )));
        }
    }
    Ok(())
}

/// Per-field checks applied before descending into children.
fn check_field_node(node: &Map<String, Value>, path: &str) -> Outcome {
    let field_type = match node.get("type") {
        None | Some(Value::Null) => {
            return Err(ValidationError::schema(format!(
                "{path}: Field without a type is not allowed."
            )));
        }
        Some(Value::String(tag)) => FieldType::from_tag(tag),
        Some(_) => None,
    };
    let Some(field_type) = field_type else {
        return Err(ValidationError::UnknownFieldType {
            hint: path.to_string(),
            field_type: node.get("type").map(Value::to_string).unwrap_or_default(),
        });
    };

    if node.get("title").is_some_and(|t| !t.is_string() && !t.is_null()) {
        return Err(ValidationError::schema(format!(
            "{path}: The field title must be a string."
        )));
    }

    if node.contains_key(MERGE_PARTIAL_KEY) {
        return Err(ValidationError::schema(format!(
            "{path}: The _mergePartial reference could not be resolved. Check the partial name."
        )));
    }

    match node.get("dynFormSearchKey") {
        None | Some(Value::Null) => Ok(()),
        Some(_) if !field_type.supports_dynamic_form() => Err(ValidationError::schema(format!(
            "{path}: dynFormSearchKey is only allowed on accordion and leaf-array fields."
        ))),
        Some(Value::String(search_key)) if !search_key.trim().is_empty() => {
            let names_child = node
                .get("fields")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .any(|child| child.get("key").and_then(Value::as_str) == Some(search_key.as_str()));
            if names_child {
                Ok(())
            } else {
                Err(ValidationError::schema(format!(
                    "{path}: dynFormSearchKey \"{search_key}\" does not name one of the container's fields."
                )))
            }
        }
        Some(_) => Err(ValidationError::schema(format!(
            "{path}: dynFormSearchKey must be a non-empty string."
        ))),
    }
}

/// Iterate an array entry of a mapping, yielding nothing when absent.
fn array_items<'a>(root: &'a Map<String, Value>, key: &str) -> impl Iterator<Item = &'a Value> {
    root.get(key).and_then(Value::as_array).into_iter().flatten()
}

fn display_key(node: &Map<String, Value>) -> String {
    match node.get("key") {
        Some(Value::String(key)) => key.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Presence {
    Required,
    Optional,
}

/// Ordered per-key checks over one mapping, stopping at the first failure.
struct Rules<'a> {
    node: &'a Map<String, Value>,
}

impl<'a> Rules<'a> {
    fn new(node: &'a Map<String, Value>) -> Self {
        Self { node }
    }

    /// A non-empty string, trimmed before `accept` runs.
    fn string(
        self,
        key: &str,
        presence: Presence,
        accept: impl Fn(&str) -> bool,
        message: impl FnOnce() -> String,
    ) -> Result<Self, ValidationError> {
        self.raw_string(
            key,
            presence,
            |v| {
                let v = v.trim();
                !v.is_empty() && accept(v)
            },
            message,
        )
    }

    /// A string passed to `accept` untrimmed.
    fn raw_string(
        self,
        key: &str,
        presence: Presence,
        accept: impl Fn(&str) -> bool,
        message: impl FnOnce() -> String,
    ) -> Result<Self, ValidationError> {
        let ok = match self.node.get(key) {
            None => presence == Presence::Optional,
            Some(Value::String(v)) => accept(v),
            Some(_) => false,
        };
        if ok {
            Ok(self)
        } else {
            Err(ValidationError::schema(message()))
        }
    }

    fn flags(self, owner: &str, keys: &[&str]) -> Result<Self, ValidationError> {
        for key in keys {
            if self.node.get(*key).is_some_and(|v| !v.is_boolean()) {
                return Err(ValidationError::schema(format!(
                    "The {owner}.{key} value must be a boolean."
                )));
            }
        }
        Ok(self)
    }

    fn list(self, key: &str, message: impl FnOnce() -> String) -> Result<Self, ValidationError> {
        if self.node.get(key).is_some_and(|v| !v.is_array()) {
            return Err(ValidationError::schema(message()));
        }
        Ok(self)
    }

    /// Required, non-empty `fields` list.
    fn fields(self, hint: &str) -> Result<Self, ValidationError> {
        match self.node.get("fields") {
            Some(Value::Array(fields)) if !fields.is_empty() => Ok(self),
            _ => Err(ValidationError::schema(format!(
                "{hint}: The fields value is invalid."
            ))),
        }
    }

    fn forbid(self, key: &str, message: impl FnOnce() -> String) -> Result<Self, ValidationError> {
        if self.node.contains_key(key) {
            return Err(ValidationError::schema(message()));
        }
        Ok(self)
    }
}

fn char_len(v: &str) -> usize {
    v.chars().count()
}

fn is_valid_key(v: &str) -> bool {
    (KEY_MIN..=KEY_MAX).contains(&char_len(v))
        && v.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn title_len(v: &str) -> bool {
    (TITLE_MIN..=TITLE_MAX).contains(&char_len(v))
}

fn description_len(v: &str) -> bool {
    char_len(v) <= DESCRIPTION_MAX
}

fn itemtitle_len(v: &str) -> bool {
    (ITEMTITLE_MIN..=ITEMTITLE_MAX).contains(&char_len(v))
}

fn sortkey_len(v: &str) -> bool {
    char_len(v) >= SORTKEY_MIN
}

fn no_traversal(v: &str) -> bool {
    !v.contains("..")
}

fn any(_: &str) -> bool {
    true
}
