//! Error types for the Sitemodel core library.

use std::path::PathBuf;

use thiserror::Error;

use crate::format::FormatError;

/// Result type alias using `ModelError`.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while loading or resolving a workspace content model.
///
/// Loading is all-or-nothing: any of these aborts resolution of the whole
/// workspace and no partial configuration is returned.
#[derive(Error, Debug)]
pub enum ModelError {
    /// A model file could not be read.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A model file holds malformed structured data.
    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// A partial reference names a partial no registry knows about.
    #[error("Dynamic partial \"{name}\" not found (referenced at {hint})")]
    DynamicPartialNotFound { name: String, hint: String },

    /// The resolved model failed schema validation.
    #[error("Invalid content model: {0}")]
    Invalid(#[from] ValidationError),

    /// Format provider error outside of a file context.
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// A validated model could not be converted into typed form.
    #[error("Model decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Resolver settings loading or validation error.
    #[error("Settings error: {message}")]
    Settings {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Generic configuration crate error.
    #[error("Config crate error: {0}")]
    ConfigCrate(#[from] config::ConfigError),
}

impl ModelError {
    /// Create an IO error for a specific path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a new parse error.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a missing-partial error.
    pub fn partial_not_found(name: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::DynamicPartialNotFound {
            name: name.into(),
            hint: hint.into(),
        }
    }

    /// Create a new settings error with a message.
    pub fn settings(message: impl Into<String>) -> Self {
        Self::Settings {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new settings error with source.
    pub fn settings_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Settings {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Schema violations reported by the validator.
///
/// The `Display` output is the exact message shown to the author.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Top-level, collection, single or field shape violation.
    #[error("{0}")]
    Schema(String),

    /// Missing, non-string or duplicated field key.
    #[error("{hint}: Each field must have an unique key and the key must be a string. {reason}")]
    FieldKey { hint: String, reason: String },

    /// Extension and dataformat disagree.
    #[error("{0}")]
    FormatConsistency(String),

    /// A field `type` outside the field-type registry.
    #[error("{hint}: The field type {field_type} is not a known field type.")]
    UnknownFieldType { hint: String, field_type: String },
}

impl ValidationError {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub(crate) fn field_key(hint: &str, reason: impl Into<String>) -> Self {
        Self::FieldKey {
            hint: hint.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error() {
        let err = ModelError::parse("quiqr/model/base.yaml", "invalid indentation");
        assert!(err.to_string().contains("Parse error"));
        assert!(err.to_string().contains("quiqr/model/base.yaml"));
        assert!(err.to_string().contains("invalid indentation"));
    }

    #[test]
    fn test_partial_not_found_error() {
        let err = ModelError::partial_not_found("hero", "Collection[key=posts]");
        assert!(err.to_string().contains("\"hero\""));
        assert!(err.to_string().contains("Collection[key=posts]"));
    }

    #[test]
    fn test_field_key_message_carries_hint() {
        let err = ValidationError::field_key(
            "Collection[key=posts] > Field[key=blocks]",
            "The key \"title\" is duplicated.",
        );
        let msg = err.to_string();
        assert!(msg.starts_with("Collection[key=posts] > Field[key=blocks]:"));
        assert!(msg.ends_with("The key \"title\" is duplicated."));
    }

    #[test]
    fn test_validation_error_converts() {
        let err: ModelError = ValidationError::schema("\"hugover\" is required").into();
        assert!(matches!(err, ModelError::Invalid(_)));
        assert!(err.to_string().contains("hugover"));
    }

    #[test]
    fn test_io_error_keeps_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ModelError::io("/ws/quiqr/model/base.yaml", io_err);
        assert!(err.to_string().contains("IO error"));
        assert!(err.to_string().contains("base.yaml"));
    }
}
