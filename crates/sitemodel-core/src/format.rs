//! Structured-data formats used by model files.
//!
//! A [`FormatProvider`] maps a file extension to a decoder/encoder pair and
//! lists the extensions it knows. The validator never parses bytes itself; it
//! only builds [`FormatMatchers`] from the provider's extension list.

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Content formats: files with a body plus front matter.
pub const CONTENT_FORMATS: &[&str] = &["md", "qmd", "mmark"];

/// Format provider errors.
#[derive(Debug, Error)]
pub enum FormatError {
    /// No decoder is registered for the extension.
    #[error("unsupported data format: {0}")]
    Unsupported(String),

    /// The decoder rejected the input.
    #[error("{format} decode error: {message}")]
    Decode { format: String, message: String },

    /// The encoder rejected the value.
    #[error("{format} encode error: {message}")]
    Encode { format: String, message: String },

    /// The extension list produced an unusable matcher.
    #[error("invalid format pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl FormatError {
    fn decode(format: &str, message: impl ToString) -> Self {
        Self::Decode {
            format: format.to_string(),
            message: message.to_string(),
        }
    }

    fn encode(format: &str, message: impl ToString) -> Self {
        Self::Encode {
            format: format.to_string(),
            message: message.to_string(),
        }
    }
}

/// Decoding and encoding of structured data keyed by file extension.
pub trait FormatProvider: Send + Sync {
    /// Registered structured-data extensions, in lookup order.
    fn all_formats_ext(&self) -> Vec<&str>;

    /// Decode raw bytes into a value tree.
    fn decode(&self, ext: &str, bytes: &[u8]) -> Result<Value, FormatError>;

    /// Encode a value tree into raw bytes.
    fn encode(&self, ext: &str, value: &Value) -> Result<Vec<u8>, FormatError>;
}

/// Built-in provider for YAML, TOML and JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataFormats;

impl DataFormats {
    const EXTENSIONS: [&'static str; 4] = ["yaml", "yml", "toml", "json"];

    /// Create the default provider.
    pub fn new() -> Self {
        Self
    }
}

impl FormatProvider for DataFormats {
    fn all_formats_ext(&self) -> Vec<&str> {
        Self::EXTENSIONS.to_vec()
    }

    fn decode(&self, ext: &str, bytes: &[u8]) -> Result<Value, FormatError> {
        match ext {
            "yaml" | "yml" => {
                let text = std::str::from_utf8(bytes).map_err(|e| FormatError::decode(ext, e))?;
                if text.trim().is_empty() {
                    return Ok(Value::Null);
                }
                serde_yaml::from_str(text).map_err(|e| FormatError::decode(ext, e))
            }
            "toml" => {
                let text = std::str::from_utf8(bytes).map_err(|e| FormatError::decode(ext, e))?;
                toml::from_str(text).map_err(|e| FormatError::decode(ext, e))
            }
            "json" => serde_json::from_slice(bytes).map_err(|e| FormatError::decode(ext, e)),
            other => Err(FormatError::Unsupported(other.to_string())),
        }
    }

    fn encode(&self, ext: &str, value: &Value) -> Result<Vec<u8>, FormatError> {
        match ext {
            "yaml" | "yml" => serde_yaml::to_string(value)
                .map(String::into_bytes)
                .map_err(|e| FormatError::encode(ext, e)),
            "toml" => toml::to_string(value)
                .map(String::into_bytes)
                .map_err(|e| FormatError::encode(ext, e)),
            "json" => serde_json::to_vec_pretty(value).map_err(|e| FormatError::encode(ext, e)),
            other => Err(FormatError::Unsupported(other.to_string())),
        }
    }
}

/// Extension matchers derived from a format provider.
#[derive(Debug, Clone)]
pub struct FormatMatchers {
    content: Regex,
    data: Regex,
    all: Regex,
}

impl FormatMatchers {
    /// Build the content, data and combined matchers.
    pub fn from_provider(provider: &dyn FormatProvider) -> Result<Self, FormatError> {
        let data_exts: Vec<String> = provider
            .all_formats_ext()
            .into_iter()
            .map(regex::escape)
            .collect();
        let data = data_exts.join("|");
        let content = CONTENT_FORMATS.join("|");

        Ok(Self {
            content: Regex::new(&format!("^({content})$"))?,
            data: Regex::new(&format!("^({data})$"))?,
            all: Regex::new(&format!("^({data}|{content})$"))?,
        })
    }

    /// Whether `ext` is a content format (`md`, `qmd`, `mmark`).
    pub fn is_content_format(&self, ext: &str) -> bool {
        self.content.is_match(ext)
    }

    /// Whether `ext` is a registered structured-data format.
    pub fn is_data_format(&self, ext: &str) -> bool {
        self.data.is_match(ext)
    }

    /// Whether `ext` is any known format.
    pub fn is_known_format(&self, ext: &str) -> bool {
        self.all.is_match(ext)
    }
}
