//! Sitemodel Core Library
//!
//! Types, field-type registry, normalization and schema validation for
//! workspace content models.

pub mod error;
pub mod field;
pub mod format;
pub mod normalize;
pub mod path;
pub mod settings;
pub mod validate;
pub mod workspace;

pub use error::{ModelError, Result, ValidationError};
pub use field::{Field, FieldKind, FieldType};
pub use format::{DataFormats, FormatError, FormatMatchers, FormatProvider};
pub use normalize::normalize;
pub use settings::ResolverSettings;
pub use validate::{Validator, validate};
pub use workspace::{Collection, DynamicPartial, Single, WorkspaceConfig};
