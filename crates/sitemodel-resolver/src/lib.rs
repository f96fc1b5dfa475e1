//! Sitemodel Resolver
//!
//! Loads workspace content models from disk, merges includes and partials,
//! and hands validated models to the editor. Also resolves per-item dynamic
//! forms and runs template corpus checks.

pub mod corpus;
pub mod dynamic;
pub mod loader;
pub mod partials;

pub use corpus::{
    DiscoveredTemplate, FieldTypeEntry, TemplateReport, TemplateStatus, discover_templates,
    extract_field_types, run_corpus, write_fixtures,
};
pub use dynamic::{DynamicForm, dynamic_containers};
pub use loader::{ModelLoader, load_config};
pub use partials::{DynamicPartials, InlineDynamics, PartialsChain, PartialsDir};
