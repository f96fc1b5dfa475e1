//! Resolver settings.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Where the resolver looks for model files inside a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Model directory, relative to the workspace root.
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Include directory, relative to the model directory.
    #[serde(default = "default_includes_dir")]
    pub includes_dir: PathBuf,

    /// Local partials directory, relative to the model directory.
    #[serde(default = "default_partials_dir")]
    pub partials_dir: PathBuf,

    /// Directory an external cache keeps remote partials in.
    #[serde(default)]
    pub partial_cache_dir: Option<PathBuf>,

    /// Ignore `partial_cache_dir` even when set.
    #[serde(default)]
    pub disable_partial_cache: bool,
}

// Default value functions
fn default_model_dir() -> PathBuf {
    PathBuf::from("quiqr/model")
}

fn default_includes_dir() -> PathBuf {
    PathBuf::from("includes")
}

fn default_partials_dir() -> PathBuf {
    PathBuf::from("partials")
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            includes_dir: default_includes_dir(),
            partials_dir: default_partials_dir(),
            partial_cache_dir: None,
            disable_partial_cache: false,
        }
    }
}

impl ResolverSettings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ModelError::settings(format!(
                "Settings file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| ModelError::io(path, e))?;
        let settings: ResolverSettings = toml::from_str(&content).map_err(|e| {
            ModelError::settings_with_source(
                format!("Failed to parse settings file: {}", path.display()),
                e,
            )
        })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from an optional file plus `SITEMODEL__*` environment
    /// overrides, e.g. `SITEMODEL__MODEL_DIR=model`.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix("SITEMODEL").separator("__"))
            .build()?;

        let settings: ResolverSettings = settings.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the settings.
    fn validate(&self) -> Result<()> {
        for (name, dir) in [
            ("model_dir", &self.model_dir),
            ("includes_dir", &self.includes_dir),
            ("partials_dir", &self.partials_dir),
        ] {
            if dir.as_os_str().is_empty() {
                return Err(ModelError::settings(format!("{name} cannot be empty")));
            }
            if !is_contained(dir) {
                return Err(ModelError::settings(format!(
                    "{name} must be a relative path without '..': {}",
                    dir.display()
                )));
            }
        }

        if self.disable_partial_cache && self.partial_cache_dir.is_some() {
            tracing::warn!("partial_cache_dir is set but disable_partial_cache is on");
        }

        Ok(())
    }

    /// `<workspace>/<model_dir>`.
    pub fn model_path(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.model_dir)
    }

    /// `<workspace>/<model_dir>/<includes_dir>`.
    pub fn includes_path(&self, workspace: &Path) -> PathBuf {
        self.model_path(workspace).join(&self.includes_dir)
    }

    /// `<workspace>/<model_dir>/<partials_dir>`.
    pub fn partials_path(&self, workspace: &Path) -> PathBuf {
        self.model_path(workspace).join(&self.partials_dir)
    }

    /// The external partial cache directory, unless disabled.
    pub fn active_partial_cache(&self) -> Option<&Path> {
        if self.disable_partial_cache {
            None
        } else {
            self.partial_cache_dir.as_deref()
        }
    }
}

fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
