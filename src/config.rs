//! Reasoner configuration, persisted as TOML.
//!
//! Every key is optional. Environment overrides are applied once, after the
//! file is loaded.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_VALIDATION_ENABLED: &str = "COMPLY_VALIDATION_ENABLED";
pub const ENV_SHAPES_PATH: &str = "COMPLY_SHAPES_PATH";

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonerConfig {
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
}

/// Shape validation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Run shape validation at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Shape file; the bundled shapes are used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shapes_path: Option<PathBuf>,
}

fn default_enabled() -> bool {
    true
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            shapes_path: None,
        }
    }
}

/// Inference settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningConfig {
    /// Default base ontology (Turtle); bundled when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ontology_path: Option<PathBuf>,
    /// Rule set (text or `.json`); bundled when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_path: Option<PathBuf>,
    /// Fixpoint pass bound; derived from the enabled rule count when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_passes: Option<usize>,
}

impl ReasonerConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content, &path.display().to_string())
    }

    pub fn from_toml(content: &str, path: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but can never produce a working pipeline.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.reasoning.max_passes == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "reasoning.max_passes".into(),
                message: "a zero pass bound fails every inference".into(),
            });
        }
        Ok(())
    }

    /// Load `path` if given, otherwise defaults, then apply the process
    /// environment.
    pub fn resolve(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `COMPLY_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary lookup.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<()> {
        if let Some(value) = lookup(ENV_VALIDATION_ENABLED) {
            self.validation.enabled = parse_bool(ENV_VALIDATION_ENABLED, &value)?;
        }
        if let Some(value) = lookup(ENV_SHAPES_PATH) {
            let value = value.trim();
            self.validation.shapes_path = (!value.is_empty()).then(|| PathBuf::from(value));
        }
        Ok(())
    }

    /// Serialize back to TOML.
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

fn parse_bool(variable: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::Env {
            variable: variable.to_string(),
            value: value.to_string(),
        }),
    }
}
