//! Check configuration parsing from YAML/JSON.

use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::schema::validate_config_schema;
use crate::mode::CheckMode;
use crate::types::CheckValue;

/// Errors that make a check configuration unusable.
///
/// All of these are fatal: the driver reports them as a failed check
/// instead of evaluating anything.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config schema validation failed: {}", .0.join("; "))]
    Schema(Vec<String>),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Unrecognized check shape: {0}")]
    UnrecognizedShape(String),

    #[error("Missing input files: {}", display_paths(.0))]
    MissingInputs(Vec<PathBuf>),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ConfigurationError {
    /// The files or fields this error is about.
    pub fn offending(&self) -> Vec<String> {
        match self {
            ConfigurationError::Io { path, .. } => vec![path.display().to_string()],
            ConfigurationError::Yaml(e) => match e.location() {
                Some(loc) => vec![format!("line {} column {}", loc.line(), loc.column())],
                None => vec!["config".to_string()],
            },
            ConfigurationError::Json(_) => vec!["config".to_string()],
            ConfigurationError::Schema(errors) => errors.clone(),
            ConfigurationError::InvalidValue { field, .. } => vec![field.clone()],
            ConfigurationError::UnrecognizedShape(_) => vec![
                "requirements.value".to_string(),
                "requirements.pattern_items".to_string(),
            ],
            ConfigurationError::MissingInputs(paths) => {
                paths.iter().map(|p| p.display().to_string()).collect()
            }
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn not_applicable() -> CheckValue {
    CheckValue::NotApplicable
}

/// Requirements section of a check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirements {
    /// Expected matched count, or "N/A" for boolean checks
    pub value: CheckValue,

    /// Patterns in priority order
    #[serde(default, deserialize_with = "null_as_empty")]
    pub pattern_items: Vec<String>,
}

/// Waivers section of a check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waivers {
    /// "N/A" disables waivers, 0 neutralizes failures, anything else enables matching
    #[serde(default = "not_applicable")]
    pub value: CheckValue,

    /// Raw waive items: plain strings or `{name, reason}` records.
    ///
    /// Kept untyped so a malformed entry is reported rather than rejecting
    /// the whole config.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub waive_items: Vec<serde_json::Value>,
}

impl Default for Waivers {
    fn default() -> Self {
        Self {
            value: CheckValue::NotApplicable,
            waive_items: Vec::new(),
        }
    }
}

/// A single check's configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Checklist item identifier (e.g., "IMP-10-0-0-00")
    #[serde(default)]
    pub item_id: Option<String>,

    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,

    /// Report files the upstream parser reads
    #[serde(default, deserialize_with = "null_as_empty")]
    pub input_files: Vec<PathBuf>,

    pub requirements: Requirements,

    #[serde(default)]
    pub waivers: Waivers,
}

impl CheckConfig {
    /// Parse a config from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigurationError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a config from JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a config from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    /// Validate an untyped document, then deserialize it.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigurationError> {
        validate_config_schema(&value).map_err(ConfigurationError::Schema)?;
        let config: CheckConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the config shape.
    ///
    /// A config is only usable if exactly one check mode applies to it.
    fn validate(&self) -> Result<(), ConfigurationError> {
        if let Some(index) = self
            .requirements
            .pattern_items
            .iter()
            .position(|p| p.is_empty())
        {
            return Err(ConfigurationError::InvalidValue {
                field: format!("requirements.pattern_items[{}]", index),
                value: "empty pattern".to_string(),
            });
        }

        CheckMode::detect(self)?;
        Ok(())
    }

    /// Input files that do not exist, resolved against `base_dir`.
    pub fn missing_inputs(&self, base_dir: &Path) -> Vec<PathBuf> {
        self.input_files
            .iter()
            .map(|p| {
                if p.is_absolute() {
                    p.clone()
                } else {
                    base_dir.join(p)
                }
            })
            .filter(|p| !p.exists())
            .collect()
    }

    /// Fail with `MissingInputs` if any input file is absent.
    pub fn require_inputs(&self, base_dir: &Path) -> Result<(), ConfigurationError> {
        let missing = self.missing_inputs(base_dir);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigurationError::MissingInputs(missing))
        }
    }
}
