//! Weaver configuration (`weaver.toml`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default location of the configuration file, relative to the project root
pub const CONFIG_FILE_NAME: &str = "weaver.toml";

/// Errors that can occur while loading or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or write the configuration file
    #[error("Failed to access config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Marker attribute full names recognized by the scanner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markers {
    /// Method-level provider marker
    #[serde(default = "default_provider_marker")]
    pub provider: String,

    /// Field-level consumer marker
    #[serde(default = "default_consumer_marker")]
    pub consumer: String,

    /// Method-level "run after wiring" marker
    #[serde(default = "default_after_wired_marker")]
    pub after_wired: String,
}

fn default_provider_marker() -> String {
    "SlotWeave.ServiceAttribute".to_string()
}

fn default_consumer_marker() -> String {
    "SlotWeave.WiredAttribute".to_string()
}

fn default_after_wired_marker() -> String {
    "SlotWeave.AfterWiredAttribute".to_string()
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            provider: default_provider_marker(),
            consumer: default_consumer_marker(),
            after_wired: default_after_wired_marker(),
        }
    }
}

/// Weaver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaverConfig {
    /// Newline-delimited list of module names eligible for weaving
    #[serde(default = "default_eligibility_file")]
    pub eligibility_file: PathBuf,

    /// Module name written to a freshly created eligibility file
    #[serde(default = "default_module")]
    pub default_module: String,

    /// Name of the synthetic type holding slot fields
    #[serde(default = "default_holder_type")]
    pub holder_type: String,

    /// Lifecycle method used when a type has no explicit initializers
    #[serde(default = "default_fallback_initializer")]
    pub fallback_initializer: String,

    /// Marker attribute names
    #[serde(default)]
    pub markers: Markers,
}

fn default_eligibility_file() -> PathBuf {
    PathBuf::from("Weaver/WeaverModules.txt")
}

fn default_module() -> String {
    "Application".to_string()
}

fn default_holder_type() -> String {
    "SlotWeave_Slots".to_string()
}

fn default_fallback_initializer() -> String {
    "Awake".to_string()
}

impl Default for WeaverConfig {
    fn default() -> Self {
        Self {
            eligibility_file: default_eligibility_file(),
            default_module: default_module(),
            holder_type: default_holder_type(),
            fallback_initializer: default_fallback_initializer(),
            markers: Markers::default(),
        }
    }
}

impl WeaverConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from a file, or use defaults if it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: WeaverConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write configuration to a file
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.holder_type.is_empty() {
            return Err(ConfigError::ValidationError(
                "holder_type cannot be empty".to_string(),
            ));
        }
        if self.fallback_initializer.is_empty() {
            return Err(ConfigError::ValidationError(
                "fallback_initializer cannot be empty".to_string(),
            ));
        }

        let markers = [
            ("provider", &self.markers.provider),
            ("consumer", &self.markers.consumer),
            ("after_wired", &self.markers.after_wired),
        ];
        for (key, name) in markers {
            if name.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "markers.{} cannot be empty",
                    key
                )));
            }
        }
        if self.markers.provider == self.markers.consumer
            || self.markers.provider == self.markers.after_wired
            || self.markers.consumer == self.markers.after_wired
        {
            return Err(ConfigError::ValidationError(
                "marker names must be distinct".to_string(),
            ));
        }

        Ok(())
    }
}
