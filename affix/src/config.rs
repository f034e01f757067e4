//! Registry configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Behavior switches for a [`CapabilityRegistry`](crate::CapabilityRegistry)
///
/// ```yaml
/// permit_anonymous: true
/// warn_on_redundant: false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Allow anonymous adapter types to be registered under a declared
    /// supertype. When off, the runtime type must match exactly.
    pub permit_anonymous: bool,

    /// Log redundant registrations at `warn` instead of `debug`
    pub warn_on_redundant: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            permit_anonymous: true,
            warn_on_redundant: true,
        }
    }
}

impl RegistryConfig {
    /// Parse a YAML document; missing fields keep their defaults
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Load from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }
}
