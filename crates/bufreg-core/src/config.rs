//! Registry configuration
//!
//! Configuration is merged from, in order:
//! - Default values
//! - An optional TOML file
//! - Environment variables (`BUFREG_*`)

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::logging::LoggingConfig;

/// Upper bound on the number of table shards
pub const MAX_SHARDS: usize = 1024;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Largest capacity a single buffer may request
    pub max_buffer_capacity: u64,

    /// Total bytes that may be reserved across all live buffers
    pub max_total_bytes: u64,

    /// Number of independently locked table shards (rounded up to a power of two)
    pub shard_count: usize,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_buffer_capacity: 256 * 1024 * 1024,
            max_total_bytes: 4 * 1024 * 1024 * 1024,
            shard_count: 16,
            logging: LoggingConfig::default(),
        }
    }
}

impl RegistryConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Defaults, then the file at `path` if given, then the environment, then validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `BUFREG_MAX_BUFFER_CAPACITY`, `BUFREG_MAX_TOTAL_BYTES`, `BUFREG_SHARDS`
    /// and the logging variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    pub(crate) fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        if let Some(value) = lookup("BUFREG_MAX_BUFFER_CAPACITY") {
            self.max_buffer_capacity = parse_env("BUFREG_MAX_BUFFER_CAPACITY", &value)?;
        }
        if let Some(value) = lookup("BUFREG_MAX_TOTAL_BYTES") {
            self.max_total_bytes = parse_env("BUFREG_MAX_TOTAL_BYTES", &value)?;
        }
        if let Some(value) = lookup("BUFREG_SHARDS") {
            self.shard_count = parse_env("BUFREG_SHARDS", &value)?;
        }
        self.logging.merge_with(lookup);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.shard_count == 0 || self.shard_count > MAX_SHARDS {
            return Err(Error::config(format!(
                "shard_count must be between 1 and {}, got {}",
                MAX_SHARDS, self.shard_count
            )));
        }
        if self.max_buffer_capacity > self.max_total_bytes {
            return Err(Error::config(format!(
                "max_buffer_capacity ({}) exceeds max_total_bytes ({})",
                self.max_buffer_capacity, self.max_total_bytes
            )));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::config(format!("Invalid value for {}: '{}' ({})", name, value, e)))
}
