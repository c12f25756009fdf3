//! Configuration loading functionality
//!
//! This module turns a YAML file or an in-memory buffer into a validated
//! [`Config`]. Parser messages are preserved so the host can show them as-is.

use std::fs;
use std::path::Path;

use log::debug;

use crate::config::error::{ConfigError, Result};
use crate::config::types::Config;
use crate::config::validator::validate_config;

/// Trait for loading configuration from different sources
pub trait ConfigLoader: Send + Sync {
    /// Load configuration from a file
    fn parse_path(&self, path: &Path) -> Result<Config>;

    /// Load configuration from raw bytes
    fn parse_bytes(&self, bytes: &[u8]) -> Result<Config>;
}

/// YAML configuration loader
#[derive(Debug, Clone, Copy)]
pub struct YamlLoader {
    validate: bool,
}

impl YamlLoader {
    /// Create a loader that runs semantic validation after parsing
    pub fn new() -> Self {
        Self { validate: true }
    }

    /// Skip semantic validation (syntax errors are still reported)
    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    fn parse(&self, bytes: &[u8]) -> Result<Config> {
        let config: Config = serde_yml::from_slice(bytes)?;

        if self.validate {
            validate_config(&config)?;
        }

        debug!(
            "Parsed configuration with {} proxies, {} groups and {} rules",
            config.proxies.len(),
            config.proxy_groups.len(),
            config.rules.len()
        );

        Ok(config)
    }
}

impl Default for YamlLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader for YamlLoader {
    fn parse_path(&self, path: &Path) -> Result<Config> {
        debug!("Loading configuration from file: {}", path.display());

        let content = fs::read(path).map_err(|e| ConfigError::from_io(path, e))?;
        if is_blank(&content) {
            return Err(ConfigError::Empty(Some(path.to_path_buf())));
        }

        self.parse(&content)
    }

    fn parse_bytes(&self, bytes: &[u8]) -> Result<Config> {
        if is_blank(bytes) {
            return Err(ConfigError::Empty(None));
        }

        self.parse(bytes)
    }
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}
