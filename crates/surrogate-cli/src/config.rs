//! Demo configuration (surrogate.toml)
//!
//! Describes the simulated database the `trace` command runs against.
//! Every field has a default; command line flags override file values.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading the demo configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Demo configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DemoConfig {
    /// Name printed by the simulated database
    #[serde(default = "default_label")]
    pub label: String,

    /// Simulated latency of each query, in milliseconds
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,

    /// Queries to run when none are given on the command line
    #[serde(default = "default_queries")]
    pub queries: Vec<String>,
}

fn default_label() -> String {
    "Database".to_string()
}

fn default_latency_ms() -> u64 {
    100
}

fn default_queries() -> Vec<String> {
    vec![
        "SELECT * FROM users;".to_string(),
        "SELECT * FROM products;".to_string(),
    ]
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            label: default_label(),
            latency_ms: default_latency_ms(),
            queries: default_queries(),
        }
    }
}

impl DemoConfig {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: DemoConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.label.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "label cannot be empty".to_string(),
            ));
        }

        if let Some(i) = self.queries.iter().position(|q| q.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "query #{} is empty",
                i + 1
            )));
        }

        Ok(())
    }

    /// Apply command line overrides
    pub fn with_overrides(mut self, latency_ms: Option<u64>, queries: Vec<String>) -> Self {
        if let Some(latency_ms) = latency_ms {
            self.latency_ms = latency_ms;
        }
        if !queries.is_empty() {
            self.queries = queries;
        }
        self
    }
}
