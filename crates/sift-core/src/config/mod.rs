//! Configuration types for sift.
//!
//! A single YAML file describes the upstream connection, the filters that decide
//! which objects are dumped, and which optional cache builder stages run.
//!
//! ```yaml
//! upstream:
//!   database_url_env: SIFT_DATABASE_URL
//! filters:
//!   schemas:
//!     exclude: [staging]
//!   tables:
//!     include: [shop.orders, shop.customers]
//! stages:
//!   users: true
//! ```

pub mod filters;
pub mod upstream;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use filters::{CategoryConfig, FilterConfig, SYSTEM_SCHEMAS};
pub use upstream::UpstreamConfig;

/// Complete sift configuration loaded from a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiftConfig {
    /// Upstream MySQL connection.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Include/exclude lists per object category.
    #[serde(default)]
    pub filters: FilterConfig,

    /// Optional cache builder stages.
    #[serde(default)]
    pub stages: StagesConfig,
}

/// Which optional cache builder stages to run after the structural stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagesConfig {
    /// Columns, keys and histograms of tables and views.
    #[serde(default = "default_true")]
    pub metadata: bool,

    #[serde(default = "default_true")]
    pub events: bool,

    #[serde(default = "default_true")]
    pub routines: bool,

    #[serde(default = "default_true")]
    pub triggers: bool,

    #[serde(default)]
    pub users: bool,
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            metadata: true,
            events: true,
            routines: true,
            triggers: true,
            users: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SiftConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic checks serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.port == 0 {
            return Err(ConfigError::Config("upstream.port must not be 0".to_string()));
        }
        Ok(())
    }
}
