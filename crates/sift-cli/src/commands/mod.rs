//! CLI command implementations.

pub mod check;
pub mod plan;

use anyhow::{Context, Result};
use sift_core::SiftConfig;
use sift_filter::{FilteringOptions, Filters};
use std::path::Path;

/// Load the configuration file and freeze its filters.
pub fn load(config_path: &Path) -> Result<(SiftConfig, Filters)> {
    let config = SiftConfig::from_file(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
    let filters = FilteringOptions::from_config(&config.filters)
        .context("Invalid filter in configuration")?
        .freeze();
    Ok((config, filters))
}
