//! Filter lists as written in the configuration file.
//!
//! These are plain strings; `sift-filter` parses them into the filtering model
//! and reports malformed entries.

use serde::{Deserialize, Serialize};

/// Schemas that hold server internals and are never dumped by default.
pub const SYSTEM_SCHEMAS: [&str; 4] = ["information_schema", "mysql", "performance_schema", "sys"];

/// Include/exclude lists for every object category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Schema names.
    #[serde(default)]
    pub schemas: CategoryConfig,

    /// `schema.table` names. Views are filtered through this list too.
    #[serde(default)]
    pub tables: CategoryConfig,

    /// `schema.event` names.
    #[serde(default)]
    pub events: CategoryConfig,

    /// `schema.routine` names.
    #[serde(default)]
    pub routines: CategoryConfig,

    /// `schema.table` (every trigger of the table) or `schema.table.trigger`.
    #[serde(default)]
    pub triggers: CategoryConfig,

    /// Accounts: `user`, `user@host`, `'user'@'host'`.
    #[serde(default)]
    pub users: CategoryConfig,

    /// Add [`SYSTEM_SCHEMAS`] to the excluded schemas.
    #[serde(default = "default_true")]
    pub exclude_system_schemas: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            schemas: CategoryConfig::default(),
            tables: CategoryConfig::default(),
            events: CategoryConfig::default(),
            routines: CategoryConfig::default(),
            triggers: CategoryConfig::default(),
            users: CategoryConfig::default(),
            exclude_system_schemas: true,
        }
    }
}

/// Include and exclude lists of one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,
}

impl CategoryConfig {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

fn default_true() -> bool {
    true
}
