//! Advisory conflict reports.
//!
//! Conflicts never change how a filter evaluates (exclusion always wins), they
//! only point at configuration that is probably not what the user meant.

use serde::Serialize;
use std::fmt;

/// Object category a filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Users,
    Schemas,
    Tables,
    Events,
    Routines,
    Triggers,
}

impl Category {
    /// Singular noun used in messages.
    pub fn noun(self) -> &'static str {
        match self {
            Category::Users => "user",
            Category::Schemas => "schema",
            Category::Tables => "table",
            Category::Events => "event",
            Category::Routines => "routine",
            Category::Triggers => "trigger",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Users => "users",
            Category::Schemas => "schemas",
            Category::Tables => "tables",
            Category::Events => "events",
            Category::Routines => "routines",
            Category::Triggers => "triggers",
        })
    }
}

/// A suspicious combination of include and exclude entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterConflict {
    /// The same entry is both included and excluded.
    IncludedAndExcluded { category: Category, entry: String },

    /// An explicitly included object whose parent is filtered out, so the
    /// include can never take effect.
    ParentFilteredOut {
        category: Category,
        entry: String,
        parent: String,
    },
}

impl FilterConflict {
    pub fn category(&self) -> Category {
        match self {
            FilterConflict::IncludedAndExcluded { category, .. }
            | FilterConflict::ParentFilteredOut { category, .. } => *category,
        }
    }
}

impl fmt::Display for FilterConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterConflict::IncludedAndExcluded { category, entry } => write!(
                f,
                "Both include and exclude options contain the {} {}",
                category.noun(),
                entry
            ),
            FilterConflict::ParentFilteredOut {
                category,
                entry,
                parent,
            } => write!(
                f,
                "The {} {} is included, but {} is filtered out",
                category.noun(),
                entry,
                parent
            ),
        }
    }
}
