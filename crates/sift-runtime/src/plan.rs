//! Dump plan: the chunking key chosen for every cached table.

use crate::index::select_index;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sift_core::{InstanceCache, ObjectStats, Table};

/// How a table is split for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    /// Ranges over the chosen index columns.
    Ranged,
    /// No usable index: the table is read as a single chunk.
    Single,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablePlan {
    pub schema: String,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// Quoted column names of the chosen index.
    pub columns: Vec<String>,
    /// The index is a primary key or has no nullable column.
    pub unique: bool,
    pub strategy: ChunkStrategy,
    pub row_count: u64,
    pub partitioned: bool,
}

impl TablePlan {
    pub fn for_table(schema: &str, name: &str, table: &Table) -> Self {
        let (index, unique) = select_index(table);
        Self {
            schema: schema.to_string(),
            table: name.to_string(),
            index: index.map(|i| i.name.clone()),
            columns: index
                .map(|i| i.columns.iter().map(|c| c.quoted_name.clone()).collect())
                .unwrap_or_default(),
            unique,
            strategy: if index.is_some() {
                ChunkStrategy::Ranged
            } else {
                ChunkStrategy::Single
            },
            row_count: table.row_count,
            partitioned: table.is_partitioned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpPlan {
    pub captured_at: DateTime<Utc>,
    pub server_version: String,
    pub stats: ObjectStats,
    pub tables: Vec<TablePlan>,
}

impl DumpPlan {
    pub fn from_cache(cache: &InstanceCache) -> Self {
        Self {
            captured_at: Utc::now(),
            server_version: cache.server.version_string.clone(),
            stats: ObjectStats::from(cache),
            tables: cache
                .tables()
                .map(|(schema, name, table)| TablePlan::for_table(schema, name, table))
                .collect(),
        }
    }

    /// Tables without a usable chunking key.
    pub fn unchunked(&self) -> impl Iterator<Item = &TablePlan> {
        self.tables
            .iter()
            .filter(|t| t.strategy == ChunkStrategy::Single)
    }
}
