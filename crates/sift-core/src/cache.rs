//! The instance cache.
//!
//! A snapshot of the server catalog restricted to the objects that survive the
//! active filters. The cache builder fills it in two stages: object names first,
//! then per-object metadata (columns, keys, histograms). Once built it is handed
//! to the extraction and checksum pipelines read-only.

use crate::account::Account;
use crate::column::ColumnType;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Complete cache of one server instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceCache {
    pub server: ServerInfo,
    pub schemas: BTreeMap<String, Schema>,
    pub users: Vec<Account>,
    /// Object counts on the server, before filtering.
    pub total: Stats,
    /// Object counts retained in this cache.
    pub filtered: Stats,
}

impl InstanceCache {
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn table(&self, schema: &str, table: &str) -> Option<&Table> {
        self.schemas.get(schema)?.tables.get(table)
    }

    pub fn view(&self, schema: &str, view: &str) -> Option<&View> {
        self.schemas.get(schema)?.views.get(view)
    }

    /// All cached tables as `(schema, table name, table)`, in name order.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &str, &Table)> {
        self.schemas.iter().flat_map(|(schema_name, schema)| {
            schema
                .tables
                .iter()
                .map(move |(name, table)| (schema_name.as_str(), name.as_str(), table))
        })
    }
}

/// Identity of the server the cache was built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Account of the session, as reported by `CURRENT_USER()`.
    pub user: String,
    /// `@@hostname` of the server.
    pub hostname: String,
    /// Host name of the machine running the dump.
    pub local_hostname: String,
    /// `host:port` the session is connected to.
    pub address: String,
    /// Full `@@version` string.
    pub version_string: String,
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gtid_executed: Option<String>,
    /// Whether the instance is part of an NDB cluster.
    pub is_ndb: bool,
}

/// A schema and the objects retained in it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub tables: BTreeMap<String, Table>,
    pub views: BTreeMap<String, View>,
    /// Default collation; empty until the metadata stage runs.
    #[serde(default)]
    pub collation: String,
    pub events: BTreeSet<String>,
    pub functions: BTreeSet<String>,
    pub procedures: BTreeSet<String>,
}

/// A base table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub engine: String,
    pub comment: String,
    pub create_options: String,
    /// Estimated row count from the table statistics.
    pub row_count: u64,
    pub average_row_length: u64,
    /// Every column in ordinal order, generated ones included.
    pub all_columns: Vec<Column>,
    /// Columns that carry data, i.e. `all_columns` without generated columns.
    pub columns: Vec<Column>,
    pub primary_key: Option<Index>,
    /// Unique keys whose columns are all `NOT NULL`.
    pub primary_key_equivalents: Vec<Index>,
    /// Unique keys with at least one nullable column.
    pub unique_keys: Vec<Index>,
    pub histograms: Vec<Histogram>,
    /// Trigger names in execution order.
    pub triggers: Vec<String>,
}

impl Table {
    pub fn is_partitioned(&self) -> bool {
        self.create_options.contains("partitioned")
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.all_columns.iter().find(|c| c.name == name)
    }
}

/// A view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub character_set_client: String,
    pub collation_connection: String,
    pub all_columns: Vec<Column>,
}

/// One column of a table or view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Backtick-quoted name, ready to be embedded in SQL.
    pub quoted_name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub nullable: bool,
    /// Binary, spatial and bit columns cannot be written as plain delimited text.
    pub unsafe_for_text: bool,
    pub generated: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType, nullable: bool) -> Self {
        let name = name.into();
        Self {
            quoted_name: quote_identifier(&name),
            unsafe_for_text: column_type.is_unsafe_for_text(),
            name,
            column_type,
            nullable,
            generated: false,
        }
    }

    pub fn generated(mut self, generated: bool) -> Self {
        self.generated = generated;
        self
    }
}

/// A unique index, as an ordered list of its columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Index {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.name == "PRIMARY"
    }

    /// Comma separated, quoted column list.
    pub fn columns_sql(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.quoted_name.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn has_nullable_column(&self) -> bool {
        self.columns.iter().any(|c| c.nullable)
    }
}

/// Histogram statistics of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    pub column: String,
    pub buckets: u64,
}

/// Object counts per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub schemas: u64,
    pub tables: u64,
    pub views: u64,
    pub events: u64,
    pub routines: u64,
    pub triggers: u64,
    pub users: u64,
}

impl Stats {
    /// Whether every count is at most the matching count in `other`.
    pub fn bounded_by(&self, other: &Stats) -> bool {
        self.schemas <= other.schemas
            && self.tables <= other.tables
            && self.views <= other.views
            && self.events <= other.events
            && self.routines <= other.routines
            && self.triggers <= other.triggers
            && self.users <= other.users
    }
}

/// Wrap an identifier in backticks, doubling embedded backticks.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Total and filtered counts side by side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectStats {
    pub total: Stats,
    pub filtered: Stats,
}

impl From<&InstanceCache> for ObjectStats {
    fn from(cache: &InstanceCache) -> Self {
        Self {
            total: cache.total,
            filtered: cache.filtered,
        }
    }
}
