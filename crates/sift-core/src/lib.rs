//! # sift-core
//!
//! Value types shared by every sift crate:
//!
//! - [`cache`]: the instance cache produced by the cache builder and consumed by
//!   the extraction and checksum pipelines
//! - [`column`]: classification of MySQL column types
//! - [`version`]: server version parsing and comparison
//! - [`config`]: YAML configuration (connection, filters, stages)

pub mod account;
pub mod cache;
pub mod column;
pub mod config;
pub mod version;

pub use account::Account;
pub use cache::{
    Column, Histogram, Index, InstanceCache, ObjectStats, Schema, ServerInfo, Stats, Table, View,
};
pub use column::ColumnType;
pub use config::{ConfigError, FilterConfig, SiftConfig, StagesConfig, UpstreamConfig};
pub use version::Version;
