//! # sift-filter
//!
//! Object filtering for sift.
//!
//! This crate provides:
//! - Include/exclude filters for accounts, schemas, tables, events, routines
//!   and triggers, parsed from qualified names such as `` `db`.`t` ``
//! - Detection of contradictory entries within a category and across parent
//!   scopes ([`FilterConflict`])
//! - Translation of the filters into `WHERE` fragments over the
//!   `information_schema` views ([`QueryHelper`])
//!
//! ## Lifecycle
//!
//! Entries are collected into [`FilteringOptions`], usually from the `filters`
//! section of the configuration file. [`FilteringOptions::freeze`] then
//! produces [`Filters`], which is immutable and cheap to clone:
//!
//! ```text
//! schemas ─┬─> tables ──> triggers
//!          ├─> events
//!          └─> routines
//! ```
//!
//! A child scope only admits an object when its parent scope admits the
//! containing schema (or table).

pub mod account;
pub mod conflict;
pub mod error;
pub mod name;
pub mod object;
pub mod options;
pub mod predicate;
pub mod schema;
pub mod sql;
pub mod trigger;
pub mod user;

pub use account::parse_account;
pub use conflict::{Category, FilterConflict};
pub use error::FilterError;
pub use object::{CaseInsensitiveMatch, ExactMatch, NameMatch, ObjectFilter};
pub use options::{FilteringOptions, Filters, ScopedObjectFilter, ScopedTriggerFilter};
pub use predicate::QueryHelper;
pub use schema::SchemaFilter;
pub use trigger::{TriggerFilter, TriggerSelection};
pub use user::UserFilter;
