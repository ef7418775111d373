//! # sift-runtime
//!
//! Catalog crawling and chunk planning for sift.
//!
//! - [`Session`]: the database capability the builder runs over; adapters
//!   implement it for a concrete driver
//! - [`InstanceCacheBuilder`]: builds an [`InstanceCache`](sift_core::InstanceCache)
//!   in a structural stage and optional metadata stages
//! - [`select_index`]: picks the chunking key of a cached table
//! - [`DumpPlan`]: the chosen key and chunking strategy of every cached table

pub mod builder;
pub mod error;
pub mod index;
pub mod plan;
pub mod session;

pub use builder::InstanceCacheBuilder;
pub use error::{BuildError, SessionError};
pub use index::select_index;
pub use plan::{ChunkStrategy, DumpPlan, TablePlan};
pub use session::{ConnectionIdentity, Row, Session, Value};
