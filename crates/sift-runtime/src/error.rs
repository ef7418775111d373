//! Error types for the runtime crate.

use thiserror::Error;

/// Errors reported by a [`Session`](crate::Session) or while decoding its rows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The server rejected the statement or the connection failed.
    #[error("statement failed: {message} (sql: {sql})")]
    Statement { sql: String, message: String },

    /// A row did not carry the requested column.
    #[error("result has no column {0}")]
    MissingColumn(String),

    /// A column value could not be decoded as the requested type.
    #[error("column {column}: expected {expected}, got {found}")]
    UnexpectedType {
        column: String,
        expected: &'static str,
        found: String,
    },
}

impl SessionError {
    pub fn statement(sql: impl Into<String>, message: impl std::fmt::Display) -> Self {
        SessionError::Statement {
            sql: sql.into(),
            message: message.to_string(),
        }
    }
}

/// Errors that abort a cache build stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A catalog query failed; the session error is reported unchanged.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A query that must return one row returned none.
    #[error("query returned no rows: {query}")]
    MissingRow { query: String },
}
