//! Error types for the filter crate.

use thiserror::Error;

/// Errors raised while populating filters.
///
/// These are raised synchronously by `include`/`exclude`; a built filter never
/// fails at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// An account specification could not be parsed.
    #[error("invalid account '{spec}': {reason}")]
    InvalidAccount { spec: String, reason: String },

    /// A (qualified) object name could not be parsed.
    #[error("invalid object name '{spec}': {reason}")]
    InvalidName { spec: String, reason: String },

    /// A schema wildcard pattern could not be compiled.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl FilterError {
    pub(crate) fn invalid_name(spec: &str, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_account(spec: &str, reason: impl Into<String>) -> Self {
        Self::InvalidAccount {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }
}
