use serde::{Deserialize, Serialize};
use std::fmt;

/// A MySQL account: `'user'@'host'`.
///
/// A missing host is only meaningful in filters, where it stands for every host
/// of the user. Accounts read from the server always carry a host.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Account {
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl Account {
    pub fn new(user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: Some(host.into()),
        }
    }

    /// Account matching every host of `user`.
    pub fn any_host(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            host: None,
        }
    }

    /// Whether this account (used as a filter entry) covers `other`.
    pub fn covers(&self, other: &Account) -> bool {
        if self.user != other.user {
            return false;
        }
        match (&self.host, &other.host) {
            (None, _) => true,
            (Some(mine), Some(theirs)) => mine == theirs,
            (Some(_), None) => false,
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quote = |s: &str| s.replace('\\', "\\\\").replace('\'', "\\'");
        match &self.host {
            Some(host) => write!(f, "'{}'@'{}'", quote(&self.user), quote(host)),
            None => write!(f, "'{}'", quote(&self.user)),
        }
    }
}
