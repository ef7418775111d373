//! Upstream database configuration types.
//!
//! Three configuration methods are supported:
//! 1. `database_url_env` - reference an environment variable
//! 2. `database_url` - provide the URL directly
//! 3. Individual fields (host, port, username, password)

use serde::{Deserialize, Serialize};

/// Configuration for the upstream MySQL connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Environment variable name containing the connection URL.
    /// Highest precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url_env: Option<String>,

    /// Full connection URL, e.g. `mysql://root@localhost:3306`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable containing the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    /// Seconds to wait for the connection to be established.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            database_url_env: None,
            database_url: None,
            host: default_host(),
            port: default_port(),
            username: default_username(),
            password: None,
            password_env: None,
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl UpstreamConfig {
    /// Build a MySQL connection URL from this configuration.
    ///
    /// Precedence:
    /// 1. database_url_env (environment variable)
    /// 2. database_url (direct URL)
    /// 3. Individual fields
    pub fn connection_string(&self) -> String {
        if let Some(env_var) = &self.database_url_env
            && let Ok(url) = std::env::var(env_var)
        {
            return url;
        }

        if let Some(url) = &self.database_url {
            return url.clone();
        }

        match self.get_password() {
            Some(password) => format!(
                "mysql://{}:{}@{}:{}",
                self.username, password, self.host, self.port
            ),
            None => format!("mysql://{}@{}:{}", self.username, self.host, self.port),
        }
    }

    /// Get the password, checking password_env first.
    fn get_password(&self) -> Option<String> {
        if let Some(env_var) = &self.password_env
            && let Ok(password) = std::env::var(env_var)
        {
            return Some(password);
        }
        self.password.clone()
    }

    /// `host:port` as configured, used for logging and server identity.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_username() -> String {
    "root".to_string()
}

fn default_connect_timeout() -> u32 {
    10
}
