//! The database session capability consumed by the cache builder.
//!
//! A session is one exclusive logical connection. Implementations live in
//! adapter crates; the builder only needs to run statements, run queries and
//! report who it is connected as.

use crate::error::SessionError;
use async_trait::async_trait;
use std::fmt;

/// Who the session is connected as, as configured on the client side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionIdentity {
    pub user: String,
    pub host: String,
    pub port: u16,
}

impl ConnectionIdentity {
    pub fn new(user: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
            port,
        }
    }

    /// `host:port`, as recorded in the server identity.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[async_trait]
pub trait Session: Send {
    /// Run a statement that produces no result set.
    async fn execute(&mut self, sql: &str) -> Result<(), SessionError>;

    /// Run a query and collect all of its rows.
    async fn query(&mut self, sql: &str) -> Result<Vec<Row>, SessionError>;

    fn identity(&self) -> &ConnectionIdentity;
}

/// A single column value.
///
/// Catalog queries only need text and integers; anything else is handed over
/// as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Int(i64),
    UInt(u64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Int(_) => "integer",
            Value::UInt(_) => "unsigned integer",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int(n) => write!(f, "{n}"),
            Value::UInt(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::UInt(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// One result row; columns are looked up by name, ignoring ASCII case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let (columns, values) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, column: &str) -> Result<&Value, SessionError> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|idx| self.values.get(idx))
            .ok_or_else(|| SessionError::MissingColumn(column.to_string()))
    }

    /// Text value; integers are rendered, NULL is `None`.
    pub fn opt_text(&self, column: &str) -> Result<Option<String>, SessionError> {
        match self.get(column)? {
            Value::Null => Ok(None),
            value => Ok(Some(value.to_string())),
        }
    }

    pub fn text(&self, column: &str) -> Result<String, SessionError> {
        self.opt_text(column)?
            .ok_or_else(|| unexpected(column, "text", &Value::Null))
    }

    /// Non-negative integer; numeric text is parsed, NULL is `None`.
    pub fn opt_u64(&self, column: &str) -> Result<Option<u64>, SessionError> {
        let value = self.get(column)?;
        match value {
            Value::Null => Ok(None),
            Value::UInt(n) => Ok(Some(*n)),
            Value::Int(n) => u64::try_from(*n)
                .map(Some)
                .map_err(|_| unexpected(column, "unsigned integer", value)),
            Value::Text(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| unexpected(column, "unsigned integer", value)),
            Value::Bytes(b) => std::str::from_utf8(b)
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .map(Some)
                .ok_or_else(|| unexpected(column, "unsigned integer", value)),
        }
    }

    pub fn u64(&self, column: &str) -> Result<u64, SessionError> {
        self.opt_u64(column)?
            .ok_or_else(|| unexpected(column, "unsigned integer", &Value::Null))
    }
}

fn unexpected(column: &str, expected: &'static str, found: &Value) -> SessionError {
    SessionError::UnexpectedType {
        column: column.to_string(),
        expected,
        found: found.kind().to_string(),
    }
}
