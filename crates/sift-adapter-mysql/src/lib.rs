//! MySQL [`Session`] over one exclusive `sqlx` connection.
//!
//! Statements go through the text protocol (`raw_sql`), which accepts every
//! `SHOW`/`SET` statement the builder issues. Column values are decoded as
//! text where the server type allows it, then as signed or unsigned integers,
//! then as raw bytes.

use async_trait::async_trait;
use sift_core::UpstreamConfig;
use sift_runtime::{ConnectionIdentity, Row, Session, SessionError, Value};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, ConnectOptions, Connection, Executor, Row as _, ValueRef};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

pub struct MySqlSession {
    conn: MySqlConnection,
    identity: ConnectionIdentity,
}

impl MySqlSession {
    /// Open a connection as described by the upstream configuration.
    pub async fn connect(config: &UpstreamConfig) -> Result<Self, SessionError> {
        let url = config.connection_string();
        let options = MySqlConnectOptions::from_str(&url)
            .map_err(|e| SessionError::statement("<connect>", e))?;
        let identity = ConnectionIdentity::new(
            options.get_username(),
            options.get_host(),
            options.get_port(),
        );

        let timeout = Duration::from_secs(u64::from(config.connect_timeout_seconds));
        let conn = tokio::time::timeout(timeout, options.connect())
            .await
            .map_err(|_| {
                SessionError::statement(
                    "<connect>",
                    format!("timed out after {}s", config.connect_timeout_seconds),
                )
            })?
            .map_err(|e| SessionError::statement("<connect>", e))?;

        info!(address = %identity.address(), user = %identity.user, "Connected to MySQL");
        Ok(Self::from_connection(conn, identity))
    }

    pub fn from_connection(conn: MySqlConnection, identity: ConnectionIdentity) -> Self {
        Self { conn, identity }
    }

    pub async fn close(self) -> Result<(), SessionError> {
        self.conn
            .close()
            .await
            .map_err(|e| SessionError::statement("<close>", e))
    }
}

#[async_trait]
impl Session for MySqlSession {
    async fn execute(&mut self, sql: &str) -> Result<(), SessionError> {
        Executor::execute(&mut self.conn, sqlx::raw_sql(sql))
            .await
            .map_err(|e| SessionError::statement(sql, e))?;
        Ok(())
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<Row>, SessionError> {
        let rows = Executor::fetch_all(&mut self.conn, sqlx::raw_sql(sql))
            .await
            .map_err(|e| SessionError::statement(sql, e))?;
        debug!(rows = rows.len(), "Fetched rows");

        rows.iter().map(|row| convert_row(sql, row)).collect()
    }

    fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }
}

fn convert_row(sql: &str, row: &MySqlRow) -> Result<Row, SessionError> {
    let columns: Vec<String> = row.columns().iter().map(|c| c.name().to_string()).collect();
    let values = (0..columns.len())
        .map(|i| convert_value(sql, row, i))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Row::new(columns, values))
}

fn convert_value(sql: &str, row: &MySqlRow, index: usize) -> Result<Value, SessionError> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| SessionError::statement(sql, e))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    if let Ok(Some(text)) = row.try_get::<Option<String>, _>(index) {
        return Ok(Value::Text(text));
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(index) {
        return Ok(Value::Int(n));
    }
    if let Ok(Some(n)) = row.try_get::<Option<u64>, _>(index) {
        return Ok(Value::UInt(n));
    }
    row.try_get::<Vec<u8>, _>(index)
        .map(Value::Bytes)
        .map_err(|e| SessionError::UnexpectedType {
            column: row
                .columns()
                .get(index)
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            expected: "text, integer or bytes",
            found: e.to_string(),
        })
}
