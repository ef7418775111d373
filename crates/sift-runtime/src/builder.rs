//! Instance cache builder.
//!
//! Building happens in stages over one exclusive [`Session`]:
//!
//! 1. [`InstanceCacheBuilder::new`] reads the server identity and enumerates
//!    the schemas, tables and views that survive the filters. Only names are
//!    fetched.
//! 2. [`InstanceCacheBuilder::metadata`] fetches columns, unique keys,
//!    histograms, schema collations and view character sets for the retained
//!    objects. [`events`](InstanceCacheBuilder::events),
//!    [`routines`](InstanceCacheBuilder::routines),
//!    [`triggers`](InstanceCacheBuilder::triggers) and
//!    [`users`](InstanceCacheBuilder::users) are optional sub-stages.
//!
//! Every stage consumes the builder and returns it on success. A failed stage
//! drops the partially built state, so a cache never exposes half-populated
//! tables. A later stage can run on a cache built earlier through
//! [`InstanceCacheBuilder::from_cache`].
//!
//! Catalog queries carry the filter predicates, and every returned row is
//! checked against the filters again before it is kept.

use crate::error::BuildError;
use crate::session::{Row, Session};
use sift_core::{
    Account, Column, ColumnType, Histogram, Index, InstanceCache, Schema, ServerInfo, Table,
    Version, View,
};
use sift_filter::{Filters, QueryHelper};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// First version with `information_schema.column_statistics`.
const HISTOGRAM_VERSION: Version = Version::new(8, 0, 0);

/// First version caching table statistics in `information_schema`.
const STATS_EXPIRY_VERSION: Version = Version::new(8, 0, 3);

pub struct InstanceCacheBuilder<'a, S: Session + ?Sized> {
    session: &'a mut S,
    filters: Filters,
    cache: InstanceCache,
}

impl<'a, S: Session + ?Sized> InstanceCacheBuilder<'a, S> {
    /// Run the structural stage.
    pub async fn new(session: &'a mut S, filters: Filters) -> Result<Self, BuildError> {
        let mut builder = Self::from_cache(session, filters, InstanceCache::default());

        builder.fetch_server_info().await?;
        builder.fetch_schemas().await?;
        builder.fetch_tables().await?;

        let cache = &builder.cache;
        info!(
            schemas = cache.filtered.schemas,
            tables = cache.filtered.tables,
            views = cache.filtered.views,
            total_schemas = cache.total.schemas,
            total_tables = cache.total.tables,
            total_views = cache.total.views,
            "Enumerated instance objects"
        );

        Ok(builder)
    }

    /// Resume building on a cache produced earlier with the same filters.
    pub fn from_cache(session: &'a mut S, filters: Filters, cache: InstanceCache) -> Self {
        Self {
            session,
            filters,
            cache,
        }
    }

    pub fn cache(&self) -> &InstanceCache {
        &self.cache
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn build(self) -> InstanceCache {
        self.cache
    }

    /// Fetch per-object metadata for every retained schema, table and view.
    pub async fn metadata(mut self) -> Result<Self, BuildError> {
        if self.cache.server.version >= STATS_EXPIRY_VERSION {
            self.execute("SET SESSION information_schema_stats_expiry = 0")
                .await?;
        }

        let mut schemas = self.cache.schemas.clone();

        self.fetch_schema_collations(&mut schemas).await?;
        self.fetch_table_details(&mut schemas).await?;
        self.fetch_columns(&mut schemas).await?;
        self.fetch_unique_keys(&mut schemas).await?;
        if self.cache.server.version >= HISTOGRAM_VERSION {
            self.fetch_histograms(&mut schemas).await?;
        }
        self.fetch_view_details(&mut schemas).await?;

        self.cache.schemas = schemas;
        info!(
            tables = self.cache.filtered.tables,
            views = self.cache.filtered.views,
            "Fetched object metadata"
        );

        Ok(self)
    }

    pub async fn events(mut self) -> Result<Self, BuildError> {
        let total = self.count("information_schema.events").await?;

        let helper = QueryHelper::new(&self.filters);
        let sql = format!(
            "SELECT EVENT_SCHEMA AS event_schema, EVENT_NAME AS event_name \
             FROM information_schema.events WHERE {}",
            helper.schema_and_event_filter("EVENT_SCHEMA", "EVENT_NAME")
        );
        let rows = self.query(&sql).await?;

        let mut schemas = self.cache.schemas.clone();
        for schema in schemas.values_mut() {
            schema.events.clear();
        }

        let mut filtered = 0;
        for row in &rows {
            let schema_name = row.text("event_schema")?;
            let event = row.text("event_name")?;
            if !self.filters.events().is_included(&schema_name, &event) {
                continue;
            }
            if let Some(schema) = schemas.get_mut(&schema_name)
                && schema.events.insert(event)
            {
                filtered += 1;
            }
        }

        self.cache.schemas = schemas;
        self.cache.total.events = total;
        self.cache.filtered.events = filtered;
        info!(events = filtered, total_events = total, "Enumerated events");

        Ok(self)
    }

    pub async fn routines(mut self) -> Result<Self, BuildError> {
        let total = self.count("information_schema.routines").await?;

        let helper = QueryHelper::new(&self.filters);
        let sql = format!(
            "SELECT ROUTINE_SCHEMA AS routine_schema, ROUTINE_NAME AS routine_name, \
             ROUTINE_TYPE AS routine_type FROM information_schema.routines WHERE {}",
            helper.schema_and_routine_filter("ROUTINE_SCHEMA", "ROUTINE_NAME")
        );
        let rows = self.query(&sql).await?;

        let mut schemas = self.cache.schemas.clone();
        for schema in schemas.values_mut() {
            schema.functions.clear();
            schema.procedures.clear();
        }

        let mut filtered = 0;
        for row in &rows {
            let schema_name = row.text("routine_schema")?;
            let routine = row.text("routine_name")?;
            if !self.filters.routines().is_included(&schema_name, &routine) {
                continue;
            }
            let Some(schema) = schemas.get_mut(&schema_name) else {
                continue;
            };
            let inserted = if row.text("routine_type")?.eq_ignore_ascii_case("FUNCTION") {
                schema.functions.insert(routine)
            } else {
                schema.procedures.insert(routine)
            };
            if inserted {
                filtered += 1;
            }
        }

        self.cache.schemas = schemas;
        self.cache.total.routines = total;
        self.cache.filtered.routines = filtered;
        info!(routines = filtered, total_routines = total, "Enumerated routines");

        Ok(self)
    }

    /// Trigger names per retained table, in execution order.
    pub async fn triggers(mut self) -> Result<Self, BuildError> {
        let total = self.count("information_schema.triggers").await?;

        let helper = QueryHelper::new(&self.filters);
        let sql = format!(
            "SELECT TRIGGER_SCHEMA AS trigger_schema, EVENT_OBJECT_TABLE AS table_name, \
             TRIGGER_NAME AS trigger_name FROM information_schema.triggers WHERE {} \
             ORDER BY EVENT_OBJECT_SCHEMA, EVENT_OBJECT_TABLE, ACTION_ORDER",
            helper.schema_and_trigger_filter(
                "TRIGGER_SCHEMA",
                "EVENT_OBJECT_TABLE",
                "TRIGGER_NAME"
            )
        );
        let rows = self.query(&sql).await?;

        let mut schemas = self.cache.schemas.clone();
        for table in schemas.values_mut().flat_map(|s| s.tables.values_mut()) {
            table.triggers.clear();
        }

        let mut filtered = 0;
        for row in &rows {
            let schema_name = row.text("trigger_schema")?;
            let table_name = row.text("table_name")?;
            let trigger = row.text("trigger_name")?;
            if !self
                .filters
                .triggers()
                .is_included(&schema_name, &table_name, &trigger)
            {
                continue;
            }
            if let Some(table) = table_mut(&mut schemas, &schema_name, &table_name) {
                table.triggers.push(trigger);
                filtered += 1;
            }
        }

        self.cache.schemas = schemas;
        self.cache.total.triggers = total;
        self.cache.filtered.triggers = filtered;
        info!(triggers = filtered, total_triggers = total, "Enumerated triggers");

        Ok(self)
    }

    pub async fn users(mut self) -> Result<Self, BuildError> {
        let total = self.count("mysql.user").await?;

        let helper = QueryHelper::new(&self.filters);
        let sql = format!(
            "SELECT User AS user, Host AS host FROM mysql.user WHERE {} ORDER BY User, Host",
            helper.user_filter("User", "Host")
        );
        let rows = self.query(&sql).await?;

        let mut users = Vec::with_capacity(rows.len());
        for row in &rows {
            let account = Account::new(row.text("user")?, row.text("host")?);
            if self.filters.is_user_included(&account) {
                users.push(account);
            }
        }

        self.cache.total.users = total;
        self.cache.filtered.users = users.len() as u64;
        self.cache.users = users;
        info!(
            users = self.cache.filtered.users,
            total_users = total,
            "Enumerated users"
        );

        Ok(self)
    }

    async fn fetch_server_info(&mut self) -> Result<(), BuildError> {
        const IDENTITY: &str =
            "SELECT CURRENT_USER() AS user, @@hostname AS hostname, @@version AS version";

        let row = self.query_one(IDENTITY).await?;
        let version_string = row.text("version")?;
        let version = version_string.parse().unwrap_or_else(|e| {
            warn!(version = %version_string, error = %e, "Unrecognized server version");
            Version::default()
        });

        let identity = self.session.identity();
        let mut server = ServerInfo {
            user: row.text("user")?,
            hostname: row.text("hostname")?,
            local_hostname: local_hostname(),
            address: identity.address(),
            version_string,
            version,
            ..Default::default()
        };

        let gtid = self
            .query("SHOW GLOBAL VARIABLES LIKE 'gtid\\_executed'")
            .await?;
        server.gtid_executed = match gtid.first() {
            Some(row) => row.opt_text("Value")?.filter(|v| !v.is_empty()),
            None => None,
        };

        server.is_ndb = self.probe_ndb().await;

        debug!(
            user = %server.user,
            hostname = %server.hostname,
            version = %server.version,
            ndb = server.is_ndb,
            "Server identity"
        );
        self.cache.server = server;
        Ok(())
    }

    /// Whether the server runs NDB Cluster. A failed probe counts as "no".
    async fn probe_ndb(&mut self) -> bool {
        const PROBE: &str = "SHOW VARIABLES LIKE 'ndbinfo\\_version'";

        match self.query(PROBE).await {
            Ok(rows) => !rows.is_empty(),
            Err(e) => {
                warn!(error = %e, "Failed to check for NDB cluster, assuming it is not used");
                false
            }
        }
    }

    async fn fetch_schemas(&mut self) -> Result<(), BuildError> {
        let total = self.count("information_schema.schemata").await?;

        let helper = QueryHelper::new(&self.filters);
        let sql = format!(
            "SELECT SCHEMA_NAME AS schema_name FROM information_schema.schemata WHERE {}",
            helper.schema_filter("SCHEMA_NAME")
        );
        let rows = self.query(&sql).await?;

        let mut schemas = BTreeMap::new();
        for row in &rows {
            let name = row.text("schema_name")?;
            if self.filters.is_schema_retained(&name) {
                schemas.insert(name, Schema::default());
            }
        }

        self.cache.total.schemas = total;
        self.cache.filtered.schemas = schemas.len() as u64;
        self.cache.schemas = schemas;
        Ok(())
    }

    /// Table and view names. Views are filtered by the table filter.
    async fn fetch_tables(&mut self) -> Result<(), BuildError> {
        let total_tables = self
            .count("information_schema.tables WHERE TABLE_TYPE = 'BASE TABLE'")
            .await?;
        let total_views = self
            .count("information_schema.tables WHERE TABLE_TYPE = 'VIEW'")
            .await?;

        let helper = QueryHelper::new(&self.filters);
        let sql = format!(
            "SELECT TABLE_SCHEMA AS table_schema, TABLE_NAME AS table_name, \
             TABLE_TYPE AS table_type FROM information_schema.tables \
             WHERE TABLE_TYPE IN ('BASE TABLE', 'VIEW') AND {}",
            helper.schema_and_table_filter("TABLE_SCHEMA", "TABLE_NAME")
        );
        let rows = self.query(&sql).await?;

        let (mut tables, mut views) = (0, 0);
        for row in &rows {
            let schema_name = row.text("table_schema")?;
            let name = row.text("table_name")?;
            if !self.filters.tables().is_included(&schema_name, &name) {
                continue;
            }
            let Some(schema) = self.cache.schemas.get_mut(&schema_name) else {
                continue;
            };
            if row.text("table_type")? == "VIEW" {
                if schema.views.insert(name, View::default()).is_none() {
                    views += 1;
                }
            } else if schema.tables.insert(name, Table::default()).is_none() {
                tables += 1;
            }
        }

        self.cache.total.tables = total_tables;
        self.cache.total.views = total_views;
        self.cache.filtered.tables = tables;
        self.cache.filtered.views = views;
        Ok(())
    }

    async fn fetch_schema_collations(
        &mut self,
        schemas: &mut BTreeMap<String, Schema>,
    ) -> Result<(), BuildError> {
        let helper = QueryHelper::new(&self.filters);
        let sql = format!(
            "SELECT SCHEMA_NAME AS schema_name, DEFAULT_COLLATION_NAME AS collation \
             FROM information_schema.schemata WHERE {}",
            helper.schema_filter("SCHEMA_NAME")
        );

        for row in &self.query(&sql).await? {
            if let Some(schema) = schemas.get_mut(&row.text("schema_name")?) {
                schema.collation = row.opt_text("collation")?.unwrap_or_default();
            }
        }
        Ok(())
    }

    async fn fetch_table_details(
        &mut self,
        schemas: &mut BTreeMap<String, Schema>,
    ) -> Result<(), BuildError> {
        let helper = QueryHelper::new(&self.filters);
        let sql = format!(
            "SELECT TABLE_SCHEMA AS table_schema, TABLE_NAME AS table_name, ENGINE AS engine, \
             TABLE_COMMENT AS comment, CREATE_OPTIONS AS create_options, \
             TABLE_ROWS AS row_count, AVG_ROW_LENGTH AS average_row_length \
             FROM information_schema.tables WHERE TABLE_TYPE = 'BASE TABLE' AND {}",
            helper.schema_and_table_filter("TABLE_SCHEMA", "TABLE_NAME")
        );

        for row in &self.query(&sql).await? {
            let Some(table) = table_mut(schemas, &row.text("table_schema")?, &row.text("table_name")?)
            else {
                continue;
            };
            table.engine = row.opt_text("engine")?.unwrap_or_default();
            table.comment = row.opt_text("comment")?.unwrap_or_default();
            table.create_options = row.opt_text("create_options")?.unwrap_or_default();
            table.row_count = row.opt_u64("row_count")?.unwrap_or_default();
            table.average_row_length = row.opt_u64("average_row_length")?.unwrap_or_default();
        }
        Ok(())
    }

    /// Columns of tables and views, in ordinal order.
    async fn fetch_columns(
        &mut self,
        schemas: &mut BTreeMap<String, Schema>,
    ) -> Result<(), BuildError> {
        let helper = QueryHelper::new(&self.filters);
        let sql = format!(
            "SELECT TABLE_SCHEMA AS table_schema, TABLE_NAME AS table_name, \
             COLUMN_NAME AS column_name, DATA_TYPE AS data_type, \
             IS_NULLABLE AS is_nullable, EXTRA AS extra \
             FROM information_schema.columns WHERE {} \
             ORDER BY TABLE_SCHEMA, TABLE_NAME, ORDINAL_POSITION",
            helper.schema_and_table_filter("TABLE_SCHEMA", "TABLE_NAME")
        );
        let rows = self.query(&sql).await?;

        for schema in schemas.values_mut() {
            for table in schema.tables.values_mut() {
                table.all_columns.clear();
                table.columns.clear();
            }
            for view in schema.views.values_mut() {
                view.all_columns.clear();
            }
        }

        for row in &rows {
            let Some(schema) = schemas.get_mut(&row.text("table_schema")?) else {
                continue;
            };
            let name = row.text("table_name")?;
            let extra = row.opt_text("extra")?.unwrap_or_default().to_ascii_uppercase();
            let column = Column::new(
                row.text("column_name")?,
                ColumnType::from_data_type(&row.text("data_type")?),
                row.text("is_nullable")?.eq_ignore_ascii_case("YES"),
            )
            .generated(extra.contains("VIRTUAL GENERATED") || extra.contains("STORED GENERATED"));

            if let Some(table) = schema.tables.get_mut(&name) {
                if !column.generated {
                    table.columns.push(column.clone());
                }
                table.all_columns.push(column);
            } else if let Some(view) = schema.views.get_mut(&name) {
                view.all_columns.push(column);
            }
        }
        Ok(())
    }

    /// Primary key, primary key equivalents and nullable unique keys.
    async fn fetch_unique_keys(
        &mut self,
        schemas: &mut BTreeMap<String, Schema>,
    ) -> Result<(), BuildError> {
        let helper = QueryHelper::new(&self.filters);
        let sql = format!(
            "SELECT TABLE_SCHEMA AS table_schema, TABLE_NAME AS table_name, \
             INDEX_NAME AS index_name, COLUMN_NAME AS column_name \
             FROM information_schema.statistics WHERE NON_UNIQUE = 0 AND {} \
             ORDER BY TABLE_SCHEMA, TABLE_NAME, INDEX_NAME, SEQ_IN_INDEX",
            helper.schema_and_table_filter("TABLE_SCHEMA", "TABLE_NAME")
        );
        let rows = self.query(&sql).await?;

        // (schema, table, index) -> column names; `None` marks a functional part.
        let mut parts: Vec<((String, String, String), Vec<Option<String>>)> = Vec::new();
        for row in &rows {
            let key = (
                row.text("table_schema")?,
                row.text("table_name")?,
                row.text("index_name")?,
            );
            let column = row.opt_text("column_name")?;
            match parts.last_mut() {
                Some((last, columns)) if *last == key => columns.push(column),
                _ => parts.push((key, vec![column])),
            }
        }

        for table in schemas.values_mut().flat_map(|s| s.tables.values_mut()) {
            table.primary_key = None;
            table.primary_key_equivalents.clear();
            table.unique_keys.clear();
        }

        for ((schema_name, table_name, index_name), names) in parts {
            let Some(table) = table_mut(schemas, &schema_name, &table_name) else {
                continue;
            };
            let columns: Option<Vec<Column>> = names
                .iter()
                .map(|name| name.as_deref().and_then(|n| table.column(n)).cloned())
                .collect();
            let Some(columns) = columns else {
                debug!(
                    schema = %schema_name,
                    table = %table_name,
                    index = %index_name,
                    "Skipping functional index"
                );
                continue;
            };

            let index = Index::new(index_name, columns);
            if index.is_primary() {
                table.primary_key = Some(index);
            } else if index.has_nullable_column() {
                table.unique_keys.push(index);
            } else {
                table.primary_key_equivalents.push(index);
            }
        }
        Ok(())
    }

    async fn fetch_histograms(
        &mut self,
        schemas: &mut BTreeMap<String, Schema>,
    ) -> Result<(), BuildError> {
        let helper = QueryHelper::new(&self.filters);
        let sql = format!(
            "SELECT SCHEMA_NAME AS schema_name, TABLE_NAME AS table_name, \
             COLUMN_NAME AS column_name, JSON_LENGTH(HISTOGRAM, '$.buckets') AS buckets \
             FROM information_schema.column_statistics WHERE {} \
             ORDER BY SCHEMA_NAME, TABLE_NAME, COLUMN_NAME",
            helper.schema_and_table_filter("SCHEMA_NAME", "TABLE_NAME")
        );
        let rows = self.query(&sql).await?;

        for table in schemas.values_mut().flat_map(|s| s.tables.values_mut()) {
            table.histograms.clear();
        }

        for row in &rows {
            if let Some(table) = table_mut(schemas, &row.text("schema_name")?, &row.text("table_name")?)
            {
                table.histograms.push(Histogram {
                    column: row.text("column_name")?,
                    buckets: row.opt_u64("buckets")?.unwrap_or_default(),
                });
            }
        }
        Ok(())
    }

    async fn fetch_view_details(
        &mut self,
        schemas: &mut BTreeMap<String, Schema>,
    ) -> Result<(), BuildError> {
        let helper = QueryHelper::new(&self.filters);
        let sql = format!(
            "SELECT TABLE_SCHEMA AS table_schema, TABLE_NAME AS table_name, \
             CHARACTER_SET_CLIENT AS character_set_client, \
             COLLATION_CONNECTION AS collation_connection \
             FROM information_schema.views WHERE {}",
            helper.schema_and_table_filter("TABLE_SCHEMA", "TABLE_NAME")
        );

        for row in &self.query(&sql).await? {
            let (schema_name, view_name) = (row.text("table_schema")?, row.text("table_name")?);
            if let Some(view) = schemas
                .get_mut(&schema_name)
                .and_then(|s| s.views.get_mut(&view_name))
            {
                view.character_set_client = row.text("character_set_client")?;
                view.collation_connection = row.text("collation_connection")?;
            }
        }
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<(), BuildError> {
        debug!(sql = %sql, "Executing statement");
        self.session.execute(sql).await?;
        Ok(())
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<Row>, BuildError> {
        debug!(sql = %sql, "Running catalog query");
        let rows = self.session.query(sql).await?;
        debug!(rows = rows.len(), "Catalog query finished");
        Ok(rows)
    }

    async fn query_one(&mut self, sql: &str) -> Result<Row, BuildError> {
        self.query(sql)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BuildError::MissingRow {
                query: sql.to_string(),
            })
    }

    /// Unfiltered row count of `from` (a table, optionally with a `WHERE`).
    async fn count(&mut self, from: &str) -> Result<u64, BuildError> {
        let sql = format!("SELECT COUNT(*) AS count FROM {from}");
        let row = self.query_one(&sql).await?;
        Ok(row.u64("count")?)
    }
}

fn table_mut<'s>(
    schemas: &'s mut BTreeMap<String, Schema>,
    schema: &str,
    table: &str,
) -> Option<&'s mut Table> {
    schemas.get_mut(schema)?.tables.get_mut(table)
}

/// Name of the machine running the client, `localhost` if the OS reports
/// none or a name that is not valid UTF-8.
fn local_hostname() -> String {
    gethostname::gethostname()
        .into_string()
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
