//! Scripted in-memory server answering the builder's catalog queries.
//!
//! Queries are recognized by the catalog table they read. `WHERE` clauses are
//! ignored: every row is returned, so the builder's own filter checks decide
//! what is kept.

#![allow(dead_code)]

use async_trait::async_trait;
use sift_filter::{Filters, FilteringOptions};
use sift_runtime::{ConnectionIdentity, Row, Session, SessionError, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NdbProbe {
    Absent,
    Present,
    Fails,
}

#[derive(Debug, Clone)]
pub struct FakeColumn {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub extra: String,
}

pub fn column(name: &str, data_type: &str, nullable: bool) -> FakeColumn {
    FakeColumn {
        name: name.into(),
        data_type: data_type.into(),
        nullable,
        extra: String::new(),
    }
}

pub fn generated(name: &str, data_type: &str) -> FakeColumn {
    FakeColumn {
        extra: "VIRTUAL GENERATED".into(),
        ..column(name, data_type, true)
    }
}

#[derive(Debug, Clone)]
pub struct FakeTable {
    pub schema: String,
    pub name: String,
    pub view: bool,
    pub engine: String,
    pub rows: u64,
    pub create_options: String,
    pub columns: Vec<FakeColumn>,
    /// Unique indexes; a `None` part is a functional key part.
    pub unique_keys: Vec<(String, Vec<Option<String>>)>,
}

pub fn table(schema: &str, name: &str, columns: Vec<FakeColumn>) -> FakeTable {
    FakeTable {
        schema: schema.into(),
        name: name.into(),
        view: false,
        engine: "InnoDB".into(),
        rows: 10,
        create_options: String::new(),
        columns,
        unique_keys: Vec::new(),
    }
}

pub fn view(schema: &str, name: &str, columns: Vec<FakeColumn>) -> FakeTable {
    FakeTable {
        view: true,
        engine: String::new(),
        rows: 0,
        ..table(schema, name, columns)
    }
}

impl FakeTable {
    pub fn key(mut self, name: &str, columns: &[&str]) -> Self {
        self.unique_keys.push((
            name.into(),
            columns.iter().map(|c| Some(c.to_string())).collect(),
        ));
        self
    }

    pub fn functional_key(mut self, name: &str) -> Self {
        self.unique_keys.push((name.into(), vec![None]));
        self
    }
}

pub struct FakeServer {
    identity: ConnectionIdentity,
    pub version: String,
    pub gtid_executed: String,
    pub ndb: NdbProbe,
    pub schemas: Vec<String>,
    pub tables: Vec<FakeTable>,
    pub events: Vec<(String, String)>,
    /// `(schema, name, FUNCTION | PROCEDURE)`
    pub routines: Vec<(String, String, String)>,
    /// `(schema, table, trigger)` in execution order.
    pub triggers: Vec<(String, String, String)>,
    pub users: Vec<(String, String)>,
    /// Any query containing this text fails.
    pub fail_on: Option<String>,
    pub executed: Vec<String>,
    pub queries: Vec<String>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self {
            identity: ConnectionIdentity::new("root", "db.test", 3306),
            version: "8.0.36".into(),
            gtid_executed: String::new(),
            ndb: NdbProbe::Absent,
            schemas: Vec::new(),
            tables: Vec::new(),
            events: Vec::new(),
            routines: Vec::new(),
            triggers: Vec::new(),
            users: Vec::new(),
            fail_on: None,
            executed: Vec::new(),
            queries: Vec::new(),
        }
    }

    /// Three user schemas plus `mysql`, with tables, a view and one of each
    /// other object kind.
    pub fn sample() -> Self {
        let mut server = Self::new();
        server.schemas = ["first", "second", "third", "mysql"]
            .into_iter()
            .map(String::from)
            .collect();

        server.tables = vec![
            table(
                "first",
                "one",
                vec![
                    column("id", "int", false),
                    column("name", "varchar", true),
                    generated("upper_name", "varchar"),
                ],
            )
            .key("PRIMARY", &["id"]),
            table(
                "first",
                "two",
                vec![column("code", "char", false), column("tag", "varchar", true)],
            )
            .key("code", &["code"])
            .key("tag", &["tag"])
            .functional_key("expr"),
            view(
                "first",
                "one_view",
                vec![column("id", "int", false), column("name", "varchar", true)],
            ),
            table("second", "one", vec![column("id", "bigint", false)]),
            table("third", "one", vec![column("id", "int", false)]),
            table("third", "two", vec![column("id", "int", false)]),
            table("mysql", "user", vec![column("User", "char", false)]),
        ];

        server.events = vec![
            ("first".into(), "nightly".into()),
            ("second".into(), "hourly".into()),
        ];
        server.routines = vec![
            ("first".into(), "Calc".into(), "FUNCTION".into()),
            ("first".into(), "load".into(), "PROCEDURE".into()),
            ("third".into(), "calc".into(), "FUNCTION".into()),
        ];
        server.triggers = vec![
            ("first".into(), "one".into(), "before_ins".into()),
            ("first".into(), "one".into(), "after_ins".into()),
            ("first".into(), "two".into(), "audit".into()),
            ("second".into(), "one".into(), "audit".into()),
        ];
        server.users = vec![
            ("root".into(), "localhost".into()),
            ("app".into(), "%".into()),
            ("app".into(), "10.0.0.1".into()),
            ("mysql.sys".into(), "localhost".into()),
        ];
        server
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.into();
        self
    }

    pub fn failing_on(mut self, pattern: &str) -> Self {
        self.fail_on = Some(pattern.into());
        self
    }

    pub fn ran(&self, pattern: &str) -> bool {
        self.queries.iter().any(|q| q.contains(pattern))
            || self.executed.iter().any(|q| q.contains(pattern))
    }

    fn answer(&self, sql: &str) -> Vec<Row> {
        if sql.starts_with("SELECT CURRENT_USER()") {
            return vec![Row::from_pairs([
                ("user", Value::from("root@%")),
                ("hostname", Value::from("db-host")),
                ("version", Value::from(self.version.as_str())),
            ])];
        }
        if sql.contains("gtid") {
            return vec![Row::from_pairs([
                ("Variable_name", Value::from("gtid_executed")),
                ("Value", Value::from(self.gtid_executed.as_str())),
            ])];
        }
        if sql.contains("ndbinfo") {
            return match self.ndb {
                NdbProbe::Present => vec![Row::from_pairs([
                    ("Variable_name", Value::from("ndbinfo_version")),
                    ("Value", Value::from("524308")),
                ])],
                _ => Vec::new(),
            };
        }
        if sql.contains("COUNT(*)") {
            return vec![Row::from_pairs([("count", Value::UInt(self.count(sql)))])];
        }
        if sql.contains("information_schema.schemata") {
            return self
                .schemas
                .iter()
                .map(|s| {
                    Row::from_pairs([
                        ("schema_name", Value::from(s.as_str())),
                        ("collation", Value::from("utf8mb4_0900_ai_ci")),
                    ])
                })
                .collect();
        }
        if sql.contains("information_schema.tables") && sql.contains("ENGINE") {
            return self
                .tables
                .iter()
                .filter(|t| !t.view)
                .map(|t| {
                    Row::from_pairs([
                        ("table_schema", Value::from(t.schema.as_str())),
                        ("table_name", Value::from(t.name.as_str())),
                        ("engine", Value::from(t.engine.as_str())),
                        ("comment", Value::from("")),
                        ("create_options", Value::from(t.create_options.as_str())),
                        ("row_count", Value::UInt(t.rows)),
                        ("average_row_length", Value::Null),
                    ])
                })
                .collect();
        }
        if sql.contains("information_schema.tables") {
            return self
                .tables
                .iter()
                .map(|t| {
                    Row::from_pairs([
                        ("table_schema", Value::from(t.schema.as_str())),
                        ("table_name", Value::from(t.name.as_str())),
                        (
                            "table_type",
                            Value::from(if t.view { "VIEW" } else { "BASE TABLE" }),
                        ),
                    ])
                })
                .collect();
        }
        if sql.contains("information_schema.columns") {
            return self
                .tables
                .iter()
                .flat_map(|t| {
                    t.columns.iter().map(move |c| {
                        Row::from_pairs([
                            ("table_schema", Value::from(t.schema.as_str())),
                            ("table_name", Value::from(t.name.as_str())),
                            ("column_name", Value::from(c.name.as_str())),
                            ("data_type", Value::from(c.data_type.as_str())),
                            (
                                "is_nullable",
                                Value::from(if c.nullable { "YES" } else { "NO" }),
                            ),
                            ("extra", Value::from(c.extra.as_str())),
                        ])
                    })
                })
                .collect();
        }
        if sql.contains("information_schema.statistics") {
            return self
                .tables
                .iter()
                .flat_map(|t| {
                    t.unique_keys.iter().flat_map(move |(index, parts)| {
                        parts.iter().map(move |part| {
                            Row::from_pairs([
                                ("table_schema", Value::from(t.schema.as_str())),
                                ("table_name", Value::from(t.name.as_str())),
                                ("index_name", Value::from(index.as_str())),
                                ("column_name", Value::from(part.as_deref())),
                            ])
                        })
                    })
                })
                .collect();
        }
        if sql.contains("information_schema.column_statistics") {
            return vec![Row::from_pairs([
                ("schema_name", Value::from("first")),
                ("table_name", Value::from("one")),
                ("column_name", Value::from("name")),
                ("buckets", Value::Int(64)),
            ])];
        }
        if sql.contains("information_schema.views") {
            return self
                .tables
                .iter()
                .filter(|t| t.view)
                .map(|t| {
                    Row::from_pairs([
                        ("table_schema", Value::from(t.schema.as_str())),
                        ("table_name", Value::from(t.name.as_str())),
                        ("character_set_client", Value::from("utf8mb4")),
                        ("collation_connection", Value::from("utf8mb4_0900_ai_ci")),
                    ])
                })
                .collect();
        }
        if sql.contains("information_schema.events") {
            return self
                .events
                .iter()
                .map(|(s, e)| {
                    Row::from_pairs([
                        ("event_schema", Value::from(s.as_str())),
                        ("event_name", Value::from(e.as_str())),
                    ])
                })
                .collect();
        }
        if sql.contains("information_schema.routines") {
            return self
                .routines
                .iter()
                .map(|(s, r, kind)| {
                    Row::from_pairs([
                        ("routine_schema", Value::from(s.as_str())),
                        ("routine_name", Value::from(r.as_str())),
                        ("routine_type", Value::from(kind.as_str())),
                    ])
                })
                .collect();
        }
        if sql.contains("information_schema.triggers") {
            return self
                .triggers
                .iter()
                .map(|(s, t, g)| {
                    Row::from_pairs([
                        ("trigger_schema", Value::from(s.as_str())),
                        ("table_name", Value::from(t.as_str())),
                        ("trigger_name", Value::from(g.as_str())),
                    ])
                })
                .collect();
        }
        if sql.contains("mysql.user") {
            return self
                .users
                .iter()
                .map(|(u, h)| {
                    Row::from_pairs([
                        ("user", Value::from(u.as_str())),
                        ("host", Value::from(h.as_str())),
                    ])
                })
                .collect();
        }
        Vec::new()
    }

    fn count(&self, sql: &str) -> u64 {
        let n = if sql.contains("information_schema.schemata") {
            self.schemas.len()
        } else if sql.contains("information_schema.tables") {
            let views = sql.contains("'VIEW'");
            self.tables.iter().filter(|t| t.view == views).count()
        } else if sql.contains("information_schema.events") {
            self.events.len()
        } else if sql.contains("information_schema.routines") {
            self.routines.len()
        } else if sql.contains("information_schema.triggers") {
            self.triggers.len()
        } else if sql.contains("mysql.user") {
            self.users.len()
        } else {
            0
        };
        n as u64
    }

    fn check_failure(&self, sql: &str) -> Result<(), SessionError> {
        match &self.fail_on {
            Some(pattern) if sql.contains(pattern.as_str()) => {
                Err(SessionError::statement(sql, "Lost connection to MySQL server"))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Session for FakeServer {
    async fn execute(&mut self, sql: &str) -> Result<(), SessionError> {
        self.check_failure(sql)?;
        self.executed.push(sql.to_string());
        Ok(())
    }

    async fn query(&mut self, sql: &str) -> Result<Vec<Row>, SessionError> {
        self.check_failure(sql)?;
        self.queries.push(sql.to_string());
        Ok(self.answer(sql))
    }

    fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }
}

/// Frozen filters built from a closure over the mutable options.
pub fn filters(configure: impl FnOnce(&mut FilteringOptions)) -> Filters {
    let mut options = FilteringOptions::new();
    configure(&mut options);
    options.freeze()
}
