//! Translation of [`Filters`] into `WHERE` fragments over catalog views.
//!
//! Two comparison strategies are used. Schema names are compared byte-exactly
//! (`STRCMP` under a binary collation) so a case-insensitive server collation
//! cannot widen a filter. Object names use plain `IN (...)` lists and so follow
//! the catalog column's collation, which reflects how the server itself treats
//! those names.
//!
//! Every category produces `(<included>) AND NOT (<excluded>)`, dropping a side
//! whose list is empty, or `TRUE` when both are.

use crate::object::{NameMatch, ObjectFilter, ObjectMap};
use crate::options::Filters;
use crate::sql::{FALSE, and_all, case_sensitive_compare, in_list, not, or_any, quote_string};
use crate::trigger::{TriggerMap, TriggerSelection};
use sift_core::Account;
use std::collections::BTreeSet;

/// Builds catalog predicates for a set of frozen filters.
#[derive(Debug, Clone, Copy)]
pub struct QueryHelper<'a> {
    filters: &'a Filters,
}

impl<'a> QueryHelper<'a> {
    pub fn new(filters: &'a Filters) -> Self {
        Self { filters }
    }

    /// Schema filter over `schema_column`.
    pub fn schema_filter(&self, schema_column: &str) -> String {
        let schemas = self.filters.schemas();
        let mut parts = Vec::new();

        if !schemas.included().is_empty() {
            parts.push(self.schema_list(schema_column, schemas.included()));
        }
        if !schemas.excluded().is_empty() {
            parts.push(not(&self.schema_list(schema_column, schemas.excluded())));
        }

        and_all(parts)
    }

    /// Object-level table filter (no schema filter).
    pub fn table_filter(&self, schema_column: &str, table_column: &str) -> String {
        self.object_filter(self.filters.tables().objects(), schema_column, table_column)
    }

    pub fn schema_and_table_filter(&self, schema_column: &str, table_column: &str) -> String {
        and_all([
            self.schema_filter(schema_column),
            self.table_filter(schema_column, table_column),
        ])
    }

    /// Object-level event filter (no schema filter).
    pub fn event_filter(&self, schema_column: &str, event_column: &str) -> String {
        self.object_filter(self.filters.events().objects(), schema_column, event_column)
    }

    pub fn schema_and_event_filter(&self, schema_column: &str, event_column: &str) -> String {
        and_all([
            self.schema_filter(schema_column),
            self.event_filter(schema_column, event_column),
        ])
    }

    /// Object-level routine filter (no schema filter).
    pub fn routine_filter(&self, schema_column: &str, routine_column: &str) -> String {
        self.object_filter(
            self.filters.routines().objects(),
            schema_column,
            routine_column,
        )
    }

    pub fn schema_and_routine_filter(&self, schema_column: &str, routine_column: &str) -> String {
        and_all([
            self.schema_filter(schema_column),
            self.routine_filter(schema_column, routine_column),
        ])
    }

    /// Trigger-level filter (no schema or table filter).
    pub fn trigger_filter(
        &self,
        schema_column: &str,
        table_column: &str,
        trigger_column: &str,
    ) -> String {
        let triggers = self.filters.triggers().triggers();
        let mut parts = Vec::new();

        if !triggers.included().is_empty() {
            parts.push(
                self.trigger_list(schema_column, table_column, trigger_column, triggers.included())
                    .unwrap_or_else(|| FALSE.to_string()),
            );
        }
        if !triggers.excluded().is_empty()
            && let Some(excluded) =
                self.trigger_list(schema_column, table_column, trigger_column, triggers.excluded())
        {
            parts.push(not(&excluded));
        }

        and_all(parts)
    }

    /// Schema, table and trigger filters combined: a trigger is only in scope
    /// when its table is.
    pub fn schema_and_trigger_filter(
        &self,
        schema_column: &str,
        table_column: &str,
        trigger_column: &str,
    ) -> String {
        and_all([
            self.schema_filter(schema_column),
            self.table_filter(schema_column, table_column),
            self.trigger_filter(schema_column, table_column, trigger_column),
        ])
    }

    /// Account filter over a `(user, host)` column pair.
    pub fn user_filter(&self, user_column: &str, host_column: &str) -> String {
        let users = self.filters.users();
        let mut parts = Vec::new();

        if !users.included().is_empty() {
            parts.push(self.account_list(user_column, host_column, users.included()));
        }
        if !users.excluded().is_empty() {
            parts.push(not(&self.account_list(
                user_column,
                host_column,
                users.excluded(),
            )));
        }

        and_all(parts)
    }

    fn schema_list<'s>(
        &self,
        schema_column: &str,
        schemas: impl IntoIterator<Item = &'s String>,
    ) -> String {
        or_any(
            schemas
                .into_iter()
                .map(|schema| case_sensitive_compare(schema_column, schema)),
        )
    }

    fn object_filter<M: NameMatch>(
        &self,
        filter: &ObjectFilter<M>,
        schema_column: &str,
        object_column: &str,
    ) -> String {
        let mut parts = Vec::new();

        if !filter.included().is_empty() {
            parts.push(
                self.object_list(schema_column, object_column, filter.included())
                    .unwrap_or_else(|| FALSE.to_string()),
            );
        }
        if !filter.excluded().is_empty()
            && let Some(excluded) =
                self.object_list(schema_column, object_column, filter.excluded())
        {
            parts.push(not(&excluded));
        }

        and_all(parts)
    }

    /// OR of `(schema matches AND object IN (...))` per schema with listed
    /// objects; `None` when no schema lists any object.
    fn object_list(
        &self,
        schema_column: &str,
        object_column: &str,
        objects: &ObjectMap,
    ) -> Option<String> {
        let clauses: Vec<String> = objects
            .iter()
            .filter(|(_, names)| !names.is_empty())
            .map(|(schema, names)| {
                and_all([
                    case_sensitive_compare(schema_column, schema),
                    in_list(object_column, names),
                ])
            })
            .collect();

        (!clauses.is_empty()).then(|| or_any(clauses))
    }

    fn trigger_list(
        &self,
        schema_column: &str,
        table_column: &str,
        trigger_column: &str,
        triggers: &TriggerMap,
    ) -> Option<String> {
        let mut clauses = Vec::new();

        for (schema, tables) in triggers {
            for (table, selection) in tables {
                let mut clause = vec![
                    case_sensitive_compare(schema_column, schema),
                    in_list(table_column, [table]),
                ];
                match selection {
                    TriggerSelection::All => {}
                    TriggerSelection::Named(names) if names.is_empty() => continue,
                    TriggerSelection::Named(names) => {
                        clause.push(in_list(trigger_column, names));
                    }
                }
                clauses.push(and_all(clause));
            }
        }

        (!clauses.is_empty()).then(|| or_any(clauses))
    }

    fn account_list(
        &self,
        user_column: &str,
        host_column: &str,
        accounts: &BTreeSet<Account>,
    ) -> String {
        or_any(accounts.iter().map(|account| {
            let user = format!("{user_column} = {}", quote_string(&account.user));
            match &account.host {
                Some(host) => and_all([user, format!("{host_column} = {}", quote_string(host))]),
                None => user,
            }
        }))
    }
}
