//! Trigger filter, scoped per `(schema, table)`.

use crate::conflict::{Category, FilterConflict};
use crate::error::FilterError;
use crate::name::{parse_schema, parse_trigger};
use crate::object::{checked, qualified};
use sift_core::cache::quote_identifier;
use std::collections::{BTreeMap, BTreeSet};

/// Which triggers of one table an entry selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerSelection {
    /// Every trigger of the table.
    All,
    Named(BTreeSet<String>),
}

impl TriggerSelection {
    pub fn contains(&self, trigger: &str) -> bool {
        match self {
            TriggerSelection::All => true,
            TriggerSelection::Named(names) => names.contains(trigger),
        }
    }
}

/// Selections per schema, then per table.
pub type TriggerMap = BTreeMap<String, BTreeMap<String, TriggerSelection>>;

/// Included and excluded triggers.
///
/// An entry `schema.table` selects every trigger of the table, an entry
/// `schema.table.trigger` a single one. This is the trigger-level test only;
/// [`crate::ScopedTriggerFilter`] also requires the table to be in scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerFilter {
    included: TriggerMap,
    excluded: TriggerMap,
}

impl TriggerFilter {
    pub fn include(&mut self, spec: &str) -> Result<(), FilterError> {
        let (schema, table, trigger) = parse_trigger(spec)?;
        insert(&mut self.included, schema, table, trigger);
        Ok(())
    }

    pub fn include_all<I, S>(&mut self, specs: I) -> Result<(), FilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        specs
            .into_iter()
            .try_for_each(|spec| self.include(spec.as_ref()))
    }

    /// Include triggers of `schema.table` by unqualified name; no names selects
    /// every trigger of the table.
    pub fn include_in<I, S>(
        &mut self,
        schema: &str,
        table: &str,
        triggers: I,
    ) -> Result<(), FilterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        insert_many(&mut self.included, schema, table, triggers)
    }

    pub fn exclude(&mut self, spec: &str) -> Result<(), FilterError> {
        let (schema, table, trigger) = parse_trigger(spec)?;
        insert(&mut self.excluded, schema, table, trigger);
        Ok(())
    }

    pub fn exclude_all<I, S>(&mut self, specs: I) -> Result<(), FilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        specs
            .into_iter()
            .try_for_each(|spec| self.exclude(spec.as_ref()))
    }

    pub fn exclude_in<I, S>(
        &mut self,
        schema: &str,
        table: &str,
        triggers: I,
    ) -> Result<(), FilterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        insert_many(&mut self.excluded, schema, table, triggers)
    }

    pub fn included(&self) -> &TriggerMap {
        &self.included
    }

    pub fn excluded(&self) -> &TriggerMap {
        &self.excluded
    }

    pub fn is_empty(&self) -> bool {
        self.included.is_empty() && self.excluded.is_empty()
    }

    /// Trigger-level test, ignoring the schema and table filters.
    pub fn is_included(&self, schema: &str, table: &str, trigger: &str) -> bool {
        !selects(&self.excluded, schema, table, trigger)
            && (self.included.is_empty() || selects(&self.included, schema, table, trigger))
    }

    pub fn conflicts(&self) -> Vec<FilterConflict> {
        let mut conflicts = Vec::new();
        for (schema, tables) in &self.included {
            for (table, selection) in tables {
                let excluded = self.excluded.get(schema).and_then(|t| t.get(table));
                match (selection, excluded) {
                    (_, None) => {}
                    (TriggerSelection::All, Some(TriggerSelection::All)) => {
                        conflicts.push(FilterConflict::IncludedAndExcluded {
                            category: Category::Triggers,
                            entry: qualified(schema, table),
                        });
                    }
                    // partially excluding an included table is a refinement
                    (TriggerSelection::All, Some(TriggerSelection::Named(_))) => {}
                    (TriggerSelection::Named(names), Some(excluded)) => {
                        for name in names.iter().filter(|n| excluded.contains(n)) {
                            conflicts.push(FilterConflict::IncludedAndExcluded {
                                category: Category::Triggers,
                                entry: trigger_entry(schema, table, name),
                            });
                        }
                    }
                }
            }
        }
        conflicts
    }

    pub fn error_on_conflicts(&self) -> bool {
        !self.conflicts().is_empty()
    }

    /// Included entries whose table is filtered out according to `table_in_scope`.
    pub(crate) fn cross_filter_conflicts_with(
        &self,
        table_in_scope: impl Fn(&str, &str) -> bool,
    ) -> Vec<FilterConflict> {
        let mut conflicts = Vec::new();
        for (schema, tables) in &self.included {
            for (table, selection) in tables {
                if table_in_scope(schema, table) {
                    continue;
                }
                let parent = format!("table {}", qualified(schema, table));
                match selection {
                    TriggerSelection::All => conflicts.push(FilterConflict::ParentFilteredOut {
                        category: Category::Triggers,
                        entry: qualified(schema, table),
                        parent,
                    }),
                    TriggerSelection::Named(names) => {
                        for name in names {
                            conflicts.push(FilterConflict::ParentFilteredOut {
                                category: Category::Triggers,
                                entry: trigger_entry(schema, table, name),
                                parent: parent.clone(),
                            });
                        }
                    }
                }
            }
        }
        conflicts
    }
}

fn insert(map: &mut TriggerMap, schema: String, table: String, trigger: Option<String>) {
    let selection = map
        .entry(schema)
        .or_default()
        .entry(table)
        .or_insert_with(|| TriggerSelection::Named(BTreeSet::new()));
    match trigger {
        None => *selection = TriggerSelection::All,
        Some(name) => {
            if let TriggerSelection::Named(names) = selection {
                names.insert(name);
            }
        }
    }
}

/// Nothing is stored unless every name is valid.
fn insert_many<I, S>(
    map: &mut TriggerMap,
    schema: &str,
    table: &str,
    triggers: I,
) -> Result<(), FilterError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let schema = parse_schema(schema)?;
    let table = checked(table.to_string())?;
    let triggers = triggers
        .into_iter()
        .map(|trigger| checked(trigger.into()))
        .collect::<Result<Vec<_>, _>>()?;

    if triggers.is_empty() {
        insert(map, schema, table, None);
        return Ok(());
    }
    for trigger in triggers {
        insert(map, schema.clone(), table.clone(), Some(trigger));
    }
    Ok(())
}

fn selects(map: &TriggerMap, schema: &str, table: &str, trigger: &str) -> bool {
    map.get(schema)
        .and_then(|tables| tables.get(table))
        .is_some_and(|selection| selection.contains(trigger))
}

fn trigger_entry(schema: &str, table: &str, trigger: &str) -> String {
    format!("{}.{}", qualified(schema, table), quote_identifier(trigger))
}
