//! Schema-scoped object filters (tables, events, routines).

use crate::conflict::{Category, FilterConflict};
use crate::error::FilterError;
use crate::name::{parse_object, parse_schema};
use crate::schema::SchemaFilter;
use sift_core::cache::quote_identifier;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::marker::PhantomData;

/// How object names are compared inside a schema.
pub trait NameMatch: Debug + Clone + Send + Sync + 'static {
    fn matches(entry: &str, name: &str) -> bool;

    fn contains(set: &BTreeSet<String>, name: &str) -> bool {
        set.iter().any(|entry| Self::matches(entry, name))
    }
}

/// Byte-exact names: tables, views, events, triggers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatch;

impl NameMatch for ExactMatch {
    fn matches(entry: &str, name: &str) -> bool {
        entry == name
    }

    fn contains(set: &BTreeSet<String>, name: &str) -> bool {
        set.contains(name)
    }
}

/// Routine names, which MySQL compares case-insensitively on every platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseInsensitiveMatch;

impl NameMatch for CaseInsensitiveMatch {
    fn matches(entry: &str, name: &str) -> bool {
        entry.to_lowercase() == name.to_lowercase()
    }
}

/// Object names per schema.
pub type ObjectMap = BTreeMap<String, BTreeSet<String>>;

/// Included and excluded objects, keyed by schema.
///
/// This is the object-level test only; [`crate::ScopedObjectFilter`] adds the
/// owning schema's test on top.
#[derive(Debug, Clone)]
pub struct ObjectFilter<M: NameMatch = ExactMatch> {
    category: Category,
    included: ObjectMap,
    excluded: ObjectMap,
    _match: PhantomData<M>,
}

impl<M: NameMatch> ObjectFilter<M> {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            included: ObjectMap::new(),
            excluded: ObjectMap::new(),
            _match: PhantomData,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Include `schema.object`.
    pub fn include(&mut self, spec: &str) -> Result<(), FilterError> {
        let (schema, object) = parse_object(spec)?;
        insert(&mut self.included, schema, object);
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

    /// Include objects of `schema` given by unqualified name.
    pub fn include_in<I, S>(&mut self, schema: &str, names: I) -> Result<(), FilterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let schema = parse_schema(schema)?;
        for name in names {
            insert(&mut self.included, schema.clone(), checked(name.into())?);
        }
        Ok(())
    }

    /// Exclude `schema.object`.
    pub fn exclude(&mut self, spec: &str) -> Result<(), FilterError> {
        let (schema, object) = parse_object(spec)?;
        insert(&mut self.excluded, schema, object);
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

    pub fn exclude_in<I, S>(&mut self, schema: &str, names: I) -> Result<(), FilterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let schema = parse_schema(schema)?;
        for name in names {
            insert(&mut self.excluded, schema.clone(), checked(name.into())?);
        }
        Ok(())
    }

    pub fn included(&self) -> &ObjectMap {
        &self.included
    }

    pub fn excluded(&self) -> &ObjectMap {
        &self.excluded
    }

    pub fn is_empty(&self) -> bool {
        self.included.is_empty() && self.excluded.is_empty()
    }

    /// Object-level test, ignoring the schema filter.
    pub fn is_included(&self, schema: &str, name: &str) -> bool {
        !self.is_excluded(schema, name)
            && (self.included.is_empty()
                || self
                    .included
                    .get(schema)
                    .is_some_and(|names| M::contains(names, name)))
    }

    /// Whether `schema.name` is explicitly excluded.
    pub fn is_excluded(&self, schema: &str, name: &str) -> bool {
        self.excluded
            .get(schema)
            .is_some_and(|names| M::contains(names, name))
    }

    /// Whether objects of `schema` can be included at all: true when there is
    /// no include list, or the include list names objects in `schema`.
    pub fn includes_schema(&self, schema: &str) -> bool {
        self.included.is_empty() || self.included.contains_key(schema)
    }

    pub fn conflicts(&self) -> Vec<FilterConflict> {
        let mut conflicts = Vec::new();
        for (schema, names) in &self.included {
            for name in names {
                if self.is_excluded(schema, name) {
                    conflicts.push(FilterConflict::IncludedAndExcluded {
                        category: self.category,
                        entry: qualified(schema, name),
                    });
                }
            }
        }
        conflicts
    }

    pub fn error_on_conflicts(&self) -> bool {
        !self.conflicts().is_empty()
    }

    /// Included objects whose schema is filtered out by `schemas`.
    pub fn cross_filter_conflicts(&self, schemas: &SchemaFilter) -> Vec<FilterConflict> {
        let mut conflicts = Vec::new();
        for (schema, names) in &self.included {
            if schemas.is_included(schema) {
                continue;
            }
            for name in names {
                conflicts.push(FilterConflict::ParentFilteredOut {
                    category: self.category,
                    entry: qualified(schema, name),
                    parent: format!("schema {}", quote_identifier(schema)),
                });
            }
        }
        conflicts
    }

    pub fn error_on_cross_filters_conflicts(&self, schemas: &SchemaFilter) -> bool {
        !self.cross_filter_conflicts(schemas).is_empty()
    }
}

fn insert(map: &mut ObjectMap, schema: String, name: String) {
    map.entry(schema).or_default().insert(name);
}

pub(crate) fn checked(name: String) -> Result<String, FilterError> {
    if name.is_empty() {
        return Err(FilterError::invalid_name(&name, "empty identifier"));
    }
    Ok(name)
}

pub(crate) fn qualified(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(name))
}
