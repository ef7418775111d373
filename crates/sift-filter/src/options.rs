//! Filtering options: the mutable configuration phase and the frozen filters.
//!
//! [`FilteringOptions`] collects include/exclude entries while configuration is
//! read. [`FilteringOptions::freeze`] turns it into [`Filters`], where each
//! object filter holds a shared reference to the filter of its parent scope:
//! tables, events and routines share the schema filter, triggers share the
//! (schema-scoped) table filter.

use crate::conflict::FilterConflict;
use crate::error::FilterError;
use crate::object::{CaseInsensitiveMatch, ExactMatch, NameMatch, ObjectFilter};
use crate::schema::SchemaFilter;
use crate::trigger::TriggerFilter;
use crate::user::UserFilter;
use crate::Category;
use sift_core::config::{FilterConfig, SYSTEM_SCHEMAS};
use sift_core::Account;
use std::sync::Arc;

/// Filters of every category, open for modification.
#[derive(Debug, Clone)]
pub struct FilteringOptions {
    users: UserFilter,
    schemas: SchemaFilter,
    tables: ObjectFilter<ExactMatch>,
    events: ObjectFilter<ExactMatch>,
    routines: ObjectFilter<CaseInsensitiveMatch>,
    triggers: TriggerFilter,
}

impl Default for FilteringOptions {
    fn default() -> Self {
        Self {
            users: UserFilter::default(),
            schemas: SchemaFilter::default(),
            tables: ObjectFilter::new(Category::Tables),
            events: ObjectFilter::new(Category::Events),
            routines: ObjectFilter::new(Category::Routines),
            triggers: TriggerFilter::default(),
        }
    }
}

impl FilteringOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate the filters from configuration lists.
    pub fn from_config(config: &FilterConfig) -> Result<Self, FilterError> {
        let mut options = Self::new();

        options.users.include_all(&config.users.include)?;
        options.users.exclude_all(&config.users.exclude)?;

        options.schemas.include_all(&config.schemas.include)?;
        options.schemas.exclude_all(&config.schemas.exclude)?;
        if config.exclude_system_schemas {
            options.schemas.exclude_all(SYSTEM_SCHEMAS)?;
        }

        options.tables.include_all(&config.tables.include)?;
        options.tables.exclude_all(&config.tables.exclude)?;

        options.events.include_all(&config.events.include)?;
        options.events.exclude_all(&config.events.exclude)?;

        options.routines.include_all(&config.routines.include)?;
        options.routines.exclude_all(&config.routines.exclude)?;

        options.triggers.include_all(&config.triggers.include)?;
        options.triggers.exclude_all(&config.triggers.exclude)?;

        Ok(options)
    }

    pub fn users(&self) -> &UserFilter {
        &self.users
    }

    pub fn users_mut(&mut self) -> &mut UserFilter {
        &mut self.users
    }

    pub fn schemas(&self) -> &SchemaFilter {
        &self.schemas
    }

    pub fn schemas_mut(&mut self) -> &mut SchemaFilter {
        &mut self.schemas
    }

    pub fn tables(&self) -> &ObjectFilter<ExactMatch> {
        &self.tables
    }

    pub fn tables_mut(&mut self) -> &mut ObjectFilter<ExactMatch> {
        &mut self.tables
    }

    pub fn events(&self) -> &ObjectFilter<ExactMatch> {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut ObjectFilter<ExactMatch> {
        &mut self.events
    }

    pub fn routines(&self) -> &ObjectFilter<CaseInsensitiveMatch> {
        &self.routines
    }

    pub fn routines_mut(&mut self) -> &mut ObjectFilter<CaseInsensitiveMatch> {
        &mut self.routines
    }

    pub fn triggers(&self) -> &TriggerFilter {
        &self.triggers
    }

    pub fn triggers_mut(&mut self) -> &mut TriggerFilter {
        &mut self.triggers
    }

    /// Stop accepting changes and wire up the scope references.
    pub fn freeze(self) -> Filters {
        let schemas = Arc::new(self.schemas);
        let tables = Arc::new(ScopedObjectFilter::new(Arc::clone(&schemas), self.tables));

        tracing::debug!(
            schemas_included = schemas.included().len(),
            schemas_excluded = schemas.excluded().len(),
            tables_included = tables.objects().included().len(),
            "filters frozen"
        );

        Filters {
            users: Arc::new(self.users),
            events: ScopedObjectFilter::new(Arc::clone(&schemas), self.events),
            routines: ScopedObjectFilter::new(Arc::clone(&schemas), self.routines),
            triggers: ScopedTriggerFilter::new(Arc::clone(&tables), self.triggers),
            schemas,
            tables,
        }
    }
}

/// An object filter evaluated under its schema filter.
#[derive(Debug, Clone)]
pub struct ScopedObjectFilter<M: NameMatch = ExactMatch> {
    schemas: Arc<SchemaFilter>,
    objects: ObjectFilter<M>,
}

impl<M: NameMatch> ScopedObjectFilter<M> {
    pub fn new(schemas: Arc<SchemaFilter>, objects: ObjectFilter<M>) -> Self {
        Self { schemas, objects }
    }

    pub fn schemas(&self) -> &SchemaFilter {
        &self.schemas
    }

    pub fn objects(&self) -> &ObjectFilter<M> {
        &self.objects
    }

    /// The schema must be in scope and the object must pass the object filter.
    /// An explicit object include cannot bring back an excluded schema.
    pub fn is_included(&self, schema: &str, name: &str) -> bool {
        self.schemas.is_included(schema) && self.objects.is_included(schema, name)
    }

    pub fn conflicts(&self) -> Vec<FilterConflict> {
        self.objects.conflicts()
    }

    pub fn error_on_conflicts(&self) -> bool {
        self.objects.error_on_conflicts()
    }

    pub fn cross_filter_conflicts(&self) -> Vec<FilterConflict> {
        self.objects.cross_filter_conflicts(&self.schemas)
    }

    pub fn error_on_cross_filters_conflicts(&self) -> bool {
        self.objects.error_on_cross_filters_conflicts(&self.schemas)
    }
}

/// The trigger filter evaluated under the table filter (and so the schema filter).
#[derive(Debug, Clone)]
pub struct ScopedTriggerFilter {
    tables: Arc<ScopedObjectFilter<ExactMatch>>,
    triggers: TriggerFilter,
}

impl ScopedTriggerFilter {
    pub fn new(tables: Arc<ScopedObjectFilter<ExactMatch>>, triggers: TriggerFilter) -> Self {
        Self { tables, triggers }
    }

    pub fn tables(&self) -> &ScopedObjectFilter<ExactMatch> {
        &self.tables
    }

    pub fn triggers(&self) -> &TriggerFilter {
        &self.triggers
    }

    /// The owning table must be in scope, then the trigger-level test applies.
    pub fn is_included(&self, schema: &str, table: &str, trigger: &str) -> bool {
        self.tables.is_included(schema, table) && self.triggers.is_included(schema, table, trigger)
    }

    pub fn conflicts(&self) -> Vec<FilterConflict> {
        self.triggers.conflicts()
    }

    pub fn error_on_conflicts(&self) -> bool {
        self.triggers.error_on_conflicts()
    }

    pub fn cross_filter_conflicts(&self) -> Vec<FilterConflict> {
        self.triggers
            .cross_filter_conflicts_with(|schema, table| self.tables.is_included(schema, table))
    }

    pub fn error_on_cross_filters_conflicts(&self) -> bool {
        !self.cross_filter_conflicts().is_empty()
    }
}

/// Immutable filters of every category, cheap to clone and safe to share
/// between threads.
#[derive(Debug, Clone)]
pub struct Filters {
    users: Arc<UserFilter>,
    schemas: Arc<SchemaFilter>,
    tables: Arc<ScopedObjectFilter<ExactMatch>>,
    events: ScopedObjectFilter<ExactMatch>,
    routines: ScopedObjectFilter<CaseInsensitiveMatch>,
    triggers: ScopedTriggerFilter,
}

impl Default for Filters {
    fn default() -> Self {
        FilteringOptions::default().freeze()
    }
}

impl Filters {
    pub fn users(&self) -> &UserFilter {
        &self.users
    }

    pub fn schemas(&self) -> &SchemaFilter {
        &self.schemas
    }

    pub fn tables(&self) -> &ScopedObjectFilter<ExactMatch> {
        &self.tables
    }

    pub fn events(&self) -> &ScopedObjectFilter<ExactMatch> {
        &self.events
    }

    pub fn routines(&self) -> &ScopedObjectFilter<CaseInsensitiveMatch> {
        &self.routines
    }

    pub fn triggers(&self) -> &ScopedTriggerFilter {
        &self.triggers
    }

    pub fn is_user_included(&self, account: &Account) -> bool {
        self.users.is_included(account)
    }

    /// Whether `schema` is kept in the cache: it passes the schema filter and,
    /// when tables are explicitly included, some included table lives in it.
    pub fn is_schema_retained(&self, schema: &str) -> bool {
        self.schemas.is_included(schema) && self.tables.objects().includes_schema(schema)
    }

    /// Same-key include/exclude conflicts across all categories.
    pub fn conflicts(&self) -> Vec<FilterConflict> {
        let mut conflicts = self.users.conflicts();
        conflicts.extend(self.schemas.conflicts());
        conflicts.extend(self.tables.conflicts());
        conflicts.extend(self.events.conflicts());
        conflicts.extend(self.routines.conflicts());
        conflicts.extend(self.triggers.conflicts());
        conflicts
    }

    pub fn error_on_conflicts(&self) -> bool {
        self.users.error_on_conflicts()
            || self.schemas.error_on_conflicts()
            || self.tables.error_on_conflicts()
            || self.events.error_on_conflicts()
            || self.routines.error_on_conflicts()
            || self.triggers.error_on_conflicts()
    }

    /// Object includes that can never take effect because the parent is filtered out.
    pub fn cross_filter_conflicts(&self) -> Vec<FilterConflict> {
        let mut conflicts = self.tables.cross_filter_conflicts();
        conflicts.extend(self.events.cross_filter_conflicts());
        conflicts.extend(self.routines.cross_filter_conflicts());
        conflicts.extend(self.triggers.cross_filter_conflicts());
        conflicts
    }

    pub fn error_on_cross_filters_conflicts(&self) -> bool {
        self.tables.error_on_cross_filters_conflicts()
            || self.events.error_on_cross_filters_conflicts()
            || self.routines.error_on_cross_filters_conflicts()
            || self.triggers.error_on_cross_filters_conflicts()
    }
}
