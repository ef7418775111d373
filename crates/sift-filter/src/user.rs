//! User (account) filter.

use crate::account::parse_account;
use crate::conflict::{Category, FilterConflict};
use crate::error::FilterError;
use sift_core::Account;
use std::collections::BTreeSet;

/// Included and excluded accounts. An entry without a host covers every host
/// of that user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    included: BTreeSet<Account>,
    excluded: BTreeSet<Account>,
}

impl UserFilter {
    pub fn include(&mut self, spec: &str) -> Result<(), FilterError> {
        self.included.insert(parse_account(spec)?);
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

    pub fn include_account(&mut self, account: Account) {
        self.included.insert(account);
    }

    pub fn exclude(&mut self, spec: &str) -> Result<(), FilterError> {
        self.excluded.insert(parse_account(spec)?);
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

    pub fn exclude_account(&mut self, account: Account) {
        self.excluded.insert(account);
    }

    pub fn included(&self) -> &BTreeSet<Account> {
        &self.included
    }

    pub fn excluded(&self) -> &BTreeSet<Account> {
        &self.excluded
    }

    pub fn is_empty(&self) -> bool {
        self.included.is_empty() && self.excluded.is_empty()
    }

    pub fn is_included(&self, account: &Account) -> bool {
        !self.excluded.iter().any(|e| e.covers(account))
            && (self.included.is_empty() || self.included.iter().any(|i| i.covers(account)))
    }

    /// Included entries that an excluded entry covers.
    pub fn conflicts(&self) -> Vec<FilterConflict> {
        self.included
            .iter()
            .filter(|included| self.excluded.iter().any(|e| e.covers(included)))
            .map(|included| FilterConflict::IncludedAndExcluded {
                category: Category::Users,
                entry: included.to_string(),
            })
            .collect()
    }

    pub fn error_on_conflicts(&self) -> bool {
        !self.conflicts().is_empty()
    }
}
