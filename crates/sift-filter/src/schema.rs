//! Schema filter.

use crate::conflict::{Category, FilterConflict};
use crate::error::FilterError;
use crate::name::parse_schema;
use regex::Regex;
use sift_core::cache::quote_identifier;
use std::collections::BTreeSet;

/// Included and excluded schema names.
///
/// Names are stored byte for byte; whether two spellings denote the same schema
/// is left to the server when the filter is turned into SQL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaFilter {
    included: BTreeSet<String>,
    excluded: BTreeSet<String>,
}

impl SchemaFilter {
    pub fn include(&mut self, spec: &str) -> Result<(), FilterError> {
        self.included.insert(parse_schema(spec)?);
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

    pub fn exclude(&mut self, spec: &str) -> Result<(), FilterError> {
        self.excluded.insert(parse_schema(spec)?);
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

    pub fn included(&self) -> &BTreeSet<String> {
        &self.included
    }

    pub fn excluded(&self) -> &BTreeSet<String> {
        &self.excluded
    }

    pub fn is_empty(&self) -> bool {
        self.included.is_empty() && self.excluded.is_empty()
    }

    /// Not excluded, and either nothing is explicitly included or `schema` is.
    pub fn is_included(&self, schema: &str) -> bool {
        !self.excluded.contains(schema)
            && (self.included.is_empty() || self.included.contains(schema))
    }

    /// Whether any included schema matches `pattern`, a `LIKE` pattern where
    /// `%` matches any run of characters, `_` a single character and `\`
    /// escapes the next character.
    pub fn matches_included(&self, pattern: &str) -> Result<bool, FilterError> {
        let re = like_to_regex(pattern)?;
        Ok(self.included.iter().any(|schema| re.is_match(schema)))
    }

    pub fn conflicts(&self) -> Vec<FilterConflict> {
        self.included
            .intersection(&self.excluded)
            .map(|schema| FilterConflict::IncludedAndExcluded {
                category: Category::Schemas,
                entry: quote_identifier(schema),
            })
            .collect()
    }

    pub fn error_on_conflicts(&self) -> bool {
        self.included.intersection(&self.excluded).next().is_some()
    }
}

/// Translate a SQL `LIKE` pattern into an anchored regular expression.
pub(crate) fn like_to_regex(pattern: &str) -> Result<Regex, FilterError> {
    let mut out = String::from("(?s)^");
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&regex::escape(escaped.encode_utf8(&mut [0; 4]))),
                None => {
                    return Err(FilterError::InvalidPattern {
                        pattern: pattern.to_string(),
                        reason: "trailing escape character".to_string(),
                    });
                }
            },
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    out.push('$');

    Regex::new(&out).map_err(|e| FilterError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}
