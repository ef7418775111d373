//! `sift check` command implementation.
//!
//! Loads the configuration and reports filter conflicts:
//! - entries both included and excluded (errors)
//! - object includes whose schema or table is filtered out (warnings)

use anyhow::Result;
use sift_filter::{Category, FilterConflict, Filters};
use std::path::Path;

/// Severity level for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single check finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFinding {
    pub severity: Severity,
    pub category: Category,
    pub message: String,
}

impl From<FilterConflict> for CheckFinding {
    fn from(conflict: FilterConflict) -> Self {
        let severity = match conflict {
            FilterConflict::IncludedAndExcluded { .. } => Severity::Error,
            FilterConflict::ParentFilteredOut { .. } => Severity::Warning,
        };
        Self {
            severity,
            category: conflict.category(),
            message: conflict.to_string(),
        }
    }
}

/// Results from running all checks.
#[derive(Debug, Default)]
pub struct CheckResults {
    pub findings: Vec<CheckFinding>,
}

impl CheckResults {
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }

    /// Print human-readable summary, errors first.
    pub fn print_summary(&self) {
        let mut findings: Vec<_> = self.findings.iter().collect();
        findings.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.category.cmp(&b.category)));

        for finding in &findings {
            let icon = match finding.severity {
                Severity::Error => "✗",
                Severity::Warning => "⚠",
            };
            println!(
                "  {} {} [{}]: {}",
                icon, finding.severity, finding.category, finding.message
            );
        }

        println!();
        if findings.is_empty() {
            println!("All checks passed.");
        } else {
            println!(
                "Summary: {} error(s), {} warning(s)",
                self.error_count(),
                self.warning_count()
            );
        }
    }
}

/// Run every filter check.
pub fn collect(filters: &Filters) -> CheckResults {
    let findings = filters
        .conflicts()
        .into_iter()
        .chain(filters.cross_filter_conflicts())
        .map(CheckFinding::from)
        .collect();
    CheckResults { findings }
}

/// Run checks without printing; fails when the filters contain errors.
pub fn run_pre_hook(filters: &Filters) -> Result<()> {
    let results = collect(filters);
    for finding in &results.findings {
        tracing::warn!(category = %finding.category, "{}", finding.message);
    }

    if results.has_errors() {
        anyhow::bail!(
            "Filters have {} error(s). Run `sift check` for details, or pass --force.",
            results.error_count()
        );
    }
    Ok(())
}

pub fn run(config_path: &Path) -> Result<()> {
    println!("Checking filters in {}...", config_path.display());
    println!();

    let (_, filters) = super::load(config_path)?;
    let results = collect(&filters);
    results.print_summary();

    if results.has_errors() {
        anyhow::bail!("Filter check failed with {} error(s)", results.error_count());
    }
    Ok(())
}
