//! Analysis reports.
//!
//! A [`Report`] is owned by exactly one per-file (or per-run) task and is
//! append-only. When all tasks are done, their reports are combined with
//! [`MergedReport::merge`], which consumes them. A merged report is final.

mod types;

pub use types::{ConfigurationError, ProcessingError, RuleViolation, Severity, ViolationScope};

use serde::Serialize;

/// An open, append-only report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    violations: Vec<RuleViolation>,
    processing_errors: Vec<ProcessingError>,
    configuration_errors: Vec<ConfigurationError>,
    files: usize,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_violation(&mut self, violation: RuleViolation) {
        self.violations.push(violation);
    }

    pub fn add_processing_error(&mut self, error: ProcessingError) {
        self.processing_errors.push(error);
    }

    pub fn add_configuration_error(&mut self, error: ConfigurationError) {
        self.configuration_errors.push(error);
    }

    /// Count a file as analyzed.
    pub fn add_file(&mut self) {
        self.files += 1;
    }

    /// Move everything from `other` to the end of this report.
    pub fn append(&mut self, other: Report) {
        self.violations.extend(other.violations);
        self.processing_errors.extend(other.processing_errors);
        self.configuration_errors.extend(other.configuration_errors);
        self.files += other.files;
    }

    pub fn violations(&self) -> &[RuleViolation] {
        &self.violations
    }

    pub fn processing_errors(&self) -> &[ProcessingError] {
        &self.processing_errors
    }

    pub fn configuration_errors(&self) -> &[ConfigurationError] {
        &self.configuration_errors
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
            && self.processing_errors.is_empty()
            && self.configuration_errors.is_empty()
    }
}

/// The read-only combination of partial reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedReport {
    violations: Vec<RuleViolation>,
    processing_errors: Vec<ProcessingError>,
    configuration_errors: Vec<ConfigurationError>,
    files: usize,
}

impl MergedReport {
    /// Concatenate partial reports.
    ///
    /// Each category keeps the order of `reports` and, within a report, the
    /// order of insertion. Nothing is deduplicated: identical violations from
    /// repeated rule firings all survive as separate entries.
    pub fn merge(reports: impl IntoIterator<Item = Report>) -> Self {
        let mut all = Report::new();
        for report in reports {
            all.append(report);
        }
        MergedReport {
            violations: all.violations,
            processing_errors: all.processing_errors,
            configuration_errors: all.configuration_errors,
            files: all.files,
        }
    }

    pub fn violations(&self) -> &[RuleViolation] {
        &self.violations
    }

    pub fn processing_errors(&self) -> &[ProcessingError] {
        &self.processing_errors
    }

    pub fn configuration_errors(&self) -> &[ConfigurationError] {
        &self.configuration_errors
    }

    /// Number of files analyzed.
    pub fn files(&self) -> usize {
        self.files
    }

    pub fn has_errors(&self) -> bool {
        !self.processing_errors.is_empty() || !self.configuration_errors.is_empty()
    }

    /// Whether the run found anything at all.
    pub fn has_findings(&self) -> bool {
        !self.violations.is_empty() || self.has_errors()
    }
}

impl From<Report> for MergedReport {
    fn from(report: Report) -> Self {
        MergedReport::merge([report])
    }
}
