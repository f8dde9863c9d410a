//! Aggregated check results
//!
//! A [`Report`] is assembled once per run from per-file results. Files keep the
//! order they were supplied in; violations inside a file are sorted by line,
//! column, rule id and message so identical input always gives identical
//! output.

use crate::diagnostic::{RuleFailure, Severity, Violation};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Terminal status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    Success,
    ViolationsFound,
    ConfigurationInvalid,
    Cancelled,
}

impl RunStatus {
    /// Process exit code for this status
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Success => 0,
            RunStatus::ViolationsFound => 1,
            RunStatus::ConfigurationInvalid => 2,
            RunStatus::Cancelled => 3,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => write!(f, "success"),
            RunStatus::ViolationsFound => write!(f, "violations found"),
            RunStatus::ConfigurationInvalid => write!(f, "configuration invalid"),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Results for one file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    /// Detected language (`None` when no profile matched)
    pub language: Option<String>,
    pub violations: Vec<Violation>,
    pub failures: Vec<RuleFailure>,
}

impl FileReport {
    pub fn new(path: PathBuf, language: Option<String>) -> Self {
        Self {
            path,
            language,
            violations: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Sort violations into their reporting order
    pub fn sort(&mut self) {
        self.violations.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        self.failures
            .sort_by(|a, b| a.rule_id.cmp(&b.rule_id).then(a.message.cmp(&b.message)));
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == severity)
            .count()
    }
}

/// One flat report entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationRecord {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
}

/// Counts over a whole report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub files: usize,
    pub files_with_violations: usize,
    pub errors: usize,
    pub warnings: usize,
    pub advisories: usize,
    pub rule_failures: usize,
}

impl Summary {
    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.advisories
    }
}

/// Final result of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub files: Vec<FileReport>,
    /// Lowest severity that fails the run
    #[serde(skip)]
    pub fail_on: Severity,
}

impl Default for Report {
    fn default() -> Self {
        Self::new(Severity::Error)
    }
}

impl Report {
    pub fn new(fail_on: Severity) -> Self {
        Self {
            files: Vec::new(),
            fail_on,
        }
    }

    /// Append a file's results (sorted on the way in)
    pub fn push(&mut self, mut file: FileReport) {
        file.sort();
        self.files.push(file);
    }

    /// Every violation, grouped by file in supply order
    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.files.iter().flat_map(|f| f.violations.iter())
    }

    pub fn failures(&self) -> impl Iterator<Item = &RuleFailure> {
        self.files.iter().flat_map(|f| f.failures.iter())
    }

    /// Flat records in reporting order
    pub fn records(&self) -> Vec<ViolationRecord> {
        self.violations()
            .map(|v| ViolationRecord {
                file: v.location.file.display().to_string(),
                line: v.location.line,
                column: v.location.column,
                rule_id: v.rule_id.clone(),
                severity: v.severity,
                message: v.message.clone(),
            })
            .collect()
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            files: self.files.len(),
            ..Summary::default()
        };
        for file in &self.files {
            if !file.violations.is_empty() {
                summary.files_with_violations += 1;
            }
            summary.errors += file.count(Severity::Error);
            summary.warnings += file.count(Severity::Warning);
            summary.advisories += file.count(Severity::Advisory);
            summary.rule_failures += file.failures.len();
        }
        summary
    }

    /// Whether any violation reaches the failing threshold. Advisory
    /// violations never do.
    pub fn has_blocking(&self) -> bool {
        self.violations()
            .any(|v| v.severity.is_blocking() && v.severity >= self.fail_on)
    }

    /// Status of a completed (not cancelled) run
    pub fn status(&self) -> RunStatus {
        if self.has_blocking() {
            RunStatus::ViolationsFound
        } else {
            RunStatus::Success
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Location;
    use pretty_assertions::assert_eq;

    fn violation(file: &str, line: usize, column: usize, rule: &str, severity: Severity) -> Violation {
        Violation::new(
            rule,
            severity,
            "message",
            Location::new(PathBuf::from(file), line, column),
        )
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunStatus::Success.exit_code(), 0);
        assert_eq!(RunStatus::ViolationsFound.exit_code(), 1);
        assert_eq!(RunStatus::ConfigurationInvalid.exit_code(), 2);
        assert_eq!(RunStatus::Cancelled.exit_code(), 3);
    }

    #[test]
    fn test_push_sorts_within_file() {
        let mut report = Report::default();
        let mut file = FileReport::new(PathBuf::from("b.java"), Some("java".to_string()));
        file.violations = vec![
            violation("b.java", 4, 1, "line-length", Severity::Warning),
            violation("b.java", 2, 9, "naming-convention", Severity::Warning),
            violation("b.java", 2, 9, "magic-literal", Severity::Warning),
        ];
        report.push(file);
        report.push(FileReport::new(PathBuf::from("a.java"), Some("java".to_string())));

        let records: Vec<_> = report
            .records()
            .into_iter()
            .map(|r| (r.line, r.rule_id))
            .collect();
        assert_eq!(
            records,
            vec![
                (2, "magic-literal".to_string()),
                (2, "naming-convention".to_string()),
                (4, "line-length".to_string()),
            ]
        );
        // supply order of files is kept
        assert_eq!(report.files[1].path, PathBuf::from("a.java"));
    }

    #[test]
    fn test_status_thresholds() {
        let mut report = Report::default();
        let mut file = FileReport::new(PathBuf::from("a.py"), Some("python".to_string()));
        file.violations = vec![
            violation("a.py", 1, 1, "verb-named-method", Severity::Advisory),
            violation("a.py", 2, 1, "line-length", Severity::Warning),
        ];
        report.push(file);
        assert_eq!(report.status(), RunStatus::Success);

        report.fail_on = Severity::Warning;
        assert_eq!(report.status(), RunStatus::ViolationsFound);

        report.fail_on = Severity::Advisory;
        report.files[0].violations.remove(1);
        assert_eq!(report.status(), RunStatus::Success);
    }

    #[test]
    fn test_summary_and_record_json() {
        let mut report = Report::default();
        let mut file = FileReport::new(PathBuf::from("a.go"), Some("go".to_string()));
        file.violations = vec![violation("a.go", 3, 7, "block-delimiter", Severity::Error)];
        report.push(file);
        report.push(FileReport::new(PathBuf::from("b.go"), Some("go".to_string())));

        let summary = report.summary();
        assert_eq!(summary.files, 2);
        assert_eq!(summary.files_with_violations, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.total(), 1);
        assert_eq!(report.status(), RunStatus::ViolationsFound);

        let json = serde_json::to_string(&report.records()[0]).unwrap();
        assert_eq!(
            json,
            r#"{"file":"a.go","line":3,"column":7,"ruleId":"block-delimiter","severity":"error","message":"message"}"#
        );
    }
}
