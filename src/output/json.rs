//! JSON output formatter
//!
//! The document holds the flat violation records in reporting order, the
//! summary counts and the status. Nothing time-dependent is included, so the
//! same input always serializes to the same bytes.

use super::OutputFormatter;
use crate::diagnostic::{RuleFailure, Violation};
use crate::report::{Report, RunStatus, Summary, ViolationRecord};
use serde::Serialize;

/// JSON formatter for machine-readable output
#[derive(Default)]
pub struct JsonFormatter {
    /// Pretty print with indentation
    pub pretty: bool,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn to_string<T: Serialize>(&self, value: &T) -> String {
        if self.pretty {
            serde_json::to_string_pretty(value).unwrap_or_default()
        } else {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutput<'a> {
    status: RunStatus,
    records: Vec<ViolationRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rule_failures: Vec<JsonFailure<'a>>,
    summary: Summary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonFailure<'a> {
    file: String,
    rule_id: &'a str,
    message: &'a str,
}

impl<'a> From<&'a RuleFailure> for JsonFailure<'a> {
    fn from(failure: &'a RuleFailure) -> Self {
        Self {
            file: failure.file.display().to_string(),
            rule_id: &failure.rule_id,
            message: &failure.message,
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, report: &Report) -> String {
        let output = JsonOutput {
            status: report.status(),
            records: report.records(),
            rule_failures: report.failures().map(JsonFailure::from).collect(),
            summary: report.summary(),
        };
        let mut text = self.to_string(&output);
        text.push('\n');
        text
    }

    fn format_violation(&self, violation: &Violation) -> String {
        let record = ViolationRecord {
            file: violation.location.file.display().to_string(),
            line: violation.location.line,
            column: violation.location.column,
            rule_id: violation.rule_id.clone(),
            severity: violation.severity,
            message: violation.message.clone(),
        };
        self.to_string(&record)
    }
}
