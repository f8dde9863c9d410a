//! GitHub Actions output formatter
//!
//! Outputs violations in GitHub Actions workflow command format:
//! ::warning file={name},line={line},col={col},title={rule}::{message}

use super::OutputFormatter;
use crate::diagnostic::{Severity, Violation};
use crate::report::Report;

/// Formatter for GitHub Actions annotations
pub struct GithubFormatter {
    /// Whether to include summary
    pub show_summary: bool,
}

impl GithubFormatter {
    /// Create a new GitHub formatter
    pub fn new() -> Self {
        Self { show_summary: true }
    }

    /// Disable summary output
    pub fn without_summary(mut self) -> Self {
        self.show_summary = false;
        self
    }
}

impl Default for GithubFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn escape(text: &str) -> String {
    text.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

impl OutputFormatter for GithubFormatter {
    fn format(&self, report: &Report) -> String {
        let mut output = String::new();

        for violation in report.violations() {
            output.push_str(&self.format_violation(violation));
            output.push('\n');
        }

        let summary = report.summary();
        if self.show_summary && summary.total() > 0 {
            output.push_str(&format!(
                "::notice::Check complete: {} error(s), {} warning(s), {} advisory(ies) in {} file(s)\n",
                summary.errors, summary.warnings, summary.advisories, summary.files
            ));

            output.push_str("::group::Kerf Summary\n");
            output.push_str(&format!("Files checked: {}\n", summary.files));
            output.push_str(&format!("Errors: {}\n", summary.errors));
            output.push_str(&format!("Warnings: {}\n", summary.warnings));
            output.push_str(&format!("Advisories: {}\n", summary.advisories));
            if summary.rule_failures > 0 {
                output.push_str(&format!("Rule failures: {}\n", summary.rule_failures));
            }
            output.push_str("::endgroup::\n");
        }

        output
    }

    fn format_violation(&self, violation: &Violation) -> String {
        let level = match violation.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Advisory => "notice",
        };

        format!(
            "::{} file={},line={},col={},title={}::{}",
            level,
            violation.location.file.display(),
            violation.location.line,
            violation.location.column.max(1),
            violation.rule_id,
            escape(&violation.message)
        )
    }
}
