//! Compact output formatter
//!
//! One line per violation, minimal output for scripting:
//! `file:line:col: severity [rule] message`

use super::OutputFormatter;
use crate::diagnostic::Violation;
use crate::report::Report;

/// Compact one-line-per-violation formatter
pub struct CompactFormatter {
    /// Show severity
    pub show_severity: bool,
    /// Show rule ID
    pub show_rule: bool,
}

impl CompactFormatter {
    /// Create a new compact formatter
    pub fn new() -> Self {
        Self {
            show_severity: true,
            show_rule: true,
        }
    }

    /// Hide severity
    pub fn without_severity(mut self) -> Self {
        self.show_severity = false;
        self
    }

    /// Hide rule ID
    pub fn without_rule(mut self) -> Self {
        self.show_rule = false;
        self
    }
}

impl Default for CompactFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for CompactFormatter {
    fn format(&self, report: &Report) -> String {
        let mut output = String::new();

        for violation in report.violations() {
            output.push_str(&self.format_violation(violation));
            output.push('\n');
        }

        output
    }

    fn format_violation(&self, violation: &Violation) -> String {
        let mut parts = vec![format!(
            "{}:{}:{}:",
            violation.location.file.display(),
            violation.location.line,
            violation.location.column
        )];

        if self.show_severity {
            parts.push(violation.severity.to_string());
        }
        if self.show_rule {
            parts.push(format!("[{}]", violation.rule_id));
        }
        parts.push(violation.message.clone());

        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;
    use crate::output::testing::{sample_report, violation};

    #[test]
    fn test_compact_full() {
        let formatter = CompactFormatter::new();
        let v = violation("magic-literal", Severity::Warning, "src/a.js", 1, 14, "magic literal 50 in comparison");

        assert_eq!(
            formatter.format_violation(&v),
            "src/a.js:1:14: warning [magic-literal] magic literal 50 in comparison"
        );
    }

    #[test]
    fn test_compact_minimal() {
        let formatter = CompactFormatter::new().without_severity().without_rule();
        let v = violation("x", Severity::Error, "f.c", 2, 3, "msg");
        assert_eq!(formatter.format_violation(&v), "f.c:2:3: msg");
    }

    #[test]
    fn test_compact_report() {
        let output = CompactFormatter::new().format(&sample_report());
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                "src/App.java:2:5: error [block-delimiter] multi-line if body must be enclosed in braces",
                "src/App.java:4:81: warning [line-length] line is 95 characters (limit 80)",
            ]
        );
    }
}
