//! Human-readable text output formatter

use super::OutputFormatter;
use crate::diagnostic::{Severity, Violation};
use crate::report::Report;
use colored::*;

/// Text formatter with optional color support
pub struct TextFormatter {
    /// Enable colored output
    pub colored: bool,

    /// Show the offending source line
    pub show_source: bool,

    /// Show help text
    pub show_help: bool,

    /// Show statistics
    pub show_stats: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colored: true,
            show_source: true,
            show_help: true,
            show_stats: true,
        }
    }
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable colors
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    fn severity_str(&self, severity: Severity) -> ColoredString {
        let s = format!("{}", severity);
        if !self.colored {
            return s.normal();
        }
        match severity {
            Severity::Error => s.red().bold(),
            Severity::Warning => s.yellow().bold(),
            Severity::Advisory => s.blue(),
        }
    }

    fn paint(&self, text: &str, paint: fn(&str) -> ColoredString) -> String {
        if self.colored {
            paint(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn count(&self, n: usize, singular: &str, plural: &str, paint: fn(&str) -> ColoredString) -> String {
        let s = format!("{} {}", n, if n == 1 { singular } else { plural });
        self.paint(&s, paint)
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, report: &Report) -> String {
        let mut output = String::new();

        // Files keep their supply order
        for file in report.files.iter().filter(|f| !f.violations.is_empty() || !f.failures.is_empty()) {
            let name = file.path.display().to_string();
            output.push_str(&self.paint(&name, |s| s.underline()));
            output.push('\n');

            for violation in &file.violations {
                output.push_str(&self.format_violation(violation));
            }
            for failure in &file.failures {
                output.push_str(&format!(
                    "{}: rule {} could not run: {}\n",
                    self.paint("note", |s| s.dimmed()),
                    failure.rule_id,
                    failure.message
                ));
            }
            output.push('\n');
        }

        if self.show_stats {
            let summary = report.summary();
            output.push_str(&format!(
                "{} processed",
                self.count(summary.files, "file", "files", |s| s.normal())
            ));

            let mut counts = Vec::new();
            if summary.errors > 0 {
                counts.push(self.count(summary.errors, "error", "errors", |s| s.red()));
            }
            if summary.warnings > 0 {
                counts.push(self.count(summary.warnings, "warning", "warnings", |s| s.yellow()));
            }
            if summary.advisories > 0 {
                counts.push(self.count(summary.advisories, "advisory", "advisories", |s| s.blue()));
            }
            if summary.rule_failures > 0 {
                counts.push(self.count(summary.rule_failures, "rule failure", "rule failures", |s| s.dimmed()));
            }

            if counts.is_empty() {
                output.push_str(": no violations");
            } else {
                output.push_str(&format!(": {}", counts.join(", ")));
            }
            output.push('\n');
        }

        output
    }

    fn format_violation(&self, violation: &Violation) -> String {
        let mut output = String::new();
        let bar = self.paint("|", |s| s.blue());

        output.push_str(&format!(
            "{}:{}:{}: {}[{}]: {}\n",
            violation.location.file.display(),
            violation.location.line,
            violation.location.column,
            self.severity_str(violation.severity),
            self.paint(&violation.rule_id, |s| s.cyan()),
            violation.message
        ));

        if self.show_source {
            if let Some(source) = &violation.source_line {
                let line_num = format!("{:>4}", violation.location.line);
                output.push_str(&format!("   {}\n", bar));
                output.push_str(&format!("{} {} {}\n", self.paint(&line_num, |s| s.blue()), bar, source));

                if violation.location.column > 0 {
                    let padding = " ".repeat(violation.location.column - 1);
                    output.push_str(&format!("   {} {}{}\n", bar, padding, self.paint("^", |s| s.red())));
                }
            }
        }

        if self.show_help {
            if let Some(help) = &violation.help {
                output.push_str(&format!("   {} help: {}\n", self.paint("=", |s| s.blue()), help));
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::testing::{sample_report, violation};
    use crate::report::Report;

    #[test]
    fn test_violation_line() {
        let formatter = TextFormatter::new().without_color();
        let v = violation("naming-convention", Severity::Warning, "a.py", 3, 5, "bad name");

        let output = formatter.format_violation(&v);
        assert_eq!(output, "a.py:3:5: warning[naming-convention]: bad name\n");
    }

    #[test]
    fn test_source_and_caret() {
        let formatter = TextFormatter::new().without_color();
        let v = violation("magic-literal", Severity::Warning, "a.js", 1, 5, "magic")
            .with_source_line("if (x > 50) {}")
            .with_help("Literals should be named");

        let output = formatter.format_violation(&v);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[2], "   1 | if (x > 50) {}");
        assert_eq!(lines[3], "   |     ^");
        assert_eq!(lines[4], "   = help: Literals should be named");
    }

    #[test]
    fn test_report_grouped_in_order() {
        let formatter = TextFormatter::new().without_color();
        let output = formatter.format(&sample_report());

        assert!(output.starts_with("src/App.java\n"));
        assert!(!output.contains("src/Clean.java"));
        // sorted by line inside the file
        let block = output.find("block-delimiter").expect("block-delimiter");
        let length = output.find("line-length").expect("line-length");
        assert!(block < length);
        assert!(output.ends_with("2 files processed: 1 error, 1 warning\n"));
    }

    #[test]
    fn test_clean_report() {
        let formatter = TextFormatter::new().without_color();
        let output = formatter.format(&Report::default());
        assert_eq!(output, "0 files processed: no violations\n");
    }

    #[test]
    fn test_without_stats() {
        let mut formatter = TextFormatter::new().without_color();
        formatter.show_stats = false;
        assert_eq!(formatter.format(&Report::default()), "");
    }
}
