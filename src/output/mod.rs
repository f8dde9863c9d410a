//! Output formatters for check reports

mod compact;
mod github;
mod json;
mod text;

pub use compact::CompactFormatter;
pub use github::GithubFormatter;
pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::config::OutputFormat;
use crate::diagnostic::Violation;
use crate::report::Report;

/// Output formatter trait
pub trait OutputFormatter: Send + Sync {
    /// Format the entire report
    fn format(&self, report: &Report) -> String;

    /// Format a single violation
    fn format_violation(&self, violation: &Violation) -> String;
}

/// Build the formatter for a configured output format
pub fn formatter_for(format: OutputFormat, colored: bool, statistics: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => {
            let mut formatter = TextFormatter::new();
            formatter.colored = colored;
            formatter.show_stats = statistics;
            Box::new(formatter)
        }
        OutputFormat::Json => Box::new(JsonFormatter::new().pretty()),
        OutputFormat::Compact => Box::new(CompactFormatter::new()),
        OutputFormat::Github => {
            if statistics {
                Box::new(GithubFormatter::new())
            } else {
                Box::new(GithubFormatter::new().without_summary())
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::diagnostic::{Location, Severity, Violation};
    use crate::report::{FileReport, Report};
    use std::path::PathBuf;

    pub fn violation(rule: &str, severity: Severity, file: &str, line: usize, col: usize, msg: &str) -> Violation {
        Violation::new(rule, severity, msg, Location::new(PathBuf::from(file), line, col))
    }

    /// Two files, one clean
    pub fn sample_report() -> Report {
        let mut report = Report::default();
        let mut file = FileReport::new(PathBuf::from("src/App.java"), Some("java".to_string()));
        file.violations = vec![
            violation("line-length", Severity::Warning, "src/App.java", 4, 81, "line is 95 characters (limit 80)")
                .with_source_line("    String greeting = \"hello\";"),
            violation("block-delimiter", Severity::Error, "src/App.java", 2, 5, "multi-line if body must be enclosed in braces"),
        ];
        report.push(file);
        report.push(FileReport::new(PathBuf::from("src/Clean.java"), Some("java".to_string())));
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatter_for_each_format() {
        let report = testing::sample_report();
        for format in [OutputFormat::Text, OutputFormat::Json, OutputFormat::Compact, OutputFormat::Github] {
            let output = formatter_for(format, false, true).format(&report);
            assert!(output.contains("src/App.java"), "{:?}: {}", format, output);
        }
    }
}
