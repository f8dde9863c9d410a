//! block-delimiter: multi-line conditional and loop bodies need braces

use crate::diagnostic::{Severity, Violation};
use crate::model::BlockKind;
use crate::rule::{Rule, RuleCategory, RuleContext, RuleError};

pub struct BlockDelimiter;

impl Rule for BlockDelimiter {
    fn id(&self) -> &'static str {
        "block-delimiter"
    }

    fn description(&self) -> &'static str {
        "Conditional and loop bodies spanning several lines must use explicit delimiters"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Structure
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let violations = ctx
            .file
            .blocks
            .iter()
            .filter(|b| matches!(b.kind, BlockKind::Conditional | BlockKind::Loop))
            .filter(|b| !b.delimited && !b.is_single_line())
            .map(|b| {
                ctx.violation(
                    self.id(),
                    ctx.severity,
                    b.start.line,
                    b.start.column,
                    &format!("multi-line {} body must be enclosed in braces", b.kind),
                )
            })
            .collect();

        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{positions, run};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_two_line_body_is_reported() {
        let text = "void f() {\n    if (ready)\n        go();\n}\n";
        let violations = run(&BlockDelimiter, "java", text);
        assert_eq!(positions(&violations), vec![(2, 5)]);
        assert_eq!(violations[0].severity, Severity::Error);
        assert_eq!(
            violations[0].message,
            "multi-line conditional body must be enclosed in braces"
        );
    }

    #[test]
    fn test_single_line_and_braced_bodies_pass() {
        let text = "void f() {\n    if (ready) go();\n    while (busy) {\n        spin();\n    }\n}\n";
        assert!(run(&BlockDelimiter, "java", text).is_empty());
    }

    #[test]
    fn test_else_and_loop_bodies() {
        let text = "void f() {\n    if (a)\n        x();\n    else\n        y();\n    for (int i = 0; i < n; i++)\n        z();\n}\n";
        let violations = run(&BlockDelimiter, "java", text);
        assert_eq!(positions(&violations), vec![(2, 5), (4, 5), (6, 5)]);
        assert_eq!(violations[2].message, "multi-line loop body must be enclosed in braces");
    }

    #[test]
    fn test_indent_languages_always_delimit() {
        let text = "if ready:\n    go()\n";
        assert!(run(&BlockDelimiter, "python", text).is_empty());
    }
}
