//! method-separation: a fixed number of blank lines between methods

use crate::diagnostic::Violation;
use crate::model::{BlockId, BlockKind, DeclKind, Declaration, SourceFile};
use crate::rule::{ParamKind, ParamSpec, Rule, RuleCategory, RuleContext, RuleError, RuleParams};

const PARAMS: &[ParamSpec] = &[ParamSpec::new(
    "required",
    ParamKind::Integer,
    "Number of blank lines expected between consecutive methods",
)];

pub struct MethodSeparation;

fn is_method_with_body(decl: &Declaration) -> bool {
    matches!(decl.kind, DeclKind::Method | DeclKind::Constructor) && decl.body.is_some()
}

fn blank_lines_between(file: &SourceFile, after: usize, before: usize) -> usize {
    (after + 1..before)
        .filter(|&n| file.is_blank_line(n))
        .count()
}

impl Rule for MethodSeparation {
    fn id(&self) -> &'static str {
        "method-separation"
    }

    fn description(&self) -> &'static str {
        "Consecutive methods are separated by a fixed number of blank lines"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Layout
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn default_params(&self) -> RuleParams {
        RuleParams::new().with("required", 2)
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let file = ctx.file;
        let required = ctx
            .params
            .usize("required")
            .ok_or_else(|| RuleError::invalid_param("required", "missing"))?;
        let mut violations = Vec::new();

        for (i, block) in file.blocks.iter().enumerate() {
            if block.kind != BlockKind::Class {
                continue;
            }
            let members = file.declarations_in(BlockId(i));
            for pair in members.windows(2) {
                let (prev, cur) = (pair[0], pair[1]);
                if !is_method_with_body(prev) || !is_method_with_body(cur) {
                    continue;
                }
                let found = blank_lines_between(file, prev.end_line, cur.start_line);
                if found != required {
                    violations.push(ctx.violation(
                        self.id(),
                        ctx.severity,
                        cur.position.line,
                        cur.position.column,
                        &format!(
                            "expected {} blank line{} before method '{}', found {}",
                            required,
                            if required == 1 { "" } else { "s" },
                            cur.name,
                            found
                        ),
                    ));
                }
            }
        }

        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{positions, run, run_with};
    use pretty_assertions::assert_eq;

    const JAVA: &str = "\
class Shop {
    void open() {
    }

    void close() {
    }


    void count() {
    }
}
";

    #[test]
    fn test_one_blank_line_is_reported() {
        let violations = run(&MethodSeparation, "java", JAVA);
        assert_eq!(positions(&violations), vec![(5, 10)]);
        assert_eq!(
            violations[0].message,
            "expected 2 blank lines before method 'close', found 1"
        );
    }

    #[test]
    fn test_fields_and_abstract_methods_are_skipped() {
        let text = "\
abstract class Base {
    int size;
    abstract void a();
    abstract void b();
    void c() {
    }
}
";
        assert!(run(&MethodSeparation, "java", text).is_empty());
    }

    #[test]
    fn test_python_single_blank_line() {
        let text = "\
class Repo:
    def __init__(self):
        self.items = []

    def add(self, item):
        self.items.append(item)
    def size(self):
        return len(self.items)
";
        let params = RuleParams::new().with("required", 1);
        let violations = run_with(&MethodSeparation, "python", text, &params);
        assert_eq!(positions(&violations), vec![(7, 9)]);
        assert_eq!(
            violations[0].message,
            "expected 1 blank line before method 'size', found 0"
        );
    }
}
