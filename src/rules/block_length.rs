//! block-length: method bodies kept short

use crate::diagnostic::{Severity, Violation};
use crate::model::BlockKind;
use crate::rule::{thresholds, ParamKind, ParamSpec, Rule, RuleCategory, RuleContext, RuleError, RuleParams};

const PARAMS: &[ParamSpec] = &[
    ParamSpec::new("soft", ParamKind::Integer, "Line count above which a method gets an advisory"),
    ParamSpec::new("hard", ParamKind::Integer, "Line count above which a method is reported"),
];

pub struct BlockLength;

impl Rule for BlockLength {
    fn id(&self) -> &'static str {
        "block-length"
    }

    fn description(&self) -> &'static str {
        "Methods should stay within the soft and hard line limits"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Structure
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn default_params(&self) -> RuleParams {
        RuleParams::new().with("soft", 15).with("hard", 25)
    }

    fn validate(&self, params: &RuleParams) -> Result<(), RuleError> {
        thresholds(params).map(|_| ())
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let (soft, hard) = thresholds(ctx.params)?;
        let mut violations = Vec::new();

        for block in ctx.file.blocks.iter().filter(|b| b.kind == BlockKind::Method) {
            let lines = block.line_count();
            let (limit, severity) = if lines > hard {
                (hard, ctx.severity)
            } else if lines > soft {
                (soft, Severity::Advisory)
            } else {
                continue;
            };
            violations.push(ctx.violation(
                self.id(),
                severity,
                block.start.line,
                block.start.column,
                &format!("method spans {} lines (limit {})", lines, limit),
            ));
        }

        Ok(violations)
    }
}
