//! line-length: soft and hard limits on physical line length

use crate::diagnostic::{Severity, Violation};
use crate::rule::{thresholds, ParamKind, ParamSpec, Rule, RuleCategory, RuleContext, RuleError, RuleParams};

const PARAMS: &[ParamSpec] = &[
    ParamSpec::new("soft", ParamKind::Integer, "Length above which a line is reported"),
    ParamSpec::new("hard", ParamKind::Integer, "Length above which a line is always an error"),
];

pub struct LineLength;

impl Rule for LineLength {
    fn id(&self) -> &'static str {
        "line-length"
    }

    fn description(&self) -> &'static str {
        "Lines must stay within the soft and hard length limits"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Layout
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn default_params(&self) -> RuleParams {
        RuleParams::new().with("soft", 80).with("hard", 120)
    }

    fn validate(&self, params: &RuleParams) -> Result<(), RuleError> {
        thresholds(params).map(|_| ())
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let (soft, hard) = thresholds(ctx.params)?;
        let mut violations = Vec::new();

        for line in &ctx.file.lines {
            let (limit, severity) = if line.length > hard {
                (hard, Severity::Error)
            } else if line.length > soft {
                (soft, ctx.severity)
            } else {
                continue;
            };
            violations.push(ctx.violation(
                self.id(),
                severity,
                line.number,
                limit + 1,
                &format!("line is {} characters long (limit {})", line.length, limit),
            ));
        }

        Ok(violations)
    }
}
