//! explanatory-comment: comments that explain a compound condition

use crate::diagnostic::{Severity, Violation};
use crate::model::{Block, BlockKind, SourceFile, TokenKind};
use crate::rule::{ParamKind, ParamSpec, Rule, RuleCategory, RuleContext, RuleError, RuleParams};

const PARAMS: &[ParamSpec] = &[ParamSpec::new(
    "operators",
    ParamKind::StringList,
    "Operators and keywords that make a condition compound",
)];

pub struct ExplanatoryComment;

fn is_compound(file: &SourceFile, block: &Block, operators: &[String]) -> bool {
    file.tokens[block.header.clone()].iter().any(|t| {
        matches!(t.kind, TokenKind::Operator | TokenKind::Keyword) && operators.contains(&t.text)
    })
}

fn has_comment_above(file: &SourceFile, block: &Block) -> bool {
    let Some(prev) = block.first_token.checked_sub(1) else {
        return false;
    };
    let token = &file.tokens[prev];
    token.kind == TokenKind::Comment && token.end.line + 1 >= block.start.line
}

impl Rule for ExplanatoryComment {
    fn id(&self) -> &'static str {
        "explanatory-comment"
    }

    fn description(&self) -> &'static str {
        "Compound conditions explained by a comment read better as a named boolean"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Clarity
    }

    fn default_severity(&self) -> Severity {
        Severity::Advisory
    }

    fn is_advisory(&self) -> bool {
        true
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn default_params(&self) -> RuleParams {
        RuleParams::new().with("operators", vec!["&&", "||", "and", "or"])
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let file = ctx.file;
        let operators = ctx.params.string_list("operators");

        let violations = file
            .blocks
            .iter()
            .filter(|b| b.kind == BlockKind::Conditional)
            .filter(|b| has_comment_above(file, b) && is_compound(file, b, &operators))
            .map(|b| {
                ctx.violation(
                    self.id(),
                    ctx.severity,
                    b.start.line,
                    b.start.column,
                    "compound condition explained by a comment; consider extracting a named boolean",
                )
            })
            .collect();

        Ok(violations)
    }
}
