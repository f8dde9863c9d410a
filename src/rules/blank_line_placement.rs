//! blank-line-placement: blank lines around blocks and before returns

use crate::diagnostic::Violation;
use crate::model::{Block, BlockKind, SourceFile, TokenKind};
use crate::rule::{ParamKind, ParamSpec, Rule, RuleCategory, RuleContext, RuleError, RuleParams};

const PARAMS: &[ParamSpec] = &[ParamSpec::new(
    "return_keywords",
    ParamKind::StringList,
    "Keywords that must be preceded by a blank line unless they open their block",
)];

pub struct BlankLinePlacement;

/// Whether the blank line above `line` is present, looking past comments
fn blank_above(file: &SourceFile, line: usize) -> bool {
    let n = file.line_above_comments(line);
    n == 0 || file.is_blank_line(n)
}

fn needs_blank_before(file: &SourceFile, block: &Block) -> bool {
    if block.continuation {
        return false;
    }
    let Some(prev) = file.prev_code_token(block.first_token) else {
        return false;
    };
    if file.tokens[prev].end.line >= block.start.line {
        return false;
    }
    let first_in_parent = block
        .parent
        .is_some_and(|id| file.block(id).open_token == prev);
    !first_in_parent
}

fn needs_blank_after(file: &SourceFile, block: &Block) -> bool {
    let Some(next) = file.next_code_token(block.last_token) else {
        return false;
    };
    if file.tokens[next].start.line <= block.end.line {
        return false;
    }
    if block
        .parent
        .is_some_and(|id| next >= file.block(id).last_token)
    {
        return false;
    }
    !file
        .blocks
        .iter()
        .any(|b| b.continuation && b.first_token == next)
}

impl Rule for BlankLinePlacement {
    fn id(&self) -> &'static str {
        "blank-line-placement"
    }

    fn description(&self) -> &'static str {
        "Blocks and return statements are set apart by blank lines"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Layout
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn default_params(&self) -> RuleParams {
        RuleParams::new().with("return_keywords", vec!["return"])
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let file = ctx.file;
        let mut violations = Vec::new();

        for block in &file.blocks {
            if block.kind == BlockKind::Other || !file.starts_statement(block.first_token) {
                continue;
            }
            if needs_blank_before(file, block) && !blank_above(file, block.start.line) {
                violations.push(ctx.violation(
                    self.id(),
                    ctx.severity,
                    block.start.line,
                    block.start.column,
                    &format!("{} block should be preceded by a blank line", block.kind),
                ));
            }
            if needs_blank_after(file, block) && !file.is_blank_line(block.end.line + 1) {
                let last = &file.tokens[block.last_token];
                violations.push(ctx.violation(
                    self.id(),
                    ctx.severity,
                    last.start.line,
                    last.start.column,
                    &format!("{} block should be followed by a blank line", block.kind),
                ));
            }
        }

        let keywords = ctx.params.string_list("return_keywords");
        for (i, token) in file.tokens.iter().enumerate() {
            if token.kind != TokenKind::Keyword || !keywords.contains(&token.text) {
                continue;
            }
            if !file.starts_line(i) || !file.starts_statement(i) {
                continue;
            }
            let Some(prev) = file.prev_code_token(i) else {
                continue;
            };
            let opens_block = file
                .enclosing_block(i)
                .is_some_and(|id| file.block(id).open_token == prev);
            if opens_block || file.tokens[prev].is_punct(":") {
                continue;
            }
            if !blank_above(file, token.start.line) {
                violations.push(ctx.violation(
                    self.id(),
                    ctx.severity,
                    token.start.line,
                    token.start.column,
                    &format!("'{}' should be preceded by a blank line", token.text),
                ));
            }
        }

        Ok(violations)
    }
}
