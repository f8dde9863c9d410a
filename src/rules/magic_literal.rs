//! magic-literal: unnamed literals used in comparisons or passed to calls

use crate::diagnostic::Violation;
use crate::model::{DeclKind, SourceFile, Token, TokenKind};
use crate::rule::{ParamKind, ParamSpec, Rule, RuleCategory, RuleContext, RuleError, RuleParams};
use std::collections::HashSet;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::new(
        "allowed",
        ParamKind::StringList,
        "Literal values that are never reported (strings written with double quotes)",
    ),
    ParamSpec::new("strings", ParamKind::Boolean, "Also check string literals"),
];

const COMPARISONS: &[&str] = &["==", "!=", "===", "!==", "<", ">", "<=", ">=", "<=>"];

pub struct MagicLiteral;

/// Canonical spelling used for allow-list lookups
fn normalize(token: &Token, negative: bool) -> String {
    match token.kind {
        TokenKind::Str => {
            let quote = token.text.chars().next().unwrap_or('"');
            let inner = token.text.trim_start_matches(quote).trim_end_matches(quote);
            format!("\"{}\"", inner)
        }
        TokenKind::Boolean => token.text.to_lowercase(),
        _ if negative => format!("-{}", token.text),
        _ => token.text.clone(),
    }
}

fn is_comparison(token: &Token) -> bool {
    token.kind == TokenKind::Operator && COMPARISONS.contains(&token.text.as_str())
}

/// Code token indices, with whether each sits directly inside call parens
struct CallSites {
    code: Vec<usize>,
    call_paren: Vec<bool>,
}

impl CallSites {
    fn new(file: &SourceFile) -> Self {
        let code: Vec<usize> = (0..file.tokens.len())
            .filter(|&i| file.tokens[i].kind.is_code())
            .collect();
        let mut call_paren = vec![false; code.len()];
        let mut stack: Vec<bool> = Vec::new();

        for (p, &i) in code.iter().enumerate() {
            let token = &file.tokens[i];
            if token.is_punct(")") || token.is_punct("]") || token.is_punct("}") {
                stack.pop();
            }
            call_paren[p] = stack.last().copied().unwrap_or(false);
            if token.is_punct("(") {
                let callee = p
                    .checked_sub(1)
                    .map(|q| &file.tokens[code[q]])
                    .is_some_and(|t| t.kind == TokenKind::Identifier);
                stack.push(callee);
            } else if token.is_punct("[") || token.is_punct("{") {
                stack.push(false);
            }
        }

        Self { code, call_paren }
    }
}

impl Rule for MagicLiteral {
    fn id(&self) -> &'static str {
        "magic-literal"
    }

    fn description(&self) -> &'static str {
        "Literals compared against or passed to calls should be named constants"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Clarity
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn default_params(&self) -> RuleParams {
        RuleParams::new()
            .with("allowed", vec!["0", "1", "-1", "\"\"", "true", "false"])
            .with("strings", true)
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let file = ctx.file;
        let allowed: HashSet<String> = ctx.params.string_list("allowed").into_iter().collect();
        let check_strings = ctx.params.bool("strings").unwrap_or(true);
        let constant_spans: Vec<(usize, usize)> = file
            .declarations
            .iter()
            .filter(|d| d.kind == DeclKind::Constant)
            .map(|d| (d.first_token, d.last_token))
            .collect();

        let sites = CallSites::new(file);
        let tok = |p: usize| &file.tokens[sites.code[p]];
        let mut violations = Vec::new();

        for p in 0..sites.code.len() {
            let token = tok(p);
            let wanted = match token.kind {
                TokenKind::Number | TokenKind::Boolean => true,
                TokenKind::Str => check_strings,
                _ => false,
            };
            if !wanted {
                continue;
            }

            // unary minus belongs to the literal
            let mut before = p.checked_sub(1);
            let mut negative = false;
            if let Some(q) = before {
                let unary = q.checked_sub(1).map(tok).is_none_or(|t| {
                    matches!(t.kind, TokenKind::Operator | TokenKind::Delimiter)
                        && !t.is_punct(")")
                        && !t.is_punct("]")
                });
                if tok(q).is_punct("-") && unary {
                    negative = true;
                    before = q.checked_sub(1);
                }
            }
            let prev = before.map(tok);
            let next = (p + 1 < sites.code.len()).then(|| tok(p + 1));

            let compared = prev.is_some_and(is_comparison) || next.is_some_and(is_comparison);
            let argument = sites.call_paren[p]
                && prev.is_some_and(|t| t.is_punct("(") || t.is_punct(","))
                && next.is_some_and(|t| t.is_punct(")") || t.is_punct(","));
            if !compared && !argument {
                continue;
            }

            let index = sites.code[p];
            if constant_spans.iter().any(|&(s, e)| index >= s && index <= e) {
                continue;
            }
            let value = normalize(token, negative);
            if allowed.contains(&value) {
                continue;
            }

            let usage = if compared { "comparison" } else { "call argument" };
            let column = if negative {
                token.start.column.saturating_sub(1).max(1)
            } else {
                token.start.column
            };
            violations.push(ctx.violation(
                self.id(),
                ctx.severity,
                token.start.line,
                column,
                &format!("magic literal {} in {}; use a named constant", value, usage),
            ));
        }

        Ok(violations)
    }
}
