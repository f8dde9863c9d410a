//! Adapter for indentation-delimited languages
//!
//! Physical lines are joined into logical lines (open brackets, trailing
//! `\`). A logical line that starts with a compound keyword and has a
//! header colon opens a block; its body is the run of following logical
//! lines indented deeper than the header.

use crate::adapter::{link_parents, match_brackets, LanguageAdapter, ParseError};
use crate::language::{contains, LanguageSyntax};
use crate::model::{
    enclosing_block, is_upper_case_name, Block, BlockId, BlockKind, DeclKind, Declaration, Token,
    TokenKind,
};
use std::collections::HashSet;

/// Adapter for Python-style syntax
pub struct IndentAdapter {
    syntax: LanguageSyntax,
}

impl IndentAdapter {
    pub fn new(syntax: LanguageSyntax) -> Self {
        Self { syntax }
    }
}

impl LanguageAdapter for IndentAdapter {
    fn syntax(&self) -> &LanguageSyntax {
        &self.syntax
    }

    fn delimit_blocks(&self, tokens: &[Token]) -> Result<Vec<Block>, ParseError> {
        let layout = Layout::new(&self.syntax, tokens)?;
        Ok(link_parents(layout.blocks()?))
    }

    fn classify_declarations(&self, tokens: &[Token], blocks: &[Block]) -> Vec<Declaration> {
        match Layout::new(&self.syntax, tokens) {
            Ok(layout) => layout.declarations(blocks),
            Err(_) => Vec::new(),
        }
    }
}

/// Soft keywords that only open a block when the line ends in `:`
const SOFT_HEADERS: &[&str] = &["match", "case"];

/// Physical lines joined by open brackets or a trailing backslash.
/// `first` and `last` are code positions.
#[derive(Debug, Clone, Copy)]
struct LogicalLine {
    first: usize,
    last: usize,
    indent: usize,
}

struct Layout<'a> {
    syntax: &'a LanguageSyntax,
    tokens: &'a [Token],
    code: Vec<usize>,
    lines: Vec<LogicalLine>,
}

impl<'a> Layout<'a> {
    fn new(syntax: &'a LanguageSyntax, tokens: &'a [Token]) -> Result<Self, ParseError> {
        let code: Vec<usize> = (0..tokens.len())
            .filter(|&i| tokens[i].kind.is_code())
            .collect();
        match_brackets(tokens, &code)?;

        let mut lines: Vec<LogicalLine> = Vec::new();
        let mut depth = 0usize;
        for (p, &i) in code.iter().enumerate() {
            let token = &tokens[i];
            let joined = p > 0 && {
                let prev = &tokens[code[p - 1]];
                depth > 0 || prev.end.line >= token.start.line || prev.is_punct("\\")
            };
            match lines.last_mut() {
                Some(line) if joined => line.last = p,
                _ => lines.push(LogicalLine {
                    first: p,
                    last: p,
                    indent: token.start.column,
                }),
            }
            if token.kind == TokenKind::Delimiter {
                match token.text.as_str() {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" => depth = depth.saturating_sub(1),
                    _ => {}
                }
            }
        }

        Ok(Self {
            syntax,
            tokens,
            code,
            lines,
        })
    }

    fn tok(&self, p: usize) -> &'a Token {
        &self.tokens[self.code[p]]
    }

    fn is(&self, p: usize, text: &str) -> bool {
        p < self.code.len() && self.tok(p).is_punct(text)
    }

    fn kw(&self, p: usize, list: &[String]) -> bool {
        p < self.code.len()
            && self.tok(p).kind == TokenKind::Keyword
            && contains(list, &self.tok(p).text)
    }

    /// Skip a leading `async`
    fn head(&self, line: &LogicalLine) -> usize {
        if line.first < line.last && self.kw(line.first, &self.syntax.keywords.modifiers) {
            line.first + 1
        } else {
            line.first
        }
    }

    /// Position of the compound keyword if the line is a block header
    fn header_word(&self, line: &LogicalLine) -> Option<usize> {
        let k = &self.syntax.keywords;
        let h = self.head(line);
        let compound = [
            &k.conditional,
            &k.continuation,
            &k.loops,
            &k.try_blocks,
            &k.switch,
            &k.class,
            &k.method,
        ]
        .iter()
        .any(|list| self.kw(h, list))
            || self.tok(h).is_keyword("with");
        let soft = self.tok(h).kind == TokenKind::Identifier
            && SOFT_HEADERS.contains(&self.tok(h).text.as_str())
            && h + 1 < line.last
            && self.is(line.last, ":");
        (compound || soft).then_some(h)
    }

    /// The colon ending a header, skipping colons that belong to lambdas
    fn header_colon(&self, line: &LogicalLine, h: usize) -> Option<usize> {
        let mut depth = 0i32;
        let mut lambdas = 0usize;
        for p in h + 1..=line.last {
            let t = self.tok(p);
            if depth == 0 && t.is_keyword("lambda") {
                lambdas += 1;
                continue;
            }
            if t.kind != TokenKind::Delimiter {
                continue;
            }
            match t.text.as_str() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth -= 1,
                ":" if depth == 0 => {
                    if lambdas == 0 {
                        return Some(p);
                    }
                    lambdas -= 1;
                }
                _ => {}
            }
        }
        None
    }

    /// First code position of the decorators stacked on line `i`
    fn decorated_start(&self, i: usize) -> usize {
        let line = &self.lines[i];
        let mut first = line.first;
        for above in self.lines[..i].iter().rev() {
            if above.indent != line.indent || !self.is(above.first, "@") {
                break;
            }
            first = above.first;
        }
        first
    }

    fn kind_of(&self, h: usize) -> BlockKind {
        let k = &self.syntax.keywords;
        if self.kw(h, &k.conditional) {
            BlockKind::Conditional
        } else if self.kw(h, &k.loops) {
            BlockKind::Loop
        } else if self.kw(h, &k.try_blocks) {
            BlockKind::Try
        } else if self.kw(h, &k.class) {
            BlockKind::Class
        } else if self.kw(h, &k.method) {
            BlockKind::Method
        } else if self.kw(h, &k.switch) || self.tok(h).text == "match" {
            BlockKind::Switch
        } else {
            BlockKind::Other
        }
    }

    fn blocks(&self) -> Result<Vec<Block>, ParseError> {
        let mut blocks = Vec::new();

        for (i, line) in self.lines.iter().enumerate() {
            let Some(h) = self.header_word(line) else {
                continue;
            };
            let Some(colon) = self.header_colon(line, h) else {
                continue;
            };

            let last = if colon < line.last {
                line.last
            } else {
                let body = self.lines[i + 1..]
                    .iter()
                    .take_while(|l| l.indent > line.indent)
                    .last();
                match body {
                    Some(l) => l.last,
                    None => {
                        return Err(ParseError::Invalid {
                            line: self.tok(colon).start.line,
                            message: "expected an indented block".to_string(),
                        })
                    }
                }
            };

            let kind = self.kind_of(h);
            let first = match kind {
                BlockKind::Method | BlockKind::Class => self.decorated_start(i),
                _ => line.first,
            };
            blocks.push(Block {
                kind,
                start: self.tok(first).start,
                end: self.tok(last).end,
                first_token: self.code[first],
                open_token: self.code[colon],
                last_token: self.code[last],
                header: self.code[line.first]..self.code[colon],
                delimited: true,
                continuation: self.kw(h, &self.syntax.keywords.continuation),
                parent: None,
            });
        }

        Ok(blocks)
    }

    fn variable_kind(&self, name: &str, in_class: bool) -> DeclKind {
        if is_upper_case_name(name) {
            DeclKind::Constant
        } else if in_class {
            DeclKind::Field
        } else {
            DeclKind::Variable
        }
    }

    fn declarations(&self, blocks: &[Block]) -> Vec<Declaration> {
        let k = &self.syntax.keywords;
        let mut declarations = Vec::new();
        // only the first assignment of a name declares it
        let mut assigned: HashSet<(Option<BlockId>, String)> = HashSet::new();

        for (i, line) in self.lines.iter().enumerate() {
            let h = self.head(line);
            let block = enclosing_block(blocks, self.code[line.first]);
            let in_class = block.is_some_and(|b| blocks[b.0].kind == BlockKind::Class);

            let (name, kind, body) = if self.kw(h, &k.method) || self.kw(h, &k.class) {
                let name = h + 1;
                if name > line.last || self.tok(name).kind != TokenKind::Identifier {
                    continue;
                }
                let kind = if self.kw(h, &k.class) {
                    DeclKind::Class
                } else if self.syntax.is_constructor_name(&self.tok(name).text) {
                    DeclKind::Constructor
                } else {
                    DeclKind::Method
                };
                let body = blocks
                    .iter()
                    .position(|b| b.header.start == self.code[line.first])
                    .map(BlockId);
                (name, kind, body)
            } else if self.tok(h).kind == TokenKind::Identifier
                && h < line.last
                && (self.is(h + 1, "=") || self.is(h + 1, ":"))
            {
                let text = &self.tok(h).text;
                if !assigned.insert((block, text.clone())) {
                    continue;
                }
                (h, self.variable_kind(text, in_class), None)
            } else {
                continue;
            };

            let name_token = self.tok(name);
            let visibility = self
                .syntax
                .name_visibility(&name_token.text)
                .unwrap_or(self.syntax.default_visibility);
            let (end_line, last_token) = match body {
                Some(b) => (blocks[b.0].end.line, blocks[b.0].last_token),
                None => (self.tok(line.last).end.line, self.code[line.last]),
            };
            let first = self.decorated_start(i);

            declarations.push(Declaration {
                name: name_token.text.clone(),
                kind,
                visibility,
                block,
                position: name_token.start,
                start_line: self.tok(first).start.line,
                end_line,
                first_token: self.code[first],
                last_token,
                body,
            });
        }

        declarations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::LanguageRegistry;
    use crate::model::{SourceFile, Visibility};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn parse(text: &str) -> Result<SourceFile, ParseError> {
        let registry = LanguageRegistry::builtin().expect("registry");
        let adapter = registry.get("python").expect("python");
        adapter.parse(text, Path::new("test.py"))
    }

    const PYTHON: &str = "\
import os

MAX_SIZE = 10


class Account:
    limit = 5

    def __init__(self, owner):
        self._owner = owner

    @property
    def owner(self):
        if self._owner and len(self._owner) > 0:
            return self._owner
        else:
            return None

    def _reset(self):
        for i in range(3): pass
        while True:
            break


def __helper():
    return [x for x in (1, 2,
                        3)]
";

    #[test]
    fn test_python_blocks() {
        let file = parse(PYTHON).expect("parse");
        let blocks: Vec<_> = file
            .blocks
            .iter()
            .map(|b| (b.kind, b.start.line, b.end.line, b.continuation))
            .collect();
        assert_eq!(
            blocks,
            vec![
                (BlockKind::Class, 6, 22, false),
                (BlockKind::Method, 9, 10, false),
                (BlockKind::Method, 12, 17, false),
                (BlockKind::Conditional, 14, 15, false),
                (BlockKind::Conditional, 16, 17, true),
                (BlockKind::Method, 19, 22, false),
                (BlockKind::Loop, 20, 20, false),
                (BlockKind::Loop, 21, 22, false),
                (BlockKind::Method, 25, 27, false),
            ]
        );
        assert!(file.blocks.iter().all(|b| b.delimited));
        assert_eq!(file.blocks[3].parent, Some(BlockId(2)));
        assert_eq!(file.blocks[1].parent, Some(BlockId(0)));
        assert_eq!(file.blocks[8].parent, None);
    }

    #[test]
    fn test_python_declarations() {
        let file = parse(PYTHON).expect("parse");
        let decls: Vec<_> = file
            .declarations
            .iter()
            .map(|d| (d.name.as_str(), d.kind, d.visibility))
            .collect();
        assert_eq!(
            decls,
            vec![
                ("MAX_SIZE", DeclKind::Constant, Visibility::Public),
                ("Account", DeclKind::Class, Visibility::Public),
                ("limit", DeclKind::Field, Visibility::Public),
                ("__init__", DeclKind::Constructor, Visibility::Public),
                ("owner", DeclKind::Method, Visibility::Public),
                ("_reset", DeclKind::Method, Visibility::Protected),
                ("__helper", DeclKind::Method, Visibility::Private),
            ]
        );

        let owner = &file.declarations[4];
        assert_eq!(owner.start_line, 12);
        assert_eq!(owner.end_line, 17);
        assert_eq!(owner.body, Some(BlockId(2)));
    }

    #[test]
    fn test_lambda_colon_is_not_header() {
        let file = parse("handler = lambda x: x\nif check(lambda v: v): run()\n").expect("parse");
        assert_eq!(file.blocks.len(), 1);
        assert_eq!(file.blocks[0].kind, BlockKind::Conditional);
        assert_eq!(file.blocks[0].start.line, 2);
        assert!(file.blocks[0].is_single_line());
    }

    #[test]
    fn test_soft_match_statement() {
        let file = parse("match command:\n    case 1:\n        go()\nmatch = 3\n").expect("parse");
        let kinds: Vec<_> = file.blocks.iter().map(|b| b.kind).collect();
        assert_eq!(kinds, vec![BlockKind::Switch, BlockKind::Other]);
    }

    #[test]
    fn test_missing_indented_block() {
        let err = parse("def f():\nreturn 1\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::Invalid {
                line: 1,
                message: "expected an indented block".to_string()
            }
        );
    }

    #[test]
    fn test_unbalanced_bracket() {
        let err = parse("x = (1,\n").unwrap_err();
        assert_eq!(err.line(), 1);
    }
}
