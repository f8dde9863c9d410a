//! Adapter for brace-delimited languages
//!
//! Blocks are found from matched `{}` pairs; the tokens in front of each
//! opening brace (its header) decide the block kind. Bodies written without
//! braces (`if (x) return;`) are found from the control keyword forward.
//! Declarations are recognised at statement starts from their token shape.

use crate::adapter::{link_parents, match_brackets, LanguageAdapter, ParseError};
use crate::language::{contains, LanguageSyntax};
use crate::model::{
    enclosing_block, is_upper_case_name, Block, BlockId, BlockKind, DeclKind, Declaration, Token,
    TokenKind, Visibility,
};
use std::collections::HashMap;

/// Adapter for C-family syntax (Java, C#, JavaScript, Go, Rust, ...)
pub struct BraceAdapter {
    syntax: LanguageSyntax,
}

impl BraceAdapter {
    pub fn new(syntax: LanguageSyntax) -> Self {
        Self { syntax }
    }
}

impl LanguageAdapter for BraceAdapter {
    fn syntax(&self) -> &LanguageSyntax {
        &self.syntax
    }

    fn delimit_blocks(&self, tokens: &[Token]) -> Result<Vec<Block>, ParseError> {
        let scan = Scan::new(&self.syntax, tokens)?;
        let mut blocks = scan.brace_blocks();
        if self.syntax.braces_optional {
            blocks.extend(scan.undelimited_blocks());
        }
        Ok(link_parents(blocks))
    }

    fn classify_declarations(&self, tokens: &[Token], blocks: &[Block]) -> Vec<Declaration> {
        match Scan::new(&self.syntax, tokens) {
            Ok(scan) => scan.declarations(blocks),
            Err(_) => Vec::new(),
        }
    }
}

/// Keywords that continue a declaration header on a new line
const HEADER_CLAUSES: &[&str] = &["extends", "implements", "throws", "where"];

/// How the backwards header walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderStop {
    /// Reached the start of a statement
    Statement,
    /// Ran into an enclosing `(`, `[` or `,`: the block sits inside an expression
    Nested,
}

/// How a typed declaration head ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Assign,
    Semicolon,
    Comma,
    Colon,
    Paren(usize),
    Brace,
    LineEnd,
}

/// Token stream view over code tokens only. Positions (`p`, `q`, ...) index
/// `code`; `code[p]` is the index into `tokens`.
struct Scan<'a> {
    syntax: &'a LanguageSyntax,
    tokens: &'a [Token],
    code: Vec<usize>,
    partner: Vec<Option<usize>>,
}

impl<'a> Scan<'a> {
    fn new(syntax: &'a LanguageSyntax, tokens: &'a [Token]) -> Result<Self, ParseError> {
        let code: Vec<usize> = (0..tokens.len())
            .filter(|&i| tokens[i].kind.is_code())
            .collect();
        let partner = match_brackets(tokens, &code)?;
        Ok(Self {
            syntax,
            tokens,
            code,
            partner,
        })
    }

    fn len(&self) -> usize {
        self.code.len()
    }

    fn tok(&self, p: usize) -> &'a Token {
        &self.tokens[self.code[p]]
    }

    fn is(&self, p: usize, text: &str) -> bool {
        p < self.len() && self.tok(p).is_punct(text)
    }

    fn kw(&self, p: usize, list: &[String]) -> bool {
        p < self.len() && self.tok(p).kind == TokenKind::Keyword && contains(list, &self.tok(p).text)
    }

    fn is_ident(&self, p: usize) -> bool {
        p < self.len() && self.tok(p).kind == TokenKind::Identifier
    }

    fn is_opener(&self, p: usize) -> bool {
        self.is(p, "(") || self.is(p, "[") || self.is(p, "{")
    }

    fn line_break_after(&self, p: usize) -> bool {
        p + 1 < self.len() && self.tok(p).end.line < self.tok(p + 1).start.line
    }

    /// A token after which the expression must go on
    fn continues_expression(&self, p: usize) -> bool {
        let t = self.tok(p);
        match t.kind {
            TokenKind::Operator => !matches!(t.text.as_str(), "++" | "--"),
            TokenKind::Delimiter => matches!(t.text.as_str(), "," | "(" | "[" | "."),
            _ => false,
        }
    }

    /// A token that can only continue the previous line
    fn starts_continuation(&self, p: usize) -> bool {
        let t = self.tok(p);
        match t.kind {
            TokenKind::Operator => !matches!(t.text.as_str(), "++" | "--" | "!" | "~" | "-"),
            TokenKind::Delimiter => t.text == ".",
            _ => false,
        }
    }

    /// A keyword that can only begin a statement or declaration
    fn starts_statement(&self, p: usize) -> bool {
        let k = &self.syntax.keywords;
        if self.is(p, "@") {
            return true;
        }
        [
            &k.conditional,
            &k.loops,
            &k.try_blocks,
            &k.switch,
            &k.class,
            &k.extension,
            &k.method,
            &k.binding,
            &k.returns,
            &k.public,
            &k.protected,
            &k.private,
            &k.modifiers,
        ]
        .iter()
        .any(|list| self.kw(p, list))
    }

    /// Start of an annotation (`@Name`, `@a.b.Name(...)`) ending at `q`
    fn annotation_start(&self, q: usize) -> Option<usize> {
        let mut p = q;
        if self.is(p, ")") {
            p = self.partner[p]?.checked_sub(1)?;
        }
        if !self.is_ident(p) {
            return None;
        }
        while p >= 2 && self.is(p - 1, ".") && self.is_ident(p - 2) {
            p -= 2;
        }
        (p >= 1 && self.is(p - 1, "@")).then(|| p - 1)
    }

    /// Whether `[...]` ending at `q` is an attribute list (`[HttpGet]`)
    fn is_attribute(&self, q: usize) -> bool {
        if !self.is(q, "]") {
            return false;
        }
        match self.partner[q] {
            Some(0) => true,
            Some(o) => {
                self.is(o - 1, ";")
                    || self.is(o - 1, "{")
                    || self.is(o - 1, "}")
                    || self.is(o - 1, "]")
                    || self.line_break_after(o - 1)
            }
            None => false,
        }
    }

    /// Whether the header walk may cross the line break between `q` and `p`
    fn joins_lines(&self, q: usize, p: usize) -> bool {
        if self.continues_expression(q)
            || self.starts_continuation(p)
            || self.annotation_start(q).is_some()
            || self.is_attribute(q)
        {
            return true;
        }
        self.tok(p).kind == TokenKind::Keyword
            && HEADER_CLAUSES.contains(&self.tok(p).text.as_str())
    }

    /// Walk back from an opening brace to the start of its header
    fn header_start(&self, open: usize) -> (usize, HeaderStop) {
        let mut p = open;
        while p > 0 {
            let q = p - 1;
            if p < open && self.tok(q).end.line < self.tok(p).start.line && !self.joins_lines(q, p) {
                return (p, HeaderStop::Statement);
            }
            let t = self.tok(q);
            if t.kind == TokenKind::Delimiter {
                match t.text.as_str() {
                    ";" => {
                        if let Some(control) = self.control_before_semicolon(q) {
                            return (control, HeaderStop::Statement);
                        }
                        return (p, HeaderStop::Statement);
                    }
                    "{" | "}" => return (p, HeaderStop::Statement),
                    "," | "(" | "[" => return (p, HeaderStop::Nested),
                    ")" | "]" => {
                        p = self.partner[q].unwrap_or(q);
                        continue;
                    }
                    _ => {}
                }
            }
            p = q;
        }
        (p, HeaderStop::Statement)
    }

    /// Paren-less control headers with clauses (`for i := 0; i < n; i++ {`)
    fn control_before_semicolon(&self, semi: usize) -> Option<usize> {
        if self.syntax.braces_optional {
            return None;
        }
        let line = self.tok(semi).start.line;
        let k = &self.syntax.keywords;
        let mut p = semi;
        while p > 0 {
            p -= 1;
            if self.tok(p).start.line != line || self.is(p, "{") || self.is(p, "}") {
                return None;
            }
            if self.is(p, ")") {
                p = self.partner[p]?;
                continue;
            }
            if self.kw(p, &k.loops) || self.kw(p, &k.conditional) || self.kw(p, &k.switch) {
                return Some(p);
            }
        }
        None
    }

    /// Skip annotations, attributes, modifiers and visibility keywords.
    /// Returns the first meaningful position and any visibility seen.
    fn skip_prefix(&self, from: usize, limit: usize) -> (usize, Option<Visibility>) {
        let k = &self.syntax.keywords;
        let mut p = from;
        let mut visibility = None;

        while p < limit {
            if self.is(p, "@") && (self.is_ident(p + 1) || self.kw(p + 1, &k.class)) {
                p += 2;
                while self.is(p, ".") && self.is_ident(p + 1) {
                    p += 2;
                }
                if self.is(p, "(") {
                    p = self.partner[p].map_or(limit, |q| q + 1);
                }
                continue;
            }
            if self.is(p, "[") {
                if let Some(q) = self.partner[p] {
                    if q + 1 < limit && self.is_attribute(q) && !self.continues_expression(q + 1) {
                        p = q + 1;
                        continue;
                    }
                }
                break;
            }
            if self.tok(p).kind != TokenKind::Keyword || self.is(p + 1, ":") {
                break;
            }
            let word = self.tok(p).text.as_str();
            if let Some(v) = k.visibility(word) {
                visibility = Some(v);
                p += 1;
                if self.is(p, "(") {
                    // pub(crate)
                    p = self.partner[p].map_or(limit, |q| q + 1);
                }
            } else if contains(&k.modifiers, word) && !self.is(p + 1, "(") {
                p += 1;
            } else if word == "default" && visibility.is_some() {
                p += 1;
            } else {
                break;
            }
        }

        (p.min(limit), visibility)
    }

    fn has_assignment(&self, from: usize, to: usize) -> Option<usize> {
        let mut p = from;
        while p < to {
            if self.is(p, "(") || self.is(p, "[") {
                p = self.partner[p].map_or(to, |q| q + 1);
                continue;
            }
            if self.is(p, "=") || self.is(p, ":=") {
                return Some(p);
            }
            p += 1;
        }
        None
    }

    fn has_lambda_arrow(&self, from: usize, to: usize) -> bool {
        (from..to).any(|p| {
            let t = self.tok(p);
            t.kind == TokenKind::Operator && contains(&self.syntax.lambda_arrows, &t.text)
        })
    }

    /// Decide the kind of a braced block from its header
    fn classify(&self, start: usize, open: usize, stop: HeaderStop) -> (BlockKind, bool) {
        let k = &self.syntax.keywords;
        if start == open {
            return (BlockKind::Other, false);
        }

        if self.kw(start, &k.continuation) {
            let kind = if self.kw(start, &k.conditional) || self.kw(start + 1, &k.conditional) {
                BlockKind::Conditional
            } else if self.kw(start, &k.try_blocks) {
                BlockKind::Try
            } else if self.kw(start, &k.loops) {
                BlockKind::Loop
            } else {
                BlockKind::Other
            };
            return (kind, true);
        }

        let (first, _) = self.skip_prefix(start, open);
        if first >= open {
            return (BlockKind::Other, false);
        }
        if self.kw(first, &k.conditional) {
            return (BlockKind::Conditional, false);
        }
        if self.kw(first, &k.loops) {
            return (BlockKind::Loop, false);
        }
        if self.kw(first, &k.try_blocks) {
            return (BlockKind::Try, false);
        }
        if self.kw(first, &k.switch) {
            return (BlockKind::Switch, false);
        }
        if self.kw(first, &k.returns) {
            return (BlockKind::Other, false);
        }

        if let Some(assign) = self.has_assignment(first, open) {
            let function_value = (assign + 1..open).any(|p| self.kw(p, &k.method))
                || self.has_lambda_arrow(assign + 1, open);
            let kind = if function_value && stop == HeaderStop::Statement {
                BlockKind::Method
            } else {
                BlockKind::Other
            };
            return (kind, false);
        }

        let paren = (first..open).find(|&p| self.is(p, "(")).unwrap_or(open);
        if (first..paren).any(|p| self.kw(p, &k.class) || self.kw(p, &k.extension)) {
            return (BlockKind::Class, false);
        }
        if (first..paren).any(|p| self.tok(p).text == "new") {
            return (BlockKind::Other, false);
        }
        if (first..open).any(|p| self.kw(p, &k.method)) {
            let kind = match stop {
                HeaderStop::Statement => BlockKind::Method,
                HeaderStop::Nested => BlockKind::Other,
            };
            return (kind, false);
        }
        if self.has_lambda_arrow(first, open) || self.kw(first, &k.reserved) {
            return (BlockKind::Other, false);
        }

        if paren < open && paren > first && self.is_ident(paren - 1) && stop == HeaderStop::Statement
        {
            let name = &self.tok(paren - 1).text;
            if !self.syntax.keyword_functions || self.syntax.is_constructor_name(name) {
                return (BlockKind::Method, false);
            }
        }

        (BlockKind::Other, false)
    }

    /// Header runs from `first` up to the opening brace, or through the
    /// last header token when the body is undelimited
    fn make_block(
        &self,
        kind: BlockKind,
        first: usize,
        open: usize,
        last: usize,
        delimited: bool,
        continuation: bool,
    ) -> Block {
        let header_end = if delimited {
            self.code[open]
        } else {
            self.code[open] + 1
        };
        Block {
            kind,
            start: self.tok(first).start,
            end: self.tok(last).end,
            first_token: self.code[first],
            open_token: self.code[open],
            last_token: self.code[last],
            header: self.code[first]..header_end,
            delimited,
            continuation,
            parent: None,
        }
    }

    /// One block per matched `{}` pair
    fn brace_blocks(&self) -> Vec<Block> {
        let mut blocks = Vec::new();
        for open in 0..self.len() {
            if !self.is(open, "{") {
                continue;
            }
            let Some(close) = self.partner[open] else {
                continue;
            };
            let (start, stop) = self.header_start(open);
            let (kind, continuation) = self.classify(start, open, stop);
            blocks.push(self.make_block(kind, start, open, close, true, continuation));
        }
        blocks
    }

    /// Conditional and loop bodies written without braces
    fn undelimited_blocks(&self) -> Vec<Block> {
        let k = &self.syntax.keywords;
        let mut blocks = Vec::new();

        for p in 0..self.len() {
            let is_else = self.kw(p, &k.continuation) && self.kw(p, &k.conditional) && !self.is(p + 1, "(");
            if is_else {
                let body = p + 1;
                if body >= self.len() || self.is(body, "{") || self.kw(body, &k.conditional) {
                    continue;
                }
                let last = self.statement_end(body);
                blocks.push(self.make_block(BlockKind::Conditional, p, p, last, false, true));
                continue;
            }

            let conditional = self.kw(p, &k.conditional);
            if !(conditional || self.kw(p, &k.loops)) || !self.is(p + 1, "(") {
                continue;
            }
            let Some(close) = self.partner[p + 1] else {
                continue;
            };
            let body = close + 1;
            if body >= self.len() || self.is(body, "{") || self.is(body, ";") {
                continue;
            }
            let last = self.statement_end(body);

            let chained = p > 0 && self.kw(p - 1, &k.continuation) && !self.kw(p, &k.continuation);
            let first = if chained { p - 1 } else { p };
            let kind = if conditional {
                BlockKind::Conditional
            } else {
                BlockKind::Loop
            };
            let continuation = self.kw(first, &k.continuation);
            blocks.push(self.make_block(kind, first, close, last, false, continuation));
        }

        blocks
    }

    /// Position of the last token of the statement starting at `s`
    fn statement_end(&self, s: usize) -> usize {
        let k = &self.syntax.keywords;
        let len = self.len();

        if self.is(s, "{") {
            return self.partner[s].unwrap_or(s);
        }
        if self.kw(s, &k.continuation) && self.kw(s, &k.conditional) && !self.is(s + 1, "(") {
            // else
            return if s + 1 < len { self.statement_end(s + 1) } else { s };
        }
        if (self.kw(s, &k.conditional) || self.kw(s, &k.loops)) && self.is(s + 1, "(") {
            if let Some(close) = self.partner[s + 1] {
                let body_end = match close + 1 {
                    b if b >= len => close,
                    b if self.is(b, ";") => b,
                    b => self.statement_end(b),
                };
                let next = body_end + 1;
                if self.kw(s, &k.conditional)
                    && next < len
                    && self.kw(next, &k.continuation)
                    && self.kw(next, &k.conditional)
                {
                    return self.statement_end(next);
                }
                return body_end;
            }
        }

        let mut p = s;
        loop {
            if self.is(p, ";") {
                return p;
            }
            if self.is_opener(p) {
                p = self.partner[p].unwrap_or(p);
            }
            let next = p + 1;
            if next >= len {
                return p;
            }
            if self.is(next, "}") || self.is(next, ")") || self.is(next, "]") {
                return p;
            }
            if self.line_break_after(p)
                && !self.continues_expression(p)
                && !self.starts_continuation(next)
            {
                return p;
            }
            p = next;
        }
    }

    /// For each position, the innermost unclosed opener around it
    fn enclosing_openers(&self) -> Vec<Option<usize>> {
        let mut stack: Vec<usize> = Vec::new();
        let mut out = vec![None; self.len()];
        for (p, slot) in out.iter_mut().enumerate() {
            if self.is(p, ")") || self.is(p, "]") || self.is(p, "}") {
                stack.pop();
            }
            *slot = stack.last().copied();
            if self.is_opener(p) && self.partner[p].is_some() {
                stack.push(p);
            }
        }
        out
    }

    fn is_statement_start(&self, s: usize, openers: &[Option<usize>]) -> bool {
        if let Some(o) = openers[s] {
            if !self.is(o, "{") {
                return false;
            }
        }
        if s == 0 {
            return true;
        }
        let prev = s - 1;
        if self.is(prev, ";") || self.is(prev, "{") || self.is(prev, "}") {
            return true;
        }
        if self.is(prev, ":") && prev >= 1 && self.syntax.keywords.visibility(&self.tok(prev - 1).text).is_some() {
            return true;
        }
        self.line_break_after(prev) && !self.continues_expression(prev) && !self.starts_continuation(s)
    }

    /// Skip a generic argument list starting at `<`
    fn skip_angles(&self, from: usize) -> usize {
        let mut depth = 0i32;
        let mut p = from;
        while p < self.len() {
            if self.is(p, "{") || self.is(p, ";") {
                return p;
            }
            match self.tok(p).text.as_str() {
                "<" => depth += 1,
                ">" => depth -= 1,
                ">>" => depth -= 2,
                _ => {}
            }
            p += 1;
            if depth <= 0 {
                break;
            }
        }
        p
    }

    /// The braced body that follows a declaration head, if any
    fn body_after(&self, from: usize, blocks_by_open: &HashMap<usize, BlockId>) -> Option<BlockId> {
        let k = &self.syntax.keywords;
        let mut p = from;
        while p < self.len() {
            if self.is(p, "{") {
                return blocks_by_open.get(&self.code[p]).copied();
            }
            if self.is(p, "(") || self.is(p, "[") {
                p = self.partner[p]? + 1;
                continue;
            }
            if self.is(p, ";") || self.is(p, "}") || self.is(p, "=") {
                return None;
            }
            if p > from && (self.kw(p, &k.method) || self.kw(p, &k.class) || self.kw(p, &k.binding)) {
                return None;
            }
            p += 1;
        }
        None
    }

    fn declarations(&self, blocks: &[Block]) -> Vec<Declaration> {
        let blocks_by_open: HashMap<usize, BlockId> = blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.delimited)
            .map(|(i, b)| (b.open_token, BlockId(i)))
            .collect();
        let openers = self.enclosing_openers();
        let mut ctx = DeclContext {
            blocks,
            blocks_by_open,
            class_names: HashMap::new(),
            sections: HashMap::new(),
        };

        let mut declarations = Vec::new();
        let mut resume = 0;
        for s in 0..self.len() {
            if s < resume {
                continue;
            }
            // members separated by commas: `x: i32,` / `int a, b;`
            let after_comma = s > 0 && self.is(s - 1, ",");
            if !after_comma && !self.is_statement_start(s, &openers) {
                continue;
            }
            let block = enclosing_block(blocks, self.code[s]);
            let in_class = block.is_some_and(|b| blocks[b.0].kind == BlockKind::Class);
            if after_comma && !(in_class && openers[s].is_some_and(|o| self.is(o, "{"))) {
                continue;
            }

            // C++ access sections: `public:`
            if self.is(s + 1, ":") && self.tok(s).kind == TokenKind::Keyword {
                let visibility = self.syntax.keywords.visibility(&self.tok(s).text);
                if let (Some(v), Some(b)) = (visibility, block) {
                    ctx.sections.insert(b, v);
                    continue;
                }
            }

            let (k, visibility) = self.skip_prefix(s, self.len());
            resume = k + 1;
            let site = Site {
                start: s,
                block,
                in_class,
                visibility,
            };
            if let Some(decl) = self.declaration_at(site, k, &ctx) {
                if decl.kind == DeclKind::Class {
                    if let Some(body) = decl.body {
                        ctx.class_names.insert(body, decl.name.clone());
                    }
                }
                declarations.push(decl);
            }
        }

        declarations
    }

    fn declaration_at(&self, site: Site, k: usize, ctx: &DeclContext<'_>) -> Option<Declaration> {
        if k >= self.len() {
            return None;
        }
        let kw = &self.syntax.keywords;

        let (name, kind, body) = if self.kw(k, &kw.extension) {
            return None;
        } else if self.kw(k, &kw.class) {
            let mut p = k + 1;
            while self.kw(p, &kw.class) || self.kw(p, &kw.modifiers) {
                p += 1;
            }
            if !self.is_ident(p) {
                return None;
            }
            (p, DeclKind::Class, self.body_after(p + 1, &ctx.blocks_by_open))
        } else if self.kw(k, &kw.method) {
            let name = self.function_name(k + 1)?;
            let body = self.body_after(name + 1, &ctx.blocks_by_open);
            (name, self.method_kind(name, site.block, ctx), body)
        } else if self.kw(k, &kw.binding) {
            return self.binding(site, k, ctx);
        } else if self.tok(k).kind == TokenKind::Keyword {
            // Go: type Name struct { ... }
            if self.is_ident(k + 1) && self.kw(k + 2, &kw.class) {
                (k + 1, DeclKind::Class, self.body_after(k + 3, &ctx.blocks_by_open))
            } else {
                return None;
            }
        } else if self.is_ident(k) && self.is(k + 1, ":=") {
            (k, self.variable_kind(&self.tok(k).text, site.in_class), None)
        } else {
            return self.typed(site, k, ctx);
        };

        Some(self.build(site, name, kind, body, ctx))
    }

    /// Name of a function after its keyword: skips a Go receiver, leading
    /// generics and a Kotlin receiver type
    fn function_name(&self, from: usize) -> Option<usize> {
        let mut p = from;
        if self.is(p, "(") {
            p = self.partner[p]? + 1;
        }
        if self.is(p, "<") {
            p = self.skip_angles(p);
        }
        if self.is(p, "*") || self.is(p, "&") {
            p += 1;
        }
        if !self.is_ident(p) {
            return None;
        }
        let mut name = p;
        loop {
            let mut q = name + 1;
            if self.is(q, "<") && self.is(self.skip_angles(q), ".") {
                q = self.skip_angles(q);
            }
            if self.is(q, ".") && self.is_ident(q + 1) {
                name = q + 1;
            } else {
                break;
            }
        }
        Some(name)
    }

    fn method_kind(&self, name: usize, block: Option<BlockId>, ctx: &DeclContext<'_>) -> DeclKind {
        let text = &self.tok(name).text;
        let class_name = block.and_then(|b| ctx.class_names.get(&b));
        if self.syntax.is_constructor_name(text) || class_name.is_some_and(|c| c == text) {
            DeclKind::Constructor
        } else {
            DeclKind::Method
        }
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

    /// `let x = ...`, `const f = () => {...}`, `val y: Int`
    fn binding(&self, site: Site, k: usize, ctx: &DeclContext<'_>) -> Option<Declaration> {
        let kw = &self.syntax.keywords;
        let mut p = k + 1;
        while self.kw(p, &kw.binding) || self.kw(p, &kw.modifiers) {
            p += 1;
        }
        if !self.is_ident(p) {
            return None;
        }
        let name = p;
        let end = self.statement_end(name);

        if let Some(assign) = self.has_assignment(name + 1, end + 1) {
            let value = assign + 1;
            let mut q = value;
            while self.kw(q, &kw.modifiers) {
                q += 1;
            }
            if self.kw(q, &kw.method) || self.arrow_at_top(value, end + 1) {
                let body = self.body_after_arrow(value, end + 1, &ctx.blocks_by_open);
                return Some(self.build(site, name, DeclKind::Method, body, ctx));
            }
        }

        let kind = self.variable_kind(&self.tok(name).text, site.in_class);
        Some(self.build(site, name, kind, None, ctx))
    }

    /// Whether a value expression is a lambda (`(a) => ...`, `x => ...`)
    fn arrow_at_top(&self, from: usize, to: usize) -> bool {
        let mut p = from;
        while p < to {
            if self.is(p, "(") {
                let Some(close) = self.partner[p] else {
                    return false;
                };
                if close + 1 < to && self.has_lambda_arrow(close + 1, close + 2) {
                    return true;
                }
                p = close + 1;
                continue;
            }
            if self.is(p, "{") || self.is(p, "[") {
                return false;
            }
            if self.has_lambda_arrow(p, p + 1) {
                return true;
            }
            p += 1;
        }
        false
    }

    fn body_after_arrow(
        &self,
        from: usize,
        to: usize,
        blocks_by_open: &HashMap<usize, BlockId>,
    ) -> Option<BlockId> {
        let mut p = from;
        while p < to {
            if self.is(p, "(") || self.is(p, "[") {
                p = self.partner[p].map_or(to, |q| q + 1);
                continue;
            }
            if self.is(p, "{") {
                return blocks_by_open.get(&self.code[p]).copied();
            }
            p += 1;
        }
        None
    }

    /// Declarations written as `Type name ...` (or `name Type` where the
    /// language puts the name first)
    fn typed(&self, site: Site, k: usize, ctx: &DeclContext<'_>) -> Option<Declaration> {
        let (ids, terminator) = self.declaration_head(k)?;
        let last = *ids.last()?;

        if let Terminator::Paren(open) = terminator {
            return self.typed_method(site, &ids, open, ctx);
        }

        let name = if ids.len() >= 2 {
            if terminator == Terminator::Colon {
                return None;
            }
            if self.syntax.name_first {
                ids[0]
            } else {
                let before = self.tok(last - 1);
                let type_shaped = before.kind == TokenKind::Identifier
                    || matches!(before.text.as_str(), ">" | ">>" | "]" | "*" | "&" | "?");
                if !type_shaped {
                    return None;
                }
                last
            }
        } else {
            if !site.in_class {
                return None;
            }
            // bare names ending in `,` or `;` are enum constants
            match terminator {
                Terminator::Assign | Terminator::Colon => last,
                _ => return None,
            }
        };

        if terminator == Terminator::Brace && !site.in_class {
            return None;
        }

        let kind = self.variable_kind(&self.tok(name).text, site.in_class);
        Some(self.build(site, name, kind, None, ctx))
    }

    fn typed_method(
        &self,
        site: Site,
        ids: &[usize],
        open: usize,
        ctx: &DeclContext<'_>,
    ) -> Option<Declaration> {
        let name = open.checked_sub(1).filter(|&n| self.is_ident(n))?;
        let text = &self.tok(name).text;
        if self.syntax.keyword_functions && !self.syntax.is_constructor_name(text) {
            return None;
        }
        let close = self.partner[open]?;
        let body = self
            .body_after(close + 1, &ctx.blocks_by_open)
            .filter(|b| ctx.blocks[b.0].kind == BlockKind::Method);

        // C++ out-of-line `Name::Name(...)`
        let qualified_ctor =
            name >= 2 && self.is(name - 1, "::") && self.tok(name - 2).text == *text;
        let kind = if qualified_ctor {
            DeclKind::Constructor
        } else {
            self.method_kind(name, site.block, ctx)
        };

        if body.is_none() {
            let signature_only = self.ends_signature(close + 1);
            let declared =
                site.in_class && signature_only && (ids.len() >= 2 || kind == DeclKind::Constructor);
            if !declared {
                return None;
            }
        }

        Some(self.build(site, name, kind, body, ctx))
    }

    /// Trailing signature parts ending in `;` (`const;`, `throws X;`, `= 0;`)
    fn ends_signature(&self, from: usize) -> bool {
        let mut p = from;
        while p < self.len() {
            if self.is(p, ";") {
                return true;
            }
            if self.is(p, "{") || self.is(p, "}") || self.is(p, "(") {
                return false;
            }
            p += 1;
        }
        false
    }

    /// Collect the identifiers of a declaration head and how it ends
    fn declaration_head(&self, k: usize) -> Option<(Vec<usize>, Terminator)> {
        let mut ids = Vec::new();
        let mut angle = 0i32;
        let mut p = k;

        while p < self.len() {
            let t = self.tok(p);
            match t.kind {
                TokenKind::Identifier => ids.push(p),
                TokenKind::Operator => match t.text.as_str() {
                    "<" => angle += 1,
                    ">" => angle -= 1,
                    ">>" => angle -= 2,
                    "=" if angle <= 0 => return Some((ids, Terminator::Assign)),
                    "*" | "&" | "&&" | "?" | "::" | "..." => {}
                    _ => return None,
                },
                TokenKind::Delimiter => match t.text.as_str() {
                    "." => {}
                    "[" => p = self.partner[p]?,
                    "," if angle > 0 => {}
                    "," => return Some((ids, Terminator::Comma)),
                    ";" | "}" => return Some((ids, Terminator::Semicolon)),
                    "(" => return Some((ids, Terminator::Paren(p))),
                    "{" => return Some((ids, Terminator::Brace)),
                    ":" => return Some((ids, Terminator::Colon)),
                    _ => return None,
                },
                _ => return None,
            }
            if angle <= 0 && t.kind == TokenKind::Identifier && self.line_break_after(p) {
                let next = p + 1;
                if !self.starts_continuation(next) && !self.is(next, "{") && !self.is(next, "(") {
                    return Some((ids, Terminator::LineEnd));
                }
            }
            p += 1;
        }
        None
    }

    fn build(
        &self,
        site: Site,
        name: usize,
        kind: DeclKind,
        body: Option<BlockId>,
        ctx: &DeclContext<'_>,
    ) -> Declaration {
        let name_token = self.tok(name);
        let section = site.block.and_then(|b| ctx.sections.get(&b)).copied();
        let visibility = site
            .visibility
            .or(section)
            .or_else(|| self.syntax.name_visibility(&name_token.text))
            .unwrap_or(self.syntax.default_visibility);
        let (end_line, last_token) = match body {
            Some(b) => (ctx.blocks[b.0].end.line, ctx.blocks[b.0].last_token),
            None => {
                let end = self.statement_end(name);
                (self.tok(end).end.line, self.code[end])
            }
        };

        Declaration {
            name: name_token.text.clone(),
            kind,
            visibility,
            block: site.block,
            position: name_token.start,
            start_line: self.tok(site.start).start.line,
            end_line,
            first_token: self.code[site.start],
            last_token,
            body,
        }
    }
}

/// Where a declaration statement sits
#[derive(Debug, Clone, Copy)]
struct Site {
    /// Statement start, annotations included
    start: usize,
    block: Option<BlockId>,
    in_class: bool,
    /// Visibility keyword found in the prefix
    visibility: Option<Visibility>,
}

struct DeclContext<'b> {
    blocks: &'b [Block],
    blocks_by_open: HashMap<usize, BlockId>,
    /// Class name by class body
    class_names: HashMap<BlockId, String>,
    /// Current `public:`-style section by class body
    sections: HashMap<BlockId, Visibility>,
}
