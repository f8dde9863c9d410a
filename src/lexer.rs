//! Language-driven tokenizer
//!
//! One scanner serves every language: comment markers, quotes and keyword
//! classes all come from the [`LanguageSyntax`] record.

use crate::adapter::ParseError;
use crate::language::{contains, LanguageSyntax};
use crate::model::{Position, Token, TokenKind};
use std::collections::HashSet;

/// Operators, longest first
const OPERATORS: &[&str] = &[
    "===", "!==", "<=>", "**=", "<<=", ">>=", "...", "==", "!=", "<=", ">=", "&&", "||", "->",
    "=>", "::", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", ":=", "<<", ">>", "??",
    "?.", "**", "+", "-", "*", "/", "%", "=", "<", ">", "!", "&", "|", "^", "~", "?",
];

/// Tokenize source text according to a language profile
pub fn tokenize(text: &str, syntax: &LanguageSyntax) -> Result<Vec<Token>, ParseError> {
    Lexer::new(text, syntax).run()
}

struct Lexer<'a> {
    syntax: &'a LanguageSyntax,
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    keywords: HashSet<&'a str>,
    /// String openers, longest first, with their multi-line flag
    quotes: Vec<(&'a str, bool)>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(text: &str, syntax: &'a LanguageSyntax) -> Self {
        let mut quotes: Vec<(&str, bool)> = syntax
            .multiline_quotes
            .iter()
            .map(|q| (q.as_str(), true))
            .chain(syntax.quotes.iter().map(|q| (q.as_str(), false)))
            .filter(|(q, _)| !q.is_empty())
            .collect();
        quotes.sort_by_key(|(q, _)| std::cmp::Reverse(q.chars().count()));

        Self {
            syntax,
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            keywords: syntax.keywords.all().collect(),
            quotes,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        while let Some(c) = self.peek(0) {
            if c.is_whitespace() {
                self.advance();
            } else if let Some(marker) = self.line_comment_at() {
                self.line_comment(marker);
            } else if let Some((open, close)) = self.block_comment_at() {
                self.block_comment(open, close)?;
            } else if let Some((quote, multiline)) = self.quote_at() {
                self.string(quote, multiline)?;
            } else if self.is_char_quote() {
                self.char_literal();
            } else if c.is_ascii_digit()
                || (c == '.' && self.peek(1).is_some_and(|d| d.is_ascii_digit()))
            {
                self.number();
            } else if c.is_alphabetic() || c == '_' || c == '$' {
                self.word();
            } else {
                self.punct();
            }
        }
        Ok(self.tokens)
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.peek(i) == Some(c))
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn push(&mut self, kind: TokenKind, from: usize, start: Position) {
        let text: String = self.chars[from..self.pos].iter().collect();
        let end = self.position();
        self.tokens.push(Token::new(kind, &text, start, end));
    }

    fn line_comment_at(&self) -> Option<&'a str> {
        self.syntax
            .line_comments
            .iter()
            .map(String::as_str)
            .filter(|m| !m.is_empty())
            .find(|m| self.starts_with(m))
    }

    fn block_comment_at(&self) -> Option<(&'a str, &'a str)> {
        self.syntax
            .block_comments
            .iter()
            .filter(|(open, close)| !open.is_empty() && !close.is_empty())
            .find(|(open, _)| self.starts_with(open))
            .map(|(open, close)| (open.as_str(), close.as_str()))
    }

    fn quote_at(&self) -> Option<(&'a str, bool)> {
        self.quotes.iter().copied().find(|(q, _)| self.starts_with(q))
    }

    fn line_comment(&mut self, marker: &str) {
        let (from, start) = (self.pos, self.position());
        self.advance_by(marker.chars().count());
        while self.peek(0).is_some_and(|c| c != '\n' && c != '\r') {
            self.advance();
        }
        self.push(TokenKind::Comment, from, start);
    }

    fn block_comment(&mut self, open: &str, close: &str) -> Result<(), ParseError> {
        let (from, start) = (self.pos, self.position());
        self.advance_by(open.chars().count());
        loop {
            if self.peek(0).is_none() {
                return Err(ParseError::UnterminatedComment { line: start.line });
            }
            if self.starts_with(close) {
                self.advance_by(close.chars().count());
                break;
            }
            self.advance();
        }
        self.push(TokenKind::Comment, from, start);
        Ok(())
    }

    fn string(&mut self, quote: &str, multiline: bool) -> Result<(), ParseError> {
        let (from, start) = (self.pos, self.position());
        self.advance_by(quote.chars().count());
        loop {
            match self.peek(0) {
                None => return Err(ParseError::UnterminatedString { line: start.line }),
                Some('\n') if !multiline => {
                    return Err(ParseError::UnterminatedString { line: start.line })
                }
                Some('\\') => {
                    self.advance();
                    // an escaped line break is still a break in a single-line string
                    if self.peek(0) == Some('\n') && !multiline {
                        return Err(ParseError::UnterminatedString { line: start.line });
                    }
                    self.advance();
                }
                Some(_) if self.starts_with(quote) => {
                    self.advance_by(quote.chars().count());
                    break;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        self.push(TokenKind::Str, from, start);
        Ok(())
    }

    /// `'x'` or `'\n'` where the quote also has non-literal uses
    fn is_char_quote(&self) -> bool {
        let Some(quote) = self.syntax.char_quote.as_deref() else {
            return false;
        };
        if !self.starts_with(quote) {
            return false;
        }
        match self.peek(1) {
            Some('\\') => true,
            Some('\n') | None => false,
            Some(_) => self.peek(2).is_some_and(|c| quote.starts_with(c)),
        }
    }

    fn char_literal(&mut self) {
        let (from, start) = (self.pos, self.position());
        self.advance();
        if self.peek(0) == Some('\\') {
            self.advance();
            self.advance();
            while self.peek(0).is_some_and(|c| c != '\'' && c != '\n') {
                self.advance();
            }
            if self.peek(0) == Some('\'') {
                self.advance();
            }
        } else {
            self.advance_by(2);
        }
        self.push(TokenKind::Str, from, start);
    }

    fn number(&mut self) {
        let (from, start) = (self.pos, self.position());
        let hex = self.starts_with("0x") || self.starts_with("0X");
        let mut seen_dot = false;
        while let Some(c) = self.peek(0) {
            let prev = self.pos.checked_sub(1).map(|i| self.chars[i]);
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else if c == '.'
                && !seen_dot
                && !hex
                && self.peek(1).is_some_and(|d| d.is_ascii_digit())
            {
                seen_dot = true;
                self.advance();
            } else if (c == '+' || c == '-') && !hex && matches!(prev, Some('e') | Some('E')) {
                self.advance();
            } else {
                break;
            }
        }
        self.push(TokenKind::Number, from, start);
    }

    fn word(&mut self) {
        let (from, start) = (self.pos, self.position());
        while self
            .peek(0)
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
        {
            self.advance();
        }
        let text: String = self.chars[from..self.pos].iter().collect();
        let kind = if contains(&self.syntax.keywords.booleans, &text) {
            TokenKind::Boolean
        } else if self.keywords.contains(text.as_str()) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        self.push(kind, from, start);
    }

    fn punct(&mut self) {
        let (from, start) = (self.pos, self.position());
        match OPERATORS.iter().find(|op| self.starts_with(op)) {
            Some(op) => {
                self.advance_by(op.len());
                self.push(TokenKind::Operator, from, start);
            }
            None => {
                self.advance();
                self.push(TokenKind::Delimiter, from, start);
            }
        }
    }
}
