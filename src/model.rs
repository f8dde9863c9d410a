//! Neutral source model
//!
//! The language-independent view of one file that every rule consumes:
//! lines, tokens, the block tree and the declaration list. A [`SourceFile`]
//! is built once by a language adapter and never mutated afterwards.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// A 1-based line/column position
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Token classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Keyword,
    Number,
    Str,
    Boolean,
    Comment,
    /// Single-character punctuation: braces, parens, separators
    Delimiter,
    Operator,
}

impl TokenKind {
    pub fn is_literal(&self) -> bool {
        matches!(self, TokenKind::Number | TokenKind::Str | TokenKind::Boolean)
    }

    pub fn is_code(&self) -> bool {
        *self != TokenKind::Comment
    }
}

/// A lexical token. `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: Position,
    pub end: Position,
}

impl Token {
    pub fn new(kind: TokenKind, text: &str, start: Position, end: Position) -> Self {
        Self {
            kind,
            text: text.to_string(),
            start,
            end,
        }
    }

    /// Check for a delimiter or operator with the given text
    pub fn is_punct(&self, text: &str) -> bool {
        matches!(self.kind, TokenKind::Delimiter | TokenKind::Operator) && self.text == text
    }

    pub fn is_keyword(&self, text: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == text
    }
}

/// What a physical line carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    /// Only comment text
    Comment,
    Code,
}

/// A physical line of the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number
    pub number: usize,
    pub text: String,
    /// Length in characters
    pub length: usize,
    pub kind: LineKind,
}

impl Line {
    pub fn is_blank(&self) -> bool {
        self.kind == LineKind::Blank
    }
}

/// Index of a block inside [`SourceFile::blocks`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub usize);

/// Structural kind of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Method,
    Conditional,
    Loop,
    Try,
    Class,
    Switch,
    Other,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKind::Method => write!(f, "method"),
            BlockKind::Conditional => write!(f, "conditional"),
            BlockKind::Loop => write!(f, "loop"),
            BlockKind::Try => write!(f, "try"),
            BlockKind::Class => write!(f, "class"),
            BlockKind::Switch => write!(f, "switch"),
            BlockKind::Other => write!(f, "block"),
        }
    }
}

/// A region of the file bounded by a start and end token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    /// Start of the construct (first header token, decorators included)
    pub start: Position,
    /// End of the construct (end of its last token)
    pub end: Position,
    /// Token index where the construct starts
    pub first_token: usize,
    /// Token index of the opening delimiter (`{`, `:`), or the last header
    /// token for an undelimited body
    pub open_token: usize,
    /// Token index of the closing delimiter or last body token
    pub last_token: usize,
    /// Header tokens (for conditionals this is the condition)
    pub header: Range<usize>,
    /// Body enclosed by explicit delimiters (braces or indentation)
    pub delimited: bool,
    /// Continues a preceding construct: `else`, `catch`, `finally`, ...
    pub continuation: bool,
    pub parent: Option<BlockId>,
}

impl Block {
    /// Number of physical lines the construct spans
    pub fn line_count(&self) -> usize {
        self.end.line - self.start.line + 1
    }

    /// Whether the token index lies inside the body
    pub fn encloses_token(&self, index: usize) -> bool {
        index > self.open_token && index <= self.last_token
    }

    pub fn is_single_line(&self) -> bool {
        self.start.line == self.end.line
    }
}

/// Declaration kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    Variable,
    Constant,
    Field,
    Method,
    Constructor,
    Class,
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclKind::Variable => write!(f, "variable"),
            DeclKind::Constant => write!(f, "constant"),
            DeclKind::Field => write!(f, "field"),
            DeclKind::Method => write!(f, "method"),
            DeclKind::Constructor => write!(f, "constructor"),
            DeclKind::Class => write!(f, "class"),
        }
    }
}

impl std::str::FromStr for DeclKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "variable" => Ok(DeclKind::Variable),
            "constant" => Ok(DeclKind::Constant),
            "field" => Ok(DeclKind::Field),
            "method" | "function" => Ok(DeclKind::Method),
            "constructor" => Ok(DeclKind::Constructor),
            "class" | "type" => Ok(DeclKind::Class),
            _ => Err(format!("Unknown declaration kind: {}", s)),
        }
    }
}

/// Declared visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Private,
    #[default]
    Unspecified,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Protected => write!(f, "protected"),
            Visibility::Private => write!(f, "private"),
            Visibility::Unspecified => write!(f, "unspecified"),
        }
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" | "pub" => Ok(Visibility::Public),
            "protected" | "internal" => Ok(Visibility::Protected),
            "private" => Ok(Visibility::Private),
            "unspecified" | "default" => Ok(Visibility::Unspecified),
            _ => Err(format!("Unknown visibility: {}", s)),
        }
    }
}

/// A named declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclKind,
    pub visibility: Visibility,
    /// Innermost block the declaration appears in (`None` at top level)
    pub block: Option<BlockId>,
    /// Position of the name token
    pub position: Position,
    /// First line of the declaration, annotations included
    pub start_line: usize,
    /// Last line of the declaration
    pub end_line: usize,
    /// Token index where the declaration statement starts
    pub first_token: usize,
    /// Token index of the last token of the statement or body
    pub last_token: usize,
    /// Body block for methods and classes
    pub body: Option<BlockId>,
}

/// Innermost block of `blocks` whose body contains the token
pub fn enclosing_block(blocks: &[Block], index: usize) -> Option<BlockId> {
    blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| b.encloses_token(index))
        .max_by_key(|(_, b)| b.open_token)
        .map(|(i, _)| BlockId(i))
}

/// Whether a name is written in all-uppercase (the constant marker)
pub fn is_upper_case_name(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_alphabetic())
        && !name.chars().any(|c| c.is_ascii_lowercase())
}

/// Inline `kerf-disable` directives found in comments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Suppressions {
    lines: HashMap<String, HashSet<usize>>,
    file: HashSet<String>,
    reasons: HashMap<(String, usize), String>,
}

fn directive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"kerf-disable(-next-line|-line|-file)?\s+([A-Za-z0-9_,\-]+)(?:\s*(?::|--)\s*(.+?))?\s*(?:\*/|-->)?\s*$",
        )
        .expect("directive pattern is valid")
    })
}

impl Suppressions {
    /// Collect directives from the comment tokens of a file
    pub fn from_tokens(tokens: &[Token]) -> Self {
        let mut suppressions = Self::default();

        for token in tokens.iter().filter(|t| t.kind == TokenKind::Comment) {
            for caps in directive_re().captures_iter(&token.text) {
                let target_line = match caps.get(1).map(|m| m.as_str()) {
                    Some("-next-line") => Some(token.end.line + 1),
                    Some("-file") => None,
                    _ => Some(token.start.line),
                };
                let reason = caps.get(3).map(|m| m.as_str().trim().to_string());

                for rule_id in caps[2].split(',').filter(|r| !r.is_empty()) {
                    match target_line {
                        Some(line) => {
                            suppressions
                                .lines
                                .entry(rule_id.to_string())
                                .or_default()
                                .insert(line);
                        }
                        None => {
                            suppressions.file.insert(rule_id.to_string());
                        }
                    }
                    if let Some(r) = &reason {
                        suppressions
                            .reasons
                            .insert((rule_id.to_string(), target_line.unwrap_or(0)), r.clone());
                    }
                }
            }
        }

        suppressions
    }

    /// Check whether a rule is disabled at a line
    pub fn is_suppressed(&self, rule_id: &str, line: usize) -> bool {
        [rule_id, "all"].iter().any(|id| {
            self.file.contains(*id)
                || self
                    .lines
                    .get(*id)
                    .is_some_and(|lines| lines.contains(&line))
        })
    }

    /// Reason given on the directive that silences a rule at a line.
    /// Directives naming the rule win over `all`; line-level over file-level.
    pub fn reason(&self, rule_id: &str, line: usize) -> Option<&str> {
        [rule_id, "all"].iter().find_map(|id| {
            self.reasons
                .get(&(id.to_string(), line))
                .or_else(|| self.reasons.get(&(id.to_string(), 0)))
                .map(String::as_str)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.file.is_empty()
    }
}

/// One file, fully lexed and classified
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
    /// Language profile identifier
    pub language: String,
    pub lines: Vec<Line>,
    pub tokens: Vec<Token>,
    pub blocks: Vec<Block>,
    pub declarations: Vec<Declaration>,
    pub suppressions: Suppressions,
}

impl SourceFile {
    /// Assemble a file from adapter output
    pub fn new(
        path: &Path,
        text: &str,
        language: &str,
        tokens: Vec<Token>,
        blocks: Vec<Block>,
        declarations: Vec<Declaration>,
    ) -> Self {
        let lines = build_lines(text, &tokens);
        let suppressions = Suppressions::from_tokens(&tokens);

        Self {
            path: path.to_path_buf(),
            text: text.to_string(),
            language: language.to_string(),
            lines,
            tokens,
            blocks,
            declarations,
            suppressions,
        }
    }

    /// Get a line by 1-based number
    pub fn line(&self, number: usize) -> Option<&Line> {
        number.checked_sub(1).and_then(|i| self.lines.get(i))
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_blank_line(&self, number: usize) -> bool {
        self.line(number).is_some_and(Line::is_blank)
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    /// Blocks whose parent is `parent` (`None` = top level), in source order
    pub fn child_blocks(&self, parent: Option<BlockId>) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks
            .iter()
            .enumerate()
            .filter(move |(_, b)| b.parent == parent)
            .map(|(i, b)| (BlockId(i), b))
    }

    /// Innermost block whose body contains the token
    pub fn enclosing_block(&self, index: usize) -> Option<BlockId> {
        enclosing_block(&self.blocks, index)
    }

    /// Declarations made directly inside a block, in source order
    pub fn declarations_in(&self, block: BlockId) -> Vec<&Declaration> {
        let mut decls: Vec<&Declaration> = self
            .declarations
            .iter()
            .filter(|d| d.block == Some(block))
            .collect();
        decls.sort_by_key(|d| d.position);
        decls
    }

    /// Closest preceding non-comment token
    pub fn prev_code_token(&self, index: usize) -> Option<usize> {
        (0..index).rev().find(|&i| self.tokens[i].kind.is_code())
    }

    /// Closest following non-comment token
    pub fn next_code_token(&self, index: usize) -> Option<usize> {
        (index + 1..self.tokens.len()).find(|&i| self.tokens[i].kind.is_code())
    }

    /// Whether no code token precedes this one on its line
    pub fn starts_line(&self, index: usize) -> bool {
        let line = self.tokens[index].start.line;
        self.prev_code_token(index)
            .map_or(true, |p| self.tokens[p].end.line < line)
    }

    /// Whether the token begins a statement rather than continuing an
    /// expression (a lambda body inside a call, a wrapped operand)
    pub fn starts_statement(&self, index: usize) -> bool {
        let Some(p) = self.prev_code_token(index) else {
            return true;
        };
        let prev = &self.tokens[p];
        if prev.is_punct(";") || prev.is_punct("{") || prev.is_punct("}") {
            return true;
        }
        if prev.end.line >= self.tokens[index].start.line {
            return false;
        }
        match prev.kind {
            TokenKind::Operator => false,
            TokenKind::Delimiter => !matches!(prev.text.as_str(), "," | "(" | "[" | "."),
            _ => true,
        }
    }

    /// Nearest line above `line` that is not a comment-only line.
    /// Returns 0 when the top of the file is reached.
    pub fn line_above_comments(&self, line: usize) -> usize {
        let mut n = line.saturating_sub(1);
        while n > 0 && self.line(n).is_some_and(|l| l.kind == LineKind::Comment) {
            n -= 1;
        }
        n
    }

    /// Text of a line for display
    pub fn source_line(&self, number: usize) -> Option<&str> {
        self.line(number).map(|l| l.text.as_str())
    }
}

fn build_lines(text: &str, tokens: &[Token]) -> Vec<Line> {
    let mut lines: Vec<Line> = text
        .lines()
        .enumerate()
        .map(|(i, t)| Line {
            number: i + 1,
            text: t.to_string(),
            length: t.chars().count(),
            kind: LineKind::Blank,
        })
        .collect();

    for token in tokens {
        for n in token.start.line..=token.end.line {
            if let Some(line) = lines.get_mut(n - 1) {
                if token.kind.is_code() {
                    line.kind = LineKind::Code;
                } else if line.kind == LineKind::Blank {
                    line.kind = LineKind::Comment;
                }
            }
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(kind: TokenKind, text: &str, line: usize, col: usize) -> Token {
        let end = Position::new(line, col + text.chars().count());
        Token::new(kind, text, Position::new(line, col), end)
    }

    #[test]
    fn test_line_kinds() {
        let text = "int x;\n\n// note\n";
        let tokens = vec![
            tok(TokenKind::Identifier, "int", 1, 1),
            tok(TokenKind::Identifier, "x", 1, 5),
            tok(TokenKind::Delimiter, ";", 1, 6),
            tok(TokenKind::Comment, "// note", 3, 1),
        ];
        let file = SourceFile::new(Path::new("a.java"), text, "java", tokens, vec![], vec![]);

        assert_eq!(file.line_count(), 3);
        assert_eq!(file.line(1).map(|l| l.kind), Some(LineKind::Code));
        assert!(file.is_blank_line(2));
        assert_eq!(file.line(3).map(|l| l.kind), Some(LineKind::Comment));
        assert_eq!(file.line(1).map(|l| l.length), Some(6));
        assert!(file.line(0).is_none());
    }

    #[test]
    fn test_line_above_comments() {
        let text = "a\n\n// one\n// two\nb\n";
        let tokens = vec![
            tok(TokenKind::Identifier, "a", 1, 1),
            tok(TokenKind::Comment, "// one", 3, 1),
            tok(TokenKind::Comment, "// two", 4, 1),
            tok(TokenKind::Identifier, "b", 5, 1),
        ];
        let file = SourceFile::new(Path::new("a.js"), text, "javascript", tokens, vec![], vec![]);
        assert_eq!(file.line_above_comments(5), 2);
        assert_eq!(file.line_above_comments(1), 0);
    }

    #[test]
    fn test_suppressions() {
        let tokens = vec![
            tok(TokenKind::Comment, "// kerf-disable-next-line line-length", 3, 1),
            tok(TokenKind::Comment, "// kerf-disable-file magic-literal: legacy", 1, 1),
            tok(TokenKind::Comment, "# kerf-disable-line all -- generated", 7, 10),
        ];
        let s = Suppressions::from_tokens(&tokens);

        assert!(s.is_suppressed("line-length", 4));
        assert!(!s.is_suppressed("line-length", 3));
        assert!(s.is_suppressed("magic-literal", 99));
        assert!(s.is_suppressed("naming-convention", 7));
        assert_eq!(s.reason("magic-literal", 5), Some("legacy"));
        assert_eq!(s.reason("all", 7), Some("generated"));
        assert_eq!(s.reason("naming-convention", 7), Some("generated"));
        assert_eq!(s.reason("line-length", 4), None);
    }

    #[test]
    fn test_upper_case_name() {
        assert!(is_upper_case_name("MAX"));
        assert!(is_upper_case_name("MAX_SIZE_2"));
        assert!(!is_upper_case_name("Max"));
        assert!(!is_upper_case_name("_"));
        assert!(!is_upper_case_name("123"));
    }

    #[test]
    fn test_visibility_from_str() {
        assert_eq!("public".parse::<Visibility>(), Ok(Visibility::Public));
        assert_eq!("private".parse::<Visibility>(), Ok(Visibility::Private));
        assert!("secret".parse::<Visibility>().is_err());
    }
}
