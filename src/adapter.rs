//! Lexical adapter contract
//!
//! An adapter turns raw text into a [`SourceFile`]. Every language family is
//! one implementation of [`LanguageAdapter`]; the lexer is shared and the
//! families differ in how they find blocks and declarations.

use crate::adapters::{BraceAdapter, IndentAdapter};
use crate::language::{BlockStyle, LanguageSyntax};
use crate::lexer;
use crate::model::{Block, BlockId, Declaration, SourceFile, Token};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Error raised when a file cannot be tokenized or structured
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unterminated string literal starting at line {line}")]
    UnterminatedString { line: usize },

    #[error("unterminated block comment starting at line {line}")]
    UnterminatedComment { line: usize },

    #[error("unbalanced '{delimiter}' at line {line}")]
    Unbalanced { line: usize, delimiter: String },

    #[error("{message} at line {line}")]
    Invalid { line: usize, message: String },
}

impl ParseError {
    /// The offending line
    pub fn line(&self) -> usize {
        match self {
            ParseError::UnterminatedString { line }
            | ParseError::UnterminatedComment { line }
            | ParseError::Unbalanced { line, .. }
            | ParseError::Invalid { line, .. } => *line,
        }
    }
}

/// Adapter trait for one language family
pub trait LanguageAdapter: Send + Sync {
    /// Language profile driving this adapter
    fn syntax(&self) -> &LanguageSyntax;

    /// Language identifier (e.g., "java", "python")
    fn id(&self) -> &str {
        &self.syntax().id
    }

    /// File extensions this adapter handles (without dot)
    fn extensions(&self) -> &[String] {
        &self.syntax().extensions
    }

    /// Split text into tokens
    fn tokenize(&self, text: &str) -> Result<Vec<Token>, ParseError> {
        lexer::tokenize(text, self.syntax())
    }

    /// Build the block tree. Blocks are returned in source order with
    /// parents linked.
    fn delimit_blocks(&self, tokens: &[Token]) -> Result<Vec<Block>, ParseError>;

    /// Find named declarations
    fn classify_declarations(&self, tokens: &[Token], blocks: &[Block]) -> Vec<Declaration>;

    /// Run the whole pipeline on one file
    fn parse(&self, text: &str, path: &Path) -> Result<SourceFile, ParseError> {
        let tokens = self.tokenize(text)?;
        let blocks = self.delimit_blocks(&tokens)?;
        let declarations = self.classify_declarations(&tokens, &blocks);
        Ok(SourceFile::new(
            path,
            text,
            self.id(),
            tokens,
            blocks,
            declarations,
        ))
    }
}

/// Pick the adapter family for a language profile
pub fn adapter_for(syntax: LanguageSyntax) -> Arc<dyn LanguageAdapter> {
    match syntax.block_style {
        BlockStyle::Brace => Arc::new(BraceAdapter::new(syntax)),
        BlockStyle::Indent => Arc::new(IndentAdapter::new(syntax)),
    }
}

fn closer_for(open: &str) -> Option<&'static str> {
    match open {
        "(" => Some(")"),
        "[" => Some("]"),
        "{" => Some("}"),
        _ => None,
    }
}

fn is_closer(text: &str) -> bool {
    matches!(text, ")" | "]" | "}")
}

/// Pair up `()`, `[]` and `{}` over a sequence of code token indices.
///
/// Returns, for each position in `code`, the position of its partner.
pub fn match_brackets(tokens: &[Token], code: &[usize]) -> Result<Vec<Option<usize>>, ParseError> {
    let mut partner = vec![None; code.len()];
    let mut stack: Vec<usize> = Vec::new();

    for (p, &i) in code.iter().enumerate() {
        let token = &tokens[i];
        if token.kind != crate::model::TokenKind::Delimiter {
            continue;
        }
        if closer_for(&token.text).is_some() {
            stack.push(p);
        } else if is_closer(&token.text) {
            let open = stack.pop().ok_or_else(|| ParseError::Unbalanced {
                line: token.start.line,
                delimiter: token.text.clone(),
            })?;
            if closer_for(&tokens[code[open]].text) != Some(token.text.as_str()) {
                return Err(ParseError::Unbalanced {
                    line: token.start.line,
                    delimiter: token.text.clone(),
                });
            }
            partner[open] = Some(p);
            partner[p] = Some(open);
        }
    }

    if let Some(open) = stack.pop() {
        let token = &tokens[code[open]];
        return Err(ParseError::Unbalanced {
            line: token.start.line,
            delimiter: token.text.clone(),
        });
    }

    Ok(partner)
}

/// Sort blocks into source order and link each to its innermost container
pub fn link_parents(mut blocks: Vec<Block>) -> Vec<Block> {
    blocks.sort_by(|a, b| {
        a.first_token
            .cmp(&b.first_token)
            .then(b.last_token.cmp(&a.last_token))
    });

    let mut stack: Vec<usize> = Vec::new();
    for i in 0..blocks.len() {
        while let Some(&top) = stack.last() {
            if blocks[top].last_token >= blocks[i].last_token {
                break;
            }
            stack.pop();
        }
        blocks[i].parent = stack.last().map(|&top| BlockId(top));
        stack.push(i);
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockKind, Position, TokenKind};

    fn delim(text: &str, line: usize) -> Token {
        Token::new(
            TokenKind::Delimiter,
            text,
            Position::new(line, 1),
            Position::new(line, 2),
        )
    }

    fn block(first: usize, last: usize) -> Block {
        Block {
            kind: BlockKind::Other,
            start: Position::new(first + 1, 1),
            end: Position::new(last + 1, 2),
            first_token: first,
            open_token: first,
            last_token: last,
            header: first..first,
            delimited: true,
            continuation: false,
            parent: None,
        }
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::Unbalanced {
            line: 4,
            delimiter: "}".to_string(),
        };
        assert_eq!(format!("{}", err), "unbalanced '}' at line 4");
        assert_eq!(err.line(), 4);
    }

    #[test]
    fn test_match_brackets() {
        let tokens = vec![delim("{", 1), delim("(", 1), delim(")", 1), delim("}", 2)];
        let code: Vec<usize> = (0..tokens.len()).collect();
        let partner = match_brackets(&tokens, &code).expect("balanced");
        assert_eq!(partner, vec![Some(3), Some(2), Some(1), Some(0)]);
    }

    #[test]
    fn test_unbalanced_brackets() {
        let tokens = vec![delim("{", 1), delim(")", 3)];
        let code: Vec<usize> = (0..tokens.len()).collect();
        assert_eq!(
            match_brackets(&tokens, &code),
            Err(ParseError::Unbalanced {
                line: 3,
                delimiter: ")".to_string()
            })
        );

        let tokens = vec![delim("{", 2), delim("{", 5), delim("}", 6)];
        let code: Vec<usize> = (0..tokens.len()).collect();
        assert_eq!(match_brackets(&tokens, &code).unwrap_err().line(), 2);
    }

    #[test]
    fn test_link_parents() {
        let blocks = link_parents(vec![block(5, 8), block(0, 20), block(10, 12), block(6, 7)]);
        let spans: Vec<_> = blocks.iter().map(|b| (b.first_token, b.parent)).collect();
        assert_eq!(
            spans,
            vec![
                (0, None),
                (5, Some(BlockId(0))),
                (6, Some(BlockId(1))),
                (10, Some(BlockId(0))),
            ]
        );
    }
}
