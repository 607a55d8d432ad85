//! Cursor over a token sequence.

use crate::error::{SyntaxError, SyntaxResult};
use crate::token::{Token, TokenKind};
use quill_source::Span;

/// A token sequence with a read position.
///
/// The sequence always ends with an `Eof` token; moving past it keeps the
/// cursor on `Eof`, and moving back never goes before the first token.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    position: usize,
}

impl TokenStream {
    /// Create a stream, appending `Eof` when the tokens lack one.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !tokens.last().is_some_and(Token::is_eof) {
            let (line, end) = tokens
                .last()
                .map(|t| (t.line, t.span.end))
                .unwrap_or((1, 0));
            tokens.push(Token::new(TokenKind::Eof, "", line, Span::empty(end)));
        }
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn current(&self) -> &Token {
        &self.tokens[self.position]
    }

    /// Advance and return the new current token.
    pub fn next(&mut self) -> &Token {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
        self.current()
    }

    /// Step back and return the new current token.
    pub fn prev(&mut self) -> &Token {
        self.position = self.position.saturating_sub(1);
        self.current()
    }

    /// Look `n` tokens ahead without moving.
    pub fn peek(&self, n: usize) -> &Token {
        let idx = (self.position + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    /// Check the current token.
    pub fn test(&self, kind: TokenKind, value: Option<&str>) -> bool {
        self.current().is(kind, value)
    }

    /// Advance, then require the new current token to match.
    pub fn expect(&mut self, kind: TokenKind, value: Option<&str>) -> SyntaxResult<Token> {
        self.next();
        self.expect_current(kind, value)
    }

    /// Require the current token to match without moving.
    pub fn expect_current(&self, kind: TokenKind, value: Option<&str>) -> SyntaxResult<Token> {
        let token = self.current();
        if token.is(kind, value) {
            Ok(token.clone())
        } else {
            Err(Self::mismatch(token, kind, value))
        }
    }

    /// Advance only if the next token matches, returning it.
    pub fn next_token_if(&mut self, kind: TokenKind, value: Option<&str>) -> Option<Token> {
        if self.peek(1).is(kind, value) {
            Some(self.next().clone())
        } else {
            None
        }
    }

    /// Position of the cursor, for save/restore by callers.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.len() == 1
    }

    /// All tokens, including the trailing `Eof`.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    fn mismatch(found: &Token, kind: TokenKind, value: Option<&str>) -> SyntaxError {
        let expected = match value {
            Some(v) => format!("{} \"{}\"", kind, v),
            None => kind.to_string(),
        };
        SyntaxError::unexpected_token(&expected, &found.describe(), found.line, found.span)
    }
}
