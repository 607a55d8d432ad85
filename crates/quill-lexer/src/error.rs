//! Lexical error types.

use quill_source::Span;
use std::fmt;
use thiserror::Error;

/// Result type for tokenizing and stream operations.
pub type SyntaxResult<T> = Result<T, SyntaxError>;

/// A lexical failure or an unexpected token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} on line {line}")]
pub struct SyntaxError {
    pub message: String,
    /// 1-based line number; 0 when the error has no source position.
    pub line: u32,
    pub span: Span,
    pub code: SyntaxErrorCode,
}

impl SyntaxError {
    /// Create a new syntax error.
    pub fn new(message: impl Into<String>, line: u32, span: Span, code: SyntaxErrorCode) -> Self {
        Self {
            message: message.into(),
            line,
            span,
            code,
        }
    }

    /// Create an unexpected token error.
    pub fn unexpected_token(expected: &str, found: &str, line: u32, span: Span) -> Self {
        Self::new(
            format!("Expected {}, found {}", expected, found),
            line,
            span,
            SyntaxErrorCode::UnexpectedToken,
        )
    }

    /// Create an unterminated construct error (`what` is e.g. "comment").
    pub fn unterminated(what: &str, line: u32, span: Span) -> Self {
        Self::new(
            format!("Unterminated {}", what),
            line,
            span,
            SyntaxErrorCode::Unterminated,
        )
    }

    /// Create an unexpected character error.
    pub fn unexpected_character(c: char, line: u32, span: Span) -> Self {
        Self::new(
            format!("Unexpected character '{}'", c),
            line,
            span,
            SyntaxErrorCode::UnexpectedCharacter,
        )
    }
}

/// Error codes for categorizing syntax errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxErrorCode {
    UnexpectedToken,
    /// Quote, comment, tag or raw block left open.
    Unterminated,
    UnexpectedCharacter,
    /// A tag-specific argument grammar did not match.
    InvalidArguments,
    /// An operator symbol could not be compiled into the lexer pattern.
    InvalidPattern,
}

impl SyntaxErrorCode {
    /// Get the error code as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnexpectedToken => "unexpected-token",
            Self::Unterminated => "unterminated",
            Self::UnexpectedCharacter => "unexpected-character",
            Self::InvalidArguments => "invalid-arguments",
            Self::InvalidPattern => "invalid-pattern",
        }
    }
}

impl fmt::Display for SyntaxErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
