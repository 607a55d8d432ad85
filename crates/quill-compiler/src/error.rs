//! Error types for template compilation.

use quill_lexer::{SyntaxError, Token};
use quill_source::Span;
use std::fmt;
use thiserror::Error;

/// Result type for the compile pipeline.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for code generation.
pub type CompileResult<T> = std::result::Result<T, CompileError>;

/// Any failure while compiling a template.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl Error {
    /// Kebab-case error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Syntax(e) => e.code.as_str(),
            Self::Parse(e) => e.code.as_str(),
            Self::Compile(e) => e.code.as_str(),
        }
    }

    /// 1-based line, when the error points into the template.
    pub fn line(&self) -> Option<u32> {
        let line = match self {
            Self::Syntax(e) => e.line,
            Self::Parse(e) => e.line,
            Self::Compile(e) => e.line,
        };
        (line > 0).then_some(line)
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Syntax(e) => Some(e.span),
            Self::Parse(e) => Some(e.span),
            Self::Compile(_) => None,
        }
    }

    /// Message without the line suffix.
    pub fn message(&self) -> &str {
        match self {
            Self::Syntax(e) => &e.message,
            Self::Parse(e) => &e.message,
            Self::Compile(e) => &e.message,
        }
    }
}

/// A structurally invalid construct.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} on line {line}")]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub span: Span,
    pub code: ParseErrorCode,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(message: impl Into<String>, line: u32, span: Span, code: ParseErrorCode) -> Self {
        Self {
            message: message.into(),
            line,
            span,
            code,
        }
    }

    /// Create an error positioned at a token.
    pub fn at(token: &Token, message: impl Into<String>, code: ParseErrorCode) -> Self {
        Self::new(message, token.line, token.span, code)
    }

    /// Create an unexpected token error.
    pub fn unexpected_token(expected: &str, found: &Token) -> Self {
        Self::at(
            found,
            format!("Expected {}, found {}", expected, found.describe()),
            ParseErrorCode::UnexpectedToken,
        )
    }

    /// Create an unknown tag error.
    pub fn unknown_tag(found: &Token) -> Self {
        Self::at(
            found,
            format!("Unexpected tag \"{}\"", found.value),
            ParseErrorCode::UnknownTag,
        )
    }

    /// Create an unclosed tag error for end of template.
    pub fn unclosed_tag(closing: &str, found: &Token) -> Self {
        Self::at(
            found,
            format!("Unexpected end of template, expected \"{}\"", closing),
            ParseErrorCode::UnclosedTag,
        )
    }

    /// Create a duplicate block error.
    pub fn duplicate_block(name: &str, line: u32) -> Self {
        Self::new(
            format!("Block \"{}\" is already defined", name),
            line,
            Span::default(),
            ParseErrorCode::DuplicateBlock,
        )
    }
}

/// Error codes for categorizing parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorCode {
    UnexpectedToken,
    UnknownTag,
    UnknownFunction,
    /// End of template reached before a closing tag.
    UnclosedTag,
    DuplicateBlock,
    /// Operand not valid for an operator (e.g. a literal after `.`).
    InvalidOperand,
    /// Non-associative operator chained without parentheses.
    NonAssociative,
    InvalidTernary,
    /// Tag used outside the scope it is restricted to.
    InvalidScope,
    NestingTooDeep,
}

impl ParseErrorCode {
    /// Get the error code as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnexpectedToken => "unexpected-token",
            Self::UnknownTag => "unknown-tag",
            Self::UnknownFunction => "unknown-function",
            Self::UnclosedTag => "unclosed-tag",
            Self::DuplicateBlock => "duplicate-block",
            Self::InvalidOperand => "invalid-operand",
            Self::NonAssociative => "non-associative",
            Self::InvalidTernary => "invalid-ternary",
            Self::InvalidScope => "invalid-scope",
            Self::NestingTooDeep => "nesting-too-deep",
        }
    }
}

impl fmt::Display for ParseErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registry lookup that failed during code generation.
///
/// The parser validates names, so this signals an internal inconsistency.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,
    /// Line of the offending node, 0 if unknown.
    pub line: u32,
    pub code: CompileErrorCode,
}

impl CompileError {
    /// Create a new compile error.
    pub fn new(message: impl Into<String>, line: u32, code: CompileErrorCode) -> Self {
        Self {
            message: message.into(),
            line,
            code,
        }
    }
}

/// Error codes for code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompileErrorCode {
    UnknownTag,
    UnknownOperator,
    UnknownFunction,
    /// A node appeared where its kind cannot be compiled.
    InvalidNode,
}

impl CompileErrorCode {
    /// Get the error code as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownTag => "unknown-tag",
            Self::UnknownOperator => "unknown-operator",
            Self::UnknownFunction => "unknown-function",
            Self::InvalidNode => "invalid-node",
        }
    }
}

impl fmt::Display for CompileErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
