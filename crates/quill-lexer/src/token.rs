//! Token types.

use quill_source::Span;
use smol_str::SmolStr;
use std::fmt;

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TokenKind {
    /// Literal template text.
    Text,
    /// A tag name, opening or closing.
    Tag,
    Identifier,
    /// A `$name` reference.
    Variable,
    /// Number, boolean or null.
    Literal,
    /// Quoted or `:short` string, already unescaped.
    String,
    Operator,
    /// One of `( ) [ ] , : ? =>`.
    Punctuation,
    ExpressionStart,
    ExpressionEnd,
    BlockStart,
    BlockEnd,
    Eof,
}

impl TokenKind {
    /// Human-readable name used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Tag => "tag",
            Self::Identifier => "identifier",
            Self::Variable => "variable",
            Self::Literal => "literal",
            Self::String => "string",
            Self::Operator => "operator",
            Self::Punctuation => "punctuation",
            Self::ExpressionStart => "expression start",
            Self::ExpressionEnd => "expression end",
            Self::BlockStart => "block start",
            Self::BlockEnd => "block end",
            Self::Eof => "end of template",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single token produced by the tokenizer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    pub kind: TokenKind,
    pub value: SmolStr,
    /// 1-based line of the token start.
    pub line: u32,
    pub span: Span,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, value: impl Into<SmolStr>, line: u32, span: Span) -> Self {
        Self {
            kind,
            value: value.into(),
            line,
            span,
        }
    }

    /// Check the kind and, when given, the value.
    pub fn is(&self, kind: TokenKind, value: Option<&str>) -> bool {
        self.kind == kind && value.map_or(true, |v| self.value == v)
    }

    /// Whether this token is the given punctuation character(s).
    pub fn is_punctuation(&self, value: &str) -> bool {
        self.is(TokenKind::Punctuation, Some(value))
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    /// Short description for error messages, e.g. `operator "+"`.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof
            | TokenKind::ExpressionStart
            | TokenKind::ExpressionEnd
            | TokenKind::BlockStart
            | TokenKind::BlockEnd => self.kind.as_str().to_string(),
            _ => format!("{} \"{}\"", self.kind, self.value),
        }
    }
}
