//! Expression lexer.
//!
//! Literals are matched by one fixed pattern. Operators and punctuation are
//! matched by a pattern assembled from the registered operator symbols,
//! longest first, so `is not set` wins over `is` and `...` over `..`.

use crate::error::{SyntaxError, SyntaxErrorCode, SyntaxResult};
use crate::token::{Token, TokenKind};
use once_cell::sync::Lazy;
use quill_source::{LineIndex, Span};
use regex::Regex;
use rustc_hash::FxHashSet;

/// Punctuation shared by every expression grammar.
pub const PUNCTUATION: &[&str] = &["(", ")", "[", "]", ",", ":", "?", "=>"];

static LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?:"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|\d+(?:\.\d+)?(?:[eE][+-]?\d+)?|(?:true|false|null)\b)"#,
    )
    .expect("literal pattern is valid")
});

static SHORT_STRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:[A-Za-z_][A-Za-z0-9_]*").expect("short string pattern is valid"));

static VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$[A-Za-z_][A-Za-z0-9_]*").expect("variable pattern is valid"));

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").expect("identifier pattern is valid"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Splits expression text into tokens.
#[derive(Debug, Clone)]
pub struct ExpressionLexer {
    operators: Regex,
    punctuation: FxHashSet<&'static str>,
}

impl ExpressionLexer {
    /// Build the lexer from every registered operator symbol.
    pub fn new<'s>(symbols: impl IntoIterator<Item = &'s str>) -> SyntaxResult<Self> {
        let mut all: Vec<String> = symbols
            .into_iter()
            .map(normalize_symbol)
            .chain(PUNCTUATION.iter().map(|p| p.to_string()))
            .collect();
        all.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        all.dedup();

        let alternatives: Vec<String> = all.iter().map(|s| symbol_pattern(s)).collect();
        let pattern = format!("^(?:{})", alternatives.join("|"));
        let operators = Regex::new(&pattern).map_err(|e| {
            SyntaxError::new(
                format!("Invalid operator pattern: {}", e),
                0,
                Span::default(),
                SyntaxErrorCode::InvalidPattern,
            )
        })?;

        Ok(Self {
            operators,
            punctuation: PUNCTUATION.iter().copied().collect(),
        })
    }

    /// Tokenize `text`, which starts at byte `base` of the template.
    pub fn tokenize(&self, text: &str, base: usize, lines: &LineIndex) -> SyntaxResult<Vec<Token>> {
        let mut tokens: Vec<Token> = Vec::new();
        let mut pos = 0;

        while pos < text.len() {
            let rest = &text[pos..];
            let trimmed = rest.trim_start();
            if trimmed.len() != rest.len() {
                pos += rest.len() - trimmed.len();
                continue;
            }

            let at = base + pos;
            let line = lines.line_number(at as u32);
            let prev = tokens.last();
            let span = |len: usize| Span::from_range(at..at + len);

            if let Some(m) = LITERAL.find(rest) {
                let raw = m.as_str();
                let token = if raw.starts_with('"') || raw.starts_with('\'') {
                    Token::new(TokenKind::String, unescape(raw), line, span(raw.len()))
                } else {
                    Token::new(TokenKind::Literal, raw, line, span(raw.len()))
                };
                tokens.push(token);
                pos += raw.len();
                continue;
            }

            if starts_operand(prev) {
                if let Some(m) = SHORT_STRING.find(rest) {
                    let raw = m.as_str();
                    tokens.push(Token::new(TokenKind::String, &raw[1..], line, span(raw.len())));
                    pos += raw.len();
                    continue;
                }
            }

            // A word right after `.` is a property name even if it spells an operator.
            let after_dot = prev.is_some_and(|t| t.is(TokenKind::Operator, Some(".")));
            if !after_dot {
                if let Some(m) = self.operators.find(rest) {
                    let raw = m.as_str();
                    let value = WHITESPACE.replace_all(raw, " ");
                    let kind = if self.punctuation.contains(value.as_ref()) {
                        TokenKind::Punctuation
                    } else {
                        TokenKind::Operator
                    };
                    tokens.push(Token::new(kind, value.as_ref(), line, span(raw.len())));
                    pos += raw.len();
                    continue;
                }
            }

            if let Some(m) = VARIABLE.find(rest) {
                let raw = m.as_str();
                tokens.push(Token::new(TokenKind::Variable, &raw[1..], line, span(raw.len())));
                pos += raw.len();
                continue;
            }

            if let Some(m) = IDENTIFIER.find(rest) {
                let raw = m.as_str();
                tokens.push(Token::new(TokenKind::Identifier, raw, line, span(raw.len())));
                pos += raw.len();
                continue;
            }

            let c = rest.chars().next().unwrap_or('\0');
            return Err(SyntaxError::unexpected_character(
                c,
                line,
                span(c.len_utf8()),
            ));
        }

        Ok(tokens)
    }
}

/// Whether the next token is in operand position, where `:name` reads as a
/// short string rather than a `:` separator. `?` is left out so `a ?:b`
/// stays the short conditional.
fn starts_operand(prev: Option<&Token>) -> bool {
    match prev {
        None => true,
        Some(t) => match t.kind {
            TokenKind::Operator => true,
            TokenKind::Punctuation => matches!(t.value.as_str(), "(" | "[" | "," | "=>"),
            _ => false,
        },
    }
}

fn normalize_symbol(symbol: &str) -> String {
    symbol.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn symbol_pattern(symbol: &str) -> String {
    let escaped: Vec<String> = symbol.split(' ').map(regex::escape).collect();
    let mut pattern = escaped.join(r"\s+");
    if symbol
        .chars()
        .last()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
    {
        pattern.push_str(r"\b");
    }
    pattern
}

/// Strip quotes and resolve backslash escapes.
fn unescape(raw: &str) -> String {
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lexer() -> ExpressionLexer {
        ExpressionLexer::new([
            "+", "-", "*", ".", "..", "...", "|", "is set", "is not set", "not", "and", "or",
            "??", "==", "=", "is divisible by", "b-or",
        ])
        .unwrap()
    }

    fn kinds(text: &str) -> Vec<(TokenKind, String)> {
        lexer()
            .tokenize(text, 0, &LineIndex::new(text))
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.value.to_string()))
            .collect()
    }

    #[test]
    fn test_literals() {
        use TokenKind::*;
        assert_eq!(
            kinds(r#"1 2.5 1e3 true null "a\"b" 'c'"#),
            vec![
                (Literal, "1".into()),
                (Literal, "2.5".into()),
                (Literal, "1e3".into()),
                (Literal, "true".into()),
                (Literal, "null".into()),
                (String, "a\"b".into()),
                (String, "c".into()),
            ]
        );
    }

    #[test]
    fn test_word_operators_need_boundaries() {
        use TokenKind::*;
        assert_eq!(
            kinds("order or nothing"),
            vec![
                (Identifier, "order".into()),
                (Operator, "or".into()),
                (Identifier, "nothing".into()),
            ]
        );
    }

    #[test]
    fn test_multiword_operator_normalized() {
        use TokenKind::*;
        assert_eq!(
            kinds("x is   not\nset"),
            vec![(Identifier, "x".into()), (Operator, "is not set".into())]
        );
        assert_eq!(
            kinds("10 is divisible by 3")[1],
            (Operator, "is divisible by".into())
        );
    }

    #[test]
    fn test_longest_match() {
        use TokenKind::*;
        assert_eq!(
            kinds("1...5"),
            vec![
                (Literal, "1".into()),
                (Operator, "...".into()),
                (Literal, "5".into()),
            ]
        );
        assert_eq!(kinds("a ?? b")[1], (Operator, "??".into()));
        assert_eq!(kinds("[1 => 2]")[2], (Punctuation, "=>".into()));
    }

    #[test]
    fn test_short_strings_only_in_operand_position() {
        use TokenKind::*;
        assert_eq!(kinds("f(:name)")[2], (String, "name".into()));
        assert_eq!(
            kinds(r#"["k":v]"#),
            vec![
                (Punctuation, "[".into()),
                (String, "k".into()),
                (Punctuation, ":".into()),
                (Identifier, "v".into()),
                (Punctuation, "]".into()),
            ]
        );
        assert_eq!(
            kinds("a ?:b"),
            vec![
                (Identifier, "a".into()),
                (Punctuation, "?".into()),
                (Punctuation, ":".into()),
                (Identifier, "b".into()),
            ]
        );
    }

    #[test]
    fn test_variables_and_properties() {
        use TokenKind::*;
        assert_eq!(
            kinds("$user.not"),
            vec![
                (Variable, "user".into()),
                (Operator, ".".into()),
                (Identifier, "not".into()),
            ]
        );
    }

    #[test]
    fn test_unexpected_character() {
        let text = "a\n@";
        let err = lexer().tokenize(text, 0, &LineIndex::new(text)).unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.code, SyntaxErrorCode::UnexpectedCharacter);
    }
}
