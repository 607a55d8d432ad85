//! Template scanner.
//!
//! Splits template text into literal text, comments, raw blocks and tag
//! bodies. Tag bodies starting with a registered tag name become
//! `Tag BlockStart … BlockEnd`; any other body is an inline expression
//! `ExpressionStart … ExpressionEnd`.

use crate::cursor::{Cursor, UnterminatedBody};
use crate::error::{SyntaxError, SyntaxErrorCode, SyntaxResult};
use crate::expression::ExpressionLexer;
use crate::stream::TokenStream;
use crate::token::{Token, TokenKind};
use quill_source::{LineIndex, Span};
use smol_str::SmolStr;
use tracing::trace;

/// Delimiters and reserved names of the template syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct LexerOptions {
    pub tag_open: String,
    pub tag_close: String,
    pub comment_open: String,
    pub comment_close: String,
    /// Prefix that turns a block tag name into its closing tag.
    pub closing_tag_prefix: String,
    /// Tag whose body is emitted verbatim.
    pub raw_tag: String,
}

impl Default for LexerOptions {
    fn default() -> Self {
        Self {
            tag_open: "{".to_string(),
            tag_close: "}".to_string(),
            comment_open: "{#".to_string(),
            comment_close: "#}".to_string(),
            closing_tag_prefix: "end".to_string(),
            raw_tag: "raw".to_string(),
        }
    }
}

/// Lookup of tag names known to the environment.
pub trait TagTable {
    /// Whether `name` is a tag, a sub-tag or a closing tag.
    fn contains_tag(&self, name: &str) -> bool;

    /// The custom argument tokenizer registered for `name`, if any.
    fn argument_tokenizer(&self, name: &str) -> Option<&dyn ArgumentTokenizer>;
}

/// Tokenizer for tags whose arguments do not follow expression syntax.
pub trait ArgumentTokenizer: Send + Sync {
    /// Tokenize the argument text of one tag occurrence.
    fn tokenize(&self, args: &str, ctx: &ArgumentContext<'_>) -> SyntaxResult<Vec<Token>>;
}

/// Positional context handed to an [`ArgumentTokenizer`].
pub struct ArgumentContext<'a> {
    pub lexer: &'a ExpressionLexer,
    pub lines: &'a LineIndex,
    /// Byte offset of the argument text within the template.
    pub offset: usize,
}

impl ArgumentContext<'_> {
    /// Lex a slice of the arguments that starts at byte `at` of the argument text.
    pub fn expression(&self, text: &str, at: usize) -> SyntaxResult<Vec<Token>> {
        self.lexer.tokenize(text, self.offset + at, self.lines)
    }

    /// Build a token positioned at byte `at` of the argument text.
    pub fn token(&self, kind: TokenKind, value: &str, at: usize) -> Token {
        let start = self.offset + at;
        Token::new(
            kind,
            value,
            self.line(at),
            Span::from_range(start..start + value.len()),
        )
    }

    /// Build an argument error positioned at byte `at` of the argument text.
    pub fn error(&self, message: impl Into<String>, at: usize) -> SyntaxError {
        SyntaxError::new(
            message,
            self.line(at),
            Span::empty((self.offset + at) as u32),
            SyntaxErrorCode::InvalidArguments,
        )
    }

    fn line(&self, at: usize) -> u32 {
        self.lines.line_number((self.offset + at) as u32)
    }
}

/// Split `text` on `separator` outside quotes and brackets.
///
/// Returns each piece with its byte offset in `text`; pieces are not trimmed.
pub fn split_top_level(text: &str, separator: char) -> Vec<(usize, &str)> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            c if c == separator && depth == 0 => {
                parts.push((start, &text[start..i]));
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push((start, &text[start..]));
    parts
}

/// Turns template text into a [`TokenStream`].
#[derive(Debug, Clone)]
pub struct Tokenizer {
    options: LexerOptions,
    lexer: ExpressionLexer,
}

impl Tokenizer {
    pub fn new(options: LexerOptions, lexer: ExpressionLexer) -> Self {
        Self { options, lexer }
    }

    pub fn options(&self) -> &LexerOptions {
        &self.options
    }

    pub fn expression_lexer(&self) -> &ExpressionLexer {
        &self.lexer
    }

    /// Tokenize a whole template.
    pub fn tokenize(&self, source: &str, tags: &dyn TagTable) -> SyntaxResult<TokenStream> {
        let lines = LineIndex::new(source);
        let mut scan = Scan {
            source,
            lines: &lines,
            cursor: Cursor::new(source),
            tokens: Vec::new(),
        };

        while !scan.cursor.is_eof() {
            let Some(open) = self.next_delimiter(scan.cursor.remaining()) else {
                let start = scan.cursor.pos();
                scan.push_text(start, source.len());
                scan.cursor.seek(source.len());
                break;
            };

            let start = scan.cursor.pos();
            scan.push_text(start, start + open);
            scan.cursor.seek(start + open);

            if scan.cursor.starts_with(&self.options.comment_open) {
                self.skip_comment(&mut scan)?;
            } else {
                self.scan_tag(&mut scan, tags)?;
            }
        }

        let end = source.len() as u32;
        scan.tokens.push(Token::new(
            TokenKind::Eof,
            "",
            lines.line_number(end),
            Span::empty(end),
        ));
        trace!(tokens = scan.tokens.len(), "tokenized template");
        Ok(TokenStream::new(scan.tokens))
    }

    /// Offset of the next comment or tag opening in `rest`.
    fn next_delimiter(&self, rest: &str) -> Option<usize> {
        let tag = rest.find(&self.options.tag_open);
        let comment = rest.find(&self.options.comment_open);
        match (tag, comment) {
            (Some(t), Some(c)) => Some(t.min(c)),
            (t, c) => t.or(c),
        }
    }

    fn skip_comment(&self, scan: &mut Scan<'_>) -> SyntaxResult<()> {
        let start = scan.cursor.pos();
        scan.cursor.consume(&self.options.comment_open);
        if scan.cursor.consume_until(&self.options.comment_close).is_none() {
            return Err(scan.unterminated("comment", start));
        }
        scan.cursor.consume(&self.options.comment_close);
        Ok(())
    }

    fn scan_tag(&self, scan: &mut Scan<'_>, tags: &dyn TagTable) -> SyntaxResult<()> {
        let start = scan.cursor.pos();
        scan.cursor.consume(&self.options.tag_open);

        // An opening delimiter followed by whitespace is literal text.
        if scan.cursor.peek_char().map_or(true, char::is_whitespace) {
            let after = scan.cursor.pos();
            scan.push_text(start, after);
            return Ok(());
        }

        let body_start = scan.cursor.pos();
        let body = match scan.cursor.consume_tag_body(&self.options.tag_close) {
            Ok(body) => body,
            Err(UnterminatedBody::Quote) => return Err(scan.unterminated("string", start)),
            Err(UnterminatedBody::Tag) => return Err(scan.unterminated("tag", start)),
        };
        let body_end = body_start + body.len();

        let name = self.tag_name(body, tags);
        if let Some(name) = name.filter(|n| tags.contains_tag(n)) {
            let args = &body[name.len()..];
            if name.as_str() == self.options.raw_tag && args.trim().is_empty() {
                return self.scan_raw(scan, start);
            }
            self.push_tag(scan, tags, &name, body_start, args, body_end)
        } else {
            scan.push_marker(TokenKind::ExpressionStart, start);
            let tokens = self.lexer.tokenize(body, body_start, scan.lines)?;
            scan.tokens.extend(tokens);
            scan.push_marker(TokenKind::ExpressionEnd, body_end);
            Ok(())
        }
    }

    /// The leading tag word of a body, when followed by whitespace or the end.
    fn tag_name(&self, body: &str, tags: &dyn TagTable) -> Option<SmolStr> {
        let word_len = |s: &str| {
            s.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(s.len())
        };
        let prefix = &self.options.closing_tag_prefix;

        let name = match body.strip_prefix(prefix.as_str()) {
            Some(rest) if !prefix.is_empty() && word_len(rest) > 0 => {
                let closing = &body[..prefix.len() + word_len(rest)];
                if tags.contains_tag(closing) {
                    closing
                } else {
                    &body[..word_len(body)]
                }
            }
            _ => &body[..word_len(body)],
        };

        let terminated = body[name.len()..]
            .chars()
            .next()
            .map_or(true, char::is_whitespace);
        (!name.is_empty() && terminated).then(|| SmolStr::new(name))
    }

    fn push_tag(
        &self,
        scan: &mut Scan<'_>,
        tags: &dyn TagTable,
        name: &str,
        body_start: usize,
        args: &str,
        body_end: usize,
    ) -> SyntaxResult<()> {
        let line = scan.lines.line_number(body_start as u32);
        scan.tokens.push(Token::new(
            TokenKind::Tag,
            name,
            line,
            Span::from_range(body_start..body_start + name.len()),
        ));
        let args_start = body_start + name.len();
        scan.push_marker(TokenKind::BlockStart, args_start);

        let tokens = match tags.argument_tokenizer(name) {
            Some(custom) if !args.trim().is_empty() => {
                let ctx = ArgumentContext {
                    lexer: &self.lexer,
                    lines: scan.lines,
                    offset: args_start,
                };
                custom.tokenize(args, &ctx)?
            }
            _ => self.lexer.tokenize(args, args_start, scan.lines)?,
        };
        scan.tokens.extend(tokens);
        scan.push_marker(TokenKind::BlockEnd, body_end);
        Ok(())
    }

    fn scan_raw(&self, scan: &mut Scan<'_>, start: usize) -> SyntaxResult<()> {
        let closing = format!(
            "{}{}{}{}",
            self.options.tag_open,
            self.options.closing_tag_prefix,
            self.options.raw_tag,
            self.options.tag_close
        );
        let content_start = scan.cursor.pos();
        if scan.cursor.consume_until(&closing).is_none() {
            return Err(scan.unterminated("raw block", start));
        }
        let content_end = scan.cursor.pos();
        scan.push_text(content_start, content_end);
        scan.cursor.consume(&closing);
        Ok(())
    }
}

/// Per-call scanner state.
struct Scan<'a> {
    source: &'a str,
    lines: &'a LineIndex,
    cursor: Cursor<'a>,
    tokens: Vec<Token>,
}

impl Scan<'_> {
    /// Push literal text, merging with a preceding text token.
    fn push_text(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let text = &self.source[start..end];
        if let Some(last) = self.tokens.last_mut().filter(|t| t.kind == TokenKind::Text) {
            let mut merged = last.value.to_string();
            merged.push_str(text);
            last.value = merged.into();
            last.span = last.span.merge(Span::from_range(start..end));
            return;
        }
        self.tokens.push(Token::new(
            TokenKind::Text,
            text,
            self.lines.line_number(start as u32),
            Span::from_range(start..end),
        ));
    }

    fn push_marker(&mut self, kind: TokenKind, at: usize) {
        self.tokens.push(Token::new(
            kind,
            "",
            self.lines.line_number(at as u32),
            Span::empty(at as u32),
        ));
    }

    fn unterminated(&self, what: &str, start: usize) -> SyntaxError {
        SyntaxError::unterminated(
            what,
            self.lines.line_number(start as u32),
            self.cursor.span_from(start),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Tags;

    struct SetArgs;

    impl ArgumentTokenizer for SetArgs {
        fn tokenize(&self, args: &str, ctx: &ArgumentContext<'_>) -> SyntaxResult<Vec<Token>> {
            let (at, name) = split_top_level(args, ':')[0];
            let skipped = name.len() - name.trim_start().len();
            Ok(vec![ctx.token(TokenKind::Identifier, name.trim(), at + skipped)])
        }
    }

    impl TagTable for Tags {
        fn contains_tag(&self, name: &str) -> bool {
            matches!(name, "if" | "else" | "endif" | "raw" | "set")
        }

        fn argument_tokenizer(&self, name: &str) -> Option<&dyn ArgumentTokenizer> {
            (name == "set").then_some(&SetArgs as &dyn ArgumentTokenizer)
        }
    }

    fn tokenizer() -> Tokenizer {
        let lexer = ExpressionLexer::new([">", "+", "."]).unwrap();
        Tokenizer::new(LexerOptions::default(), lexer)
    }

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        tokenizer()
            .tokenize(source, &Tags)
            .unwrap()
            .tokens()
            .iter()
            .map(|t| (t.kind, t.value.to_string()))
            .collect()
    }

    #[test]
    fn test_text_and_expression() {
        use TokenKind::*;
        assert_eq!(
            kinds("Hi {name}!"),
            vec![
                (Text, "Hi ".into()),
                (ExpressionStart, "".into()),
                (Identifier, "name".into()),
                (ExpressionEnd, "".into()),
                (Text, "!".into()),
                (Eof, "".into()),
            ]
        );
    }

    #[test]
    fn test_tags() {
        use TokenKind::*;
        assert_eq!(
            kinds("{if x > 1}a{else}b{endif}"),
            vec![
                (Tag, "if".into()),
                (BlockStart, "".into()),
                (Identifier, "x".into()),
                (Operator, ">".into()),
                (Literal, "1".into()),
                (BlockEnd, "".into()),
                (Text, "a".into()),
                (Tag, "else".into()),
                (BlockStart, "".into()),
                (BlockEnd, "".into()),
                (Text, "b".into()),
                (Tag, "endif".into()),
                (BlockStart, "".into()),
                (BlockEnd, "".into()),
                (Eof, "".into()),
            ]
        );
    }

    #[test]
    fn test_adjacent_text_is_merged() {
        let stream = tokenizer().tokenize("a{# note #}b{raw}{x}{endraw}c", &Tags).unwrap();
        let tokens = stream.tokens();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].value, "ab{x}c");
        assert_eq!(tokens[0].span, Span::new(0, 29));
        for pair in tokens.windows(2) {
            assert!(!(pair[0].kind == TokenKind::Text && pair[1].kind == TokenKind::Text));
        }
    }

    #[test]
    fn test_brace_followed_by_space_is_text() {
        assert_eq!(
            kinds("a { b }"),
            vec![(TokenKind::Text, "a { b }".into()), (TokenKind::Eof, "".into())]
        );
    }

    #[test]
    fn test_quoted_delimiter_inside_tag() {
        let stream = tokenizer().tokenize(r#"{"}" + x}"#, &Tags).unwrap();
        assert_eq!(stream.tokens()[1].value, "}");
        assert_eq!(stream.tokens()[1].kind, TokenKind::String);
    }

    #[test]
    fn test_tag_word_must_end() {
        use TokenKind::*;
        assert_eq!(kinds("{if.x}")[0], (ExpressionStart, "".into()));
        assert_eq!(kinds("{iffy}")[1], (Identifier, "iffy".into()));
    }

    #[test]
    fn test_custom_argument_tokenizer() {
        let stream = tokenizer().tokenize("{set total: 1}", &Tags).unwrap();
        let id = &stream.tokens()[2];
        assert_eq!(id.value, "total");
        assert_eq!(id.span, Span::new(5, 10));
    }

    #[test]
    fn test_line_numbers() {
        let stream = tokenizer().tokenize("a\nb\n{x}", &Tags).unwrap();
        assert_eq!(stream.tokens()[2].line, 3);
    }

    #[test]
    fn test_unterminated_errors() {
        let t = tokenizer();
        let cases = [
            ("a {# open", "Unterminated comment on line 1"),
            ("\n{x + 1", "Unterminated tag on line 2"),
            ("{\"x}", "Unterminated string on line 1"),
            ("{raw}abc", "Unterminated raw block on line 1"),
        ];
        for (source, message) in cases {
            let err = t.tokenize(source, &Tags).unwrap_err();
            assert_eq!(err.to_string(), message);
            assert_eq!(err.code, SyntaxErrorCode::Unterminated);
        }
    }

    #[test]
    fn test_closing_prefix_slash() {
        struct SlashTags;
        impl TagTable for SlashTags {
            fn contains_tag(&self, name: &str) -> bool {
                matches!(name, "if" | "/if")
            }
            fn argument_tokenizer(&self, _: &str) -> Option<&dyn ArgumentTokenizer> {
                None
            }
        }
        let options = LexerOptions {
            closing_tag_prefix: "/".to_string(),
            ..LexerOptions::default()
        };
        let t = Tokenizer::new(options, ExpressionLexer::new(["."]).unwrap());
        let stream = t.tokenize("{if a}x{/if}", &SlashTags).unwrap();
        assert!(stream
            .tokens()
            .iter()
            .any(|tok| tok.is(TokenKind::Tag, Some("/if"))));
    }

    #[test]
    fn test_split_top_level() {
        let parts = split_top_level(r#"a: f(1, 2), b: "x,y""#, ',');
        assert_eq!(parts, vec![(0, "a: f(1, 2)"), (11, r#" b: "x,y""#)]);
    }
}
