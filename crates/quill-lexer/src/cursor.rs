//! Byte cursor over template text.

use quill_source::Span;

/// A forward-only cursor used by the template scanner.
pub struct Cursor<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    /// Current byte position.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Get the remaining source.
    pub fn remaining(&self) -> &'a str {
        &self.source[self.pos..]
    }

    pub fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Consume and return the next character.
    pub fn next_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub fn starts_with(&self, s: &str) -> bool {
        self.remaining().starts_with(s)
    }

    /// Consume a string if the remaining source starts with it.
    pub fn consume(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    /// Move to an absolute byte position.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.source.len());
    }

    /// Advance to the next occurrence of `s` and return the skipped text.
    /// Returns `None` without moving when `s` does not occur.
    pub fn consume_until(&mut self, s: &str) -> Option<&'a str> {
        let idx = self.remaining().find(s)?;
        let start = self.pos;
        self.pos += idx;
        Some(&self.source[start..self.pos])
    }

    /// Read up to `close`, skipping over quoted strings, and consume `close`.
    /// On failure reports whether input ended inside a quote.
    pub fn consume_tag_body(&mut self, close: &str) -> Result<&'a str, UnterminatedBody> {
        let start = self.pos;
        let mut quote: Option<char> = None;
        while let Some(c) = self.peek_char() {
            match quote {
                Some(q) => {
                    self.next_char();
                    if c == '\\' {
                        self.next_char();
                    } else if c == q {
                        quote = None;
                    }
                }
                None => {
                    if self.starts_with(close) {
                        let body = &self.source[start..self.pos];
                        self.pos += close.len();
                        return Ok(body);
                    }
                    if c == '"' || c == '\'' {
                        quote = Some(c);
                    }
                    self.next_char();
                }
            }
        }
        Err(if quote.is_some() {
            UnterminatedBody::Quote
        } else {
            UnterminatedBody::Tag
        })
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Get a span from start to current position.
    pub fn span_from(&self, start: usize) -> Span {
        Span::new(start as u32, self.pos as u32)
    }
}

/// Why a tag body could not be closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnterminatedBody {
    Quote,
    Tag,
}
