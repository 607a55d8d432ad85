//! Source positions and output buffers for quill.
//!
//! Spans locate tokens and nodes in template text, the line index turns
//! byte offsets into line numbers for diagnostics, and `CodeBuilder` is the
//! append-only buffer the code generator writes into.

use std::ops::Range;

/// A half-open byte range `[start, end)` in template text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// An empty span at `offset`, for errors at a position.
    #[inline]
    pub const fn empty(offset: u32) -> Self {
        Self::new(offset, offset)
    }

    #[inline]
    pub fn from_range(range: Range<usize>) -> Self {
        Self::new(range.start as u32, range.end as u32)
    }

    #[inline]
    pub const fn len(&self) -> u32 {
        self.end - self.start
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The smallest span covering both.
    #[inline]
    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// Maps byte offsets to 1-based line numbers.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offsets of the start of each line.
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(
                text.bytes()
                    .enumerate()
                    .filter(|&(_, b)| b == b'\n')
                    .map(|(i, _)| (i + 1) as u32),
            )
            .collect();
        Self { line_starts }
    }

    /// The line containing `offset`; offsets past the end map to the last
    /// line.
    pub fn line_number(&self, offset: u32) -> u32 {
        self.line_starts.partition_point(|&start| start <= offset) as u32
    }
}

/// Append-only buffer for generated source.
#[derive(Debug, Default, Clone)]
pub struct CodeBuilder {
    code: String,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_str(&mut self, code: &str) {
        self.code.push_str(code);
    }

    pub fn newline(&mut self) {
        self.code.push('\n');
    }

    /// Append `level` levels of four-space indentation.
    pub fn indent(&mut self, level: usize) {
        for _ in 0..level {
            self.code.push_str("    ");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn finish(self) -> String {
        self.code
    }
}
