//! Source span tracking for error reporting.

use serde::{Deserialize, Serialize};

/// Represents a position in the source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed, in characters)
    pub column: usize,
    /// Byte offset from the start of the file
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

/// Represents a span in the source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start position
    pub start: Position,
    /// End position (exclusive)
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// A zero-width span at `pos`.
    pub fn point(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// Byte range covered by the span.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start.offset..self.end.offset
    }

    /// Merge two spans into one that covers both
    pub fn merge(&self, other: &Span) -> Span {
        let start = if self.start.offset < other.start.offset {
            self.start
        } else {
            other.start
        };
        let end = if self.end.offset > other.end.offset {
            self.end
        } else {
            other.end
        };
        Span { start, end }
    }
}

/// Running line/column counter over one source buffer.
///
/// Positions are produced by advancing from the last requested offset, so a
/// scan that asks for non-decreasing offsets walks the source exactly once.
/// Asking for an earlier offset restarts from the beginning.
#[derive(Debug, Clone)]
pub struct LineCursor<'a> {
    source: &'a str,
    position: Position,
}

impl<'a> LineCursor<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            position: Position::new(1, 1, 0),
        }
    }

    /// Position of byte `offset`, clamped to the end of the source.
    pub fn advance_to(&mut self, offset: usize) -> Position {
        let offset = offset.min(self.source.len());
        if offset < self.position.offset {
            self.position = Position::new(1, 1, 0);
        }

        let bytes = &self.source.as_bytes()[self.position.offset..offset];
        for &b in bytes {
            if b == b'\n' {
                self.position.line += 1;
                self.position.column = 1;
            } else if b & 0xC0 != 0x80 {
                // Columns count characters: UTF-8 continuation bytes are skipped.
                self.position.column += 1;
            }
        }
        self.position.offset = offset;
        self.position
    }

    /// Span between two byte offsets, `start <= end`.
    pub fn span(&mut self, start: usize, end: usize) -> Span {
        let start = self.advance_to(start);
        Span::new(start, self.advance_to(end))
    }
}
