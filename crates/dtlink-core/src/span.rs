//! Source locations.
//!
//! Every AST element carries a [`Span`]: the file it came from, its byte
//! range, and its start and (exclusive) end as line/column [`Position`]s.
//! Line/column positions are what the scope predicate compares; byte ranges
//! are what diagnostic renderers slice.

use std::{fmt, ops::Range};

/// Identity of one source file within a [`SourceMap`](crate::source::SourceMap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FileId(u32);

impl FileId {
    /// Create a file id from its raw index.
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// The raw index of this file id.
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

/// A zero-based line/column position.
///
/// Ordering is line-major, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// A located range of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    file: FileId,
    start: usize,
    end: usize,
    start_pos: Position,
    end_pos: Position,
}

impl Span {
    /// Create a span from its byte range and line/column bounds.
    pub fn new(file: FileId, range: Range<usize>, start_pos: Position, end_pos: Position) -> Self {
        Self {
            file,
            start: range.start,
            end: range.end,
            start_pos,
            end_pos,
        }
    }

    /// The file this span belongs to.
    pub fn file(&self) -> FileId {
        self.file
    }

    /// Get the start byte offset of the span
    pub fn start(&self) -> usize {
        self.start
    }

    /// Get the end byte offset of the span
    pub fn end(&self) -> usize {
        self.end
    }

    /// Get the length of the span in bytes
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the span is empty
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Line/column of the first character.
    pub fn start_pos(&self) -> Position {
        self.start_pos
    }

    /// Line/column just past the last character.
    pub fn end_pos(&self) -> Position {
        self.end_pos
    }

    /// Create a union of two spans (encompassing both).
    ///
    /// Both spans must belong to the same file; the file of `self` is kept.
    pub fn union(&self, other: Span) -> Span {
        let (start, start_pos) = if other.start < self.start {
            (other.start, other.start_pos)
        } else {
            (self.start, self.start_pos)
        };
        let (end, end_pos) = if other.end > self.end {
            (other.end, other.end_pos)
        } else {
            (self.end, self.end_pos)
        };
        Span::new(self.file, start..end, start_pos, end_pos)
    }

    /// Narrow a single-line span to `range`, given relative to `text`, the
    /// exact source text this span covers.
    pub fn subspan(&self, text: &str, range: Range<usize>) -> Span {
        let column = |offset: usize| {
            let chars = text.get(..offset).map_or(offset, |prefix| prefix.chars().count());
            self.start_pos.column + chars as u32
        };
        Span::new(
            self.file,
            self.start + range.start..self.start + range.end,
            Position::new(self.start_pos.line, column(range.start)),
            Position::new(self.start_pos.line, column(range.end)),
        )
    }

    /// Whether `position` in `file` lies within this span, bounds inclusive.
    pub fn covers(&self, file: FileId, position: Position) -> bool {
        self.file == file && self.start_pos <= position && position <= self.end_pos
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.start_pos)
    }
}

/// Byte offset to line/column conversion for one source text.
#[derive(Debug, Clone)]
pub struct LineIndex<'src> {
    text: &'src str,
    line_starts: Vec<usize>,
}

impl<'src> LineIndex<'src> {
    pub fn new(text: &'src str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        Self { text, line_starts }
    }

    /// Position of byte `offset`. Columns count characters, not bytes.
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column = self
            .text
            .get(line_start..offset)
            .map_or(offset - line_start, |prefix| prefix.chars().count());
        Position::new(line as u32, column as u32)
    }

    /// Build a [`Span`] in `file` for a byte range of this text.
    pub fn span(&self, file: FileId, range: Range<usize>) -> Span {
        let start_pos = self.position(range.start);
        let end_pos = self.position(range.end);
        Span::new(file, range, start_pos, end_pos)
    }

    /// Inverse of [`LineIndex::position`], clamped to the text.
    pub fn offset(&self, position: Position) -> usize {
        let Some(&line_start) = self.line_starts.get(position.line as usize) else {
            return self.text.len();
        };
        self.text[line_start..]
            .char_indices()
            .take_while(|(_, ch)| *ch != '\n')
            .nth(position.column as usize)
            .map_or_else(
                || {
                    let line = &self.text[line_start..];
                    line_start + line.find('\n').unwrap_or(line.len())
                },
                |(idx, _)| line_start + idx,
            )
    }
}

/// A value tagged with the source span it was parsed from.
#[derive(Debug, Clone, Copy, Default)]
pub struct Spanned<T> {
    value: T,
    span: Span,
}

impl<T> Spanned<T> {
    /// Create a new spanned value from a value and span information
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Convert from one spanned type to another, keeping the span.
    pub fn map<F, U>(&self, f: F) -> Spanned<U>
    where
        F: FnOnce(&T) -> U,
    {
        Spanned {
            value: f(&self.value),
            span: self.span,
        }
    }

    /// Get a reference to the underlying value
    pub fn inner(&self) -> &T {
        &self.value
    }

    /// Consume the Spanned wrapper and return just the inner value
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> std::ops::Deref for Spanned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T: fmt::Display> fmt::Display for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

// PartialEq compares only the inner values, ignoring span information
impl<T: PartialEq> PartialEq for Spanned<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value.eq(&other.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index_positions() {
        let index = LineIndex::new("/ {\n\tfoo;\n};\n");

        assert_eq!(index.position(0), Position::new(0, 0));
        assert_eq!(index.position(2), Position::new(0, 2));
        assert_eq!(index.position(4), Position::new(1, 0));
        assert_eq!(index.position(5), Position::new(1, 1));
        assert_eq!(index.position(10), Position::new(2, 0));
    }

    #[test]
    fn test_line_index_offset_round_trip() {
        let text = "a {\n  b;\n};";
        let index = LineIndex::new(text);

        for offset in 0..text.len() {
            assert_eq!(index.offset(index.position(offset)), offset);
        }
    }

    #[test]
    fn test_line_index_offset_past_line_end() {
        let index = LineIndex::new("ab\ncd");
        assert_eq!(index.offset(Position::new(0, 10)), 2);
        assert_eq!(index.offset(Position::new(7, 0)), 5);
    }

    #[test]
    fn test_span_basic_functionality() {
        let index = LineIndex::new("hello world");
        let span = index.span(FileId::new(1), 6..11);

        assert_eq!(span.file(), FileId::new(1));
        assert_eq!(span.start(), 6);
        assert_eq!(span.end(), 11);
        assert_eq!(span.len(), 5);
        assert!(!span.is_empty());
        assert_eq!(span.start_pos(), Position::new(0, 6));
        assert_eq!(span.end_pos(), Position::new(0, 11));
    }

    #[test]
    fn test_span_union() {
        let index = LineIndex::new("one\ntwo\nthree");
        let first = index.span(FileId::default(), 0..3);
        let last = index.span(FileId::default(), 8..13);

        let union = first.union(last);
        assert_eq!(union.range(), 0..13);
        assert_eq!(union.start_pos(), Position::new(0, 0));
        assert_eq!(union.end_pos(), Position::new(2, 5));
    }

    #[test]
    fn test_subspan() {
        let text = "x = &{/soc/uart@1};";
        let index = LineIndex::new(text);
        let token = index.span(FileId::new(1), 4..18);

        let segment = token.subspan(&text[4..18], 7..13);
        assert_eq!(&text[segment.range()], "uart@1");
        assert_eq!(segment.start_pos(), Position::new(0, 11));
        assert_eq!(segment.end_pos(), Position::new(0, 17));
        assert_eq!(segment.file(), FileId::new(1));
    }

    #[test]
    fn test_span_covers() {
        let index = LineIndex::new("a {\n};");
        let span = index.span(FileId::new(2), 0..6);

        assert!(span.covers(FileId::new(2), Position::new(0, 0)));
        assert!(span.covers(FileId::new(2), Position::new(1, 2)));
        assert!(!span.covers(FileId::new(2), Position::new(1, 3)));
        assert!(!span.covers(FileId::new(3), Position::new(0, 1)));
    }

    #[test]
    fn test_position_ordering_is_line_major() {
        assert!(Position::new(0, 80) < Position::new(1, 0));
        assert!(Position::new(3, 1) < Position::new(3, 2));
    }

    #[test]
    fn test_spanned_map_keeps_span() {
        let span = LineIndex::new("0x10").span(FileId::default(), 0..4);
        let spanned = Spanned::new("0x10", span);
        let mapped = spanned.map(|text| text.len());

        assert_eq!(*mapped.inner(), 4);
        assert_eq!(mapped.span(), span);
    }
}
