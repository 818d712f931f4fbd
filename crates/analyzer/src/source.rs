//! Source location tracking

use serde::{Deserialize, Serialize};

/// A span of source code from start to end byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn empty(pos: usize) -> Self {
        Self { start: pos, end: pos }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Smallest span covering both `self` and `other`
    pub fn merge(&self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Line/column position derived from a byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

/// Source text with precomputed line starts, used to turn spans into locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let mut line_starts = vec![0];
        for (i, &byte) in content.as_bytes().iter().enumerate() {
            if byte == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { name: name.into(), content, line_starts }
    }

    pub fn location(&self, offset: usize) -> Location {
        let line = self
            .line_starts
            .binary_search(&offset)
            .unwrap_or_else(|i| i.saturating_sub(1));
        Location {
            line: line + 1,
            column: offset - self.line_starts[line] + 1,
            offset,
        }
    }

    /// Source text covered by `span`, if it lies within the file
    pub fn snippet(&self, span: Span) -> Option<&str> {
        self.content.get(span.start..span.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_lookup() {
        let file = SourceFile::new("main.leek", "let a = 1\nlet b = a(2)");
        assert_eq!(file.location(0), Location { line: 1, column: 1, offset: 0 });
        assert_eq!(file.location(14), Location { line: 2, column: 5, offset: 14 });
        assert_eq!(file.snippet(Span::new(18, 22)), Some("a(2)"));
    }

    #[test]
    fn test_merge() {
        let span = Span::new(4, 8).merge(Span::new(2, 5));
        assert_eq!(span, Span::new(2, 8));
        assert_eq!(span.len(), 6);
    }
}
