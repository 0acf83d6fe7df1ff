//! Source map for managing source files and computing source locations.
//!
//! The [`SourceMap`] owns every file handed to the compiler and answers the
//! questions diagnostics rendering needs: which file does a [`FileId`] name,
//! what text sits on a given line, and what line/column does a byte offset
//! fall on.

use std::sync::Arc;

use thiserror::Error;

use super::{FileId, Span};

/// Errors raised by source map lookups.
#[derive(Debug, Error)]
pub enum SourceMapError {
    #[error("file not found: {0:?}")]
    FileNotFound(FileId),

    #[error("span out of bounds: file has {file_len} bytes, span is {span_start}..{span_end}")]
    SpanOutOfBounds {
        file_len: usize,
        span_start: usize,
        span_end: usize,
    },
}

/// A source file with its content and precomputed line table.
#[derive(Clone)]
pub struct SourceFile {
    id: FileId,
    name: String,
    content: Arc<str>,
    /// Byte offset of each line start, always beginning with 0.
    line_starts: Arc<[usize]>,
}

impl SourceFile {
    pub fn new(id: FileId, name: impl Into<String>, content: impl Into<Arc<str>>) -> Self {
        let content = content.into();
        let line_starts = Self::compute_line_starts(&content);
        Self {
            id,
            name: name.into(),
            content,
            line_starts,
        }
    }

    fn compute_line_starts(content: &str) -> Arc<[usize]> {
        let mut line_starts = vec![0];
        for (i, ch) in content.char_indices() {
            if ch == '\n' {
                line_starts.push(i + 1);
            }
        }
        line_starts.into()
    }

    #[inline]
    pub fn id(&self) -> FileId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Convert a byte offset to 1-based (line, column) coordinates.
    pub fn offset_to_line_col(&self, offset: usize) -> (usize, usize) {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => (line + 1, 1),
            Err(insert_point) => {
                let line = insert_point - 1;
                let line_start = self.line_starts.get(line).copied().unwrap_or(0);
                (line + 1, offset - line_start + 1)
            }
        }
    }

    /// Get a specific source line (1-indexed), without its line terminator.
    pub fn line_at(&self, line: usize) -> Option<&str> {
        let start = self.line_starts.get(line.checked_sub(1)?).copied()?;
        let end = self
            .line_starts
            .get(line)
            .copied()
            .unwrap_or(self.content.len());
        Some(self.content[start..end].trim_end_matches(['\n', '\r']))
    }

    /// Extract the text a span covers.
    pub fn extract(&self, span: Span) -> Result<&str, SourceMapError> {
        if span.end > self.content.len() || span.start > span.end {
            return Err(SourceMapError::SpanOutOfBounds {
                file_len: self.content.len(),
                span_start: span.start,
                span_end: span.end,
            });
        }
        Ok(&self.content[span.start..span.end])
    }
}

/// Registry of all source files in one compiler invocation.
///
/// # Examples
///
/// ```
/// use rivc_util::span::SourceMap;
///
/// let mut map = SourceMap::new();
/// let id = map.add_file("main.rs", "fn main() {}\n");
/// assert_eq!(map.file(id).unwrap().name(), "main.rs");
/// ```
#[derive(Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file and return its id.
    pub fn add_file(&mut self, name: impl Into<String>, content: impl Into<Arc<str>>) -> FileId {
        let id = FileId(self.files.len());
        self.files.push(SourceFile::new(id, name, content));
        id
    }

    pub fn file(&self, id: FileId) -> Result<&SourceFile, SourceMapError> {
        self.files
            .get(id.index())
            .ok_or(SourceMapError::FileNotFound(id))
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup() {
        let mut map = SourceMap::new();
        let a = map.add_file("a.rs", "fn a() {}");
        let b = map.add_file("b.rs", "fn b() {}");
        assert_ne!(a, b);
        assert_eq!(map.file(a).unwrap().name(), "a.rs");
        assert_eq!(map.file(b).unwrap().content(), "fn b() {}");
        assert!(map.file(FileId(7)).is_err());
    }

    #[test]
    fn test_line_starts() {
        let file = SourceFile::new(FileId(0), "t.rs", "one\ntwo\nthree");
        assert_eq!(file.line_count(), 3);
        assert_eq!(file.line_at(1), Some("one"));
        assert_eq!(file.line_at(2), Some("two"));
        assert_eq!(file.line_at(3), Some("three"));
        assert_eq!(file.line_at(4), None);
    }

    #[test]
    fn test_offset_to_line_col() {
        let file = SourceFile::new(FileId(0), "t.rs", "one\ntwo\nthree");
        assert_eq!(file.offset_to_line_col(0), (1, 1));
        assert_eq!(file.offset_to_line_col(4), (2, 1));
        assert_eq!(file.offset_to_line_col(6), (2, 3));
        assert_eq!(file.offset_to_line_col(8), (3, 1));
    }

    #[test]
    fn test_extract() {
        let file = SourceFile::new(FileId(0), "t.rs", "fn main() {}");
        assert_eq!(file.extract(Span::new(0, 2, 1, 1)).unwrap(), "fn");
        assert!(file.extract(Span::new(0, 100, 1, 1)).is_err());
    }

    #[test]
    fn test_crlf_lines_trimmed() {
        let file = SourceFile::new(FileId(0), "t.rs", "one\r\ntwo\r\n");
        assert_eq!(file.line_at(1), Some("one"));
        assert_eq!(file.line_at(2), Some("two"));
    }
}
