//! [`SourceMap`]: an append-only registry of source files, used to turn a
//! byte offset (as carried on a [`super::Span`]) back into a line and
//! column for diagnostics.

use std::ops::Range;
use std::sync::Arc;

use super::{FileId, Span};

/// One source file, plus a precomputed table of line-start byte offsets for
/// O(log n) offset-to-line/column lookup.
pub struct SourceFile {
    id: FileId,
    name: String,
    content: Arc<str>,
    line_starts: Arc<[usize]>,
}

impl SourceFile {
    pub fn new(id: usize, name: impl Into<String>, content: impl Into<Arc<str>>) -> Self {
        let content = content.into();
        let line_starts = compute_line_starts(&content);
        Self {
            id: FileId(id),
            name: name.into(),
            content,
            line_starts: line_starts.into(),
        }
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

    /// Byte offset where 0-indexed `line` starts, if it exists.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// 1-indexed `(line, column)` for a byte offset into this file.
    pub fn offset_to_line_col(&self, offset: usize) -> (usize, usize) {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => (line + 1, 1),
            Err(0) => (1, offset + 1),
            Err(next_line) => {
                let line = next_line - 1;
                let col = offset - self.line_starts[line] + 1;
                (line + 1, col)
            }
        }
    }

    /// The (trailing-newline-trimmed) source line containing `offset`.
    pub fn line_at_offset(&self, offset: usize) -> Option<&str> {
        let (line, _) = self.offset_to_line_col(offset);
        self.line_at(line)
    }

    /// The (trailing-newline-trimmed) 1-indexed source line.
    pub fn line_at(&self, line: usize) -> Option<&str> {
        if line == 0 || line > self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[line - 1];
        let end = self
            .line_starts
            .get(line)
            .copied()
            .unwrap_or(self.content.len());
        Some(self.content[start..end].trim_end_matches(['\n', '\r']))
    }

    /// Extract a raw byte range. Panics on out-of-bounds or non-char
    /// boundary ranges — internal/debug helper, not a fallible public API.
    pub fn extract(&self, range: Range<usize>) -> &str {
        &self.content[range]
    }
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("line_count", &self.line_count())
            .finish()
    }
}

fn compute_line_starts(content: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, ch) in content.char_indices() {
        if ch == '\n' {
            starts.push(i + 1);
        }
    }
    starts
}

/// An append-only collection of [`SourceFile`]s, addressed by [`FileId`].
#[derive(Default)]
pub struct SourceMap {
    files: Vec<Arc<SourceFile>>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    pub fn add_file(&mut self, name: impl Into<String>, content: impl Into<Arc<str>>) -> FileId {
        let id = self.files.len();
        self.files.push(Arc::new(SourceFile::new(id, name, content)));
        FileId(id)
    }

    pub fn get(&self, id: FileId) -> Option<Arc<SourceFile>> {
        self.files.get(id.0).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Render a rustc-style `--> name:line:col` block with a caret
    /// underline, for use in a [`crate::diagnostic::DiagnosticBuilder`]
    /// snippet or a standalone terminal report.
    pub fn format_span(&self, span: Span) -> Option<String> {
        let file = self.get(span.file_id)?;
        let line_text = file.line_at(span.line as usize)?;
        let col = span.column.max(1) as usize;
        let underline_len = span.len().max(1);
        Some(format!(
            "--> {}:{}:{}\n{:>4} | {}\n     | {}{}",
            file.name(),
            span.line,
            span.column,
            span.line,
            line_text,
            " ".repeat(col - 1),
            "^".repeat(underline_len),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_file() {
        let f = SourceFile::new(0, "a.hulk", "let x = 1;");
        assert_eq!(f.line_count(), 1);
        assert_eq!(f.line_at(1), Some("let x = 1;"));
    }

    #[test]
    fn multiline_offset_lookup() {
        let f = SourceFile::new(0, "a.hulk", "let x = 1;\nlet y = 2;\nprint(x);\n");
        assert_eq!(f.line_count(), 4);
        assert_eq!(f.offset_to_line_col(0), (1, 1));
        assert_eq!(f.offset_to_line_col(11), (2, 1));
        assert_eq!(f.line_at(2), Some("let y = 2;"));
        assert_eq!(f.line_at(3), Some("print(x);"));
    }

    #[test]
    fn offset_mid_line() {
        let f = SourceFile::new(0, "a.hulk", "abcdef\nghijkl\n");
        assert_eq!(f.offset_to_line_col(3), (1, 4));
        assert_eq!(f.offset_to_line_col(9), (2, 3));
    }

    #[test]
    fn empty_file() {
        let f = SourceFile::new(0, "empty.hulk", "");
        assert_eq!(f.line_count(), 1);
        assert_eq!(f.line_at(1), Some(""));
    }

    #[test]
    fn line_out_of_range() {
        let f = SourceFile::new(0, "a.hulk", "x\n");
        assert_eq!(f.line_at(0), None);
        assert_eq!(f.line_at(99), None);
    }

    #[test]
    fn source_map_add_and_get() {
        let mut map = SourceMap::new();
        let id = map.add_file("a.hulk", "let x = 1;");
        let file = map.get(id).unwrap();
        assert_eq!(file.name(), "a.hulk");
        assert_eq!(map.file_count(), 1);
    }

    #[test]
    fn get_missing_file() {
        let map = SourceMap::new();
        assert!(map.get(FileId(0)).is_none());
    }

    #[test]
    fn format_span_renders_caret() {
        let mut map = SourceMap::new();
        let id = map.add_file("a.hulk", "let x = 1 + \"s\";\n");
        let span = Span::with_file(8, 9, id, 1, 9);
        let rendered = map.format_span(span).unwrap();
        assert!(rendered.contains("a.hulk:1:9"));
        assert!(rendered.contains('^'));
    }
}
