//! Diagnostic builder for fluent diagnostic construction.

use super::{Diagnostic, DiagnosticCode, Level};
use crate::Span;

/// A source code snippet for display in diagnostics.
#[derive(Clone, Debug)]
pub struct SourceSnippet {
    pub line: String,
    pub line_number: usize,
    pub start_column: usize,
    pub end_column: usize,
    pub label: Option<String>,
}

impl SourceSnippet {
    pub fn new(
        line: impl Into<String>,
        line_number: usize,
        start_column: usize,
        end_column: usize,
        label: Option<impl Into<String>>,
    ) -> Self {
        Self {
            line: line.into(),
            line_number,
            start_column,
            end_column,
            label: label.map(Into::into),
        }
    }

    /// A snippet without a highlighted range (a point span).
    pub fn point(line: impl Into<String>, line_number: usize, column: usize) -> Self {
        Self {
            line: line.into(),
            line_number,
            start_column: column,
            end_column: column,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Renders the source line with a caret (`^`) underline beneath the
    /// highlighted range.
    pub fn format(&self) -> String {
        let line_num_width = self.line_number.to_string().len().max(3);
        let mut result = String::new();

        result.push_str(&format!(
            "{:>width$} | {}\n",
            self.line_number,
            self.line,
            width = line_num_width
        ));
        result.push_str(&format!("{:>width$} | ", "", width = line_num_width));

        let underline_start = self.start_column.saturating_sub(1);
        let underline_len = (self.end_column - self.start_column).max(1);

        for _ in 0..underline_start {
            result.push(' ');
        }
        for _ in 0..underline_len {
            result.push('^');
        }

        if let Some(ref label) = self.label {
            result.push_str(&format!(" {label}"));
        }

        result
    }
}

/// Fluent builder for [`Diagnostic`]s.
///
/// ```
/// use hulk_util::diagnostic::{DiagnosticBuilder, DiagnosticCode, Span};
///
/// let diag = DiagnosticBuilder::error("'x' is not defined in this context")
///     .code(DiagnosticCode::E_HULK_UNDEFINED)
///     .span(Span::DUMMY)
///     .help("declare 'x' with a `let` expression before using it")
///     .build();
/// ```
pub struct DiagnosticBuilder {
    level: Level,
    message: String,
    span: Span,
    code: Option<DiagnosticCode>,
    notes: Vec<String>,
    helps: Vec<String>,
    snippets: Vec<SourceSnippet>,
}

impl DiagnosticBuilder {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            span: Span::DUMMY,
            code: None,
            notes: Vec::new(),
            helps: Vec::new(),
            snippets: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Level::Warning, message)
    }

    pub fn bug(message: impl Into<String>) -> Self {
        Self::new(Level::Bug, message)
    }

    pub fn code(mut self, code: DiagnosticCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.helps.push(help.into());
        self
    }

    /// Alias for [`Self::note`], matching [`Diagnostic::with_note`]'s
    /// naming.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Alias for [`Self::help`], matching [`Diagnostic::with_help`]'s
    /// naming.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.helps.push(help.into());
        self
    }

    pub fn snippet(mut self, snippet: SourceSnippet) -> Self {
        self.snippets.push(snippet);
        self
    }

    pub fn build(self) -> Diagnostic {
        Diagnostic {
            level: self.level,
            message: self.message,
            span: self.span,
            code: self.code,
            notes: self.notes,
            helps: self.helps,
            snippets: self.snippets,
        }
    }

    /// Builds and immediately emits the diagnostic to `handler`.
    pub fn emit(self, handler: &super::Handler) {
        handler.emit_diagnostic(self.build());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_snippet_new_holds_fields() {
        let snippet = SourceSnippet::new("let x = 1 in x", 1, 5, 6, Some("variable"));
        assert_eq!(snippet.line, "let x = 1 in x");
        assert_eq!(snippet.line_number, 1);
        assert_eq!(snippet.start_column, 5);
        assert_eq!(snippet.end_column, 6);
        assert_eq!(snippet.label, Some("variable".to_string()));
    }

    #[test]
    fn source_snippet_point_has_equal_columns() {
        let snippet = SourceSnippet::point("let x = 1 in x", 1, 5);
        assert_eq!(snippet.start_column, 5);
        assert_eq!(snippet.end_column, 5);
        assert_eq!(snippet.label, None);
    }

    #[test]
    fn source_snippet_with_label_sets_label() {
        let snippet =
            SourceSnippet::new("let x = 1 in x", 1, 5, 6, None::<String>).with_label("here");
        assert_eq!(snippet.label, Some("here".to_string()));
    }

    #[test]
    fn source_snippet_format_renders_caret_and_label() {
        let snippet = SourceSnippet::new("let x = 1 in x", 1, 5, 6, Some("here"));
        let formatted = snippet.format();
        assert!(formatted.contains("let x = 1 in x"));
        assert!(formatted.contains('^'));
        assert!(formatted.contains("here"));
    }

    #[test]
    fn builder_error_sets_error_level() {
        let diag = DiagnosticBuilder::error("test error").span(Span::DUMMY).build();
        assert_eq!(diag.level, Level::Error);
        assert_eq!(diag.message, "test error");
    }

    #[test]
    fn builder_warning_sets_warning_level() {
        let diag = DiagnosticBuilder::warning("test warning")
            .span(Span::DUMMY)
            .build();
        assert_eq!(diag.level, Level::Warning);
    }

    #[test]
    fn builder_code_is_attached() {
        let diag = DiagnosticBuilder::error("test")
            .code(DiagnosticCode::E_HULK_UNDEFINED)
            .span(Span::DUMMY)
            .build();
        assert_eq!(diag.code, Some(DiagnosticCode::E_HULK_UNDEFINED));
    }

    #[test]
    fn builder_collects_notes_and_helps() {
        let diag = DiagnosticBuilder::error("test")
            .note("note 1")
            .note("note 2")
            .help("help 1")
            .help("help 2")
            .span(Span::DUMMY)
            .build();
        assert_eq!(diag.notes, vec!["note 1", "note 2"]);
        assert_eq!(diag.helps, vec!["help 1", "help 2"]);
    }

    #[test]
    fn builder_collects_snippets() {
        let snippet = SourceSnippet::point("test", 1, 1);
        let diag = DiagnosticBuilder::error("test")
            .snippet(snippet.clone())
            .span(Span::DUMMY)
            .build();
        assert_eq!(diag.snippets.len(), 1);
        assert_eq!(diag.snippets[0].line, "test");
    }

    #[test]
    fn builder_fluent_chain() {
        let code = DiagnosticCode::E_HULK_TYPE_MISMATCH;
        let snippet = SourceSnippet::new("if (x) 1 else \"a\"", 1, 1, 3, Some("here"));

        let diag = DiagnosticBuilder::error("branches have incompatible types")
            .code(code)
            .span(Span::new(0, 2, 1, 1))
            .note("the `then` branch has type `Number`")
            .help("make both branches return the same type")
            .snippet(snippet)
            .build();

        assert_eq!(diag.level, Level::Error);
        assert_eq!(diag.code, Some(code));
        assert_eq!(diag.notes.len(), 1);
        assert_eq!(diag.helps.len(), 1);
        assert_eq!(diag.snippets.len(), 1);
    }

    #[test]
    fn builder_emit_pushes_into_handler() {
        use super::super::Handler;

        let handler = Handler::new();
        DiagnosticBuilder::error("test error")
            .span(Span::DUMMY)
            .emit(&handler);

        assert!(handler.has_errors());
        assert_eq!(handler.error_count(), 1);
    }

    #[test]
    fn builder_emit_with_code_preserves_code() {
        use super::super::Handler;

        let handler = Handler::new();
        DiagnosticBuilder::error("type error")
            .code(DiagnosticCode::E_HULK_TYPE_MISMATCH)
            .span(Span::DUMMY)
            .emit(&handler);

        let diags = handler.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, Some(DiagnosticCode::E_HULK_TYPE_MISMATCH));
    }
}
