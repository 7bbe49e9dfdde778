//! Diagnostic reporting: [`Diagnostic`], [`Handler`], [`DiagnosticBuilder`],
//! and the [`DiagnosticCode`] taxonomy every pipeline stage in `hulk-sem`
//! reports through.
//!
//! A [`Diagnostic`] always reports a problem with the *program being
//! checked*, never a consistency violation inside the checker itself (those
//! are [`crate::error::ContextError`]/[`crate::error::ScopeError`],
//! propagated with `Result`/`?`). Every stage of the pipeline (spec.md §2)
//! pushes into one shared [`Handler`]; `Handler::has_errors()` is the
//! propagation gate between stages (spec.md §7).
//!
//! ```
//! use hulk_util::diagnostic::{Handler, DiagnosticBuilder, DiagnosticCode};
//! use hulk_util::Span;
//!
//! let handler = Handler::new();
//! DiagnosticBuilder::error("'x' is not defined in this context")
//!     .code(DiagnosticCode::E_HULK_UNDEFINED)
//!     .span(Span::DUMMY)
//!     .emit(&handler);
//!
//! assert!(handler.has_errors());
//! ```

mod builder;
mod codes;
mod level;

pub use builder::{DiagnosticBuilder, SourceSnippet};
pub use codes::DiagnosticCode;
pub use level::{ColorConfig, LabelStyle, Level};

use crate::Span;
use std::cell::RefCell;

/// A single diagnostic: a level, a message, the span it anchors to, plus
/// optional notes/helps/snippets accumulated by [`DiagnosticBuilder`].
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub span: Span,
    pub code: Option<DiagnosticCode>,
    pub notes: Vec<String>,
    pub helps: Vec<String>,
    pub snippets: Vec<SourceSnippet>,
}

impl Diagnostic {
    pub fn new(level: Level, message: impl Into<String>, span: Span) -> Self {
        Self {
            level,
            message: message.into(),
            span,
            code: None,
            notes: Vec::new(),
            helps: Vec::new(),
            snippets: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Error, message, span)
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Warning, message, span)
    }

    pub fn with_code(mut self, code: DiagnosticCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.helps.push(help.into());
        self
    }

    pub fn with_snippet(mut self, snippet: SourceSnippet) -> Self {
        self.snippets.push(snippet);
        self
    }

    /// One-line rendering: `error[E5001]: 'x' is not defined in this context`
    /// — the §7 "one-line description prefixed by the stage name" is the
    /// caller's job (the stage name isn't known to a bare `Diagnostic`);
    /// this gives the part after that prefix.
    pub fn render_oneline(&self) -> String {
        match self.code {
            Some(code) => format!("{}[{}]: {}", self.level, code, self.message),
            None => format!("{}: {}", self.level, self.message),
        }
    }
}

/// Collects [`Diagnostic`]s emitted by every pipeline stage.
///
/// Shared by `&Handler` across stages (spec.md §2's stages "share a shared
/// error list"); interior mutability means a stage doesn't need `&mut` just
/// to report a problem.
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
    panic_on_error: bool,
}

impl Handler {
    pub fn new() -> Self {
        Self {
            diagnostics: RefCell::new(Vec::new()),
            panic_on_error: false,
        }
    }

    /// A handler that panics the moment an error-level diagnostic is
    /// emitted — useful in tests that assert a particular program
    /// type-checks cleanly.
    pub fn new_panicking() -> Self {
        Self {
            diagnostics: RefCell::new(Vec::new()),
            panic_on_error: true,
        }
    }

    pub fn emit_diagnostic(&self, diagnostic: Diagnostic) {
        if self.panic_on_error && diagnostic.level.is_error() {
            panic!("diagnostic error: {}", diagnostic.message);
        }
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    pub fn build_error(&self, span: Span, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::error(message).span(span)
    }

    pub fn build_warning(&self, span: Span, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::warning(message).span(span)
    }

    /// The §7 propagation gate: a stage with `has_errors()` true aborts the
    /// pipeline before the next stage runs.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.borrow().iter().any(|d| d.level.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level.is_error())
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level.is_warning())
            .count()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// The minimal §6 error output: one rendered line per diagnostic, in
    /// discovery order.
    pub fn to_strings(&self) -> Vec<String> {
        self.diagnostics
            .borrow()
            .iter()
            .map(Diagnostic::render_oneline)
            .collect()
    }

    pub fn clear(&self) {
        self.diagnostics.borrow_mut().clear();
    }

    /// Appends another handler's diagnostics onto this one, preserving
    /// order — used by `hulk-driver` to merge per-stage handlers if a
    /// caller chooses to run stages with separate handlers instead of one
    /// shared one.
    pub fn absorb(&self, other: &Handler) {
        self.diagnostics
            .borrow_mut()
            .extend(other.diagnostics.borrow().iter().cloned());
    }
}

impl Default for Handler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_starts_empty() {
        let handler = Handler::new();
        assert!(!handler.has_errors());
        assert_eq!(handler.error_count(), 0);
        assert_eq!(handler.warning_count(), 0);
    }

    #[test]
    fn emit_diagnostic_counts_errors_and_warnings_separately() {
        let handler = Handler::new();
        handler.emit_diagnostic(Diagnostic::error("e", Span::DUMMY));
        handler.emit_diagnostic(Diagnostic::warning("w", Span::DUMMY));
        assert_eq!(handler.error_count(), 1);
        assert_eq!(handler.warning_count(), 1);
        assert!(handler.has_errors());
    }

    #[test]
    fn clear_resets_handler() {
        let handler = Handler::new();
        handler.emit_diagnostic(Diagnostic::error("e", Span::DUMMY));
        handler.clear();
        assert!(!handler.has_errors());
    }

    #[test]
    fn panicking_handler_panics_on_error() {
        let handler = Handler::new_panicking();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            handler.emit_diagnostic(Diagnostic::error("boom", Span::DUMMY));
        }));
        assert!(result.is_err());
    }

    #[test]
    fn panicking_handler_does_not_panic_on_warning() {
        let handler = Handler::new_panicking();
        handler.emit_diagnostic(Diagnostic::warning("fine", Span::DUMMY));
        assert_eq!(handler.warning_count(), 1);
    }

    #[test]
    fn to_strings_renders_one_line_per_diagnostic() {
        let handler = Handler::new();
        DiagnosticBuilder::error("'x' is not defined")
            .code(DiagnosticCode::E_HULK_UNDEFINED)
            .span(Span::DUMMY)
            .emit(&handler);
        let lines = handler.to_strings();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("E5001"));
        assert!(lines[0].contains("'x' is not defined"));
    }

    #[test]
    fn absorb_appends_in_order() {
        let a = Handler::new();
        let b = Handler::new();
        a.emit_diagnostic(Diagnostic::error("first", Span::DUMMY));
        b.emit_diagnostic(Diagnostic::error("second", Span::DUMMY));
        a.absorb(&b);
        let msgs: Vec<_> = a.diagnostics().into_iter().map(|d| d.message).collect();
        assert_eq!(msgs, vec!["first", "second"]);
    }

    #[test]
    fn render_oneline_without_code() {
        let d = Diagnostic::warning("careful", Span::DUMMY);
        assert_eq!(d.render_oneline(), "warning: careful");
    }
}
