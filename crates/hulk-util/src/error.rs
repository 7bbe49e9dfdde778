//! Internal, unrecoverable failure modes for this crate and for
//! `hulk-sem`'s `Context`/`Scope` API boundaries.
//!
//! These are distinct from the diagnostic taxonomy in [`crate::diagnostic`]:
//! a [`Diagnostic`](crate::diagnostic::Diagnostic) reports a problem with the
//! *program being checked* and is always recoverable (the pipeline keeps
//! going and collects more of them). The errors here signal a consistency
//! violation in the *checker itself* — e.g. asking a `Context` for a type
//! that was never registered — and are propagated with `Result`/`?`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SymbolError {
    #[error("failed to intern symbol: {0}")]
    InternFailed(String),

    #[error("symbol not found: index {index}")]
    NotFound { index: u32 },
}

#[derive(Debug, Error)]
pub enum SourceMapError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("invalid span: start {start} > end {end}")]
    InvalidSpan { start: usize, end: usize },

    #[error("span out of bounds: file has {file_len} bytes, span is {span_start}..{span_end}")]
    SpanOutOfBounds {
        file_len: usize,
        span_start: usize,
        span_end: usize,
    },

    #[error("invalid line number: {line} (file has {max_lines} lines)")]
    InvalidLineNumber { line: usize, max_lines: usize },
}

#[derive(Debug, Error)]
pub enum IndexVecError {
    #[error("index out of bounds: index {index}, length {length}")]
    OutOfBounds { index: usize, length: usize },
}

#[derive(Debug, Error)]
pub enum DiagnosticError {
    #[error("failed to format diagnostic: {0}")]
    FormatFailed(String),
}

/// Raised by `hulk-sem`'s `Context` when a lookup or registration is
/// internally inconsistent — grounded on `bruce`'s bare `SemanticError`
/// exception, which the Rust port replaces with a typed error so call sites
/// can tell "name already in context" apart from "name not in context"
/// without string matching.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("'{0}' is already defined in this context")]
    AlreadyDefined(String),

    #[error("'{0}' is not defined in this context")]
    NotDefined(String),
}

/// Raised by `hulk-sem`'s `Scope`/`Rib` tree for the same reason
/// [`ContextError`] exists for `Context`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("'{0}' is already defined in this scope")]
    AlreadyDefined(String),

    #[error("'{0}' is not defined in this scope")]
    NotDefined(String),
}

pub type SymbolResult<T> = std::result::Result<T, SymbolError>;
pub type SourceMapResult<T> = std::result::Result<T, SourceMapError>;
pub type IndexVecResult<T> = std::result::Result<T, IndexVecError>;
pub type DiagnosticResult<T> = std::result::Result<T, DiagnosticError>;
pub type ContextResult<T> = std::result::Result<T, ContextError>;
pub type ScopeResult<T> = std::result::Result<T, ScopeError>;
