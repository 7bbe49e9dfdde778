//! hulk-util — core utilities shared by every crate in the workspace.
//!
//! String interning ([`symbol::Symbol`]), typed index vectors
//! ([`index_vec::IndexVec`]), definition identifiers ([`def_id::DefId`]),
//! source positions ([`span::Span`], [`span::SourceMap`]), and the
//! diagnostic reporting stack ([`diagnostic::Diagnostic`],
//! [`diagnostic::Handler`]) all live here so that `hulk-ast`, `hulk-sem`,
//! and `hulk-driver` share one vocabulary for positions and errors.

pub mod def_id;
pub mod diagnostic;
pub mod error;
pub mod index_vec;
pub mod span;
pub mod symbol;

pub use def_id::{DefId, DefIdGenerator};
pub use diagnostic::{Diagnostic, DiagnosticBuilder, DiagnosticCode, Handler, Level};
pub use error::{
    ContextError, ContextResult, DiagnosticError, DiagnosticResult, IndexVecError,
    IndexVecResult, ScopeError, ScopeResult, SourceMapError, SourceMapResult, SymbolError,
    SymbolResult,
};
pub use index_vec::{Idx, IndexVec};
pub use span::{FileId, SourceMap, Span};
pub use symbol::Symbol;

pub use rustc_hash::{FxHashMap, FxHashSet};
