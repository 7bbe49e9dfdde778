//! Declaration nodes: parameters, functions, protocol method specs,
//! protocols, type members, type declarations, and the top-level program.

use crate::Expr;
use hulk_util::{Span, Symbol};
use serde::{Deserialize, Serialize};

/// A formal parameter: name plus an optional declared type annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: Symbol,
    pub ty: Option<Symbol>,
    pub span: Span,
}

/// A top-level or method `function` declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: Symbol,
    pub params: Vec<Param>,
    pub ret_ty: Option<Symbol>,
    pub body: Expr,
    pub span: Span,
}

/// A protocol method signature: no body, just the shape a conforming type
/// must `implement` (spec.md §4's `implements` relation is contravariant in
/// params, covariant in return).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodSpec {
    pub name: Symbol,
    pub params: Vec<Param>,
    pub ret_ty: Symbol,
    pub span: Span,
}

/// `protocol Name [extends Parent1, Parent2, ...] { ... }`. Multiple
/// `extends` are allowed by the grammar; `TypeBuilder` is the stage that
/// rejects a combination whose method specs collide (spec.md §4.5, §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protocol {
    pub name: Symbol,
    pub extends: Vec<Symbol>,
    pub methods: Vec<MethodSpec>,
    pub span: Span,
}

/// One member of a `type` body: either a stored attribute (with its
/// initializer expression) or a method (a `Function` with no separate
/// `self` parameter — `hulk-sem` injects `self` when it builds the method's
/// scope).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Member {
    Attribute {
        name: Symbol,
        ty: Option<Symbol>,
        init: Expr,
        span: Span,
    },
    Method(Function),
}

/// A parametric constructor argument passed to a parent type in an
/// `inherits` clause, e.g. `inherits Parent(x, y)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: Symbol,
    pub params: Vec<Param>,
    pub parent: Option<Symbol>,
    pub parent_args: Vec<Expr>,
    pub members: Vec<Member>,
    pub span: Span,
}

/// A top-level declaration: a named type, a named protocol, or a named
/// function. (Global `let` bindings and the top-level expression are held
/// directly by [`Program`], mirroring `bruce/ast.py::Program`.)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Decl {
    Type(TypeDecl),
    Protocol(Protocol),
    Function(Function),
}

/// The root node: every declaration, followed by the single expression the
/// program evaluates to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub decls: Vec<Decl>,
    pub expr: Expr,
}
