//! Expression nodes (spec.md §3's `ExprNode` family).

use hulk_util::{Span, Symbol};
use serde::{Deserialize, Serialize};

/// One binding of a `let`/multi-`let`: name, optional declared type, value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LetBinding {
    pub name: Symbol,
    pub ty: Option<Symbol>,
    pub value: Expr,
}

/// A (condition, branch) pair of a `Conditional` node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CondBranch {
    pub condition: Expr,
    pub branch: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOpKind {
    /// Boolean negation (`!`).
    Neg,
    /// Arithmetic negation (unary `-`).
    ArithNeg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOpKind {
    Logic,
    Comparison,
    Arith,
    Power,
    Concat,
}

/// Every expression in the language: a tagged payload plus the [`Span`] it
/// was parsed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    Number(f64),
    Str(String),
    Boolean(bool),
    /// `is_builtin` is set by the parser for `self`/`base` (spec.md §6) so
    /// later stages don't need to special-case the literal text.
    Identifier {
        name: Symbol,
        is_builtin: bool,
    },
    TypeInstancing {
        type_name: Symbol,
        args: Vec<Expr>,
    },
    Vector {
        items: Vec<Expr>,
    },
    MappedIterable {
        map_expr: Box<Expr>,
        item_id: Symbol,
        item_type: Option<Symbol>,
        iterable: Box<Expr>,
    },
    MemberAccessing {
        target: Box<Expr>,
        member: Symbol,
    },
    FunctionCall {
        target: Box<Expr>,
        args: Vec<Expr>,
    },
    Indexing {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Mutation {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Downcasting {
        target: Box<Expr>,
        type_name: Symbol,
    },
    UnaryOp {
        kind: UnaryOpKind,
        operand: Box<Expr>,
    },
    BinaryOp {
        kind: BinaryOpKind,
        operator: Symbol,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    TypeMatching {
        target: Box<Expr>,
        type_name: Symbol,
    },
    Block {
        exprs: Vec<Expr>,
    },
    Loop {
        condition: Box<Expr>,
        body: Box<Expr>,
        fallback: Box<Expr>,
    },
    /// Sugar; rewritten away by the Desugarer (spec.md §4.3) before any
    /// later stage runs. Carried here so the parser can hand it straight
    /// through without knowing about desugaring.
    Iterator {
        item_id: Symbol,
        item_type: Option<Symbol>,
        iterable: Box<Expr>,
        body: Box<Expr>,
        fallback: Box<Expr>,
    },
    Conditional {
        branches: Vec<CondBranch>,
        fallback: Box<Expr>,
    },
    LetExpr {
        name: Symbol,
        ty: Option<Symbol>,
        value: Box<Expr>,
        body: Box<Expr>,
    },
    /// Sugar; rewritten into nested `LetExpr`s by the Desugarer.
    MultipleLetExpr {
        bindings: Vec<LetBinding>,
        body: Box<Expr>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn identifier(name: Symbol, is_builtin: bool, span: Span) -> Self {
        Self::new(ExprKind::Identifier { name, is_builtin }, span)
    }

    /// The identifier this expression resolves to if it is a bare,
    /// non-builtin identifier — used by passes that need to tell
    /// `x` apart from `x.y` or `f(x)` without a full pattern match at the
    /// call site.
    pub fn as_identifier(&self) -> Option<Symbol> {
        match &self.kind {
            ExprKind::Identifier { name, .. } => Some(*name),
            _ => None,
        }
    }

    pub fn is_builtin_identifier(&self, text: &str) -> bool {
        matches!(&self.kind, ExprKind::Identifier { name, is_builtin: true } if name.eq_str(text))
    }
}
