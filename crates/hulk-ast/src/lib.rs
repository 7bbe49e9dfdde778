//! `hulk-ast` — the node shapes produced by the (out-of-scope, per spec.md
//! §1) lexer/parser and consumed by every stage of `hulk-sem`'s pipeline.
//!
//! Every expression-producing node carries a [`Span`](hulk_util::Span) so
//! `hulk-sem` can anchor a diagnostic to the exact construct that triggered
//! it (spec.md's Data Model requires this; the reference implementation's
//! plain-string errors do not carry one — see `hulk-sem`'s DESIGN.md entry).
//! Everything here is plain data: construction helpers and the
//! `is_assignable`/`get_safe_typename` free functions the reference's
//! `ast.py` defines at module scope. No semantic logic (name resolution,
//! type inference, ...) lives in this crate — that's `hulk-sem`.

mod decl;
mod display;
mod expr;

pub use decl::*;
pub use expr::*;

use hulk_util::Symbol;

/// `bruce/ast.py::is_assignable`: a mutation target must be a non-builtin
/// identifier, an indexing expression, or a member access.
pub fn is_assignable(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Identifier { is_builtin, .. } => !is_builtin,
        ExprKind::Indexing { .. } | ExprKind::MemberAccessing { .. } => true,
        _ => false,
    }
}

/// Reserved identifiers the parser hands to `hulk-sem` pre-resolved as
/// builtins (spec.md §6): `self` and `base`.
pub fn is_reserved_identifier(name: Symbol) -> bool {
    name.eq_str("self") || name.eq_str("base")
}

/// User code must not declare a name starting with `$` — those are reserved
/// for the Desugarer's fresh iterator bindings (spec.md §6).
pub fn is_dollar_reserved(name: Symbol) -> bool {
    name.as_str().starts_with('$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use hulk_util::Span;

    #[test]
    fn identifier_is_assignable_unless_builtin() {
        let x = Expr::identifier(Symbol::intern("x"), false, Span::DUMMY);
        assert!(is_assignable(&x));
        let slf = Expr::identifier(Symbol::intern("self"), true, Span::DUMMY);
        assert!(!is_assignable(&slf));
    }

    #[test]
    fn member_access_and_indexing_are_assignable() {
        let base = Expr::identifier(Symbol::intern("v"), false, Span::DUMMY);
        let member = Expr::new(
            ExprKind::MemberAccessing { target: Box::new(base.clone()), member: Symbol::intern("x") },
            Span::DUMMY,
        );
        assert!(is_assignable(&member));
        let index = Expr::new(
            ExprKind::Indexing {
                target: Box::new(base),
                index: Box::new(Expr::new(ExprKind::Number(0.0), Span::DUMMY)),
            },
            Span::DUMMY,
        );
        assert!(is_assignable(&index));
    }

    #[test]
    fn literals_are_not_assignable() {
        let n = Expr::new(ExprKind::Number(1.0), Span::DUMMY);
        assert!(!is_assignable(&n));
    }

    #[test]
    fn reserved_identifiers() {
        assert!(is_reserved_identifier(Symbol::intern("self")));
        assert!(is_reserved_identifier(Symbol::intern("base")));
        assert!(!is_reserved_identifier(Symbol::intern("x")));
    }

    #[test]
    fn dollar_reserved_names() {
        assert!(is_dollar_reserved(Symbol::intern("$iter0")));
        assert!(!is_dollar_reserved(Symbol::intern("iter0")));
    }

    #[test]
    fn round_trip_through_json() {
        let expr = Expr::new(
            ExprKind::BinaryOp {
                kind: BinaryOpKind::Arith,
                operator: Symbol::intern("+"),
                left: Box::new(Expr::new(ExprKind::Number(1.0), Span::DUMMY)),
                right: Box::new(Expr::new(ExprKind::Number(2.0), Span::DUMMY)),
            },
            Span::DUMMY,
        );
        let json = serde_json::to_string(&expr).expect("serialize");
        let back: Expr = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(format!("{back}"), format!("{expr}"));
    }

    #[test]
    fn display_renders_conditional() {
        let cond = Expr::new(
            ExprKind::Conditional {
                branches: vec![CondBranch {
                    condition: Expr::new(ExprKind::Boolean(true), Span::DUMMY),
                    branch: Expr::new(ExprKind::Number(1.0), Span::DUMMY),
                }],
                fallback: Box::new(Expr::new(ExprKind::Number(0.0), Span::DUMMY)),
            },
            Span::DUMMY,
        );
        assert_eq!(format!("{cond}"), "if (true) 1 else 0");
    }
}
