//! Stage A: rewrites the AST to the smaller core language (§4.3), grounded
//! on `bruce/visitors/desugarer.py`.

use hulk_ast::{CondBranch, Decl, Expr, ExprKind, LetBinding, Member, Program, TypeDecl};
use hulk_util::Symbol;

/// Owns the fresh-counter for synthesized `$iterable` bindings and tracks
/// which method/parent is being walked so `base(args)` can be resolved.
/// The reference's `Desugarer` carries the same two fields
/// (`current_method_name`, `current_type_parent_name`).
pub struct Desugarer {
    iterable_count: u32,
}

impl Desugarer {
    pub fn new() -> Self {
        Self { iterable_count: 0 }
    }

    fn next_iterable_id(&mut self) -> Symbol {
        self.iterable_count += 1;
        Symbol::intern(&format!("$iterable_{}", self.iterable_count))
    }

    pub fn desugar_program(&mut self, program: Program) -> Program {
        let decls = program
            .decls
            .into_iter()
            .map(|d| self.desugar_decl(d))
            .collect();
        let expr = self.desugar_expr(program.expr, None, None);
        Program { decls, expr }
    }

    fn desugar_decl(&mut self, decl: Decl) -> Decl {
        match decl {
            Decl::Type(t) => Decl::Type(self.desugar_type_decl(t)),
            Decl::Protocol(p) => Decl::Protocol(p),
            Decl::Function(f) => {
                let mut f = f;
                f.body = self.desugar_expr(f.body, None, None);
                Decl::Function(f)
            }
        }
    }

    fn desugar_type_decl(&mut self, mut decl: TypeDecl) -> TypeDecl {
        decl.parent_args = decl
            .parent_args
            .into_iter()
            .map(|e| self.desugar_expr(e, None, None))
            .collect();
        let parent_name = decl.parent;
        decl.members = decl
            .members
            .into_iter()
            .map(|member| match member {
                Member::Attribute { name, ty, init, span } => Member::Attribute {
                    name,
                    ty,
                    init: self.desugar_expr(init, None, parent_name),
                    span,
                },
                Member::Method(mut func) => {
                    func.body = self.desugar_expr(func.body, Some(func.name), parent_name);
                    Member::Method(func)
                }
            })
            .collect();
        decl
    }

    /// `current_method`/`current_type_parent` are threaded explicitly
    /// rather than stored as interior state, since `hulk-ast` nodes are
    /// owned values passed by move — no shared mutable tree to visit
    /// in-place the way the reference's OO visitor does.
    fn desugar_expr(
        &mut self,
        expr: Expr,
        current_method: Option<Symbol>,
        current_type_parent: Option<Symbol>,
    ) -> Expr {
        let span = expr.span;
        let kind = match expr.kind {
            ExprKind::MultipleLetExpr { bindings, body } => {
                let bindings: Vec<LetBinding> = bindings
                    .into_iter()
                    .map(|b| LetBinding {
                        name: b.name,
                        ty: b.ty,
                        value: self.desugar_expr(b.value, current_method, current_type_parent),
                    })
                    .collect();
                let body = self.desugar_expr(*body, current_method, current_type_parent);
                return desugar_let_bindings(bindings, body);
            }
            ExprKind::Iterator { item_id, item_type, iterable, body, fallback } => {
                let iterable_id = self.next_iterable_id();
                let iterable = self.desugar_expr(*iterable, current_method, current_type_parent);
                let body = self.desugar_expr(*body, current_method, current_type_parent);
                let fallback = self.desugar_expr(*fallback, current_method, current_type_parent);
                return build_iterator_desugaring(iterable_id, item_id, item_type, iterable, body, fallback, span);
            }
            ExprKind::Identifier { name, is_builtin } => {
                if is_builtin && name.eq_str("base") && current_method.is_some() {
                    let parent = current_type_parent.unwrap_or(Symbol::intern("Object"));
                    let self_expr = Expr::identifier(Symbol::intern("self"), true, span);
                    let downcast = Expr::new(
                        ExprKind::Downcasting {
                            target: Box::new(self_expr),
                            type_name: parent,
                        },
                        span,
                    );
                    return Expr::new(
                        ExprKind::MemberAccessing {
                            target: Box::new(downcast),
                            member: current_method.unwrap(),
                        },
                        span,
                    );
                }
                ExprKind::Identifier { name, is_builtin }
            }
            ExprKind::Number(_) | ExprKind::Str(_) | ExprKind::Boolean(_) => expr.kind,
            ExprKind::TypeInstancing { type_name, args } => ExprKind::TypeInstancing {
                type_name,
                args: self.desugar_all(args, current_method, current_type_parent),
            },
            ExprKind::Vector { items } => ExprKind::Vector {
                items: self.desugar_all(items, current_method, current_type_parent),
            },
            ExprKind::MappedIterable { map_expr, item_id, item_type, iterable } => {
                ExprKind::MappedIterable {
                    map_expr: Box::new(self.desugar_expr(*map_expr, current_method, current_type_parent)),
                    item_id,
                    item_type,
                    iterable: Box::new(self.desugar_expr(*iterable, current_method, current_type_parent)),
                }
            }
            ExprKind::MemberAccessing { target, member } => ExprKind::MemberAccessing {
                target: Box::new(self.desugar_expr(*target, current_method, current_type_parent)),
                member,
            },
            ExprKind::FunctionCall { target, args } => ExprKind::FunctionCall {
                target: Box::new(self.desugar_expr(*target, current_method, current_type_parent)),
                args: self.desugar_all(args, current_method, current_type_parent),
            },
            ExprKind::Indexing { target, index } => ExprKind::Indexing {
                target: Box::new(self.desugar_expr(*target, current_method, current_type_parent)),
                index: Box::new(self.desugar_expr(*index, current_method, current_type_parent)),
            },
            ExprKind::Mutation { target, value } => ExprKind::Mutation {
                target: Box::new(self.desugar_expr(*target, current_method, current_type_parent)),
                value: Box::new(self.desugar_expr(*value, current_method, current_type_parent)),
            },
            ExprKind::Downcasting { target, type_name } => ExprKind::Downcasting {
                target: Box::new(self.desugar_expr(*target, current_method, current_type_parent)),
                type_name,
            },
            ExprKind::UnaryOp { kind, operand } => ExprKind::UnaryOp {
                kind,
                operand: Box::new(self.desugar_expr(*operand, current_method, current_type_parent)),
            },
            ExprKind::BinaryOp { kind, operator, left, right } => ExprKind::BinaryOp {
                kind,
                operator,
                left: Box::new(self.desugar_expr(*left, current_method, current_type_parent)),
                right: Box::new(self.desugar_expr(*right, current_method, current_type_parent)),
            },
            ExprKind::TypeMatching { target, type_name } => ExprKind::TypeMatching {
                target: Box::new(self.desugar_expr(*target, current_method, current_type_parent)),
                type_name,
            },
            ExprKind::Block { exprs } => ExprKind::Block {
                exprs: self.desugar_all(exprs, current_method, current_type_parent),
            },
            ExprKind::Loop { condition, body, fallback } => ExprKind::Loop {
                condition: Box::new(self.desugar_expr(*condition, current_method, current_type_parent)),
                body: Box::new(self.desugar_expr(*body, current_method, current_type_parent)),
                fallback: Box::new(self.desugar_expr(*fallback, current_method, current_type_parent)),
            },
            ExprKind::Conditional { branches, fallback } => ExprKind::Conditional {
                branches: branches
                    .into_iter()
                    .map(|b| CondBranch {
                        condition: self.desugar_expr(b.condition, current_method, current_type_parent),
                        branch: self.desugar_expr(b.branch, current_method, current_type_parent),
                    })
                    .collect(),
                fallback: Box::new(self.desugar_expr(*fallback, current_method, current_type_parent)),
            },
            ExprKind::LetExpr { name, ty, value, body } => ExprKind::LetExpr {
                name,
                ty,
                value: Box::new(self.desugar_expr(*value, current_method, current_type_parent)),
                body: Box::new(self.desugar_expr(*body, current_method, current_type_parent)),
            },
        };
        Expr::new(kind, span)
    }

    fn desugar_all(
        &mut self,
        exprs: Vec<Expr>,
        current_method: Option<Symbol>,
        current_type_parent: Option<Symbol>,
    ) -> Vec<Expr> {
        exprs
            .into_iter()
            .map(|e| self.desugar_expr(e, current_method, current_type_parent))
            .collect()
    }
}

impl Default for Desugarer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hulk_ast::BinaryOpKind;
    use hulk_util::Span;

    fn num(n: f64) -> Expr {
        Expr::new(ExprKind::Number(n), Span::DUMMY)
    }

    fn ident(name: &str) -> Expr {
        Expr::identifier(Symbol::intern(name), false, Span::DUMMY)
    }

    fn binding(name: &str, value: Expr) -> LetBinding {
        LetBinding { name: Symbol::intern(name), ty: None, value }
    }

    /// `let a = 1, b = a + 1 in a + b` must desugar with `a` bound in the
    /// outer `LetExpr` so `b`'s initializer can see it — not the reverse.
    #[test]
    fn multiple_let_desugars_with_the_first_binding_outermost() {
        let program = Expr::new(
            ExprKind::MultipleLetExpr {
                bindings: vec![
                    binding("a", num(1.0)),
                    binding(
                        "b",
                        Expr::new(
                            ExprKind::BinaryOp {
                                kind: BinaryOpKind::Arith,
                                operator: Symbol::intern("+"),
                                left: Box::new(ident("a")),
                                right: Box::new(num(1.0)),
                            },
                            Span::DUMMY,
                        ),
                    ),
                ],
                body: Box::new(ident("a")),
            },
            Span::DUMMY,
        );

        let desugared = Desugarer::new().desugar_expr(program, None, None);

        let ExprKind::LetExpr { name: outer_name, value: outer_value, body: outer_body, .. } =
            desugared.kind
        else {
            panic!("expected an outer LetExpr");
        };
        assert_eq!(outer_name.as_str(), "a");
        assert!(matches!(outer_value.kind, ExprKind::Number(n) if n == 1.0));

        let ExprKind::LetExpr { name: inner_name, value: inner_value, .. } = outer_body.kind
        else {
            panic!("expected a nested LetExpr binding b inside a's LetExpr");
        };
        assert_eq!(inner_name.as_str(), "b");
        assert!(matches!(
            inner_value.kind,
            ExprKind::BinaryOp { kind: BinaryOpKind::Arith, .. }
        ));
    }

    /// Zero bindings desugars straight to the body, with no `LetExpr` at all.
    #[test]
    fn multiple_let_with_no_bindings_desugars_to_the_bare_body() {
        let desugared = desugar_let_bindings(Vec::new(), ident("x"));
        assert!(matches!(desugared.kind, ExprKind::Identifier { .. }));
    }

    /// A tree with no desugarable nodes at all (spec §8: Desugarer is
    /// idempotent) comes back unchanged in shape.
    #[test]
    fn desugaring_a_plain_expression_is_a_no_op() {
        let expr = Expr::new(
            ExprKind::BinaryOp {
                kind: BinaryOpKind::Arith,
                operator: Symbol::intern("+"),
                left: Box::new(num(1.0)),
                right: Box::new(num(2.0)),
            },
            Span::DUMMY,
        );
        let once = Desugarer::new().desugar_expr(expr.clone(), None, None);
        let twice = Desugarer::new().desugar_expr(once.clone(), None, None);
        assert!(matches!(once.kind, ExprKind::BinaryOp { .. }));
        assert!(matches!(twice.kind, ExprKind::BinaryOp { .. }));
    }

    /// `for (x in it) body else fb` rewrites into the documented
    /// `LetExpr($iterable = it; Loop(...))` shape, with the freshly bound
    /// `$iterable` name threaded through both `next()`/`current()` calls.
    #[test]
    fn iterator_desugars_into_a_let_bound_loop() {
        let expr = Expr::new(
            ExprKind::Iterator {
                item_id: Symbol::intern("x"),
                item_type: None,
                iterable: Box::new(ident("xs")),
                body: Box::new(ident("x")),
                fallback: Box::new(num(0.0)),
            },
            Span::DUMMY,
        );

        let desugared = Desugarer::new().desugar_expr(expr, None, None);

        let ExprKind::LetExpr { name: iterable_name, value, body, .. } = desugared.kind else {
            panic!("expected the outer $iterable LetExpr");
        };
        assert!(iterable_name.as_str().starts_with("$iterable"));
        assert!(matches!(value.kind, ExprKind::Identifier { .. }));

        let ExprKind::Loop { condition, body: loop_body, .. } = body.kind else {
            panic!("expected a Loop as the $iterable binding's body");
        };
        let ExprKind::FunctionCall { target, .. } = condition.kind else {
            panic!("expected next() as the loop condition");
        };
        let ExprKind::MemberAccessing { member, .. } = target.kind else {
            panic!("expected a MemberAccessing target for next()");
        };
        assert_eq!(member.as_str(), "next");

        let ExprKind::LetExpr { name: item_name, .. } = loop_body.kind else {
            panic!("expected the item LetExpr inside the loop body");
        };
        assert_eq!(item_name.as_str(), "x");
    }
}

/// `desugar_let_expr`: head-first recursion into nested `LetExpr`s —
/// `MultipleLetExpr(b1,...,bn; body)` ⇒ `LetExpr(b1; LetExpr(b2; ...
/// LetExpr(bn; body)))`, b1 outermost, so a later binding's initializer can
/// see an earlier one (`desugarer.py` lines 6-14's head-first recursion).
fn desugar_let_bindings(mut bindings: Vec<LetBinding>, body: Expr) -> Expr {
    let span = body.span;
    if bindings.is_empty() {
        return body;
    }
    let first = bindings.remove(0);
    let inner = desugar_let_bindings(bindings, body);
    Expr::new(
        ExprKind::LetExpr {
            name: first.name,
            ty: first.ty,
            value: Box::new(first.value),
            body: Box::new(inner),
        },
        span,
    )
}

/// `Iterator(id, T?, iterable, body, fallback)` ⇒
/// `LetExpr($iterableN = iterable; Loop(cond = $iterableN.next(),
///   body = LetExpr(id: T = $iterableN.current(); body), fallback))`.
#[allow(clippy::too_many_arguments)]
fn build_iterator_desugaring(
    iterable_id: Symbol,
    item_id: Symbol,
    item_type: Option<Symbol>,
    iterable: Expr,
    body: Expr,
    fallback: Expr,
    span: hulk_util::Span,
) -> Expr {
    let iterable_ref = || Expr::identifier(iterable_id, false, span);
    let call = |member: &str| {
        Expr::new(
            ExprKind::FunctionCall {
                target: Box::new(Expr::new(
                    ExprKind::MemberAccessing {
                        target: Box::new(iterable_ref()),
                        member: Symbol::intern(member),
                    },
                    span,
                )),
                args: Vec::new(),
            },
            span,
        )
    };

    let inner_let = Expr::new(
        ExprKind::LetExpr {
            name: item_id,
            ty: item_type,
            value: Box::new(call("current")),
            body: Box::new(body),
        },
        span,
    );

    let loop_expr = Expr::new(
        ExprKind::Loop {
            condition: Box::new(call("next")),
            body: Box::new(inner_let),
            fallback: Box::new(fallback),
        },
        span,
    );

    Expr::new(
        ExprKind::LetExpr {
            name: iterable_id,
            ty: None,
            value: Box::new(iterable),
            body: Box::new(loop_expr),
        },
        span,
    )
}
