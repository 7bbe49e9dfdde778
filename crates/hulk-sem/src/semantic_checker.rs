//! Stage E: identifier/function resolution, assignability, instantiation
//! arity, and protocol/type existence (§4.7). Grounded on
//! `bruce/visitors/checker.py`'s structural shape (a child scope per
//! recursion step), but follows spec.md §4.7's fuller textual description —
//! the reference file is rougher (it never actually defines `self` in a
//! method scope) and is not the source of truth here.
//!
//! Child ribs created while walking (constructor-param scopes, method
//! scopes, block scopes, `let` bodies, ...) are transient: nothing outside
//! this pass ever looks them up again, so they're simply left in [`Scope`]'s
//! arena once this stage finishes. `TypeInferer` builds its own, separate
//! rib tree as it walks — the only state that survives between stages lives
//! in [`Context`]'s `Type`/`Method`/`Attribute` records and in the global
//! scope's root rib (`FunctionCollector`'s registrations).

use hulk_ast::{Decl, Expr, ExprKind, Function, Member, Program, TypeDecl};
use hulk_util::symbol::{KW_BASE, KW_SELF};
use hulk_util::{Handler, Span, Symbol};

use crate::context::{Context, TypeId, TypeOrProtoId};
use crate::diagnostics::DiagnosticKind;
use crate::scope::{RibId, Scope};
use crate::ty::Ty;

pub struct SemanticChecker<'a> {
    ctx: &'a Context,
    scope: &'a mut Scope,
    handler: &'a Handler,
}

impl<'a> SemanticChecker<'a> {
    pub fn new(ctx: &'a Context, scope: &'a mut Scope, handler: &'a Handler) -> Self {
        Self { ctx, scope, handler }
    }

    pub fn run(&mut self, program: &Program) {
        log::debug!("SemanticChecker: walking program");
        let program_rib = self.scope.create_child(self.scope.root(), false);
        for decl in &program.decls {
            match decl {
                Decl::Type(t) => self.check_type_decl(t, program_rib),
                Decl::Function(f) => self.check_function(f, program_rib),
                Decl::Protocol(_) => {}
            }
        }
        self.check_expr(&program.expr, program_rib);
        log::debug!("SemanticChecker done: {} diagnostics so far", self.handler.error_count());
    }

    fn check_type_decl(&mut self, t: &TypeDecl, parent_rib: RibId) {
        let Ok(tid) = self.ctx.get_type(t.name) else { return };
        let ctor_rib = self.scope.create_child(parent_rib, false);
        if let Some(params) = self.ctx.type_(tid).params.clone() {
            for p in params {
                let _ = self.scope.define_variable(ctor_rib, p.name, p.ty);
            }
        }
        for arg in &t.parent_args {
            self.check_expr(arg, ctor_rib);
        }
        for member in &t.members {
            match member {
                Member::Attribute { init, .. } => self.check_expr(init, ctor_rib),
                Member::Method(func) => self.check_method(func, tid, parent_rib),
            }
        }
    }

    /// A method's scope is rooted at the program scope, not the
    /// constructor-param scope — HULK methods see `self`/attributes and
    /// their own parameters, never the constructor's local parameter
    /// bindings (those only exist for attribute initializers and parent
    /// args, per §4.7).
    fn check_method(&mut self, func: &Function, tid: TypeId, parent_rib: RibId) {
        let method_rib = self.scope.create_child(parent_rib, true);
        let mut self_shadowed = false;
        for p in &func.params {
            if p.name == KW_SELF {
                self_shadowed = true;
            }
            let ty = p.ty.and_then(|n| self.ctx.resolve_ty(n).ok());
            let _ = self.scope.define_variable(method_rib, p.name, ty);
        }
        if !self_shadowed {
            let _ = self.scope.define_variable(method_rib, KW_SELF, Some(Ty::Named(tid)));
        }
        self.check_expr(&func.body, method_rib);
    }

    fn check_function(&mut self, f: &Function, parent_rib: RibId) {
        let func_rib = self.scope.create_child(parent_rib, true);
        for p in &f.params {
            let ty = p.ty.and_then(|n| self.ctx.resolve_ty(n).ok());
            let _ = self.scope.define_variable(func_rib, p.name, ty);
        }
        self.check_expr(&f.body, func_rib);
    }

    fn check_expr(&mut self, expr: &Expr, rib: RibId) {
        match &expr.kind {
            ExprKind::Number(_) | ExprKind::Str(_) | ExprKind::Boolean(_) => {}
            ExprKind::Identifier { name, is_builtin } => {
                self.check_identifier(*name, *is_builtin, rib, expr.span)
            }
            ExprKind::TypeInstancing { type_name, args } => {
                self.check_type_instancing(*type_name, args, rib, expr.span)
            }
            ExprKind::Vector { items } => {
                for item in items {
                    self.check_expr(item, rib);
                }
            }
            ExprKind::MappedIterable { map_expr, item_id, iterable, .. } => {
                self.check_expr(iterable, rib);
                let child = self.scope.create_child(rib, false);
                let _ = self.scope.define_variable(child, *item_id, None);
                self.check_expr(map_expr, child);
            }
            ExprKind::MemberAccessing { target, .. } => self.check_expr(target, rib),
            ExprKind::FunctionCall { target, args } => {
                for arg in args {
                    self.check_expr(arg, rib);
                }
                self.check_expr(target, rib);
                if !matches!(
                    target.kind,
                    ExprKind::Identifier { .. } | ExprKind::MemberAccessing { .. }
                ) {
                    self.diag(
                        DiagnosticKind::InvalidCallTarget,
                        "call target must be an identifier or a member access".to_string(),
                        expr.span,
                    );
                }
            }
            ExprKind::Indexing { target, index } => {
                self.check_expr(target, rib);
                self.check_expr(index, rib);
            }
            ExprKind::Mutation { target, value } => {
                self.check_expr(target, rib);
                self.check_expr(value, rib);
                if !hulk_ast::is_assignable(target) {
                    self.diag(
                        DiagnosticKind::NotAssignable,
                        "mutation target does not support destructive assignment".to_string(),
                        expr.span,
                    );
                }
            }
            ExprKind::Downcasting { target, type_name } => {
                self.check_type_or_proto_exists(*type_name, expr.span);
                self.check_expr(target, rib);
            }
            ExprKind::UnaryOp { operand, .. } => self.check_expr(operand, rib),
            ExprKind::BinaryOp { left, right, .. } => {
                self.check_expr(left, rib);
                self.check_expr(right, rib);
            }
            ExprKind::TypeMatching { target, type_name } => {
                self.check_type_or_proto_exists(*type_name, expr.span);
                self.check_expr(target, rib);
            }
            ExprKind::Block { exprs } => {
                let child = self.scope.create_child(rib, false);
                for e in exprs {
                    self.check_expr(e, child);
                }
            }
            ExprKind::Loop { condition, body, fallback } => {
                self.check_expr(condition, rib);
                self.check_expr(body, rib);
                self.check_expr(fallback, rib);
            }
            ExprKind::Conditional { branches, fallback } => {
                for branch in branches {
                    self.check_expr(&branch.condition, rib);
                    self.check_expr(&branch.branch, rib);
                }
                self.check_expr(fallback, rib);
            }
            ExprKind::LetExpr { name, ty, value, body } => {
                self.check_expr(value, rib);
                let child = self.scope.create_child(rib, false);
                let resolved = ty.and_then(|n| self.ctx.resolve_ty(n).ok());
                let _ = self.scope.define_variable(child, *name, resolved);
                self.check_expr(body, child);
            }
            // Sugar forms never survive the Desugarer; handled structurally
            // for totality rather than assumed unreachable.
            ExprKind::Iterator { iterable, body, fallback, .. } => {
                self.check_expr(iterable, rib);
                self.check_expr(body, rib);
                self.check_expr(fallback, rib);
            }
            ExprKind::MultipleLetExpr { bindings, body } => {
                for binding in bindings {
                    self.check_expr(&binding.value, rib);
                }
                self.check_expr(body, rib);
            }
        }
    }

    fn check_identifier(&mut self, name: Symbol, is_builtin: bool, rib: RibId, span: Span) {
        if is_builtin && name == KW_BASE {
            self.diag(
                DiagnosticKind::BaseMisuse,
                "'base' used outside of a method, or the enclosing type has no parent".to_string(),
                span,
            );
            return;
        }
        if !self.scope.is_var_defined(rib, name) && !self.scope.is_func_defined(rib, name) {
            self.diag(DiagnosticKind::Undefined, format!("'{name}' is not defined"), span);
        }
    }

    fn check_type_instancing(&mut self, type_name: Symbol, args: &[Expr], rib: RibId, span: Span) {
        match self.ctx.get_type_or_proto(type_name) {
            Ok(TypeOrProtoId::Type(tid)) => {
                let arity = self.ctx.type_(tid).params.as_ref().map_or(0, |p| p.len());
                if arity != args.len() {
                    self.diag(
                        DiagnosticKind::ArityMismatch,
                        format!(
                            "'{type_name}' expects {arity} constructor argument(s), got {}",
                            args.len()
                        ),
                        span,
                    );
                }
            }
            Ok(TypeOrProtoId::Proto(_)) => {
                self.diag(
                    DiagnosticKind::ProtocolInstantiation,
                    format!("cannot instantiate protocol '{type_name}' with 'new'"),
                    span,
                );
            }
            Err(_) => {
                self.diag(DiagnosticKind::Undefined, format!("undefined type '{type_name}'"), span)
            }
        }
        for arg in args {
            self.check_expr(arg, rib);
        }
    }

    fn check_type_or_proto_exists(&mut self, name: Symbol, span: Span) {
        if self.ctx.get_type_or_proto(name).is_err() {
            self.diag(DiagnosticKind::Undefined, format!("undefined type or protocol '{name}'"), span);
        }
    }

    fn diag(&self, kind: DiagnosticKind, message: String, span: Span) {
        self.handler.emit_diagnostic(kind.diagnostic(message, span));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hulk_ast::ExprKind;
    use hulk_util::Span;

    fn num(n: f64) -> Expr {
        Expr::new(ExprKind::Number(n), Span::DUMMY)
    }

    fn ident(name: &str, is_builtin: bool) -> Expr {
        Expr::identifier(Symbol::intern(name), is_builtin, Span::DUMMY)
    }

    #[test]
    fn undefined_identifier_is_reported() {
        let ctx = Context::new();
        let mut scope = Scope::new();
        let handler = Handler::new();
        let program = Program { decls: Vec::new(), expr: ident("x", false) };
        SemanticChecker::new(&ctx, &mut scope, &handler).run(&program);
        assert!(handler.has_errors());
    }

    #[test]
    fn base_outside_method_is_misuse() {
        let ctx = Context::new();
        let mut scope = Scope::new();
        let handler = Handler::new();
        let program = Program { decls: Vec::new(), expr: ident("base", true) };
        SemanticChecker::new(&ctx, &mut scope, &handler).run(&program);
        assert!(handler.has_errors());
    }

    #[test]
    fn let_binding_is_visible_in_its_body() {
        let ctx = Context::new();
        let mut scope = Scope::new();
        let handler = Handler::new();
        let expr = Expr::new(
            ExprKind::LetExpr {
                name: Symbol::intern("x"),
                ty: None,
                value: Box::new(num(1.0)),
                body: Box::new(ident("x", false)),
            },
            Span::DUMMY,
        );
        let program = Program { decls: Vec::new(), expr };
        SemanticChecker::new(&ctx, &mut scope, &handler).run(&program);
        assert!(!handler.has_errors());
    }

    #[test]
    fn mutation_of_non_assignable_target_is_rejected() {
        let ctx = Context::new();
        let mut scope = Scope::new();
        let handler = Handler::new();
        let expr = Expr::new(
            ExprKind::Mutation {
                target: Box::new(num(1.0)),
                value: Box::new(num(2.0)),
            },
            Span::DUMMY,
        );
        let program = Program { decls: Vec::new(), expr };
        SemanticChecker::new(&ctx, &mut scope, &handler).run(&program);
        assert!(handler.has_errors());
    }

    #[test]
    fn function_call_on_non_identifier_target_is_invalid() {
        let ctx = Context::new();
        let mut scope = Scope::new();
        let handler = Handler::new();
        let expr = Expr::new(
            ExprKind::FunctionCall { target: Box::new(num(1.0)), args: Vec::new() },
            Span::DUMMY,
        );
        let program = Program { decls: Vec::new(), expr };
        SemanticChecker::new(&ctx, &mut scope, &handler).run(&program);
        assert!(handler.has_errors());
    }
}
