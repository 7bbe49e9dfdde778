//! Stage D: registers every top-level `function` declaration in the global
//! scope (§4.6), grounded on `bruce/visitors/function_collector.py`.

use hulk_ast::{Decl, Program};
use hulk_util::{ContextError, Handler, Span, Symbol};

use crate::context::{Context, Param};
use crate::diagnostics::DiagnosticKind;
use crate::scope::{RibId, Scope};
use crate::ty::Ty;

pub struct FunctionCollector<'a> {
    ctx: &'a Context,
    scope: &'a mut Scope,
    handler: &'a Handler,
}

impl<'a> FunctionCollector<'a> {
    pub fn new(ctx: &'a Context, scope: &'a mut Scope, handler: &'a Handler) -> Self {
        Self { ctx, scope, handler }
    }

    /// `root` is the rib free functions are registered into — always the
    /// global scope's root, per §4.6 ("registers... in the global scope").
    pub fn run(&mut self, program: &Program, root: RibId) {
        log::debug!("FunctionCollector: scanning for free functions");
        for decl in &program.decls {
            let Decl::Function(f) = decl else { continue };
            if self.scope.is_func_defined(root, f.name) {
                self.handler.emit_diagnostic(DiagnosticKind::AlreadyDefined.diagnostic(
                    format!("function '{}' is already defined", f.name),
                    f.span,
                ));
                continue;
            }
            let params: Vec<Param> = f
                .params
                .iter()
                .map(|p| Param::new(p.name, self.resolve_opt(p.ty, p.span)))
                .collect();
            let ret = f.ret_ty.map(|name| self.resolve(name, f.span));
            self.scope
                .define_function(root, f.name, params, ret)
                .expect("presence already checked above");
        }
    }

    fn resolve_opt(&self, ty: Option<Symbol>, span: Span) -> Option<Ty> {
        ty.map(|name| self.resolve(name, span))
    }

    fn resolve(&self, name: Symbol, span: Span) -> Ty {
        match self.ctx.resolve_ty(name) {
            Ok(t) => t,
            Err(ContextError::NotDefined(n)) => {
                self.handler.emit_diagnostic(
                    DiagnosticKind::Undefined.diagnostic(format!("undefined type '{n}'"), span),
                );
                Ty::Error
            }
            Err(_) => Ty::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hulk_ast::{Expr, ExprKind, Function};
    use hulk_util::Span;

    fn func(name: &str, ret_ty: Option<&str>) -> Decl {
        Decl::Function(Function {
            name: Symbol::intern(name),
            params: Vec::new(),
            ret_ty: ret_ty.map(Symbol::intern),
            body: Expr::new(ExprKind::Number(0.0), Span::DUMMY),
            span: Span::DUMMY,
        })
    }

    #[test]
    fn registers_function_with_resolved_return_type() {
        let ctx = Context::new();
        let mut scope = Scope::new();
        let root = scope.root();
        let handler = Handler::new();
        let program = Program {
            decls: vec![func("f", None)],
            expr: Expr::new(ExprKind::Number(0.0), Span::DUMMY),
        };
        FunctionCollector::new(&ctx, &mut scope, &handler).run(&program, root);
        assert!(!handler.has_errors());
        assert!(scope.is_func_defined(root, Symbol::intern("f")));
    }

    #[test]
    fn duplicate_function_name_reports_already_defined() {
        let ctx = Context::new();
        let mut scope = Scope::new();
        let root = scope.root();
        let handler = Handler::new();
        let program = Program {
            decls: vec![func("f", None), func("f", None)],
            expr: Expr::new(ExprKind::Number(0.0), Span::DUMMY),
        };
        FunctionCollector::new(&ctx, &mut scope, &handler).run(&program, root);
        assert!(handler.has_errors());
    }

    #[test]
    fn unresolvable_return_type_reports_undefined_and_uses_error_type() {
        let ctx = Context::new();
        let mut scope = Scope::new();
        let root = scope.root();
        let handler = Handler::new();
        let program = Program {
            decls: vec![func("f", Some("Nope"))],
            expr: Expr::new(ExprKind::Number(0.0), Span::DUMMY),
        };
        FunctionCollector::new(&ctx, &mut scope, &handler).run(&program, root);
        assert!(handler.has_errors());
        let record = scope.find_function(root, Symbol::intern("f")).unwrap();
        assert_eq!(record.ret, Some(Ty::Error));
    }
}
