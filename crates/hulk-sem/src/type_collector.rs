//! Stage B: registers every declared type/protocol name in [`Context`]
//! (§4.4), grounded on `bruce/visitors/type_builder.py::TypeCollector`
//! (a pass the reference keeps in the same module as `TypeBuilder` but
//! that runs strictly before it).

use hulk_ast::{Decl, Program};
use hulk_util::{ContextError, Handler};

use crate::context::Context;
use crate::diagnostics::DiagnosticKind;

pub struct TypeCollector<'a> {
    ctx: &'a mut Context,
    handler: &'a Handler,
}

impl<'a> TypeCollector<'a> {
    pub fn new(ctx: &'a mut Context, handler: &'a Handler) -> Self {
        Self { ctx, handler }
    }

    pub fn run(&mut self, program: &Program) {
        log::debug!("TypeCollector: {} top-level declarations", program.decls.len());
        for decl in &program.decls {
            match decl {
                Decl::Type(t) => {
                    if let Err(ContextError::AlreadyDefined(name)) = self.ctx.create_type(t.name) {
                        self.already_defined(&name, t.span);
                    }
                }
                Decl::Protocol(p) => {
                    if let Err(ContextError::AlreadyDefined(name)) =
                        self.ctx.create_protocol(p.name)
                    {
                        self.already_defined(&name, p.span);
                    }
                }
                Decl::Function(_) => {}
            }
        }
        log::debug!(
            "TypeCollector done: {} types, {} protocols registered",
            self.ctx.type_ids().count(),
            self.ctx.proto_ids().count(),
        );
    }

    fn already_defined(&self, name: &str, span: hulk_util::Span) {
        self.handler.emit_diagnostic(
            DiagnosticKind::AlreadyDefined
                .diagnostic(format!("'{name}' is already defined"), span),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hulk_ast::{Program, TypeDecl};
    use hulk_util::{Span, Symbol};

    fn type_decl(name: &str) -> Decl {
        Decl::Type(TypeDecl {
            name: Symbol::intern(name),
            params: Vec::new(),
            parent: None,
            parent_args: Vec::new(),
            members: Vec::new(),
            span: Span::DUMMY,
        })
    }

    #[test]
    fn registers_each_type_once() {
        let mut ctx = Context::new();
        let handler = Handler::new();
        let program = Program {
            decls: vec![type_decl("A"), type_decl("B")],
            expr: hulk_ast::Expr::new(hulk_ast::ExprKind::Number(0.0), Span::DUMMY),
        };
        TypeCollector::new(&mut ctx, &handler).run(&program);
        assert!(!handler.has_errors());
        assert!(ctx.get_type(Symbol::intern("A")).is_ok());
        assert!(ctx.get_type(Symbol::intern("B")).is_ok());
    }

    #[test]
    fn duplicate_type_name_is_already_defined() {
        let mut ctx = Context::new();
        let handler = Handler::new();
        let program = Program {
            decls: vec![type_decl("A"), type_decl("A")],
            expr: hulk_ast::Expr::new(hulk_ast::ExprKind::Number(0.0), Span::DUMMY),
        };
        TypeCollector::new(&mut ctx, &handler).run(&program);
        assert!(handler.has_errors());
    }
}
