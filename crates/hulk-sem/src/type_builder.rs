//! Stage C: resolves parents, constructor params, attributes, method
//! signatures, and protocol specs; inherits constructor params; computes
//! topological order (§4.5). Grounded on
//! `bruce/visitors/type_builder.py::TypeBuilder`.

use hulk_ast::{Decl, Member, Program};
use hulk_util::symbol::{KW_SELF, TY_OBJECT};
use hulk_util::{ContextError, Handler, Span, Symbol};

use crate::context::{Context, Param, TypeId};
use crate::diagnostics::DiagnosticKind;
use crate::ty::Ty;

pub struct TypeBuilder<'a> {
    ctx: &'a mut Context,
    handler: &'a Handler,
}

impl<'a> TypeBuilder<'a> {
    pub fn new(ctx: &'a mut Context, handler: &'a Handler) -> Self {
        Self { ctx, handler }
    }

    /// Runs steps 1-5 of §4.5. Returns `false` (pipeline should abort) iff a
    /// `CircularInheritance` was found, mirroring the reference's "throw away
    /// the whole order" behavior for step 5.
    pub fn run(&mut self, program: &Program) -> bool {
        log::debug!("TypeBuilder: resolving parents, members, and protocol specs");
        for decl in &program.decls {
            match decl {
                Decl::Type(t) => self.build_type(t),
                Decl::Protocol(p) => self.build_protocol(p),
                Decl::Function(_) => {}
            }
        }

        let order = match self.ctx.topological_order() {
            Ok(order) => order,
            Err(cycle) => {
                let name = self.ctx.type_(cycle).name;
                self.handler.emit_diagnostic(DiagnosticKind::CircularInheritance.diagnostic(
                    format!("'{name}' participates in a cyclic inheritance chain"),
                    Span::DUMMY,
                ));
                log::debug!("TypeBuilder: aborting, cycle found at '{name}'");
                return false;
            }
        };

        self.inherit_params(&order);
        self.check_overrides(&order);
        log::debug!("TypeBuilder done: {} types in topological order", order.len());
        true
    }

    fn build_type(&mut self, t: &hulk_ast::TypeDecl) {
        let Ok(tid) = self.ctx.get_type(t.name) else {
            return;
        };

        match t.parent {
            Some(parent_name) => match self.ctx.get_type(parent_name) {
                Ok(parent_id) if self.ctx.type_(parent_id).inheritable => {
                    if let Err(ContextError::AlreadyDefined(name)) =
                        self.ctx.type_mut(tid).set_parent(parent_id)
                    {
                        self.diag(DiagnosticKind::AlreadyDefined, format!("'{name}' already has a parent"), t.span);
                    }
                }
                Ok(_) => self.diag(
                    DiagnosticKind::Undefined,
                    format!("'{parent_name}' is not inheritable"),
                    t.span,
                ),
                Err(_) => self.diag(
                    DiagnosticKind::Undefined,
                    format!("undefined parent type '{parent_name}'"),
                    t.span,
                ),
            },
            None => {
                let object_id = self
                    .ctx
                    .get_type(TY_OBJECT)
                    .expect("Object is seeded before the pipeline runs");
                let _ = self.ctx.type_mut(tid).set_parent(object_id);
            }
        }

        let params: Vec<Param> = t
            .params
            .iter()
            .map(|p| {
                if p.name == KW_SELF {
                    self.diag(
                        DiagnosticKind::AlreadyDefined,
                        "'self' cannot be used as a constructor parameter name".to_string(),
                        p.span,
                    );
                }
                Param::new(p.name, self.resolve_opt(p.ty, p.span))
            })
            .collect();
        if let Err(ContextError::AlreadyDefined(name)) = self.ctx.type_mut(tid).set_params(params)
        {
            self.diag(DiagnosticKind::AlreadyDefined, format!("'{name}' already has params"), t.span);
        }

        for member in &t.members {
            match member {
                Member::Attribute { name, ty, span, .. } => {
                    let resolved = self.resolve_opt(*ty, *span);
                    if let Err(ContextError::AlreadyDefined(dup)) =
                        self.ctx.type_mut(tid).define_attribute(*name, resolved)
                    {
                        self.diag(DiagnosticKind::AlreadyDefined, format!("attribute '{dup}' is already defined"), *span);
                    }
                }
                Member::Method(func) => {
                    let params: Vec<Param> = func
                        .params
                        .iter()
                        .map(|p| Param::new(p.name, self.resolve_opt(p.ty, p.span)))
                        .collect();
                    let ret = self.resolve_opt(func.ret_ty, func.span);
                    if let Err(ContextError::AlreadyDefined(dup)) =
                        self.ctx.type_mut(tid).define_method(func.name, params, ret)
                    {
                        self.diag(DiagnosticKind::AlreadyDefined, format!("method '{dup}' is already defined"), func.span);
                    }
                }
            }
        }
    }

    fn build_protocol(&mut self, p: &hulk_ast::Protocol) {
        let Ok(pid) = self.ctx.get_protocol(p.name) else {
            return;
        };

        for parent_name in &p.extends {
            match self.ctx.get_protocol(*parent_name) {
                Ok(parent_pid) => {
                    if let Err(ContextError::AlreadyDefined(name)) =
                        self.ctx.add_proto_parent(pid, parent_pid)
                    {
                        self.diag(
                            DiagnosticKind::AlreadyDefined,
                            format!("method spec '{name}' collides across protocol parents"),
                            p.span,
                        );
                    }
                }
                Err(_) => self.diag(
                    DiagnosticKind::Undefined,
                    format!("undefined parent protocol '{parent_name}'"),
                    p.span,
                ),
            }
        }

        for spec in &p.methods {
            let inherited = self.ctx.all_method_specs(pid);
            if inherited.contains_key(&spec.name) {
                self.diag(
                    DiagnosticKind::AlreadyDefined,
                    format!("method spec '{}' shadows a parent protocol's spec", spec.name),
                    spec.span,
                );
                continue;
            }
            let params: Vec<Param> = spec
                .params
                .iter()
                .map(|pr| Param::new(pr.name, self.resolve_opt(pr.ty, pr.span)))
                .collect();
            let ret = Some(self.resolve(spec.ret_ty, spec.span));
            let _ = self.ctx.proto_mut(pid).add_method_spec(spec.name, params, ret);
        }
    }

    /// §4.5 step 4: a type with no explicitly declared constructor params and
    /// a non-`Object` parent inherits the parent's param list wholesale.
    /// Runs in topological (parent-before-child) order so a parent that
    /// itself inherited its params has already been resolved.
    fn inherit_params(&mut self, order: &[TypeId]) {
        let object_id = self.ctx.get_type(TY_OBJECT).expect("Object is seeded");
        for &tid in order {
            let empty = matches!(self.ctx.type_(tid).params.as_ref(), Some(p) if p.is_empty());
            if !empty {
                continue;
            }
            let Some(parent_id) = self.ctx.type_(tid).parent else { continue };
            if parent_id == object_id {
                continue;
            }
            let parent_params = self
                .ctx
                .type_(parent_id)
                .params
                .clone()
                .unwrap_or_default();
            self.ctx.type_mut(tid).params = Some(parent_params);
        }
    }

    /// §4.5 step 2's override check, deferred to run after every type is
    /// fully built and ordered (source declaration order can't be trusted to
    /// put a parent's methods in place before a child references them).
    fn check_overrides(&mut self, order: &[TypeId]) {
        for &tid in order {
            let Some(parent_id) = self.ctx.type_(tid).parent else { continue };
            let own_methods = self.ctx.type_(tid).methods.clone();
            for (name, method) in own_methods {
                if let Some(parent_method) = self.ctx.find_method(parent_id, name) {
                    if !method.signature_eq(parent_method) {
                        self.diag(
                            DiagnosticKind::OverrideMismatch,
                            format!("'{name}' overrides its parent's method with an incompatible signature"),
                            Span::DUMMY,
                        );
                    }
                }
            }
        }
    }

    fn resolve_opt(&mut self, ty: Option<Symbol>, span: Span) -> Option<Ty> {
        ty.map(|name| self.resolve(name, span))
    }

    fn resolve(&mut self, name: Symbol, span: Span) -> Ty {
        match self.ctx.resolve_ty(name) {
            Ok(t) => t,
            Err(ContextError::NotDefined(n)) => {
                self.diag(DiagnosticKind::Undefined, format!("undefined type '{n}'"), span);
                Ty::Error
            }
            Err(_) => Ty::Error,
        }
    }

    fn diag(&self, kind: DiagnosticKind, message: String, span: Span) {
        self.handler.emit_diagnostic(kind.diagnostic(message, span));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hulk_ast::{Expr, ExprKind, Function, Protocol as AstProtocol, MethodSpec, TypeDecl};
    use hulk_util::Span;

    fn seed_object(ctx: &mut Context) {
        ctx.insert_builtin_type(crate::context::Type {
            name: TY_OBJECT,
            params: Some(Vec::new()),
            attributes: Default::default(),
            methods: Default::default(),
            parent: None,
            parent_args_count: 0,
            inheritable: true,
        });
    }

    fn empty_expr() -> Expr {
        Expr::new(ExprKind::Number(0.0), Span::DUMMY)
    }

    #[test]
    fn defaults_missing_parent_to_object() {
        let mut ctx = Context::new();
        seed_object(&mut ctx);
        let handler = Handler::new();
        let a = Decl::Type(TypeDecl {
            name: Symbol::intern("A"),
            params: Vec::new(),
            parent: None,
            parent_args: Vec::new(),
            members: Vec::new(),
            span: Span::DUMMY,
        });
        ctx.create_type(Symbol::intern("A")).unwrap();
        let program = Program { decls: vec![a], expr: empty_expr() };
        assert!(TypeBuilder::new(&mut ctx, &handler).run(&program));
        let aid = ctx.get_type(Symbol::intern("A")).unwrap();
        let object_id = ctx.get_type(TY_OBJECT).unwrap();
        assert_eq!(ctx.type_(aid).parent, Some(object_id));
    }

    #[test]
    fn detects_circular_inheritance() {
        let mut ctx = Context::new();
        seed_object(&mut ctx);
        let handler = Handler::new();
        ctx.create_type(Symbol::intern("P")).unwrap();
        ctx.create_type(Symbol::intern("Q")).unwrap();
        let p = Decl::Type(TypeDecl {
            name: Symbol::intern("P"),
            params: Vec::new(),
            parent: Some(Symbol::intern("Q")),
            parent_args: Vec::new(),
            members: Vec::new(),
            span: Span::DUMMY,
        });
        let q = Decl::Type(TypeDecl {
            name: Symbol::intern("Q"),
            params: Vec::new(),
            parent: Some(Symbol::intern("P")),
            parent_args: Vec::new(),
            members: Vec::new(),
            span: Span::DUMMY,
        });
        let program = Program { decls: vec![p, q], expr: empty_expr() };
        assert!(!TypeBuilder::new(&mut ctx, &handler).run(&program));
        assert!(handler.has_errors());
    }

    #[test]
    fn inherits_empty_constructor_params_from_parent() {
        let mut ctx = Context::new();
        seed_object(&mut ctx);
        let handler = Handler::new();
        ctx.create_type(Symbol::intern("A")).unwrap();
        ctx.create_type(Symbol::intern("B")).unwrap();
        let a = Decl::Type(TypeDecl {
            name: Symbol::intern("A"),
            params: vec![hulk_ast::Param { name: Symbol::intern("x"), ty: None, span: Span::DUMMY }],
            parent: None,
            parent_args: Vec::new(),
            members: Vec::new(),
            span: Span::DUMMY,
        });
        let b = Decl::Type(TypeDecl {
            name: Symbol::intern("B"),
            params: Vec::new(),
            parent: Some(Symbol::intern("A")),
            parent_args: Vec::new(),
            members: Vec::new(),
            span: Span::DUMMY,
        });
        let program = Program { decls: vec![a, b], expr: empty_expr() };
        assert!(TypeBuilder::new(&mut ctx, &handler).run(&program));
        let bid = ctx.get_type(Symbol::intern("B")).unwrap();
        assert_eq!(ctx.type_(bid).params.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn override_mismatch_is_reported() {
        let mut ctx = Context::new();
        seed_object(&mut ctx);
        let handler = Handler::new();
        ctx.create_type(Symbol::intern("A")).unwrap();
        ctx.create_type(Symbol::intern("B")).unwrap();
        let method_a = Function {
            name: Symbol::intern("m"),
            params: Vec::new(),
            ret_ty: Some(Symbol::intern("Number")),
            body: empty_expr(),
            span: Span::DUMMY,
        };
        let method_b = Function {
            name: Symbol::intern("m"),
            params: vec![hulk_ast::Param { name: Symbol::intern("x"), ty: Some(Symbol::intern("Number")), span: Span::DUMMY }],
            ret_ty: Some(Symbol::intern("Number")),
            body: empty_expr(),
            span: Span::DUMMY,
        };
        ctx.insert_builtin_type(crate::context::Type {
            name: Symbol::intern("Number"),
            params: Some(Vec::new()),
            attributes: Default::default(),
            methods: Default::default(),
            parent: ctx.get_type(TY_OBJECT).ok(),
            parent_args_count: 0,
            inheritable: false,
        });
        let a = Decl::Type(TypeDecl {
            name: Symbol::intern("A"),
            params: Vec::new(),
            parent: None,
            parent_args: Vec::new(),
            members: vec![Member::Method(method_a)],
            span: Span::DUMMY,
        });
        let b = Decl::Type(TypeDecl {
            name: Symbol::intern("B"),
            params: Vec::new(),
            parent: Some(Symbol::intern("A")),
            parent_args: Vec::new(),
            members: vec![Member::Method(method_b)],
            span: Span::DUMMY,
        });
        let program = Program { decls: vec![a, b], expr: empty_expr() };
        assert!(TypeBuilder::new(&mut ctx, &handler).run(&program));
        assert!(handler.has_errors());
    }

    #[test]
    fn protocol_extends_rejects_colliding_specs() {
        let mut ctx = Context::new();
        seed_object(&mut ctx);
        let handler = Handler::new();
        ctx.create_protocol(Symbol::intern("I1")).unwrap();
        ctx.create_protocol(Symbol::intern("I2")).unwrap();
        ctx.create_protocol(Symbol::intern("Child")).unwrap();
        let spec = |ret: &str| MethodSpec {
            name: Symbol::intern("foo"),
            params: Vec::new(),
            ret_ty: Symbol::intern(ret),
            span: Span::DUMMY,
        };
        ctx.insert_builtin_type(crate::context::Type {
            name: Symbol::intern("Number"),
            params: Some(Vec::new()),
            attributes: Default::default(),
            methods: Default::default(),
            parent: ctx.get_type(TY_OBJECT).ok(),
            parent_args_count: 0,
            inheritable: false,
        });
        let i1 = Decl::Protocol(AstProtocol {
            name: Symbol::intern("I1"),
            extends: Vec::new(),
            methods: vec![spec("Number")],
            span: Span::DUMMY,
        });
        let i2 = Decl::Protocol(AstProtocol {
            name: Symbol::intern("I2"),
            extends: Vec::new(),
            methods: vec![spec("Number")],
            span: Span::DUMMY,
        });
        let child = Decl::Protocol(AstProtocol {
            name: Symbol::intern("Child"),
            extends: vec![Symbol::intern("I1"), Symbol::intern("I2")],
            methods: Vec::new(),
            span: Span::DUMMY,
        });
        let program = Program { decls: vec![i1, i2, child], expr: empty_expr() };
        assert!(TypeBuilder::new(&mut ctx, &handler).run(&program));
        assert!(handler.has_errors());
    }
}
