//! Stage F: the fixed-point type-inference loop (§4.8), grounded on
//! `bruce/visitors/type_inferer.py::TypeInferer`.
//!
//! Each pass rebuilds a fresh, transient `Scope` rib tree the same way
//! `SemanticChecker` does — nothing outside this stage ever looks at those
//! ribs again. What needs to survive between passes (a narrowed
//! constructor-param, attribute, method-param/return, or free-function
//! param/return type) lives on `Context`'s records or on the root rib's
//! `FunctionRecord`s, which this stage writes back to directly after each
//! per-declaration pass: seed the transient binding from the persisted
//! record, infer the body (which narrows the transient binding through
//! ordinary use), then diff the transient binding against the seed and, if
//! it changed, copy it back onto the persisted record and raise `occurs`.

use hulk_ast::{
    BinaryOpKind, Decl, Expr, ExprKind, Function, Member, Program, TypeDecl, UnaryOpKind,
};
use hulk_util::symbol::{ID_CURRENT, KW_SELF, PROTO_ITERABLE, TY_BOOLEAN, TY_NUMBER, TY_OBJECT, TY_STRING};
use hulk_util::{Handler, Symbol};

use crate::context::{Context, ProtoId, TypeId};
use crate::diagnostics::DiagnosticKind;
use crate::scope::{RibId, Scope};
use crate::ty::{implements, narrow, union_of, Ty};

pub struct TypeInferer<'a> {
    ctx: &'a mut Context,
    scope: &'a mut Scope,
    handler: &'a Handler,
}

impl<'a> TypeInferer<'a> {
    pub fn new(ctx: &'a mut Context, scope: &'a mut Scope, handler: &'a Handler) -> Self {
        Self { ctx, scope, handler }
    }

    pub fn run(&mut self, program: &Program) {
        log::debug!("TypeInferer: starting fixed-point loop");
        let mut iterations = 0usize;
        loop {
            iterations += 1;
            let mut occurs = false;
            self.pass(program, &mut occurs, false);
            if !occurs {
                break;
            }
        }
        log::debug!("TypeInferer: fixed point reached after {iterations} iteration(s)");
        let mut occurs = false;
        self.pass(program, &mut occurs, true);
    }

    fn pass(&mut self, program: &Program, occurs: &mut bool, final_pass: bool) {
        let root = self.scope.create_child(self.scope.root(), false);
        for decl in &program.decls {
            match decl {
                Decl::Type(t) => self.infer_type_decl(t, root, occurs, final_pass),
                Decl::Function(f) => self.infer_function(f, root, occurs, final_pass),
                Decl::Protocol(_) => {}
            }
        }
        self.infer_expr(&program.expr, root, None, occurs, final_pass);
    }

    fn infer_type_decl(&mut self, t: &TypeDecl, parent_rib: RibId, occurs: &mut bool, final_pass: bool) {
        let Ok(tid) = self.ctx.get_type(t.name) else { return };
        let ctor_rib = self.scope.create_child(parent_rib, false);
        let params = self.ctx.type_(tid).params.clone().unwrap_or_default();
        let original: Vec<Option<Ty>> = params.iter().map(|p| p.ty.clone()).collect();
        for p in &params {
            let _ = self.scope.define_variable(ctor_rib, p.name, p.ty.clone());
        }
        for arg in &t.parent_args {
            let _ = self.infer_expr(arg, ctor_rib, None, occurs, final_pass);
        }
        for member in &t.members {
            match member {
                Member::Attribute { name, init, span, .. } => {
                    let init_ty = self.infer_expr(init, ctor_rib, None, occurs, final_pass);
                    if let Some(ity) = &init_ty {
                        let attr = self.ctx.type_mut(tid).attributes.get_mut(name).unwrap();
                        if let Some(new_ty) = narrow(&attr.ty, ity) {
                            attr.ty = Some(new_ty);
                            *occurs = true;
                        }
                    }
                    if final_pass && self.ctx.type_(tid).attributes[name].ty.is_none() {
                        self.diag(
                            DiagnosticKind::UninferrableType,
                            format!("cannot infer a type for attribute '{name}'"),
                            *span,
                        );
                    }
                }
                Member::Method(func) => self.infer_method(func, tid, parent_rib, occurs, final_pass),
            }
        }

        for (i, p) in params.iter().enumerate() {
            if let Some((_, var)) = self.scope.find_variable(ctor_rib, p.name) {
                if var.ty != original[i] {
                    self.ctx.type_mut(tid).params.as_mut().unwrap()[i].ty = var.ty.clone();
                    *occurs = true;
                }
            }
            if final_pass && self.ctx.type_(tid).params.as_ref().unwrap()[i].ty.is_none() {
                self.diag(
                    DiagnosticKind::UninferrableType,
                    format!("cannot infer a type for constructor parameter '{}'", p.name),
                    t.span,
                );
            }
        }
    }

    fn infer_method(
        &mut self,
        func: &Function,
        tid: TypeId,
        parent_rib: RibId,
        occurs: &mut bool,
        final_pass: bool,
    ) {
        let method_rib = self.scope.create_child(parent_rib, true);
        let params = self
            .ctx
            .type_(tid)
            .methods
            .get(&func.name)
            .map(|m| m.params.clone())
            .unwrap_or_default();
        let original: Vec<Option<Ty>> = params.iter().map(|p| p.ty.clone()).collect();
        let mut self_shadowed = false;
        for p in &params {
            if p.name == KW_SELF {
                self_shadowed = true;
            }
            let _ = self.scope.define_variable(method_rib, p.name, p.ty.clone());
        }
        if !self_shadowed {
            let _ = self.scope.define_variable(method_rib, KW_SELF, Some(Ty::Named(tid)));
        }
        let body_ty = self.infer_expr(&func.body, method_rib, Some(tid), occurs, final_pass);

        if let Some(method) = self.ctx.type_mut(tid).methods.get_mut(&func.name) {
            for (i, p) in params.iter().enumerate() {
                if let Some((_, var)) = self.scope.find_variable(method_rib, p.name) {
                    if var.ty != original[i] {
                        method.params[i].ty = var.ty.clone();
                        *occurs = true;
                    }
                }
            }
            if let Some(bty) = &body_ty {
                if let Some(new_ret) = narrow(&method.ret, bty) {
                    method.ret = Some(new_ret);
                    *occurs = true;
                }
            }
        }

        if final_pass {
            if let Some(method) = self.ctx.type_(tid).methods.get(&func.name).cloned() {
                for p in &method.params {
                    if p.ty.is_none() {
                        self.diag(
                            DiagnosticKind::UninferrableType,
                            format!("cannot infer a type for parameter '{}' of method '{}'", p.name, func.name),
                            func.span,
                        );
                    }
                }
                if method.ret.is_none() {
                    self.diag(
                        DiagnosticKind::UninferrableType,
                        format!("cannot infer a return type for method '{}'", func.name),
                        func.span,
                    );
                }
            }
        }
    }

    fn infer_function(&mut self, f: &Function, parent_rib: RibId, occurs: &mut bool, final_pass: bool) {
        let root = self.scope.root();
        let Some(record) = self.scope.find_function(root, f.name).cloned() else { return };
        let func_rib = self.scope.create_child(parent_rib, true);
        let original: Vec<Option<Ty>> = record.params.iter().map(|p| p.ty.clone()).collect();
        for p in &record.params {
            let _ = self.scope.define_variable(func_rib, p.name, p.ty.clone());
        }
        let body_ty = self.infer_expr(&f.body, func_rib, None, occurs, final_pass);

        for (i, p) in record.params.iter().enumerate() {
            if let Some((_, var)) = self.scope.find_variable(func_rib, p.name) {
                if var.ty != original[i] {
                    if let Some(rec) = self.scope.rib_mut(root).local_funcs.get_mut(&f.name) {
                        rec.params[i].ty = var.ty.clone();
                    }
                    *occurs = true;
                }
            }
        }
        if let Some(bty) = &body_ty {
            if let Some(new_ret) = narrow(&record.ret, bty) {
                if let Some(rec) = self.scope.rib_mut(root).local_funcs.get_mut(&f.name) {
                    rec.ret = Some(new_ret);
                }
                *occurs = true;
            }
        }

        if final_pass {
            if let Some(updated) = self.scope.find_function(root, f.name) {
                for p in &updated.params {
                    if p.ty.is_none() {
                        self.diag(
                            DiagnosticKind::UninferrableType,
                            format!("cannot infer a type for parameter '{}' of function '{}'", p.name, f.name),
                            f.span,
                        );
                    }
                }
                if updated.ret.is_none() {
                    self.diag(
                        DiagnosticKind::UninferrableType,
                        format!("cannot infer a return type for function '{}'", f.name),
                        f.span,
                    );
                }
            }
        }
    }

    fn infer_expr(
        &mut self,
        expr: &Expr,
        rib: RibId,
        current_type: Option<TypeId>,
        occurs: &mut bool,
        final_pass: bool,
    ) -> Option<Ty> {
        match &expr.kind {
            ExprKind::Number(_) => Some(Ty::Named(self.number_id())),
            ExprKind::Str(_) => Some(Ty::Named(self.string_id())),
            ExprKind::Boolean(_) => Some(Ty::Named(self.boolean_id())),

            ExprKind::Identifier { name, is_builtin } => {
                if *is_builtin && *name == KW_SELF && !self.scope.is_var_defined(rib, KW_SELF) {
                    current_type.map(Ty::Named).or(Some(Ty::Function))
                } else if let Some((_, var)) = self.scope.find_variable(rib, *name) {
                    var.ty.clone()
                } else {
                    Some(Ty::Function)
                }
            }

            ExprKind::TypeInstancing { type_name, args } => {
                let tid = self.ctx.get_type(*type_name).ok();
                let params = tid.and_then(|id| self.ctx.type_(id).params.clone()).unwrap_or_default();
                for (i, arg) in args.iter().enumerate() {
                    let _ = self.infer_expr(arg, rib, current_type, occurs, final_pass);
                    if let Some(pty) = params.get(i).and_then(|p| p.ty.clone()) {
                        self.narrow_node(arg, rib, current_type, &pty, occurs);
                    }
                }
                tid.map(Ty::Named).or(Some(Ty::Error))
            }

            ExprKind::Vector { items } => {
                let object_ty = Ty::Named(self.object_id());
                let tys: Vec<Ty> = items
                    .iter()
                    .map(|item| {
                        self.infer_expr(item, rib, current_type, occurs, final_pass)
                            .unwrap_or_else(|| object_ty.clone())
                    })
                    .collect();
                let elem = if tys.is_empty() { object_ty } else { union_of(tys) };
                Some(Ty::Vector(Box::new(elem)))
            }

            ExprKind::MappedIterable { map_expr, item_id, iterable, .. } => {
                let iterable_ty = self.infer_expr(iterable, rib, current_type, occurs, final_pass);
                let proto_id = self.iterable_proto_id();
                self.narrow_node(iterable, rib, current_type, &Ty::Proto(proto_id), occurs);
                let object_ty = Ty::Named(self.object_id());
                let item_ty = match &iterable_ty {
                    Some(Ty::Vector(elem)) => Some((**elem).clone()),
                    Some(Ty::Named(tid)) if implements(self.ctx, *tid, proto_id) => {
                        self.ctx.find_method(*tid, ID_CURRENT).and_then(|m| m.ret.clone())
                    }
                    Some(Ty::Proto(pid)) if *pid == proto_id => Some(object_ty.clone()),
                    _ => None,
                };
                let child = self.scope.create_child(rib, false);
                let _ = self.scope.define_variable(child, *item_id, item_ty);
                let map_ty = self.infer_expr(map_expr, child, current_type, occurs, final_pass);

                if final_pass {
                    let still_none =
                        self.scope.find_variable(child, *item_id).map_or(true, |(_, v)| v.ty.is_none());
                    if still_none {
                        self.diag(
                            DiagnosticKind::UninferrableType,
                            format!("cannot infer a type for '{item_id}'"),
                            expr.span,
                        );
                    }
                }
                Some(Ty::Vector(Box::new(map_ty.unwrap_or(object_ty))))
            }

            ExprKind::MemberAccessing { target, member } => {
                if target.is_builtin_identifier("self") {
                    match current_type.and_then(|tid| self.ctx.find_attribute(tid, *member).cloned()) {
                        Some(attr) => attr.ty,
                        None => Some(Ty::Function),
                    }
                } else {
                    let _ = self.infer_expr(target, rib, current_type, occurs, final_pass);
                    let candidates = self.types_and_protos_declaring_member(*member);
                    if !candidates.is_empty() {
                        let union = union_of(candidates);
                        self.narrow_node(target, rib, current_type, &union, occurs);
                    }
                    Some(Ty::Function)
                }
            }

            ExprKind::FunctionCall { target, args } => self.infer_call(target, args, rib, current_type, occurs, final_pass),

            ExprKind::Indexing { target, index } => {
                let target_ty = self.infer_expr(target, rib, current_type, occurs, final_pass);
                let _ = self.infer_expr(index, rib, current_type, occurs, final_pass);
                let object_ty = Ty::Named(self.object_id());
                self.narrow_node(target, rib, current_type, &Ty::Vector(Box::new(object_ty.clone())), occurs);
                let number_ty = Ty::Named(self.number_id());
                self.narrow_node(index, rib, current_type, &number_ty, occurs);
                match target_ty {
                    Some(Ty::Vector(elem)) => Some(*elem),
                    _ => Some(object_ty),
                }
            }

            ExprKind::Mutation { target, value } => {
                let _ = self.infer_expr(target, rib, current_type, occurs, final_pass);
                let value_ty = self.infer_expr(value, rib, current_type, occurs, final_pass);
                if let Some(vty) = &value_ty {
                    self.narrow_node(target, rib, current_type, vty, occurs);
                }
                value_ty
            }

            ExprKind::Downcasting { target, type_name } => {
                let _ = self.infer_expr(target, rib, current_type, occurs, final_pass);
                Some(self.ctx.resolve_ty(*type_name).unwrap_or(Ty::Error))
            }

            ExprKind::UnaryOp { kind, operand } => {
                let _ = self.infer_expr(operand, rib, current_type, occurs, final_pass);
                match kind {
                    UnaryOpKind::Neg => {
                        let b = Ty::Named(self.boolean_id());
                        self.narrow_node(operand, rib, current_type, &b, occurs);
                        Some(b)
                    }
                    UnaryOpKind::ArithNeg => {
                        let n = Ty::Named(self.number_id());
                        self.narrow_node(operand, rib, current_type, &n, occurs);
                        Some(n)
                    }
                }
            }

            ExprKind::BinaryOp { kind, left, right, .. } => {
                let _ = self.infer_expr(left, rib, current_type, occurs, final_pass);
                let _ = self.infer_expr(right, rib, current_type, occurs, final_pass);
                let number_ty = Ty::Named(self.number_id());
                let boolean_ty = Ty::Named(self.boolean_id());
                let string_ty = Ty::Named(self.string_id());
                match kind {
                    BinaryOpKind::Arith | BinaryOpKind::Power => {
                        self.narrow_node(left, rib, current_type, &number_ty, occurs);
                        self.narrow_node(right, rib, current_type, &number_ty, occurs);
                        Some(number_ty)
                    }
                    BinaryOpKind::Comparison => {
                        self.narrow_node(left, rib, current_type, &number_ty, occurs);
                        self.narrow_node(right, rib, current_type, &number_ty, occurs);
                        Some(boolean_ty)
                    }
                    BinaryOpKind::Logic => {
                        self.narrow_node(left, rib, current_type, &boolean_ty, occurs);
                        self.narrow_node(right, rib, current_type, &boolean_ty, occurs);
                        Some(boolean_ty)
                    }
                    BinaryOpKind::Concat => {
                        let union = union_of(vec![number_ty, string_ty.clone()]);
                        self.narrow_node(left, rib, current_type, &union, occurs);
                        self.narrow_node(right, rib, current_type, &union, occurs);
                        Some(string_ty)
                    }
                }
            }

            ExprKind::TypeMatching { target, .. } => {
                let _ = self.infer_expr(target, rib, current_type, occurs, final_pass);
                Some(Ty::Named(self.boolean_id()))
            }

            ExprKind::Block { exprs } => {
                let child = self.scope.create_child(rib, false);
                let mut result = None;
                for e in exprs {
                    result = self.infer_expr(e, child, current_type, occurs, final_pass);
                }
                result
            }

            ExprKind::Loop { condition, body, fallback } => {
                let boolean_ty = Ty::Named(self.boolean_id());
                let _ = self.infer_expr(condition, rib, current_type, occurs, final_pass);
                self.narrow_node(condition, rib, current_type, &boolean_ty, occurs);
                let body_ty = self.infer_expr(body, rib, current_type, occurs, final_pass);
                let fallback_ty = self.infer_expr(fallback, rib, current_type, occurs, final_pass);
                match (body_ty, fallback_ty) {
                    (Some(a), Some(b)) => Some(union_of(vec![a, b])),
                    _ => None,
                }
            }

            ExprKind::Conditional { branches, fallback } => {
                let boolean_ty = Ty::Named(self.boolean_id());
                let mut tys = Vec::new();
                for branch in branches {
                    let _ = self.infer_expr(&branch.condition, rib, current_type, occurs, final_pass);
                    self.narrow_node(&branch.condition, rib, current_type, &boolean_ty, occurs);
                    tys.push(self.infer_expr(&branch.branch, rib, current_type, occurs, final_pass));
                }
                tys.push(self.infer_expr(fallback, rib, current_type, occurs, final_pass));
                if tys.iter().any(Option::is_none) {
                    None
                } else {
                    Some(union_of(tys.into_iter().map(Option::unwrap).collect()))
                }
            }

            ExprKind::LetExpr { name, ty, value, body } => {
                let value_ty = self.infer_expr(value, rib, current_type, occurs, final_pass);
                let declared = ty.and_then(|n| self.ctx.resolve_ty(n).ok());
                let initial = declared.or(value_ty);
                let child = self.scope.create_child(rib, false);
                let _ = self.scope.define_variable(child, *name, initial);
                let result = self.infer_expr(body, child, current_type, occurs, final_pass);

                if final_pass {
                    let still_none =
                        self.scope.find_variable(child, *name).map_or(true, |(_, v)| v.ty.is_none());
                    if still_none {
                        self.diag(
                            DiagnosticKind::UninferrableType,
                            format!("cannot infer a type for '{name}'"),
                            expr.span,
                        );
                    }
                }
                result
            }

            // Sugar forms never survive the Desugarer; handled structurally
            // for totality.
            ExprKind::Iterator { iterable, body, fallback, .. } => {
                let _ = self.infer_expr(iterable, rib, current_type, occurs, final_pass);
                let _ = self.infer_expr(body, rib, current_type, occurs, final_pass);
                self.infer_expr(fallback, rib, current_type, occurs, final_pass)
            }
            ExprKind::MultipleLetExpr { bindings, body } => {
                for binding in bindings {
                    let _ = self.infer_expr(&binding.value, rib, current_type, occurs, final_pass);
                }
                self.infer_expr(body, rib, current_type, occurs, final_pass)
            }
        }
    }

    fn infer_call(
        &mut self,
        target: &Expr,
        args: &[Expr],
        rib: RibId,
        current_type: Option<TypeId>,
        occurs: &mut bool,
        final_pass: bool,
    ) -> Option<Ty> {
        match &target.kind {
            ExprKind::Identifier { name, is_builtin } if !*is_builtin => {
                if let Some(func) = self.scope.find_function(rib, *name).cloned() {
                    for (i, arg) in args.iter().enumerate() {
                        let _ = self.infer_expr(arg, rib, current_type, occurs, final_pass);
                        if let Some(pty) = func.params.get(i).and_then(|p| p.ty.clone()) {
                            self.narrow_node(arg, rib, current_type, &pty, occurs);
                        }
                    }
                    func.ret
                } else {
                    for arg in args {
                        let _ = self.infer_expr(arg, rib, current_type, occurs, final_pass);
                    }
                    None
                }
            }
            ExprKind::MemberAccessing { target: recv, member } => {
                let recv_ty = self.infer_expr(recv, rib, current_type, occurs, final_pass);
                let method = match &recv_ty {
                    Some(Ty::Named(tid)) => self.ctx.find_method(*tid, *member).cloned(),
                    _ => None,
                };
                for (i, arg) in args.iter().enumerate() {
                    let _ = self.infer_expr(arg, rib, current_type, occurs, final_pass);
                    if let Some(pty) = method.as_ref().and_then(|m| m.params.get(i)).and_then(|p| p.ty.clone()) {
                        self.narrow_node(arg, rib, current_type, &pty, occurs);
                    }
                }
                method.and_then(|m| m.ret)
            }
            _ => {
                for arg in args {
                    let _ = self.infer_expr(arg, rib, current_type, occurs, final_pass);
                }
                None
            }
        }
    }

    /// `_infer(node, scope, T)`: narrows the slot `expr` refers to, if it
    /// refers to one at all. Only plain (non-builtin) identifiers and
    /// `self.attr` member accesses name a narrowable slot; every other
    /// expression shape is a no-op, matching the reference's "narrows the
    /// stored type of an identifier-bound variable" phrasing.
    fn narrow_node(
        &mut self,
        expr: &Expr,
        rib: RibId,
        current_type: Option<TypeId>,
        proposed: &Ty,
        occurs: &mut bool,
    ) {
        match &expr.kind {
            ExprKind::Identifier { name, is_builtin } => {
                if *is_builtin && *name == KW_SELF {
                    return;
                }
                *occurs |= self.scope.narrow_variable(rib, *name, proposed);
            }
            ExprKind::MemberAccessing { target, member } if target.is_builtin_identifier("self") => {
                if let Some(tid) = current_type {
                    if let Some(owner) = self.ctx.find_attribute_owner(tid, *member) {
                        let attr = self.ctx.type_mut(owner).attributes.get_mut(member).unwrap();
                        if let Some(new_ty) = narrow(&attr.ty, proposed) {
                            attr.ty = Some(new_ty);
                            *occurs = true;
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn types_and_protos_declaring_member(&self, member: Symbol) -> Vec<Ty> {
        let mut out = Vec::new();
        for tid in self.ctx.type_ids() {
            if self.ctx.find_method(tid, member).is_some() || self.ctx.find_attribute(tid, member).is_some() {
                out.push(Ty::Named(tid));
            }
        }
        for pid in self.ctx.proto_ids() {
            if self.ctx.all_method_specs(pid).contains_key(&member) {
                out.push(Ty::Proto(pid));
            }
        }
        out
    }

    fn number_id(&self) -> TypeId {
        self.ctx.get_type(TY_NUMBER).expect("Number is seeded before the pipeline runs")
    }

    fn string_id(&self) -> TypeId {
        self.ctx.get_type(TY_STRING).expect("String is seeded before the pipeline runs")
    }

    fn boolean_id(&self) -> TypeId {
        self.ctx.get_type(TY_BOOLEAN).expect("Boolean is seeded before the pipeline runs")
    }

    fn object_id(&self) -> TypeId {
        self.ctx.get_type(TY_OBJECT).expect("Object is seeded before the pipeline runs")
    }

    fn iterable_proto_id(&self) -> ProtoId {
        self.ctx
            .get_protocol(PROTO_ITERABLE)
            .expect("IterableProto is seeded before the pipeline runs")
    }

    fn diag(&self, kind: DiagnosticKind, message: String, span: hulk_util::Span) {
        self.handler.emit_diagnostic(kind.diagnostic(message, span));
    }
}
