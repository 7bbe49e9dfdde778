//! Stage G: the final conformance pass (§4.9), grounded on
//! `bruce/visitors/type_checker.py` and `bruce/types.py::allow_type`.
//!
//! Unlike `SemanticChecker`/`TypeInferer`, this stage never mutates
//! `Context` or `Scope` — it only reads the types those two earlier stages
//! settled on and reports every place an expression's type is not
//! admissible into the context that expects it. A sub-expression that
//! failed to type (an unresolved identifier, a bad call) is treated as
//! `Ty::Error`, which `allow_type` absorbs, so one failure never cascades
//! into a pile of unrelated `TypeMismatch` diagnostics for the same root
//! cause (§7's "recovery is local").

use hulk_ast::{
    BinaryOpKind, Decl, Expr, ExprKind, Function, Member, Program, TypeDecl, UnaryOpKind,
};
use hulk_util::symbol::{KW_SELF, PROTO_ITERABLE, TY_BOOLEAN, TY_NUMBER, TY_OBJECT, TY_STRING};
use hulk_util::{Handler, Span, Symbol};

use crate::context::{Context, ProtoId, TypeId};
use crate::diagnostics::DiagnosticKind;
use crate::scope::{RibId, Scope};
use crate::ty::{allow_type, union_of, Ty};

pub struct TypeChecker<'a> {
    ctx: &'a Context,
    scope: &'a mut Scope,
    handler: &'a Handler,
}

impl<'a> TypeChecker<'a> {
    pub fn new(ctx: &'a Context, scope: &'a mut Scope, handler: &'a Handler) -> Self {
        Self { ctx, scope, handler }
    }

    pub fn run(&mut self, program: &Program) {
        log::debug!("TypeChecker: checking conformance");
        let root = self.scope.create_child(self.scope.root(), false);
        for decl in &program.decls {
            match decl {
                Decl::Type(t) => self.check_type_decl(t, root),
                Decl::Function(f) => self.check_function(f, root),
                Decl::Protocol(_) => {}
            }
        }
        self.check_expr(&program.expr, root, None);
        log::debug!("TypeChecker done: {} diagnostics so far", self.handler.error_count());
    }

    fn check_type_decl(&mut self, t: &TypeDecl, parent_rib: RibId) {
        let Ok(tid) = self.ctx.get_type(t.name) else { return };
        let ctor_rib = self.scope.create_child(parent_rib, false);
        let params = self.ctx.type_(tid).params.clone().unwrap_or_default();
        for p in &params {
            let _ = self.scope.define_variable(ctor_rib, p.name, p.ty.clone());
        }

        if let Some(parent_id) = self.ctx.type_(tid).parent {
            let parent_params = self.ctx.type_(parent_id).params.clone().unwrap_or_default();
            if t.parent_args.len() != parent_params.len() {
                self.diag(
                    DiagnosticKind::ArityMismatch,
                    format!(
                        "'{}' passes {} argument(s) to parent constructor, expected {}",
                        t.name,
                        t.parent_args.len(),
                        parent_params.len()
                    ),
                    t.span,
                );
            }
            for (arg, parent_param) in t.parent_args.iter().zip(parent_params.iter()) {
                let arg_ty = self.check_expr(arg, ctor_rib, None);
                if let (Some(at), Some(pt)) = (&arg_ty, &parent_param.ty) {
                    if !allow_type(self.ctx, at, pt) {
                        self.diag(
                            DiagnosticKind::TypeMismatch,
                            format!(
                                "argument for parent constructor parameter '{}' is not admissible",
                                parent_param.name
                            ),
                            arg.span,
                        );
                    }
                }
            }
        }
        // Any remaining parent-arg expressions (arity already flagged above,
        // or no parent params to zip against) still need their own subtrees
        // checked.
        for arg in t.parent_args.iter().skip(params_checked(&t.parent_args, self.ctx, tid)) {
            self.check_expr(arg, ctor_rib, None);
        }

        for member in &t.members {
            match member {
                Member::Attribute { name, init, span, .. } => {
                    let init_ty = self.check_expr(init, ctor_rib, None);
                    let declared = self.ctx.type_(tid).attributes.get(name).and_then(|a| a.ty.clone());
                    if let (Some(it), Some(dt)) = (&init_ty, &declared) {
                        if !allow_type(self.ctx, it, dt) {
                            self.diag(
                                DiagnosticKind::TypeMismatch,
                                format!("initializer for attribute '{name}' is not admissible into its declared type"),
                                *span,
                            );
                        }
                    }
                }
                Member::Method(func) => self.check_method(func, tid, parent_rib),
            }
        }
    }

    fn check_method(&mut self, func: &Function, tid: TypeId, parent_rib: RibId) {
        let method_rib = self.scope.create_child(parent_rib, true);
        let params = self
            .ctx
            .type_(tid)
            .methods
            .get(&func.name)
            .map(|m| m.params.clone())
            .unwrap_or_default();
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
        let body_ty = self.check_expr(&func.body, method_rib, Some(tid));
        let declared_ret = self.ctx.type_(tid).methods.get(&func.name).and_then(|m| m.ret.clone());
        if let (Some(bt), Some(rt)) = (&body_ty, &declared_ret) {
            if !allow_type(self.ctx, bt, rt) {
                self.diag(
                    DiagnosticKind::TypeMismatch,
                    format!("body of method '{}' is not admissible into its declared return type", func.name),
                    func.span,
                );
            }
        }
    }

    fn check_function(&mut self, f: &Function, parent_rib: RibId) {
        let func_rib = self.scope.create_child(parent_rib, true);
        let root = self.scope.root();
        let record = self.scope.find_function(root, f.name).cloned();
        let params = record.as_ref().map(|r| r.params.clone()).unwrap_or_default();
        for p in &params {
            let _ = self.scope.define_variable(func_rib, p.name, p.ty.clone());
        }
        let body_ty = self.check_expr(&f.body, func_rib, None);
        if let (Some(bt), Some(rt)) = (&body_ty, record.and_then(|r| r.ret)) {
            if !allow_type(self.ctx, bt, &rt) {
                self.diag(
                    DiagnosticKind::TypeMismatch,
                    format!("body of function '{}' is not admissible into its declared return type", f.name),
                    f.span,
                );
            }
        }
    }

    fn check_expr(&mut self, expr: &Expr, rib: RibId, current_type: Option<TypeId>) -> Option<Ty> {
        match &expr.kind {
            ExprKind::Number(_) => Some(Ty::Named(self.number_id())),
            ExprKind::Str(_) => Some(Ty::Named(self.string_id())),
            ExprKind::Boolean(_) => Some(Ty::Named(self.boolean_id())),

            ExprKind::Identifier { name, is_builtin } => {
                if *is_builtin && *name == KW_SELF && !self.scope.is_var_defined(rib, KW_SELF) {
                    current_type.map(Ty::Named).or(Some(Ty::Function))
                } else if let Some((_, var)) = self.scope.find_variable(rib, *name) {
                    Some(var.ty.clone().unwrap_or(Ty::Error))
                } else if self.scope.is_func_defined(rib, *name) {
                    Some(Ty::Function)
                } else {
                    Some(Ty::Error)
                }
            }

            ExprKind::TypeInstancing { type_name, args } => {
                let tid = self.ctx.get_type(*type_name).ok();
                let params = tid.and_then(|id| self.ctx.type_(id).params.clone()).unwrap_or_default();
                if let Some(id) = tid {
                    if args.len() != params.len() {
                        self.diag(
                            DiagnosticKind::ArityMismatch,
                            format!(
                                "'{type_name}' expects {} constructor argument(s), got {}",
                                params.len(),
                                args.len()
                            ),
                            expr.span,
                        );
                    }
                    let _ = id;
                }
                for (i, arg) in args.iter().enumerate() {
                    let arg_ty = self.check_expr(arg, rib, current_type);
                    if let (Some(at), Some(pt)) = (&arg_ty, params.get(i).and_then(|p| p.ty.clone())) {
                        if !allow_type(self.ctx, at, &pt) {
                            self.diag(
                                DiagnosticKind::TypeMismatch,
                                format!("constructor argument {i} is not admissible into its parameter type"),
                                arg.span,
                            );
                        }
                    }
                }
                Some(tid.map(Ty::Named).unwrap_or(Ty::Error))
            }

            ExprKind::Vector { items } => {
                let tys: Vec<Ty> = items.iter().map(|i| self.check_expr(i, rib, current_type).unwrap_or(Ty::Error)).collect();
                let object_ty = Ty::Named(self.object_id());
                let elem = if tys.is_empty() { object_ty } else { union_of(tys) };
                Some(Ty::Vector(Box::new(elem)))
            }

            ExprKind::MappedIterable { map_expr, item_id, iterable, .. } => {
                let iterable_ty = self.check_expr(iterable, rib, current_type);
                let proto_id = self.iterable_proto_id();
                if let Some(it) = &iterable_ty {
                    if !allow_type(self.ctx, it, &Ty::Proto(proto_id)) {
                        self.diag(
                            DiagnosticKind::TypeMismatch,
                            "the iterated expression does not implement the iterable protocol".to_string(),
                            iterable.span,
                        );
                    }
                }
                let object_ty = Ty::Named(self.object_id());
                let item_ty = match &iterable_ty {
                    Some(Ty::Vector(elem)) => (**elem).clone(),
                    Some(Ty::Named(tid)) => self
                        .ctx
                        .find_method(*tid, hulk_util::symbol::ID_CURRENT)
                        .and_then(|m| m.ret.clone())
                        .unwrap_or(object_ty.clone()),
                    _ => object_ty.clone(),
                };
                let child = self.scope.create_child(rib, false);
                let _ = self.scope.define_variable(child, *item_id, Some(item_ty));
                let map_ty = self.check_expr(map_expr, child, current_type);
                Some(Ty::Vector(Box::new(map_ty.unwrap_or(object_ty))))
            }

            ExprKind::MemberAccessing { target, member } => {
                if target.is_builtin_identifier("self") {
                    match current_type.and_then(|tid| self.ctx.find_attribute(tid, *member).cloned()) {
                        Some(attr) => attr.ty.or(Some(Ty::Error)),
                        None => Some(Ty::Function),
                    }
                } else {
                    let _ = self.check_expr(target, rib, current_type);
                    Some(Ty::Function)
                }
            }

            ExprKind::FunctionCall { target, args } => self.check_call(target, args, expr.span, rib, current_type),

            ExprKind::Indexing { target, index } => {
                let target_ty = self.check_expr(target, rib, current_type);
                let index_ty = self.check_expr(index, rib, current_type);
                match &target_ty {
                    Some(Ty::Vector(_)) | Some(Ty::Error) => {}
                    _ => self.diag(
                        DiagnosticKind::IndexTargetNotVector,
                        "indexing target is not a vector".to_string(),
                        target.span,
                    ),
                }
                let number_ty = Ty::Named(self.number_id());
                if let Some(it) = &index_ty {
                    if !allow_type(self.ctx, it, &number_ty) {
                        self.diag(
                            DiagnosticKind::IndexNotNumber,
                            "index must be a Number".to_string(),
                            index.span,
                        );
                    }
                }
                match target_ty {
                    Some(Ty::Vector(elem)) => Some(*elem),
                    _ => Some(self.object_ty()),
                }
            }

            ExprKind::Mutation { target, value } => {
                if target.is_builtin_identifier("self") {
                    self.diag(
                        DiagnosticKind::NotAssignable,
                        "'self' is not assignable".to_string(),
                        target.span,
                    );
                }
                let target_ty = self.check_expr(target, rib, current_type);
                let value_ty = self.check_expr(value, rib, current_type);
                if let (Some(tt), Some(vt)) = (&target_ty, &value_ty) {
                    if !allow_type(self.ctx, vt, tt) {
                        self.diag(
                            DiagnosticKind::TypeMismatch,
                            "assigned value is not admissible into the target's type".to_string(),
                            expr.span,
                        );
                    }
                }
                value_ty
            }

            ExprKind::Downcasting { target, type_name } => {
                let target_ty = self.check_expr(target, rib, current_type);
                let named = self.ctx.resolve_ty(*type_name).unwrap_or(Ty::Error);
                if let Some(tt) = &target_ty {
                    if !(allow_type(self.ctx, tt, &named) || allow_type(self.ctx, &named, tt)) {
                        self.diag(
                            DiagnosticKind::TypeMismatch,
                            format!("'{type_name}' is unrelated to the downcast target's type"),
                            expr.span,
                        );
                    }
                }
                Some(named)
            }

            ExprKind::UnaryOp { kind, operand } => {
                let operand_ty = self.check_expr(operand, rib, current_type);
                match kind {
                    UnaryOpKind::Neg => {
                        self.require(&operand_ty, TY_BOOLEAN, DiagnosticKind::NonBooleanCondition, operand.span, "! operand must be Boolean");
                        Some(Ty::Named(self.boolean_id()))
                    }
                    UnaryOpKind::ArithNeg => {
                        self.require(&operand_ty, TY_NUMBER, DiagnosticKind::NonNumericOperand, operand.span, "unary - operand must be Number");
                        Some(Ty::Named(self.number_id()))
                    }
                }
            }

            ExprKind::BinaryOp { kind, left, right, .. } => {
                let left_ty = self.check_expr(left, rib, current_type);
                let right_ty = self.check_expr(right, rib, current_type);
                match kind {
                    BinaryOpKind::Arith | BinaryOpKind::Power => {
                        self.require(&left_ty, TY_NUMBER, DiagnosticKind::NonNumericOperand, left.span, "arithmetic operand must be Number");
                        self.require(&right_ty, TY_NUMBER, DiagnosticKind::NonNumericOperand, right.span, "arithmetic operand must be Number");
                        Some(Ty::Named(self.number_id()))
                    }
                    BinaryOpKind::Comparison => {
                        self.require(&left_ty, TY_NUMBER, DiagnosticKind::NonNumericOperand, left.span, "comparison operand must be Number");
                        self.require(&right_ty, TY_NUMBER, DiagnosticKind::NonNumericOperand, right.span, "comparison operand must be Number");
                        Some(Ty::Named(self.boolean_id()))
                    }
                    BinaryOpKind::Logic => {
                        self.require(&left_ty, TY_BOOLEAN, DiagnosticKind::NonBooleanCondition, left.span, "logic operand must be Boolean");
                        self.require(&right_ty, TY_BOOLEAN, DiagnosticKind::NonBooleanCondition, right.span, "logic operand must be Boolean");
                        Some(Ty::Named(self.boolean_id()))
                    }
                    BinaryOpKind::Concat => {
                        self.require_number_or_string(&left_ty, left.span);
                        self.require_number_or_string(&right_ty, right.span);
                        Some(Ty::Named(self.string_id()))
                    }
                }
            }

            ExprKind::TypeMatching { target, type_name } => {
                let target_ty = self.check_expr(target, rib, current_type);
                let named = self.ctx.resolve_ty(*type_name).unwrap_or(Ty::Error);
                if let Some(tt) = &target_ty {
                    if !(allow_type(self.ctx, tt, &named) || allow_type(self.ctx, &named, tt)) {
                        self.diag(
                            DiagnosticKind::TypeMismatch,
                            format!("'{type_name}' is unrelated to the tested expression's type"),
                            expr.span,
                        );
                    }
                }
                Some(Ty::Named(self.boolean_id()))
            }

            ExprKind::Block { exprs } => {
                let child = self.scope.create_child(rib, false);
                let mut result = Some(self.object_ty());
                for e in exprs {
                    result = self.check_expr(e, child, current_type);
                }
                result
            }

            ExprKind::Loop { condition, body, fallback } => {
                let cond_ty = self.check_expr(condition, rib, current_type);
                self.require(&cond_ty, TY_BOOLEAN, DiagnosticKind::NonBooleanCondition, condition.span, "loop condition must be Boolean");
                let body_ty = self.check_expr(body, rib, current_type).unwrap_or(Ty::Error);
                let fallback_ty = self.check_expr(fallback, rib, current_type).unwrap_or(Ty::Error);
                Some(union_of(vec![body_ty, fallback_ty]))
            }

            ExprKind::Conditional { branches, fallback } => {
                let mut tys = Vec::new();
                for branch in branches {
                    let cond_ty = self.check_expr(&branch.condition, rib, current_type);
                    self.require(&cond_ty, TY_BOOLEAN, DiagnosticKind::NonBooleanCondition, branch.condition.span, "condition must be Boolean");
                    tys.push(self.check_expr(&branch.branch, rib, current_type).unwrap_or(Ty::Error));
                }
                tys.push(self.check_expr(fallback, rib, current_type).unwrap_or(Ty::Error));
                Some(union_of(tys))
            }

            ExprKind::LetExpr { name, ty, value, body } => {
                let value_ty = self.check_expr(value, rib, current_type);
                let declared = ty.and_then(|n| self.ctx.resolve_ty(n).ok());
                if let (Some(vt), Some(dt)) = (&value_ty, &declared) {
                    if !allow_type(self.ctx, vt, dt) {
                        self.diag(
                            DiagnosticKind::TypeMismatch,
                            format!("value bound to '{name}' is not admissible into its declared type"),
                            expr.span,
                        );
                    }
                }
                let child = self.scope.create_child(rib, false);
                let bound = declared.or(value_ty).unwrap_or(Ty::Error);
                let _ = self.scope.define_variable(child, *name, Some(bound));
                self.check_expr(body, child, current_type)
            }

            // Sugar forms never survive the Desugarer.
            ExprKind::Iterator { iterable, body, fallback, .. } => {
                let _ = self.check_expr(iterable, rib, current_type);
                let _ = self.check_expr(body, rib, current_type);
                self.check_expr(fallback, rib, current_type)
            }
            ExprKind::MultipleLetExpr { bindings, body } => {
                for binding in bindings {
                    let _ = self.check_expr(&binding.value, rib, current_type);
                }
                self.check_expr(body, rib, current_type)
            }
        }
    }

    fn check_call(
        &mut self,
        target: &Expr,
        args: &[Expr],
        span: Span,
        rib: RibId,
        current_type: Option<TypeId>,
    ) -> Option<Ty> {
        match &target.kind {
            ExprKind::Identifier { name, is_builtin } if !*is_builtin => {
                if let Some(func) = self.scope.find_function(rib, *name).cloned() {
                    if func.params.len() != args.len() {
                        self.diag(
                            DiagnosticKind::ArityMismatch,
                            format!("'{name}' expects {} argument(s), got {}", func.params.len(), args.len()),
                            span,
                        );
                    }
                    for (i, arg) in args.iter().enumerate() {
                        let arg_ty = self.check_expr(arg, rib, current_type);
                        if let (Some(at), Some(pt)) = (&arg_ty, func.params.get(i).and_then(|p| p.ty.clone())) {
                            if !allow_type(self.ctx, at, &pt) {
                                self.diag(
                                    DiagnosticKind::TypeMismatch,
                                    format!("argument {i} to '{name}' is not admissible into its parameter type"),
                                    arg.span,
                                );
                            }
                        }
                    }
                    func.ret
                } else {
                    if !self.scope.is_var_defined(rib, *name) {
                        self.diag(DiagnosticKind::Undefined, format!("undefined function '{name}'"), span);
                    }
                    for arg in args {
                        let _ = self.check_expr(arg, rib, current_type);
                    }
                    Some(Ty::Error)
                }
            }
            ExprKind::MemberAccessing { target: recv, member } => {
                let recv_ty = self.check_expr(recv, rib, current_type);
                let method = match &recv_ty {
                    Some(Ty::Named(tid)) => self.ctx.find_method(*tid, *member).cloned(),
                    _ => None,
                };
                match (&recv_ty, &method) {
                    (Some(Ty::Named(_)), None) => self.diag(
                        DiagnosticKind::InvalidCallTarget,
                        format!("'{member}' is not a method of the receiver's type"),
                        span,
                    ),
                    (Some(Ty::Named(_)), Some(m)) if m.params.len() != args.len() => self.diag(
                        DiagnosticKind::ArityMismatch,
                        format!("'{member}' expects {} argument(s), got {}", m.params.len(), args.len()),
                        span,
                    ),
                    _ => {}
                }
                for (i, arg) in args.iter().enumerate() {
                    let arg_ty = self.check_expr(arg, rib, current_type);
                    if let (Some(at), Some(pt)) = (&arg_ty, method.as_ref().and_then(|m| m.params.get(i)).and_then(|p| p.ty.clone())) {
                        if !allow_type(self.ctx, at, &pt) {
                            self.diag(
                                DiagnosticKind::TypeMismatch,
                                format!("argument {i} to '{member}' is not admissible into its parameter type"),
                                arg.span,
                            );
                        }
                    }
                }
                method.and_then(|m| m.ret).or(Some(Ty::Error))
            }
            _ => {
                self.diag(
                    DiagnosticKind::InvalidCallTarget,
                    "call target must be an identifier or a member access".to_string(),
                    span,
                );
                for arg in args {
                    let _ = self.check_expr(arg, rib, current_type);
                }
                Some(Ty::Error)
            }
        }
    }

    fn require(
        &mut self,
        ty: &Option<Ty>,
        expected: Symbol,
        kind: DiagnosticKind,
        span: Span,
        message: &str,
    ) {
        let Ok(expected_id) = self.ctx.get_type(expected) else { return };
        if let Some(t) = ty {
            if !allow_type(self.ctx, t, &Ty::Named(expected_id)) {
                self.diag(kind, message.to_string(), span);
            }
        }
    }

    fn require_number_or_string(&mut self, ty: &Option<Ty>, span: Span) {
        let Some(t) = ty else { return };
        let number = Ty::Named(self.number_id());
        let string = Ty::Named(self.string_id());
        if !allow_type(self.ctx, t, &number) && !allow_type(self.ctx, t, &string) {
            self.diag(
                DiagnosticKind::NonNumericOperand,
                "concatenation operand must be Number or String".to_string(),
                span,
            );
        }
    }

    fn object_ty(&self) -> Ty {
        Ty::Named(self.object_id())
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

    fn diag(&self, kind: DiagnosticKind, message: String, span: Span) {
        self.handler.emit_diagnostic(kind.diagnostic(message, span));
    }
}

/// How many leading `parent_args` were already visited by the zipped
/// arity/admissibility loop in `check_type_decl` — `parent_params.len()` if
/// that's the shorter side, else `parent_args.len()` itself (nothing left
/// to re-visit).
fn params_checked(parent_args: &[Expr], ctx: &Context, tid: TypeId) -> usize {
    match ctx.type_(tid).parent {
        Some(parent_id) => {
            let parent_params_len = ctx.type_(parent_id).params.as_ref().map_or(0, |p| p.len());
            parent_args.len().min(parent_params_len)
        }
        None => 0,
    }
}
