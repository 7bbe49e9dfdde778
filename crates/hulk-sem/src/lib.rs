//! `hulk-sem` — the semantic middle-end pipeline (spec.md §2): seven stages
//! over an immutable AST, sharing one [`Context`] and one [`Scope`], every
//! diagnostic funneled through one [`Handler`].
//!
//! [`check`] is the single entry point `hulk-driver` calls: Desugarer →
//! TypeCollector → TypeBuilder → FunctionCollector → SemanticChecker →
//! TypeInferer → TypeChecker, aborting between stages the moment the shared
//! `Handler` has an error (§7's propagation policy), since a later stage
//! built on inconsistent `Context`/`Scope` state would only produce noise.

pub mod context;
pub mod desugar;
pub mod diagnostics;
pub mod function_collector;
pub mod scope;
pub mod semantic_checker;
pub mod ty;
pub mod type_builder;
pub mod type_checker;
pub mod type_collector;
pub mod type_inferer;

pub use context::{Context, Method, Param, Proto, ProtoId, Type, TypeId, TypeOrProtoId};
pub use desugar::Desugarer;
pub use diagnostics::DiagnosticKind;
pub use function_collector::FunctionCollector;
pub use scope::{FunctionRecord, RibId, Scope, Variable};
pub use semantic_checker::SemanticChecker;
pub use ty::{allow_type, conforms_to, implements, narrow, union_of, Ty};
pub use type_builder::TypeBuilder;
pub use type_checker::TypeChecker;
pub use type_collector::TypeCollector;
pub use type_inferer::TypeInferer;

pub use hulk_util::Handler;

use hulk_ast::Program;

/// Runs the full pipeline over `program` against an already-seeded
/// `ctx`/`scope` (builtins installed by the caller, per spec.md §6 — see
/// `hulk-driver::seed`), returning the desugared program, the final
/// `Context`/`Scope`, and every diagnostic rendered to a one-line string in
/// discovery order.
///
/// Each stage shares one [`Handler`]; a stage that leaves it holding an
/// error aborts the pipeline before the next stage runs, since every later
/// stage assumes the `Context`/`Scope` state a prior stage was supposed to
/// have built cleanly (§7).
pub fn check(
    program: Program,
    mut ctx: Context,
    mut scope: Scope,
) -> (Program, Context, Scope, Vec<String>) {
    let handler = Handler::new();
    log::debug!("check: starting HULK semantic pipeline");

    let program = Desugarer::new().desugar_program(program);

    TypeCollector::new(&mut ctx, &handler).run(&program);
    if handler.has_errors() {
        log::debug!("check: aborting after TypeCollector");
        return (program, ctx, scope, handler.to_strings());
    }

    if !TypeBuilder::new(&mut ctx, &handler).run(&program) {
        log::debug!("check: aborting after TypeBuilder (circular inheritance)");
        return (program, ctx, scope, handler.to_strings());
    }
    if handler.has_errors() {
        log::debug!("check: aborting after TypeBuilder");
        return (program, ctx, scope, handler.to_strings());
    }

    let root = scope.root();
    FunctionCollector::new(&ctx, &mut scope, &handler).run(&program, root);
    if handler.has_errors() {
        log::debug!("check: aborting after FunctionCollector");
        return (program, ctx, scope, handler.to_strings());
    }

    SemanticChecker::new(&ctx, &mut scope, &handler).run(&program);
    if handler.has_errors() {
        log::debug!("check: aborting after SemanticChecker");
        return (program, ctx, scope, handler.to_strings());
    }

    TypeInferer::new(&mut ctx, &mut scope, &handler).run(&program);
    if handler.has_errors() {
        log::debug!("check: aborting after TypeInferer");
        return (program, ctx, scope, handler.to_strings());
    }

    TypeChecker::new(&ctx, &mut scope, &handler).run(&program);

    log::debug!(
        "check: pipeline finished with {} error(s), {} warning(s)",
        handler.error_count(),
        handler.warning_count()
    );
    (program, ctx, scope, handler.to_strings())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hulk_ast::{BinaryOpKind, Expr, ExprKind};
    use hulk_util::{Span, Symbol};

    fn seed_minimal() -> Context {
        let mut ctx = Context::new();
        ctx.insert_builtin_type(Type {
            name: Symbol::intern("Object"),
            params: Some(Vec::new()),
            attributes: Default::default(),
            methods: Default::default(),
            parent: None,
            parent_args_count: 0,
            inheritable: true,
        });
        let object_id = ctx.get_type(Symbol::intern("Object")).unwrap();
        for name in ["Number", "String", "Boolean"] {
            ctx.insert_builtin_type(Type {
                name: Symbol::intern(name),
                params: Some(Vec::new()),
                attributes: Default::default(),
                methods: Default::default(),
                parent: Some(object_id),
                parent_args_count: 0,
                inheritable: false,
            });
        }
        ctx
    }

    #[test]
    fn a_clean_arithmetic_program_checks_without_errors() {
        let ctx = seed_minimal();
        let scope = Scope::new();
        let expr = Expr::new(
            ExprKind::BinaryOp {
                kind: BinaryOpKind::Arith,
                operator: Symbol::intern("+"),
                left: Box::new(Expr::new(ExprKind::Number(3.0), Span::DUMMY)),
                right: Box::new(Expr::new(ExprKind::Number(4.0), Span::DUMMY)),
            },
            Span::DUMMY,
        );
        let program = hulk_ast::Program { decls: Vec::new(), expr };
        let (_, _, _, errors) = check(program, ctx, scope);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
    }

    #[test]
    fn an_undefined_identifier_is_reported() {
        let ctx = seed_minimal();
        let scope = Scope::new();
        let expr = Expr::identifier(Symbol::intern("nope"), false, Span::DUMMY);
        let program = hulk_ast::Program { decls: Vec::new(), expr };
        let (_, _, _, errors) = check(program, ctx, scope);
        assert!(!errors.is_empty());
    }
}
