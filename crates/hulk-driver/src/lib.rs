//! `hulk-driver` — seeds a [`hulk_sem::Context`]/[`hulk_sem::Scope`] with the
//! builtins spec.md §6 requires of every program, then hands them to
//! [`hulk_sem::check`]. This crate is a harness standing in for the
//! out-of-scope CLI driver (spec.md §1): just enough to exercise `check`
//! end-to-end against an AST loaded from JSON, the way `faxc-drv` drives the
//! real compiler pipeline from source files.

use hulk_sem::{Context, Param, Proto, Scope, Ty, Type};
use hulk_util::symbol::{
    ID_COS, ID_E, ID_EXP, ID_LOG, ID_NEXT, ID_CURRENT, ID_PI, ID_PRINT, ID_RAND, ID_RANGE, ID_SIN,
    ID_SQRT, PROTO_ITERABLE, TY_BOOLEAN, TY_NUMBER, TY_OBJECT, TY_STRING,
};

/// Installs `Object`/`Number`/`String`/`Boolean`, the `Iterable` protocol,
/// the `PI`/`E` constants, and the `print`/`range`/`sqrt`/`exp`/`log`/`rand`/
/// `sin`/`cos` builtin functions (spec.md §6) into a fresh [`Context`]/
/// [`Scope`] pair, ready for [`hulk_sem::check`].
///
/// `Vector` is deliberately not installed as a `Context` type: per
/// `hulk-sem`'s `ty.rs`, `VectorType` is an inference-only pseudo-type
/// (`Ty::Vector`) and never gets a nominal entry of its own.
pub fn seed() -> (Context, Scope) {
    let mut ctx = Context::new();
    let mut scope = Scope::new();

    let object_id = ctx.insert_builtin_type(Type {
        name: TY_OBJECT,
        params: Some(Vec::new()),
        attributes: Default::default(),
        methods: Default::default(),
        parent: None,
        parent_args_count: 0,
        inheritable: true,
    });
    for name in [TY_NUMBER, TY_STRING, TY_BOOLEAN] {
        ctx.insert_builtin_type(Type {
            name,
            params: Some(Vec::new()),
            attributes: Default::default(),
            methods: Default::default(),
            parent: Some(object_id),
            parent_args_count: 0,
            inheritable: false,
        });
    }
    let number_id = ctx.get_type(TY_NUMBER).expect("just inserted");
    let boolean_id = ctx.get_type(TY_BOOLEAN).expect("just inserted");

    let mut iterable = Proto {
        name: PROTO_ITERABLE,
        parents: Vec::new(),
        specs: Default::default(),
    };
    iterable
        .add_method_spec(ID_NEXT, Vec::new(), Some(Ty::Named(boolean_id)))
        .expect("fresh protocol, no collision possible");
    iterable
        .add_method_spec(ID_CURRENT, Vec::new(), Some(Ty::Named(object_id)))
        .expect("fresh protocol, no collision possible");
    let _iterable_id = ctx.insert_builtin_protocol(iterable);

    let root = scope.root();
    let number = Ty::Named(number_id);
    scope
        .define_constant(root, ID_PI, Some(number.clone()))
        .expect("root scope is fresh");
    scope
        .define_constant(root, ID_E, Some(number.clone()))
        .expect("root scope is fresh");

    let object_param = |n: &str| Param::new(hulk_util::Symbol::intern(n), Some(Ty::Named(object_id)));
    let number_param = |n: &str| Param::new(hulk_util::Symbol::intern(n), Some(number.clone()));

    scope
        .define_function(root, ID_PRINT, vec![object_param("value")], Some(Ty::Named(object_id)))
        .expect("root scope is fresh");
    scope
        .define_function(
            root,
            ID_RANGE,
            vec![number_param("start"), number_param("end")],
            Some(Ty::Vector(Box::new(number.clone()))),
        )
        .expect("root scope is fresh");
    scope
        .define_function(root, ID_SQRT, vec![number_param("value")], Some(number.clone()))
        .expect("root scope is fresh");
    scope
        .define_function(root, ID_EXP, vec![number_param("value")], Some(number.clone()))
        .expect("root scope is fresh");
    scope
        .define_function(
            root,
            ID_LOG,
            vec![number_param("base"), number_param("value")],
            Some(number.clone()),
        )
        .expect("root scope is fresh");
    scope
        .define_function(root, ID_RAND, Vec::new(), Some(number.clone()))
        .expect("root scope is fresh");
    scope
        .define_function(root, ID_SIN, vec![number_param("value")], Some(number.clone()))
        .expect("root scope is fresh");
    scope
        .define_function(root, ID_COS, vec![number_param("value")], Some(number))
        .expect("root scope is fresh");

    log::debug!("seed: installed builtin types, the Iterable protocol, and the stdlib");
    (ctx, scope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_installs_the_builtin_types() {
        let (ctx, _scope) = seed();
        assert!(ctx.get_type(TY_NUMBER).is_ok());
        assert!(ctx.get_type(TY_STRING).is_ok());
        assert!(ctx.get_type(TY_BOOLEAN).is_ok());
        assert!(ctx.get_protocol(PROTO_ITERABLE).is_ok());
    }

    #[test]
    fn seed_installs_pi_and_e_as_constants() {
        let (_, scope) = seed();
        let root = scope.root();
        assert!(scope.is_var_defined(root, ID_PI));
        assert!(scope.is_var_defined(root, ID_E));
    }

    #[test]
    fn seed_installs_the_stdlib_functions() {
        let (_, scope) = seed();
        let root = scope.root();
        for name in [ID_PRINT, ID_RANGE, ID_SQRT, ID_EXP, ID_LOG, ID_RAND, ID_SIN, ID_COS] {
            assert!(scope.is_func_defined(root, name), "{name} should be defined");
        }
    }

    #[test]
    fn seed_leaves_vector_unregistered_as_a_nominal_type() {
        let (ctx, _) = seed();
        assert!(ctx.get_type(hulk_util::Symbol::intern("Vector")).is_err());
    }
}
