//! [`Ty`]: the semantic type value every stage from `TypeCollector` onward
//! passes around. Grounded on `bruce/types.py`: the reference represents
//! `Object`/`Number`/`Function`/`Union`/`Vector`/`ErrorType` as sibling
//! subclasses of `Type` that duck-type the same `conforms_to`/`get_method`
//! surface; the Rust port collapses that hierarchy into one enum so every
//! call site pattern-matches instead of relying on `isinstance`.

use crate::context::{Context, ProtoId, TypeId};

/// A semantic type value.
///
/// `Named`/`Proto` refer into a [`Context`] by stable id; `Function`,
/// `Vector`, `Union`, and `Error` are the reference's lowercase
/// inference-only pseudo-types (`FunctionType`, `VectorType`, `UnionType`,
/// `ErrorType` in `bruce/types.py`) and never get a `Context` entry of
/// their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    Named(TypeId),
    Proto(ProtoId),
    /// Placeholder type of identifiers that resolve to a function rather
    /// than a variable (`bruce/types.py::FunctionType`).
    Function,
    /// `VectorType(T)`: only ever appears as an inferred/checked type, not
    /// as a declared source type.
    Vector(Box<Ty>),
    /// A narrowing lattice element: the set of types a slot could still be.
    /// Always normalized (deduped, flattened, never holding another
    /// `Union` nested inside) by [`union_of`]/[`Ty::intersect`].
    Union(Vec<Ty>),
    /// The absorbing sentinel: conforms to and from everything, so one
    /// failure doesn't cascade into unrelated diagnostics.
    Error,
}

impl Ty {
    pub fn is_error(&self) -> bool {
        matches!(self, Ty::Error)
    }

    /// `UnionType.__and__`: set intersection, unpacking nested unions.
    /// Returns the single remaining member directly if intersection
    /// collapses to one type (`union_type`'s "unwrap singleton" rule).
    pub fn intersect(&self, other: &Ty) -> Ty {
        let a = self.clone().into_members();
        let b = other.clone().into_members();
        let common: Vec<Ty> = a.into_iter().filter(|x| b.contains(x)).collect();
        union_of(common)
    }

    /// `UnionType.__or__` / the free `union_type` helper: set union,
    /// unwrapped to a bare `Ty` if it has exactly one member.
    pub fn union(&self, other: &Ty) -> Ty {
        let mut members = self.clone().into_members();
        for m in other.clone().into_members() {
            if !members.contains(&m) {
                members.push(m);
            }
        }
        union_of(members)
    }

    fn into_members(self) -> Vec<Ty> {
        match self {
            Ty::Union(members) => members,
            other => vec![other],
        }
    }

    /// Number of distinct members if this is a union, 1 otherwise — used by
    /// `TypeInferer::_infer`'s "narrowing strictly decreased cardinality"
    /// occurs-flag check.
    pub fn cardinality(&self) -> usize {
        match self {
            Ty::Union(members) => members.len(),
            _ => 1,
        }
    }
}

/// `bruce/types.py::union_type`: builds a [`Ty::Union`], collapsing to the
/// bare member if there is only one, deduplicating and flattening nested
/// unions.
pub fn union_of(types: Vec<Ty>) -> Ty {
    let mut members: Vec<Ty> = Vec::new();
    for t in types {
        for m in t.into_members() {
            if !members.contains(&m) {
                members.push(m);
            }
        }
    }
    if members.len() == 1 {
        members.into_iter().next().unwrap()
    } else {
        Ty::Union(members)
    }
}

/// `Type.conforms_to` / `UnionType.conforms_to` / `ErrorType.conforms_to`
/// unified: nominal subtyping between two `Ty` values that are both
/// ultimately grounded in `Named` types (or absorbed by `Error`/`Union`).
pub fn conforms_to(ctx: &Context, a: &Ty, b: &Ty) -> bool {
    if a.is_error() || b.is_error() {
        return true;
    }
    match (a, b) {
        (Ty::Union(members), _) => members.iter().any(|m| conforms_to(ctx, m, b)),
        (Ty::Named(x), Ty::Named(y)) => ctx.type_conforms_to(*x, *y),
        (Ty::Vector(x), Ty::Vector(y)) => conforms_to(ctx, x, y),
        (Ty::Function, Ty::Function) => true,
        _ => a == b,
    }
}

/// Param-position compatibility between a method's declared type (`method_ty`)
/// and the spec's declared type (`spec_ty`), per `Type.implements`'s four
/// branches (`bruce/tools/semantic/__init__.py` lines ~280-300): Type-to-Type
/// is contravariant (the spec's type must conform to the method's), Type-to-
/// Proto requires the method's concrete type to implement the spec's
/// protocol, Proto-to-Proto requires extension, and a Proto method param
/// against a Type spec param is never admissible.
fn param_compatible(ctx: &Context, method_ty: &Ty, spec_ty: &Ty) -> bool {
    match (method_ty, spec_ty) {
        (Ty::Named(pt), Ty::Named(spt)) => ctx.type_conforms_to(*spt, *pt),
        (Ty::Named(pt), Ty::Proto(spt)) => implements(ctx, *pt, *spt),
        (Ty::Proto(pt), Ty::Proto(spt)) => ctx.proto_extends(*pt, *spt),
        (Ty::Proto(_), Ty::Named(_)) => false,
        _ => method_ty == spec_ty,
    }
}

/// Return-position compatibility, same four branches as [`param_compatible`]
/// but covariant in the Type-to-Type case (`bruce/tools/semantic/__init__.py`
/// lines ~302-325): the method's return must conform to the spec's.
fn return_compatible(ctx: &Context, method_ty: &Ty, spec_ty: &Ty) -> bool {
    match (method_ty, spec_ty) {
        (Ty::Named(mt), Ty::Named(st)) => ctx.type_conforms_to(*mt, *st),
        (Ty::Named(mt), Ty::Proto(st)) => implements(ctx, *mt, *st),
        (Ty::Proto(mt), Ty::Proto(st)) => ctx.proto_extends(*mt, *st),
        (Ty::Proto(_), Ty::Named(_)) => false,
        _ => method_ty == spec_ty,
    }
}

/// `Type.implements` (§4.9): every spec of `proto` (including inherited
/// ones) must be realized by a method on `type_id` with contravariant
/// params and covariant return.
pub fn implements(ctx: &Context, type_id: TypeId, proto_id: ProtoId) -> bool {
    let specs = ctx.all_method_specs(proto_id);
    specs.values().all(|spec| {
        match ctx.find_method(type_id, spec.name) {
            Some(method) => {
                method.params.len() == spec.params.len()
                    && method
                        .params
                        .iter()
                        .zip(&spec.params)
                        .all(|(m, s)| match (&m.ty, &s.ty) {
                            (Some(mt), Some(st)) => param_compatible(ctx, mt, st),
                            _ => false,
                        })
                    && match (&method.ret, &spec.ret) {
                        (Some(mr), Some(sr)) => return_compatible(ctx, mr, sr),
                        _ => false,
                    }
            }
            None => false,
        }
    })
}

/// `types.py::allow_type` (§4.9): the universal admissibility relation.
pub fn allow_type(ctx: &Context, value: &Ty, target: &Ty) -> bool {
    if value.is_error() || target.is_error() {
        return true;
    }
    match (value, target) {
        // A union conforms iff at least one element does (§4.9): the same
        // existential rule `conforms_to` already applies on line 108.
        (Ty::Union(members), _) => members.iter().any(|m| allow_type(ctx, m, target)),
        (_, Ty::Named(obj)) if is_object(ctx, *obj) && matches!(value, Ty::Proto(_)) => true,
        (Ty::Proto(a), Ty::Proto(b)) => ctx.proto_extends(*a, *b),
        (Ty::Named(a), Ty::Proto(b)) => implements(ctx, *a, *b),
        (Ty::Named(a), Ty::Named(b)) => ctx.type_conforms_to(*a, *b),
        (Ty::Vector(a), Ty::Vector(b)) => allow_type(ctx, a, b),
        (Ty::Function, Ty::Function) => true,
        _ => false,
    }
}

fn is_object(ctx: &Context, id: TypeId) -> bool {
    ctx.type_(id).name.eq_str("Object")
}

/// `TypeInferer::_infer`'s narrowing rule (§4.8): `None` is replaced
/// outright, a `Union` is intersected, anything already concrete is left
/// alone. Returns the narrowed type only when it actually changed something
/// — callers use that to drive the fixed-point loop's `occurs` flag.
pub fn narrow(current: &Option<Ty>, proposed: &Ty) -> Option<Ty> {
    match current {
        None => Some(proposed.clone()),
        Some(Ty::Union(_)) => {
            let narrowed = current.as_ref().unwrap().intersect(proposed);
            if Some(&narrowed) == current.as_ref() {
                None
            } else {
                Some(narrowed)
            }
        }
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Param;
    use hulk_util::Symbol;

    fn named(n: u32) -> Ty {
        Ty::Named(TypeId(n))
    }

    /// `let x: Parent = cond ? a : b` where `a`/`b` infer to sibling types
    /// only one of which conforms to `Parent` — §4.9's existential rule, the
    /// same one `conforms_to` already applies on line 108.
    #[test]
    fn allow_type_admits_a_union_if_any_member_conforms() {
        let mut ctx = Context::new();
        let parent = ctx.create_type(Symbol::intern("Parent")).unwrap();
        let child = ctx.create_type(Symbol::intern("Child")).unwrap();
        ctx.type_mut(child).set_parent(parent).unwrap();
        let unrelated = ctx.create_type(Symbol::intern("Unrelated")).unwrap();

        let value = Ty::Union(vec![Ty::Named(unrelated), Ty::Named(child)]);
        assert!(allow_type(&ctx, &value, &Ty::Named(parent)));
    }

    #[test]
    fn allow_type_rejects_a_union_if_no_member_conforms() {
        let mut ctx = Context::new();
        let parent = ctx.create_type(Symbol::intern("Parent")).unwrap();
        let a = ctx.create_type(Symbol::intern("A")).unwrap();
        let b = ctx.create_type(Symbol::intern("B")).unwrap();

        let value = Ty::Union(vec![Ty::Named(a), Ty::Named(b)]);
        assert!(!allow_type(&ctx, &value, &Ty::Named(parent)));
    }

    /// Type-to-Proto param branch: a method whose param is a concrete `Type`
    /// satisfies a spec whose param is a `Proto`, provided the concrete type
    /// implements that protocol.
    #[test]
    fn implements_admits_a_type_param_that_implements_the_spec_protocol() {
        let mut ctx = Context::new();
        let ret = ctx.create_type(Symbol::intern("Ret")).unwrap();
        let small = ctx.create_protocol(Symbol::intern("Small")).unwrap();
        // Speaker implements Small trivially (Small has no method specs).
        let speaker = ctx.create_type(Symbol::intern("Speaker")).unwrap();

        let proto = ctx.create_protocol(Symbol::intern("TakesSmall")).unwrap();
        ctx.proto_mut(proto)
            .add_method_spec(
                Symbol::intern("m"),
                vec![Param::new(Symbol::intern("x"), Some(Ty::Proto(small)))],
                Some(Ty::Named(ret)),
            )
            .unwrap();

        let caller = ctx.create_type(Symbol::intern("Caller")).unwrap();
        ctx.type_mut(caller)
            .define_method(
                Symbol::intern("m"),
                vec![Param::new(Symbol::intern("x"), Some(Ty::Named(speaker)))],
                Some(Ty::Named(ret)),
            )
            .unwrap();

        assert!(implements(&ctx, caller, proto));
    }

    /// Proto-to-Proto param branch: a method whose param is a `Proto` that
    /// extends the spec's `Proto` param satisfies the spec.
    #[test]
    fn implements_admits_a_proto_param_that_extends_the_spec_protocol() {
        let mut ctx = Context::new();
        let ret = ctx.create_type(Symbol::intern("Ret")).unwrap();
        let small = ctx.create_protocol(Symbol::intern("Small")).unwrap();
        let big = ctx.create_protocol(Symbol::intern("Big")).unwrap();
        ctx.add_proto_parent(big, small).unwrap();

        let proto = ctx.create_protocol(Symbol::intern("TakesSmall")).unwrap();
        ctx.proto_mut(proto)
            .add_method_spec(
                Symbol::intern("m"),
                vec![Param::new(Symbol::intern("x"), Some(Ty::Proto(small)))],
                Some(Ty::Named(ret)),
            )
            .unwrap();

        let caller = ctx.create_type(Symbol::intern("Caller")).unwrap();
        ctx.type_mut(caller)
            .define_method(
                Symbol::intern("m"),
                vec![Param::new(Symbol::intern("x"), Some(Ty::Proto(big)))],
                Some(Ty::Named(ret)),
            )
            .unwrap();

        assert!(implements(&ctx, caller, proto));
    }

    /// Proto-param-against-Type-spec is never admissible (§4.9): a method
    /// whose param is a `Proto` can never realize a spec whose param is a
    /// concrete `Type`, no matter the relationship.
    #[test]
    fn implements_rejects_a_proto_param_against_a_type_spec_param() {
        let mut ctx = Context::new();
        let ret = ctx.create_type(Symbol::intern("Ret")).unwrap();
        let object = ctx.create_type(Symbol::intern("Object")).unwrap();
        let small = ctx.create_protocol(Symbol::intern("Small")).unwrap();

        let proto = ctx.create_protocol(Symbol::intern("TakesObject")).unwrap();
        ctx.proto_mut(proto)
            .add_method_spec(
                Symbol::intern("m"),
                vec![Param::new(Symbol::intern("x"), Some(Ty::Named(object)))],
                Some(Ty::Named(ret)),
            )
            .unwrap();

        let caller = ctx.create_type(Symbol::intern("Caller")).unwrap();
        ctx.type_mut(caller)
            .define_method(
                Symbol::intern("m"),
                vec![Param::new(Symbol::intern("x"), Some(Ty::Proto(small)))],
                Some(Ty::Named(ret)),
            )
            .unwrap();

        assert!(!implements(&ctx, caller, proto));
    }

    #[test]
    fn union_of_dedups_and_flattens_nested_unions() {
        let u = union_of(vec![named(0), named(1), named(0), Ty::Union(vec![named(1), named(2)])]);
        assert_eq!(u, Ty::Union(vec![named(0), named(1), named(2)]));
    }

    #[test]
    fn union_of_a_single_member_collapses_to_that_member() {
        assert_eq!(union_of(vec![named(0), named(0)]), named(0));
    }

    #[test]
    fn intersect_keeps_only_common_members() {
        let a = Ty::Union(vec![named(0), named(1), named(2)]);
        let b = Ty::Union(vec![named(1), named(2), named(3)]);
        assert_eq!(a.intersect(&b), Ty::Union(vec![named(1), named(2)]));
    }

    #[test]
    fn intersect_collapsing_to_one_member_unwraps_the_union() {
        let a = Ty::Union(vec![named(0), named(1)]);
        let b = Ty::Union(vec![named(1), named(2)]);
        assert_eq!(a.intersect(&b), named(1));
    }

    #[test]
    fn narrow_replaces_an_unconstrained_slot_outright() {
        assert_eq!(narrow(&None, &named(0)), Some(named(0)));
    }

    #[test]
    fn narrow_leaves_an_already_concrete_slot_alone() {
        assert_eq!(narrow(&Some(named(0)), &named(1)), None);
    }

    #[test]
    fn narrow_reports_no_change_when_intersection_is_unchanged() {
        let current = Some(Ty::Union(vec![named(0), named(1)]));
        assert_eq!(narrow(&current, &Ty::Union(vec![named(0), named(1), named(2)])), None);
    }

    /// Every member of a `Ty::Union` built from arbitrary duplicate-laden
    /// input is distinct — `union_of` never leaves a repeat behind.
    #[quickcheck_macros::quickcheck]
    fn union_of_has_no_duplicate_members(tags: Vec<u8>) -> bool {
        let members: Vec<Ty> = tags.iter().map(|&t| named(t as u32)).collect();
        let result = union_of(members).into_members();
        let mut seen = Vec::new();
        for m in &result {
            if seen.contains(m) {
                return false;
            }
            seen.push(m.clone());
        }
        true
    }

    /// Intersecting two unions never grows their cardinality — narrowing is
    /// monotonically non-increasing (spec.md §4.8's fixed-point relies on
    /// this to terminate).
    #[quickcheck_macros::quickcheck]
    fn intersecting_two_unions_never_increases_cardinality(a_tags: Vec<u8>, b_tags: Vec<u8>) -> bool {
        let a = union_of(a_tags.iter().map(|&t| named(t as u32)).collect());
        let b = union_of(b_tags.iter().map(|&t| named(t as u32)).collect());
        a.intersect(&b).cardinality() <= a.cardinality()
    }
}
