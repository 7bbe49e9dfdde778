//! The shared, mutable `Context`: the Type/Proto maps every pipeline stage
//! reads from and writes into. Grounded on
//! `bruce/tools/semantic/context.py::Context`/`Type`/`Protocol`/`Attribute`/
//! `Method`.

use hulk_util::{define_idx, ContextError, ContextResult, IndexVec, Symbol};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::ty::Ty;

define_idx!(TypeId);
define_idx!(ProtoId);

/// A constructor/method/function parameter: a name plus its type, which
/// starts `None` and is filled in by `TypeInferer` if the declaration left
/// it unannotated.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Symbol,
    pub ty: Option<Ty>,
}

impl Param {
    pub fn new(name: Symbol, ty: Option<Ty>) -> Self {
        Self { name, ty }
    }
}

/// A stored field of a [`Type`]. `bruce/tools/semantic/context.py::Attribute`.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: Symbol,
    pub ty: Option<Ty>,
}

/// A member function of a [`Type`]. `params` never includes the implicit
/// `self` receiver — callers that need it model `self` as a scope binding
/// instead (spec.md §9).
#[derive(Debug, Clone)]
pub struct Method {
    pub name: Symbol,
    pub params: Vec<Param>,
    pub ret: Option<Ty>,
}

impl Method {
    /// Pointwise arity/param-type/return-type equality, used by
    /// `TypeBuilder`'s override check (§4.5 step 2) and by quickcheck tests.
    pub fn signature_eq(&self, other: &Method) -> bool {
        self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.ty == b.ty)
            && self.ret == other.ret
    }
}

/// A nominal class: constructor params, attributes, methods, a single
/// parent. `bruce/tools/semantic/context.py::Type`.
#[derive(Debug, Clone)]
pub struct Type {
    pub name: Symbol,
    pub params: Option<Vec<Param>>,
    pub attributes: IndexMap<Symbol, Attribute>,
    pub methods: IndexMap<Symbol, Method>,
    pub parent: Option<TypeId>,
    pub parent_args_count: usize,
    /// `false` for `Object`/`Number`/`String`/`Boolean` and for the
    /// inference-only `VectorType`/`UnionType`/`ErrorType`/`FunctionType`
    /// pseudo-types, which never live in a [`Context`] (`types.py`'s
    /// `is_inheritable` property).
    pub inheritable: bool,
}

impl Type {
    fn new(name: Symbol) -> Self {
        Self {
            name,
            params: None,
            attributes: IndexMap::new(),
            methods: IndexMap::new(),
            parent: None,
            parent_args_count: 0,
            inheritable: true,
        }
    }

    pub fn set_parent(&mut self, parent: TypeId) -> ContextResult<()> {
        if self.parent.is_some() {
            return Err(ContextError::AlreadyDefined(self.name.to_string()));
        }
        self.parent = Some(parent);
        Ok(())
    }

    pub fn set_params(&mut self, params: Vec<Param>) -> ContextResult<()> {
        if self.params.is_some() {
            return Err(ContextError::AlreadyDefined(self.name.to_string()));
        }
        self.params = Some(params);
        Ok(())
    }

    pub fn define_attribute(&mut self, name: Symbol, ty: Option<Ty>) -> ContextResult<()> {
        if self.attributes.contains_key(&name) {
            return Err(ContextError::AlreadyDefined(name.to_string()));
        }
        self.attributes.insert(name, Attribute { name, ty });
        Ok(())
    }

    pub fn define_method(
        &mut self,
        name: Symbol,
        params: Vec<Param>,
        ret: Option<Ty>,
    ) -> ContextResult<()> {
        if self.methods.contains_key(&name) {
            return Err(ContextError::AlreadyDefined(name.to_string()));
        }
        self.methods.insert(name, Method { name, params, ret });
        Ok(())
    }
}

/// A structural protocol: method signatures a conforming [`Type`] must
/// implement. `bruce/tools/semantic/context.py::Protocol`.
#[derive(Debug, Clone)]
pub struct Proto {
    pub name: Symbol,
    pub parents: Vec<ProtoId>,
    pub specs: IndexMap<Symbol, Method>,
}

impl Proto {
    fn new(name: Symbol) -> Self {
        Self {
            name,
            parents: Vec::new(),
            specs: IndexMap::new(),
        }
    }

    pub fn add_method_spec(
        &mut self,
        name: Symbol,
        params: Vec<Param>,
        ret: Option<Ty>,
    ) -> ContextResult<()> {
        if self.specs.contains_key(&name) {
            return Err(ContextError::AlreadyDefined(name.to_string()));
        }
        self.specs.insert(name, Method { name, params, ret });
        Ok(())
    }
}

/// Either a resolved [`TypeId`] or [`ProtoId`] — `Context::get_type_or_proto`'s
/// result, since types and protocols share one namespace (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOrProtoId {
    Type(TypeId),
    Proto(ProtoId),
}

/// Owns every [`Type`] and [`Proto`] by stable [`TypeId`]/[`ProtoId`], keyed
/// additionally by name through one shared namespace (§4.1: "types and
/// protocols share the namespace").
pub struct Context {
    types: IndexVec<TypeId, Type>,
    protos: IndexVec<ProtoId, Proto>,
    names: FxHashMap<Symbol, TypeOrProtoId>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            types: IndexVec::new(),
            protos: IndexVec::new(),
            names: FxHashMap::default(),
        }
    }

    pub fn create_type(&mut self, name: Symbol) -> ContextResult<TypeId> {
        if self.names.contains_key(&name) {
            return Err(ContextError::AlreadyDefined(name.to_string()));
        }
        let id = self.types.push(Type::new(name));
        self.names.insert(name, TypeOrProtoId::Type(id));
        Ok(id)
    }

    pub fn create_protocol(&mut self, name: Symbol) -> ContextResult<ProtoId> {
        if self.names.contains_key(&name) {
            return Err(ContextError::AlreadyDefined(name.to_string()));
        }
        let id = self.protos.push(Proto::new(name));
        self.names.insert(name, TypeOrProtoId::Proto(id));
        Ok(id)
    }

    /// Registers an already-built pseudo type (`Object`, `Number`, ...)
    /// without going through [`Context::create_type`]'s duplicate check,
    /// for `hulk-driver`'s `seed()` to install builtins at known ids.
    pub fn insert_builtin_type(&mut self, ty: Type) -> TypeId {
        let name = ty.name;
        let id = self.types.push(ty);
        self.names.insert(name, TypeOrProtoId::Type(id));
        id
    }

    pub fn insert_builtin_protocol(&mut self, proto: Proto) -> ProtoId {
        let name = proto.name;
        let id = self.protos.push(proto);
        self.names.insert(name, TypeOrProtoId::Proto(id));
        id
    }

    pub fn get_type(&self, name: Symbol) -> ContextResult<TypeId> {
        match self.names.get(&name) {
            Some(TypeOrProtoId::Type(id)) => Ok(*id),
            _ => Err(ContextError::NotDefined(name.to_string())),
        }
    }

    pub fn get_protocol(&self, name: Symbol) -> ContextResult<ProtoId> {
        match self.names.get(&name) {
            Some(TypeOrProtoId::Proto(id)) => Ok(*id),
            _ => Err(ContextError::NotDefined(name.to_string())),
        }
    }

    pub fn get_type_or_proto(&self, name: Symbol) -> ContextResult<TypeOrProtoId> {
        self.names
            .get(&name)
            .copied()
            .ok_or_else(|| ContextError::NotDefined(name.to_string()))
    }

    pub fn type_ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.types.indices()
    }

    pub fn proto_ids(&self) -> impl Iterator<Item = ProtoId> + '_ {
        self.protos.indices()
    }

    pub fn type_(&self, id: TypeId) -> &Type {
        &self.types[id]
    }

    pub fn type_mut(&mut self, id: TypeId) -> &mut Type {
        &mut self.types[id]
    }

    pub fn proto(&self, id: ProtoId) -> &Proto {
        &self.protos[id]
    }

    pub fn proto_mut(&mut self, id: ProtoId) -> &mut Proto {
        &mut self.protos[id]
    }

    /// Walks the full attribute set of a type, parent-first, the way
    /// `Type.all_attributes` in the reference builds an `OrderedDict` by
    /// walking to the root first and letting child entries overwrite.
    pub fn all_attributes(&self, id: TypeId) -> IndexMap<Symbol, TypeId> {
        let mut out = match self.type_(id).parent {
            Some(parent) => self.all_attributes(parent),
            None => IndexMap::new(),
        };
        for name in self.type_(id).attributes.keys() {
            out.insert(*name, id);
        }
        out
    }

    /// Same as [`Context::all_attributes`] but for methods, used by the
    /// override check and by `get_method`'s parent-chain walk.
    pub fn all_methods(&self, id: TypeId) -> IndexMap<Symbol, TypeId> {
        let mut out = match self.type_(id).parent {
            Some(parent) => self.all_methods(parent),
            None => IndexMap::new(),
        };
        for name in self.type_(id).methods.keys() {
            out.insert(*name, id);
        }
        out
    }

    /// `bruce/tools/semantic/context.py::Type.get_attribute`: walks the
    /// parent chain.
    pub fn find_attribute(&self, id: TypeId, name: Symbol) -> Option<&Attribute> {
        let t = self.type_(id);
        if let Some(attr) = t.attributes.get(&name) {
            return Some(attr);
        }
        t.parent.and_then(|p| self.find_attribute(p, name))
    }

    /// Like [`Context::find_attribute`] but returns the [`TypeId`] that
    /// actually declares the attribute, for callers (`TypeInferer`) that
    /// need to write a narrowed type back onto the declaring record even
    /// when accessed through a subtype.
    pub fn find_attribute_owner(&self, id: TypeId, name: Symbol) -> Option<TypeId> {
        if self.type_(id).attributes.contains_key(&name) {
            return Some(id);
        }
        self.type_(id).parent.and_then(|p| self.find_attribute_owner(p, name))
    }

    /// `bruce/tools/semantic/context.py::Type.get_method`: walks the parent
    /// chain.
    pub fn find_method(&self, id: TypeId, name: Symbol) -> Option<&Method> {
        let t = self.type_(id);
        if let Some(m) = t.methods.get(&name) {
            return Some(m);
        }
        t.parent.and_then(|p| self.find_method(p, name))
    }

    /// All specs a [`Proto`] exposes, including everything inherited
    /// through `extends` (`Protocol.extends` transitively walked).
    pub fn all_method_specs(&self, id: ProtoId) -> IndexMap<Symbol, Method> {
        let mut out = IndexMap::new();
        for parent in self.proto(id).parents.clone() {
            out.extend(self.all_method_specs(parent));
        }
        for (name, spec) in &self.proto(id).specs {
            out.insert(*name, spec.clone());
        }
        out
    }

    /// `Protocol.extends`: true iff `other` is `id` or a (transitive)
    /// parent of `id`.
    pub fn proto_extends(&self, id: ProtoId, other: ProtoId) -> bool {
        if id == other {
            return true;
        }
        self.proto(id)
            .parents
            .iter()
            .any(|&p| self.proto_extends(p, other))
    }

    /// `Type.conforms_to`: true iff `id` equals `other` or `id`'s (possibly
    /// transitive) parent does.
    pub fn type_conforms_to(&self, id: TypeId, other: TypeId) -> bool {
        if id == other {
            return true;
        }
        match self.type_(id).parent {
            Some(parent) => self.type_conforms_to(parent, other),
            None => false,
        }
    }

    /// `get_safe_type`: resolves a declared type-annotation name to a [`Ty`],
    /// searching both namespaces. Every stage from `TypeBuilder` onward goes
    /// through this rather than calling `get_type`/`get_protocol` directly,
    /// so a source annotation naming a protocol (legal everywhere a type
    /// annotation is written, except `new`) resolves correctly.
    pub fn resolve_ty(&self, name: Symbol) -> ContextResult<Ty> {
        match self.get_type_or_proto(name)? {
            TypeOrProtoId::Type(id) => Ok(Ty::Named(id)),
            TypeOrProtoId::Proto(id) => Ok(Ty::Proto(id)),
        }
    }

    /// `Graph`/`topological_order` (§4.5 step 5), grounded on
    /// `bruce/visitors/type_builder.py::Graph` but ported to an iterative
    /// walk of each type's single parent edge rather than a recursive DFS
    /// over a general graph: since every type has at most one parent, a
    /// cycle is exactly a parent chain that revisits a node still on the
    /// current walk. Returns the offending [`TypeId`] on the first cycle
    /// found, or the full parent-before-child order otherwise.
    pub fn topological_order(&self) -> Result<Vec<TypeId>, TypeId> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut color: FxHashMap<TypeId, Color> = FxHashMap::default();
        let mut order = Vec::with_capacity(self.types.len());

        for start in self.type_ids() {
            if color.get(&start) == Some(&Color::Black) {
                continue;
            }
            let mut path = Vec::new();
            let mut node = start;
            loop {
                match color.get(&node).copied().unwrap_or(Color::White) {
                    Color::Black => break,
                    Color::Gray => return Err(node),
                    Color::White => {
                        color.insert(node, Color::Gray);
                        path.push(node);
                        match self.type_(node).parent {
                            Some(p) => node = p,
                            None => break,
                        }
                    }
                }
            }
            while let Some(n) = path.pop() {
                color.insert(n, Color::Black);
                order.push(n);
            }
        }
        Ok(order)
    }

    /// Links `parent` as one of `proto`'s `extends` targets (§4.5 step 3),
    /// enforcing the §9 Open Question decision: two parents (or a parent and
    /// the protocol's own specs) may never introduce the same method name.
    /// Checked before the link is recorded, so a rejected `extends` leaves
    /// `proto`'s parent list untouched.
    pub fn add_proto_parent(&mut self, proto_id: ProtoId, parent_id: ProtoId) -> ContextResult<()> {
        let incoming = self.all_method_specs(parent_id);
        let mut already_reachable = IndexMap::new();
        for existing_parent in self.proto(proto_id).parents.clone() {
            already_reachable.extend(self.all_method_specs(existing_parent));
        }
        for name in incoming.keys() {
            if already_reachable.contains_key(name) || self.proto(proto_id).specs.contains_key(name)
            {
                return Err(ContextError::AlreadyDefined(name.to_string()));
            }
        }
        self.proto_mut(proto_id).parents.push(parent_id);
        Ok(())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
