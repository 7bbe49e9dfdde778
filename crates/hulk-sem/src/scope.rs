//! The hierarchical [`Scope`] tree (§4.2), grounded on
//! `bruce/tools/semantic/simple_scope.py::Scope` (the variant with
//! `is_function_scope`, not the older `scope.py` without it — §9 needs the
//! flag to tell a method's `self` apart from an ordinary binding) and
//! ported to the `RibId`/`Rib` arena shape `faxc-sem/src/scope.rs` uses for
//! its own (unrelated) name-resolution scope tree.

use hulk_util::{define_idx, IndexVec, ScopeError, ScopeResult, Symbol};
use indexmap::IndexMap;

use crate::ty::Ty;

define_idx!(RibId);

/// A local variable or constant binding. `constant` mirrors the
/// reference's separate `Constant`/`Variable` records collapsed into one
/// type with a flag, since they differ only in mutability and both live in
/// `local_vars`.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: Symbol,
    pub ty: Option<Ty>,
    pub constant: bool,
}

/// A free function registered in a scope (§4.6). `hulk-sem`'s `Function`
/// semantic entity distinct from `hulk-ast::Function` (the AST node) —
/// this is the record `FunctionCollector` builds and `TypeInferer` mutates.
#[derive(Debug, Clone)]
pub struct FunctionRecord {
    pub name: Symbol,
    pub params: Vec<crate::context::Param>,
    pub ret: Option<Ty>,
}

/// One frame ("rib") of the scope tree: its own bindings plus a parent
/// link. `is_function_scope` is the flag §4.2/§4.7 use to decide whether an
/// unshadowed `self` inside this frame resolves to the enclosing type.
#[derive(Debug)]
pub struct Rib {
    pub local_vars: IndexMap<Symbol, Variable>,
    pub local_funcs: IndexMap<Symbol, FunctionRecord>,
    pub parent: Option<RibId>,
    pub is_function_scope: bool,
}

/// The scope tree: an arena of [`Rib`]s addressed by [`RibId`], rather than
/// the reference's parent-linked heap objects — matches `hulk-util`'s
/// `Idx`/`IndexVec` convention used throughout this workspace.
pub struct Scope {
    ribs: IndexVec<RibId, Rib>,
    root: RibId,
}

impl Scope {
    pub fn new() -> Self {
        let mut ribs = IndexVec::new();
        let root = ribs.push(Rib {
            local_vars: IndexMap::new(),
            local_funcs: IndexMap::new(),
            parent: None,
            is_function_scope: false,
        });
        Self { ribs, root }
    }

    pub fn root(&self) -> RibId {
        self.root
    }

    pub fn create_child(&mut self, parent: RibId, is_function_scope: bool) -> RibId {
        self.ribs.push(Rib {
            local_vars: IndexMap::new(),
            local_funcs: IndexMap::new(),
            parent: Some(parent),
            is_function_scope,
        })
    }

    pub fn rib(&self, id: RibId) -> &Rib {
        &self.ribs[id]
    }

    pub fn rib_mut(&mut self, id: RibId) -> &mut Rib {
        &mut self.ribs[id]
    }

    pub fn define_variable(
        &mut self,
        rib: RibId,
        name: Symbol,
        ty: Option<Ty>,
    ) -> ScopeResult<()> {
        self.define_binding(rib, name, ty, false)
    }

    pub fn define_constant(
        &mut self,
        rib: RibId,
        name: Symbol,
        ty: Option<Ty>,
    ) -> ScopeResult<()> {
        self.define_binding(rib, name, ty, true)
    }

    fn define_binding(
        &mut self,
        rib: RibId,
        name: Symbol,
        ty: Option<Ty>,
        constant: bool,
    ) -> ScopeResult<()> {
        let frame = self.rib_mut(rib);
        if frame.local_vars.contains_key(&name) {
            return Err(ScopeError::AlreadyDefined(name.to_string()));
        }
        frame.local_vars.insert(name, Variable { name, ty, constant });
        Ok(())
    }

    pub fn define_function(
        &mut self,
        rib: RibId,
        name: Symbol,
        params: Vec<crate::context::Param>,
        ret: Option<Ty>,
    ) -> ScopeResult<()> {
        let frame = self.rib_mut(rib);
        if frame.local_funcs.contains_key(&name) {
            return Err(ScopeError::AlreadyDefined(name.to_string()));
        }
        frame
            .local_funcs
            .insert(name, FunctionRecord { name, params, ret });
        Ok(())
    }

    /// Walks to the parent chain; returns the owning [`RibId`] alongside the
    /// variable so callers can check `is_function_scope` on the right frame
    /// (§4.7/§4.8's `self`-resolution rule).
    pub fn find_variable(&self, rib: RibId, name: Symbol) -> Option<(RibId, &Variable)> {
        let frame = self.rib(rib);
        if let Some(var) = frame.local_vars.get(&name) {
            return Some((rib, var));
        }
        frame.parent.and_then(|p| self.find_variable(p, name))
    }

    pub fn find_function(&self, rib: RibId, name: Symbol) -> Option<&FunctionRecord> {
        let frame = self.rib(rib);
        if let Some(f) = frame.local_funcs.get(&name) {
            return Some(f);
        }
        frame.parent.and_then(|p| self.find_function(p, name))
    }

    pub fn is_var_defined(&self, rib: RibId, name: Symbol) -> bool {
        self.find_variable(rib, name).is_some()
    }

    pub fn is_func_defined(&self, rib: RibId, name: Symbol) -> bool {
        self.find_function(rib, name).is_some()
    }

    /// `get_top_scope`: walks to the root, used by `SemanticChecker`'s
    /// function-call handling which creates its child scope off the root
    /// rather than the lexically enclosing one (§4.7).
    pub fn top(&self, rib: RibId) -> RibId {
        match self.rib(rib).parent {
            Some(p) => self.top(p),
            None => rib,
        }
    }

    /// Set the (possibly still-`None`) type of a variable already defined
    /// in `rib` — `TypeInferer::_infer`'s narrowing write-back.
    pub fn set_variable_type(&mut self, rib: RibId, name: Symbol, ty: Ty) {
        if let Some(var) = self.rib_mut(rib).local_vars.get_mut(&name) {
            var.ty = Some(ty);
        }
    }

    /// `TypeInferer::_infer` (§4.8) applied to a scope-bound variable: walks
    /// to the rib that actually owns `name` (unlike [`Scope::set_variable_type`],
    /// which only looks at `rib` itself) and narrows its type there via
    /// [`crate::ty::narrow`]. Returns `true` iff the type changed, which the
    /// caller folds into the fixed-point loop's `occurs` flag.
    pub fn narrow_variable(&mut self, rib: RibId, name: Symbol, proposed: &Ty) -> bool {
        let owner = match self.find_variable(rib, name) {
            Some((owner, var)) => (owner, var.ty.clone()),
            None => return false,
        };
        let (owner, current) = owner;
        match crate::ty::narrow(&current, proposed) {
            Some(new_ty) => {
                self.rib_mut(owner).local_vars.get_mut(&name).unwrap().ty = Some(new_ty);
                true
            }
            None => false,
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}
