// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Context-qualified entities and the pointer abstraction. All of them are
//! interned by the [`CSManager`] into dense-id arenas, so identity is a pair
//! comparison and never a pointer comparison.

use crate::context::ContextId;
use crate::heap::{HeapModel, ObjId};
use crate::new_index;
use crate::program::{CallSiteId, FieldId, MethodId, Program, TypeId, VarId};
use crate::util::Interner;

new_index! {
    /// The unique identifier of a context-qualified variable.
    pub struct CSVarId
}

new_index! {
    /// The unique identifier of a context-qualified object.
    pub struct CSObjId
}

new_index! {
    /// The unique identifier of a context-qualified method.
    pub struct CSMethodId
}

new_index! {
    /// The unique identifier of a context-qualified call site.
    pub struct CSCallSiteId
}

new_index! {
    /// The unique identifier of a pointer-flow-graph pointer.
    pub struct PointerId
}

/// A local variable under a calling context.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CSVar {
    pub ctx: ContextId,
    pub var: VarId,
}

/// A heap object under a heap context.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CSObj {
    pub ctx: ContextId,
    pub obj: ObjId,
}

/// A method under a calling context.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CSMethod {
    pub ctx: ContextId,
    pub method: MethodId,
}

/// A call site under the calling context of its containing method.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CSCallSite {
    pub ctx: ContextId,
    pub site: CallSiteId,
}

/// A node of the pointer flow graph. The variant set is closed: every
/// consumer matches exhaustively, so adding a kind is a compile-checked
/// change.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Pointer {
    /// A context-qualified local variable.
    Var(CSVarId),
    /// An instance field of a context-qualified object.
    InstanceField(CSObjId, FieldId),
    /// A static field.
    StaticField(FieldId),
    /// The elements of a context-qualified array object, merged.
    ArrayIndex(CSObjId),
}

/// Intern tables for every (context, entity) pair and for pointers.
pub struct CSManager {
    cs_vars: Interner<CSVar, CSVarId>,
    cs_objs: Interner<CSObj, CSObjId>,
    cs_methods: Interner<CSMethod, CSMethodId>,
    cs_call_sites: Interner<CSCallSite, CSCallSiteId>,
    pointers: Interner<Pointer, PointerId>,
}

impl CSManager {
    pub fn new() -> Self {
        CSManager {
            cs_vars: Interner::new(),
            cs_objs: Interner::new(),
            cs_methods: Interner::new(),
            cs_call_sites: Interner::new(),
            pointers: Interner::new(),
        }
    }

    #[inline]
    pub fn get_cs_var(&mut self, ctx: ContextId, var: VarId) -> CSVarId {
        self.cs_vars.intern(CSVar { ctx, var })
    }

    #[inline]
    pub fn get_cs_obj(&mut self, ctx: ContextId, obj: ObjId) -> CSObjId {
        self.cs_objs.intern(CSObj { ctx, obj })
    }

    #[inline]
    pub fn get_cs_method(&mut self, ctx: ContextId, method: MethodId) -> CSMethodId {
        self.cs_methods.intern(CSMethod { ctx, method })
    }

    #[inline]
    pub fn get_cs_call_site(&mut self, ctx: ContextId, site: CallSiteId) -> CSCallSiteId {
        self.cs_call_sites.intern(CSCallSite { ctx, site })
    }

    #[inline]
    pub fn cs_var(&self, id: CSVarId) -> CSVar {
        *self.cs_vars.value(id)
    }

    #[inline]
    pub fn cs_obj(&self, id: CSObjId) -> CSObj {
        *self.cs_objs.value(id)
    }

    #[inline]
    pub fn cs_method(&self, id: CSMethodId) -> CSMethod {
        *self.cs_methods.value(id)
    }

    #[inline]
    pub fn cs_call_site(&self, id: CSCallSiteId) -> CSCallSite {
        *self.cs_call_sites.value(id)
    }

    /// The canonical pointer for the given coordinates; one per distinct
    /// pointer, created on first access.
    #[inline]
    pub fn get_pointer(&mut self, pointer: Pointer) -> PointerId {
        self.pointers.intern(pointer)
    }

    #[inline]
    pub fn get_var_ptr(&mut self, ctx: ContextId, var: VarId) -> PointerId {
        let cs_var = self.get_cs_var(ctx, var);
        self.get_pointer(Pointer::Var(cs_var))
    }

    #[inline]
    pub fn get_instance_field_ptr(&mut self, base: CSObjId, field: FieldId) -> PointerId {
        self.get_pointer(Pointer::InstanceField(base, field))
    }

    #[inline]
    pub fn get_static_field_ptr(&mut self, field: FieldId) -> PointerId {
        self.get_pointer(Pointer::StaticField(field))
    }

    #[inline]
    pub fn get_array_ptr(&mut self, array: CSObjId) -> PointerId {
        self.get_pointer(Pointer::ArrayIndex(array))
    }

    #[inline]
    pub fn pointer(&self, id: PointerId) -> Pointer {
        *self.pointers.value(id)
    }

    #[inline]
    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    /// Read-only lookup, for consumers of a finished solve.
    pub fn try_pointer(&self, pointer: &Pointer) -> Option<PointerId> {
        self.pointers.get(pointer)
    }

    /// Read-only lookup of a context-qualified variable.
    pub fn try_cs_var(&self, ctx: ContextId, var: VarId) -> Option<CSVarId> {
        self.cs_vars.get(&CSVar { ctx, var })
    }

    pub fn pointer_iter(&self) -> impl Iterator<Item = &Pointer> {
        self.pointers.iter()
    }

    /// The declared type of a pointer: its variable's, field's, or array
    /// element's type.
    pub fn pointer_ty(&self, id: PointerId, program: &Program, heap: &HeapModel) -> TypeId {
        match self.pointer(id) {
            Pointer::Var(v) => program.var(self.cs_var(v).var).ty,
            Pointer::InstanceField(_, f) | Pointer::StaticField(f) => program.field(f).ty,
            Pointer::ArrayIndex(a) => {
                let array_ty = heap.obj(self.cs_obj(a).obj).ty;
                program.element_type(array_ty).unwrap_or(array_ty)
            }
        }
    }
}

impl Default for CSManager {
    fn default() -> Self {
        Self::new()
    }
}
