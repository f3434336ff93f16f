// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Method bodies: local variables, the statement kinds the solver reacts
//! to, and call sites.

use super::{AllocSiteId, CallSiteId, FieldId, MethodId, MethodRef, TypeId, VarId};

/// A local variable, together with the access indexes driving the
/// object-driven transfer rules: the field/array accesses this variable is
/// the base of, and the call sites it is the receiver of.
#[derive(Debug)]
pub struct Var {
    pub method: MethodId,
    pub name: String,
    pub ty: TypeId,
    pub(crate) field_loads: Vec<FieldAccess>,
    pub(crate) field_stores: Vec<FieldAccess>,
    pub(crate) array_loads: Vec<ArrayAccess>,
    pub(crate) array_stores: Vec<ArrayAccess>,
    pub(crate) invokes: Vec<CallSiteId>,
}

impl Var {
    pub(crate) fn new(method: MethodId, name: String, ty: TypeId) -> Self {
        Var {
            method,
            name,
            ty,
            field_loads: Vec::new(),
            field_stores: Vec::new(),
            array_loads: Vec::new(),
            array_stores: Vec::new(),
            invokes: Vec::new(),
        }
    }

    /// `x = base.f` statements with this variable as `base`; `var` is `x`.
    #[inline]
    pub fn field_loads(&self) -> &[FieldAccess] {
        &self.field_loads
    }

    /// `base.f = x` statements with this variable as `base`; `var` is `x`.
    #[inline]
    pub fn field_stores(&self) -> &[FieldAccess] {
        &self.field_stores
    }

    /// `x = base[*]` statements with this variable as `base`.
    #[inline]
    pub fn array_loads(&self) -> &[ArrayAccess] {
        &self.array_loads
    }

    /// `base[*] = x` statements with this variable as `base`.
    #[inline]
    pub fn array_stores(&self) -> &[ArrayAccess] {
        &self.array_stores
    }

    /// Virtual/interface call sites with this variable as the receiver.
    #[inline]
    pub fn invokes(&self) -> &[CallSiteId] {
        &self.invokes
    }
}

/// The non-base side of an instance field access.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct FieldAccess {
    pub var: VarId,
    pub field: FieldId,
}

/// The non-base side of an array access.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ArrayAccess {
    pub var: VarId,
}

/// The statement kinds with pointer-affecting semantics. Everything else in
/// a method body is irrelevant to the analysis and is not represented.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Statement {
    /// `x = new T`
    New { lhs: VarId, site: AllocSiteId },
    /// `x = y`
    Assign { lhs: VarId, rhs: VarId },
    /// `x = (T) y`
    Cast { lhs: VarId, rhs: VarId, ty: TypeId },
    /// `x = base.f`
    LoadField { lhs: VarId, base: VarId, field: FieldId },
    /// `base.f = x`
    StoreField { base: VarId, field: FieldId, rhs: VarId },
    /// `x = C.f`
    LoadStatic { lhs: VarId, field: FieldId },
    /// `C.f = x`
    StoreStatic { field: FieldId, rhs: VarId },
    /// `x = a[*]`
    LoadArray { lhs: VarId, array: VarId },
    /// `a[*] = x`
    StoreArray { array: VarId, rhs: VarId },
    /// Any invoke instruction; the payload lives in the call-site arena.
    Invoke(CallSiteId),
}

/// The dispatch discipline of a call site.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum CallKind {
    Static,
    Special,
    Virtual,
    Interface,
}

impl CallKind {
    /// Static and special targets are resolvable without receiver objects.
    #[inline]
    pub fn is_statically_resolvable(self) -> bool {
        matches!(self, CallKind::Static | CallKind::Special)
    }
}

#[derive(Clone, Debug)]
pub struct CallSite {
    pub caller: MethodId,
    pub kind: CallKind,
    pub method_ref: MethodRef,
    /// Absent exactly for static calls.
    pub receiver: Option<VarId>,
    pub args: Vec<VarId>,
    /// The variable receiving the return value, if any.
    pub result: Option<VarId>,
}

/// A method body. Return values are modeled as the set of variables that
/// may flow out of the method rather than as explicit return statements.
#[derive(Debug)]
pub struct Body {
    pub this_var: Option<VarId>,
    pub params: Vec<VarId>,
    pub ret_vars: Vec<VarId>,
    pub stmts: Vec<Statement>,
}
