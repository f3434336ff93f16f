// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The program-model boundary: classes, fields, methods, reference types and
//! the hierarchy queries the solver relies on. The class loader and the
//! front end that populate this model live outside the crate; a
//! [`ProgramBuilder`] assembles the arenas and the built [`Program`] is
//! immutable for the lifetime of a solve.

use std::collections::HashMap;

use crate::new_index;
use crate::util::Interner;

pub mod body;
pub mod builder;

pub use body::{ArrayAccess, Body, CallKind, CallSite, FieldAccess, Statement, Var};
pub use builder::{BodyBuilder, ProgramBuilder};

new_index! {
    /// The unique identifier of an interned reference type.
    pub struct TypeId
}

new_index! {
    /// The unique identifier of a class or interface.
    pub struct ClassId
}

new_index! {
    /// The unique identifier of a declared field.
    pub struct FieldId
}

new_index! {
    /// The unique identifier of a declared method.
    pub struct MethodId
}

new_index! {
    /// The unique identifier of a local variable.
    pub struct VarId
}

new_index! {
    /// The unique identifier of a call site.
    pub struct CallSiteId
}

new_index! {
    /// The unique identifier of an allocation site.
    pub struct AllocSiteId
}

/// A reference type: a class/interface type or an array type.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum TypeKind {
    Class(ClassId),
    Array(TypeId),
}

#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub superclass: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    pub is_interface: bool,
    pub(crate) methods: Vec<MethodId>,
    pub(crate) fields: Vec<FieldId>,
}

impl Class {
    /// The methods declared directly in this class.
    #[inline]
    pub fn methods(&self) -> &[MethodId] {
        &self.methods
    }

    /// The fields declared directly in this class.
    #[inline]
    pub fn fields(&self) -> &[FieldId] {
        &self.fields
    }
}

#[derive(Debug)]
pub struct Field {
    pub declaring_class: ClassId,
    pub name: String,
    pub ty: TypeId,
    pub is_static: bool,
}

#[derive(Debug)]
pub struct Method {
    pub declaring_class: ClassId,
    pub name: String,
    pub descriptor: String,
    pub is_static: bool,
    pub is_abstract: bool,
    pub body: Option<Body>,
}

impl Method {
    /// Returns the body, which is absent for abstract methods.
    #[inline]
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }
}

/// An unresolved method reference as it appears at a call site: the class
/// named by the instruction plus the subsignature.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct MethodRef {
    pub class: ClassId,
    pub name: String,
    pub descriptor: String,
}

/// One allocation site: a `new T` statement in some method.
#[derive(Clone, Debug)]
pub struct AllocSite {
    pub method: MethodId,
    pub ty: TypeId,
}

/// The closed-world program under analysis.
pub struct Program {
    pub(crate) types: Interner<TypeKind, TypeId>,
    pub(crate) classes: Vec<Class>,
    pub(crate) class_map: HashMap<String, ClassId>,
    pub(crate) fields: Vec<Field>,
    pub(crate) methods: Vec<Method>,
    pub(crate) vars: Vec<Var>,
    pub(crate) call_sites: Vec<CallSite>,
    pub(crate) alloc_sites: Vec<AllocSite>,
    /// The hierarchy root every reference type is assignable to.
    pub(crate) root_class: Option<ClassId>,
}

impl Program {
    #[inline]
    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.index()]
    }

    #[inline]
    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.index()]
    }

    #[inline]
    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.index()]
    }

    #[inline]
    pub fn var(&self, id: VarId) -> &Var {
        &self.vars[id.index()]
    }

    #[inline]
    pub fn call_site(&self, id: CallSiteId) -> &CallSite {
        &self.call_sites[id.index()]
    }

    #[inline]
    pub fn alloc_site(&self, id: AllocSiteId) -> &AllocSite {
        &self.alloc_sites[id.index()]
    }

    #[inline]
    pub fn type_kind(&self, ty: TypeId) -> TypeKind {
        *self.types.value(ty)
    }

    #[inline]
    pub fn root_class(&self) -> Option<ClassId> {
        self.root_class
    }

    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.class_map.get(name).copied()
    }

    /// Returns the interned type for a class, if the builder created it.
    pub fn class_type(&self, class: ClassId) -> Option<TypeId> {
        self.types.get(&TypeKind::Class(class))
    }

    /// Returns the element type of an array type.
    pub fn element_type(&self, ty: TypeId) -> Option<TypeId> {
        match self.type_kind(ty) {
            TypeKind::Array(elem) => Some(elem),
            TypeKind::Class(_) => None,
        }
    }

    /// Reflexive-transitive subtyping over superclasses and interfaces.
    pub fn is_subclass_of(&self, a: ClassId, b: ClassId) -> bool {
        let mut worklist = vec![a];
        while let Some(c) = worklist.pop() {
            if c == b {
                return true;
            }
            let class = self.class(c);
            worklist.extend(class.superclass);
            worklist.extend(class.interfaces.iter().copied());
        }
        false
    }

    /// Can a value of type `from` be assigned to a slot of type `to`?
    ///
    /// Arrays are covariant; every array type is assignable to the root
    /// class and nothing else among class types.
    pub fn is_assignable(&self, from: TypeId, to: TypeId) -> bool {
        if from == to {
            return true;
        }
        match (self.type_kind(from), self.type_kind(to)) {
            (TypeKind::Class(a), TypeKind::Class(b)) => self.is_subclass_of(a, b),
            (TypeKind::Array(s), TypeKind::Array(t)) => self.is_assignable(s, t),
            (TypeKind::Array(_), TypeKind::Class(b)) => Some(b) == self.root_class,
            (TypeKind::Class(_), TypeKind::Array(_)) => false,
        }
    }

    /// Resolves a static/special call target by walking up from the class
    /// the reference names. Abstract declarations are skipped; `None` means
    /// the reference is unresolvable (malformed metadata).
    pub fn resolve_ref(&self, mref: &MethodRef) -> Option<MethodId> {
        self.lookup_concrete(Some(mref.class), mref)
    }

    /// Virtual dispatch: resolves the target invoked on a receiver of
    /// dynamic type `recv_ty`. Array receivers dispatch through the root
    /// class.
    pub fn dispatch(&self, recv_ty: TypeId, mref: &MethodRef) -> Option<MethodId> {
        let start = match self.type_kind(recv_ty) {
            TypeKind::Class(c) => Some(c),
            TypeKind::Array(_) => self.root_class,
        };
        self.lookup_concrete(start, mref)
    }

    fn lookup_concrete(&self, start: Option<ClassId>, mref: &MethodRef) -> Option<MethodId> {
        let mut class = start;
        while let Some(c) = class {
            for &m in &self.class(c).methods {
                let method = self.method(m);
                if !method.is_abstract
                    && method.name == mref.name
                    && method.descriptor == mref.descriptor
                {
                    return Some(m);
                }
            }
            class = self.class(c).superclass;
        }
        None
    }
}
