// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Assembly of [`Program`] arenas. Drivers (and tests) populate classes,
//! members and method bodies through these builders; the finished program
//! is immutable.

use std::collections::HashMap;

use crate::util::Interner;

use super::body::{ArrayAccess, Body, CallKind, CallSite, FieldAccess, Statement, Var};
use super::{
    AllocSite, AllocSiteId, CallSiteId, Class, ClassId, Field, FieldId, Method, MethodId,
    MethodRef, Program, TypeId, TypeKind, VarId,
};

pub struct ProgramBuilder {
    types: Interner<TypeKind, TypeId>,
    classes: Vec<Class>,
    class_map: HashMap<String, ClassId>,
    fields: Vec<Field>,
    methods: Vec<Method>,
    vars: Vec<Var>,
    call_sites: Vec<CallSite>,
    alloc_sites: Vec<AllocSite>,
    root_class: Option<ClassId>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        ProgramBuilder {
            types: Interner::new(),
            classes: Vec::new(),
            class_map: HashMap::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            vars: Vec::new(),
            call_sites: Vec::new(),
            alloc_sites: Vec::new(),
            root_class: None,
        }
    }

    /// Adds a class. The first class added without a superclass becomes the
    /// hierarchy root.
    pub fn add_class(&mut self, name: &str, superclass: Option<ClassId>) -> ClassId {
        let id = self.push_class(name, superclass, false);
        if superclass.is_none() && self.root_class.is_none() {
            self.root_class = Some(id);
        }
        id
    }

    pub fn add_interface(&mut self, name: &str) -> ClassId {
        self.push_class(name, None, true)
    }

    fn push_class(&mut self, name: &str, superclass: Option<ClassId>, is_interface: bool) -> ClassId {
        assert!(
            !self.class_map.contains_key(name),
            "duplicate class name: {name}"
        );
        let id = ClassId::new(self.classes.len());
        self.classes.push(Class {
            name: name.to_string(),
            superclass,
            interfaces: Vec::new(),
            is_interface,
            methods: Vec::new(),
            fields: Vec::new(),
        });
        self.class_map.insert(name.to_string(), id);
        id
    }

    /// Records that `class` implements `iface`.
    pub fn implement(&mut self, class: ClassId, iface: ClassId) {
        assert!(self.classes[iface.index()].is_interface);
        self.classes[class.index()].interfaces.push(iface);
    }

    pub fn class_type(&mut self, class: ClassId) -> TypeId {
        self.types.intern(TypeKind::Class(class))
    }

    pub fn array_type(&mut self, elem: TypeId) -> TypeId {
        self.types.intern(TypeKind::Array(elem))
    }

    pub fn add_field(&mut self, class: ClassId, name: &str, ty: TypeId, is_static: bool) -> FieldId {
        let id = FieldId::new(self.fields.len());
        self.fields.push(Field {
            declaring_class: class,
            name: name.to_string(),
            ty,
            is_static,
        });
        self.classes[class.index()].fields.push(id);
        id
    }

    pub fn add_method(&mut self, class: ClassId, name: &str, descriptor: &str) -> MethodId {
        self.push_method(class, name, descriptor, false, false)
    }

    pub fn add_static_method(&mut self, class: ClassId, name: &str, descriptor: &str) -> MethodId {
        self.push_method(class, name, descriptor, true, false)
    }

    pub fn add_abstract_method(&mut self, class: ClassId, name: &str, descriptor: &str) -> MethodId {
        self.push_method(class, name, descriptor, false, true)
    }

    fn push_method(
        &mut self,
        class: ClassId,
        name: &str,
        descriptor: &str,
        is_static: bool,
        is_abstract: bool,
    ) -> MethodId {
        let id = MethodId::new(self.methods.len());
        self.methods.push(Method {
            declaring_class: class,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            is_static,
            is_abstract,
            body: None,
        });
        self.classes[class.index()].methods.push(id);
        id
    }

    pub fn method_ref(&self, class: ClassId, name: &str, descriptor: &str) -> MethodRef {
        MethodRef {
            class,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }
    }

    /// Starts a body for `method`. Finish the returned builder before
    /// starting another.
    pub fn body(&mut self, method: MethodId) -> BodyBuilder<'_> {
        assert!(
            !self.methods[method.index()].is_abstract,
            "abstract methods have no body"
        );
        BodyBuilder {
            pb: self,
            method,
            this_var: None,
            params: Vec::new(),
            ret_vars: Vec::new(),
            stmts: Vec::new(),
        }
    }

    pub fn finish(self) -> Program {
        Program {
            types: self.types,
            classes: self.classes,
            class_map: self.class_map,
            fields: self.fields,
            methods: self.methods,
            vars: self.vars,
            call_sites: self.call_sites,
            alloc_sites: self.alloc_sites,
            root_class: self.root_class,
        }
    }
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulates statements for one method body, maintaining the per-variable
/// access indexes as statements are added.
pub struct BodyBuilder<'a> {
    pb: &'a mut ProgramBuilder,
    method: MethodId,
    this_var: Option<VarId>,
    params: Vec<VarId>,
    ret_vars: Vec<VarId>,
    stmts: Vec<Statement>,
}

impl<'a> BodyBuilder<'a> {
    pub fn var(&mut self, name: &str, ty: TypeId) -> VarId {
        let id = VarId::new(self.pb.vars.len());
        self.pb.vars.push(Var::new(self.method, name.to_string(), ty));
        id
    }

    pub fn set_this(&mut self, var: VarId) {
        self.this_var = Some(var);
    }

    pub fn add_param(&mut self, var: VarId) {
        self.params.push(var);
    }

    pub fn add_ret(&mut self, var: VarId) {
        self.ret_vars.push(var);
    }

    /// `lhs = new ty`
    pub fn alloc(&mut self, lhs: VarId, ty: TypeId) -> AllocSiteId {
        let site = AllocSiteId::new(self.pb.alloc_sites.len());
        self.pb.alloc_sites.push(AllocSite {
            method: self.method,
            ty,
        });
        self.stmts.push(Statement::New { lhs, site });
        site
    }

    pub fn assign(&mut self, lhs: VarId, rhs: VarId) {
        self.stmts.push(Statement::Assign { lhs, rhs });
    }

    pub fn cast(&mut self, lhs: VarId, rhs: VarId, ty: TypeId) {
        self.stmts.push(Statement::Cast { lhs, rhs, ty });
    }

    pub fn load_field(&mut self, lhs: VarId, base: VarId, field: FieldId) {
        self.pb.vars[base.index()]
            .field_loads
            .push(FieldAccess { var: lhs, field });
        self.stmts.push(Statement::LoadField { lhs, base, field });
    }

    pub fn store_field(&mut self, base: VarId, field: FieldId, rhs: VarId) {
        self.pb.vars[base.index()]
            .field_stores
            .push(FieldAccess { var: rhs, field });
        self.stmts.push(Statement::StoreField { base, field, rhs });
    }

    pub fn load_static(&mut self, lhs: VarId, field: FieldId) {
        self.stmts.push(Statement::LoadStatic { lhs, field });
    }

    pub fn store_static(&mut self, field: FieldId, rhs: VarId) {
        self.stmts.push(Statement::StoreStatic { field, rhs });
    }

    pub fn load_array(&mut self, lhs: VarId, array: VarId) {
        self.pb.vars[array.index()]
            .array_loads
            .push(ArrayAccess { var: lhs });
        self.stmts.push(Statement::LoadArray { lhs, array });
    }

    pub fn store_array(&mut self, array: VarId, rhs: VarId) {
        self.pb.vars[array.index()]
            .array_stores
            .push(ArrayAccess { var: rhs });
        self.stmts.push(Statement::StoreArray { array, rhs });
    }

    /// Adds an invoke statement. Virtual/interface sites are indexed on
    /// their receiver variable so the solver can revisit them per newly
    /// discovered receiver object.
    pub fn invoke(
        &mut self,
        kind: CallKind,
        method_ref: MethodRef,
        receiver: Option<VarId>,
        args: Vec<VarId>,
        result: Option<VarId>,
    ) -> CallSiteId {
        assert_eq!(
            kind == CallKind::Static,
            receiver.is_none(),
            "exactly the static call kind takes no receiver"
        );
        let id = CallSiteId::new(self.pb.call_sites.len());
        self.pb.call_sites.push(CallSite {
            caller: self.method,
            kind,
            method_ref,
            receiver,
            args,
            result,
        });
        if let (Some(recv), false) = (receiver, kind.is_statically_resolvable()) {
            self.pb.vars[recv.index()].invokes.push(id);
        }
        self.stmts.push(Statement::Invoke(id));
        id
    }

    pub fn finish(self) {
        let body = Body {
            this_var: self.this_var,
            params: self.params,
            ret_vars: self.ret_vars,
            stmts: self.stmts,
        };
        self.pb.methods[self.method.index()].body = Some(body);
    }
}
