// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The heap object model. An abstract object is either one allocation site
//! or a synthetic object with no site: a merged object standing for every
//! instance of a type, or a mock object minted by the driver to seed entry
//! points.

use std::collections::{HashMap, HashSet};

use crate::new_index;
use crate::program::{AllocSiteId, ClassId, Program, TypeId, TypeKind};

new_index! {
    /// The unique identifier of an abstract heap object.
    pub struct ObjId
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum ObjKind {
    /// An allocation-site object.
    Alloc(AllocSiteId),
    /// A synthetic object standing for every instance of its type.
    Merged,
    /// A synthetic object minted by the driver, e.g. for entry-point seeds.
    Mock { name: String },
}

#[derive(Clone, Debug)]
pub struct Obj {
    pub kind: ObjKind,
    pub ty: TypeId,
}

impl Obj {
    /// Synthetic objects are context-free: they always carry the empty heap
    /// context, whatever the active selector.
    #[inline]
    pub fn is_synthetic(&self) -> bool {
        !matches!(self.kind, ObjKind::Alloc(_))
    }
}

/// Interns abstract objects. Allocation-site objects are created lazily when
/// the solver first processes the site; identity is stable for the run.
pub struct HeapModel {
    objs: Vec<Obj>,
    site_map: HashMap<AllocSiteId, ObjId>,
    merged_map: HashMap<TypeId, ObjId>,
    /// Types whose allocation sites all collapse into one merged object.
    merged_types: HashSet<TypeId>,
}

impl HeapModel {
    pub fn new() -> Self {
        HeapModel {
            objs: Vec::new(),
            site_map: HashMap::new(),
            merged_map: HashMap::new(),
            merged_types: HashSet::new(),
        }
    }

    /// Requests that every allocation of `ty` be modeled by one merged
    /// object, trading precision for fewer objects. Must be configured
    /// before solving.
    pub fn merge_type(&mut self, ty: TypeId) {
        self.merged_types.insert(ty);
    }

    #[inline]
    pub fn obj(&self, id: ObjId) -> &Obj {
        &self.objs[id.index()]
    }

    #[inline]
    pub fn obj_count(&self) -> usize {
        self.objs.len()
    }

    /// Returns the object for an allocation site, creating it on first use.
    /// Sites allocating a merged type all yield that type's merged object.
    pub fn get_obj(&mut self, site: AllocSiteId, program: &Program) -> ObjId {
        if let Some(id) = self.site_map.get(&site) {
            return *id;
        }
        let ty = program.alloc_site(site).ty;
        let id = if self.merged_types.contains(&ty) {
            self.get_merged_obj(ty)
        } else {
            self.push(Obj {
                kind: ObjKind::Alloc(site),
                ty,
            })
        };
        self.site_map.insert(site, id);
        id
    }

    /// The object a site resolved to, if the site has been processed.
    pub fn site_obj(&self, site: AllocSiteId) -> Option<ObjId> {
        self.site_map.get(&site).copied()
    }

    /// Returns the merged object for `ty`, creating it on first use.
    pub fn get_merged_obj(&mut self, ty: TypeId) -> ObjId {
        if let Some(id) = self.merged_map.get(&ty) {
            return *id;
        }
        let id = self.push(Obj {
            kind: ObjKind::Merged,
            ty,
        });
        self.merged_map.insert(ty, id);
        id
    }

    /// Mints a fresh mock object; every call yields a distinct object.
    pub fn mk_mock_obj(&mut self, name: &str, ty: TypeId) -> ObjId {
        self.push(Obj {
            kind: ObjKind::Mock {
                name: name.to_string(),
            },
            ty,
        })
    }

    /// The class whose code contains the object's allocation, if any. Used
    /// by container-based context selectors.
    pub fn alloc_container(&self, id: ObjId, program: &Program) -> Option<ClassId> {
        match self.obj(id).kind {
            ObjKind::Alloc(site) => {
                let method = program.alloc_site(site).method;
                Some(program.method(method).declaring_class)
            }
            ObjKind::Merged | ObjKind::Mock { .. } => match program.type_kind(self.obj(id).ty) {
                TypeKind::Class(c) => Some(c),
                TypeKind::Array(_) => None,
            },
        }
    }

    fn push(&mut self, obj: Obj) -> ObjId {
        let id = ObjId::new(self.objs.len());
        self.objs.push(obj);
        id
    }
}

impl Default for HeapModel {
    fn default() -> Self {
        Self::new()
    }
}
