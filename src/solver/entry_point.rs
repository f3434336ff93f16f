// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Entry points seed the analysis with the initial objects for `this` and
//! the parameters of designated root methods.

use crate::heap::ObjId;
use crate::program::MethodId;

/// One analysis root: an entry method plus the objects seeded into its
/// `this` variable and parameters. Empty seedings are legitimate — an
/// unused parameter simply starts with nothing.
///
/// Several entry points may target the same method; whether their seeds
/// merge into one context-qualified method or diverge depends on the active
/// context selector.
pub trait EntryPoint {
    fn method(&self) -> MethodId;

    /// The objects for the `this` variable.
    fn this_objs(&self) -> Vec<ObjId> {
        Vec::new()
    }

    /// The objects for the i-th parameter, `i` in `[0, param_count)`.
    fn param_objs(&self, _i: usize) -> Vec<ObjId> {
        Vec::new()
    }
}

/// An entry point with explicitly listed seed objects.
pub struct SpecifiedEntryPoint {
    pub method: MethodId,
    pub this_objs: Vec<ObjId>,
    pub param_objs: Vec<Vec<ObjId>>,
}

impl SpecifiedEntryPoint {
    /// An entry point that seeds nothing, e.g. a `main` method whose
    /// parameters the driver chooses to ignore.
    pub fn bare(method: MethodId) -> Self {
        SpecifiedEntryPoint {
            method,
            this_objs: Vec::new(),
            param_objs: Vec::new(),
        }
    }
}

impl EntryPoint for SpecifiedEntryPoint {
    fn method(&self) -> MethodId {
        self.method
    }

    fn this_objs(&self) -> Vec<ObjId> {
        self.this_objs.clone()
    }

    fn param_objs(&self, i: usize) -> Vec<ObjId> {
        self.param_objs.get(i).cloned().unwrap_or_default()
    }
}
