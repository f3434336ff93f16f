// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The frozen outcome of a completed solve. Everything here is read-only;
//! external consumers (dataflow clients, derived flow-graph builders) query
//! this view, never a running solver.

use crate::context::ContextId;
use crate::cs::{CSManager, CSObjId, Pointer, PointerId};
use crate::graph::{CallGraph, PointerFlowGraph};
use crate::heap::{HeapModel, ObjId};
use crate::program::VarId;
use crate::pts::PointsToSet;

use super::Diagnostic;

pub struct PointerAnalysisResult<P> {
    csm: CSManager,
    heap: HeapModel,
    pfg: PointerFlowGraph,
    call_graph: CallGraph,
    pts: Vec<P>,
    diagnostics: Vec<Diagnostic>,
    empty: P,
}

impl<P: PointsToSet<CSObjId>> PointerAnalysisResult<P> {
    pub(crate) fn new(
        csm: CSManager,
        heap: HeapModel,
        pfg: PointerFlowGraph,
        call_graph: CallGraph,
        pts: Vec<P>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        PointerAnalysisResult {
            csm,
            heap,
            pfg,
            call_graph,
            pts,
            diagnostics,
            empty: P::new(),
        }
    }

    /// The points-to set of a pointer; empty for pointers the solve never
    /// touched.
    pub fn points_to(&self, pointer: PointerId) -> &P {
        self.pts.get(pointer.index()).unwrap_or(&self.empty)
    }

    /// Looks a pointer up by coordinates without interning anything new.
    pub fn pointer_of(&self, pointer: &Pointer) -> Option<PointerId> {
        self.csm.try_pointer(pointer)
    }

    /// The points-to set of a context-qualified variable.
    pub fn var_points_to(&self, ctx: ContextId, var: VarId) -> &P {
        self.csm
            .try_cs_var(ctx, var)
            .and_then(|cs_var| self.csm.try_pointer(&Pointer::Var(cs_var)))
            .map(|p| self.points_to(p))
            .unwrap_or(&self.empty)
    }

    /// The context-stripped objects a context-qualified variable may point
    /// to, sorted and deduplicated. Convenient for assertions over
    /// allocation sites.
    pub fn var_objs(&self, ctx: ContextId, var: VarId) -> Vec<ObjId> {
        let mut objs: Vec<ObjId> = self
            .var_points_to(ctx, var)
            .iter()
            .map(|cs_obj| self.csm.cs_obj(cs_obj).obj)
            .collect();
        objs.sort_unstable();
        objs.dedup();
        objs
    }

    /// May `p` and `q` refer to a common object?
    pub fn may_alias(&self, p: PointerId, q: PointerId) -> bool {
        let (small, large) = if self.points_to(p).count() <= self.points_to(q).count() {
            (self.points_to(p), self.points_to(q))
        } else {
            (self.points_to(q), self.points_to(p))
        };
        small.iter().any(|obj| large.contains(obj))
    }

    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    pub fn pointer_flow_graph(&self) -> &PointerFlowGraph {
        &self.pfg
    }

    pub fn cs_manager(&self) -> &CSManager {
        &self.csm
    }

    pub fn heap(&self) -> &HeapModel {
        &self.heap
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}
