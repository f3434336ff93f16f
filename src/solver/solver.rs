// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The key component of the analysis: one queue of work units drives both
//! points-to propagation and call-graph construction to a joint fixed
//! point. Only deltas — objects a pointer has not seen before — are ever
//! forwarded along pointer-flow edges.

use std::collections::VecDeque;
use std::time::Instant;

use itertools::Itertools;
use log::*;

use crate::context::selector::{ContextSelector, ObjInfo};
use crate::context::ContextId;
use crate::cs::{CSManager, CSObjId, Pointer, PointerId};
use crate::graph::{CallGraph, FlowKind, PointerFlowGraph};
use crate::heap::{HeapModel, ObjId};
use crate::program::{CallSiteId, Program, Statement, VarId};
use crate::pts::{HybridPointsToSet, PointsToSet};

use super::entry_point::EntryPoint;
use super::result::PointerAnalysisResult;
use super::{Diagnostic, SolverError, SolverOptions, WorkItem};

pub struct Solver<'p, S, P = HybridPointsToSet<CSObjId>> {
    program: &'p Program,
    heap: HeapModel,
    selector: S,
    csm: CSManager,
    pfg: PointerFlowGraph,
    call_graph: CallGraph,
    /// One points-to set per pointer, indexed by `PointerId`.
    pts: Vec<P>,
    worklist: VecDeque<WorkItem<P>>,
    entry_points: Vec<Box<dyn EntryPoint>>,
    diagnostics: Vec<Diagnostic>,
    options: SolverOptions,
}

impl<'p, S, P> Solver<'p, S, P>
where
    S: ContextSelector,
    P: PointsToSet<CSObjId>,
{
    pub fn new(program: &'p Program, heap: HeapModel, selector: S) -> Self {
        Solver {
            program,
            heap,
            selector,
            csm: CSManager::new(),
            pfg: PointerFlowGraph::new(),
            call_graph: CallGraph::new(),
            pts: Vec::new(),
            worklist: VecDeque::new(),
            entry_points: Vec::new(),
            diagnostics: Vec::new(),
            options: SolverOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SolverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn add_entry_point(&mut self, entry_point: Box<dyn EntryPoint>) {
        self.entry_points.push(entry_point);
    }

    /// Runs the analysis to its fixed point, consuming the solver. All
    /// queries go through the returned frozen result; there is no way to
    /// read a solve in progress.
    pub fn solve(mut self) -> Result<PointerAnalysisResult<P>, SolverError> {
        if self.entry_points.is_empty() {
            return Err(SolverError::NoEntryPoints);
        }
        let start = Instant::now();
        self.seed();

        let mut steps = 0usize;
        while let Some(item) = self.worklist.pop_front() {
            if let Some(budget) = self.options.max_steps {
                if steps >= budget {
                    warn!("aborting after {steps} work units; result discarded as unsound");
                    return Err(SolverError::StepBudgetExhausted { budget, steps });
                }
            }
            steps += 1;
            match item {
                WorkItem::Reachable(method) => self.process_reachable(method),
                WorkItem::Delta { pointer, objs } => self.process_delta(pointer, &objs),
            }
        }

        info!(
            "pointer analysis reached a fixed point after {} work units in {}: {} reachable methods, {} call edges, {} pointers",
            steps,
            humantime::format_duration(start.elapsed()),
            self.call_graph.reachable_count(),
            self.call_graph.edge_count(),
            self.csm.pointer_count(),
        );
        Ok(PointerAnalysisResult::new(
            self.csm,
            self.heap,
            self.pfg,
            self.call_graph,
            self.pts,
            self.diagnostics,
        ))
    }

    /// Marks the entry methods reachable and injects their seed objects.
    /// Seed objects carry the empty heap context.
    fn seed(&mut self) {
        let program = self.program;
        let entry_points = std::mem::take(&mut self.entry_points);
        for entry_point in &entry_points {
            let method = entry_point.method();
            let ctx = self.selector.empty_context_id();
            let cs_method = self.csm.get_cs_method(ctx, method);
            self.add_reachable(cs_method);

            let Some(body) = program.method(method).body() else {
                continue;
            };
            if let Some(this_var) = body.this_var {
                self.seed_var(ctx, this_var, entry_point.this_objs());
            }
            for (i, &param) in body.params.iter().enumerate() {
                self.seed_var(ctx, param, entry_point.param_objs(i));
            }
        }
    }

    fn seed_var(&mut self, ctx: ContextId, var: VarId, objs: Vec<ObjId>) {
        if objs.is_empty() {
            return;
        }
        let empty_ctx = self.selector.empty_context_id();
        let mut set = P::new();
        for obj in objs {
            let cs_obj = self.csm.get_cs_obj(empty_ctx, obj);
            set.insert(cs_obj);
        }
        let pointer = self.csm.get_var_ptr(ctx, var);
        self.add_work_delta(pointer, set);
    }

    fn add_reachable(&mut self, method: crate::cs::CSMethodId) {
        if self.call_graph.add_reachable(method) {
            self.worklist.push_back(WorkItem::Reachable(method));
        }
    }

    /// Dispatches the statements of a method that just entered the
    /// reachable set. Instance field/array accesses and virtual calls are
    /// object-driven: they react to receiver deltas, not to this pass.
    fn process_reachable(&mut self, cs_method: crate::cs::CSMethodId) {
        let program = self.program;
        let m = self.csm.cs_method(cs_method);
        let method = program.method(m.method);
        debug!(
            "processing {}.{} under {:?}",
            program.class(method.declaring_class).name,
            method.name,
            m.ctx
        );
        let Some(body) = method.body() else {
            return;
        };

        for stmt in &body.stmts {
            match stmt {
                Statement::New { lhs, site } => {
                    let obj = self.heap.get_obj(*site, program);
                    let heap_ctx = self.heap_context(m.ctx, obj);
                    let cs_obj = self.csm.get_cs_obj(heap_ctx, obj);
                    let pointer = self.csm.get_var_ptr(m.ctx, *lhs);
                    self.add_work_delta(pointer, P::singleton(cs_obj));
                }
                Statement::Assign { lhs, rhs } => {
                    let src = self.csm.get_var_ptr(m.ctx, *rhs);
                    let dst = self.csm.get_var_ptr(m.ctx, *lhs);
                    self.add_pfg_edge(src, dst, FlowKind::LocalAssign);
                }
                Statement::Cast { lhs, rhs, ty } => {
                    let src = self.csm.get_var_ptr(m.ctx, *rhs);
                    let dst = self.csm.get_var_ptr(m.ctx, *lhs);
                    self.add_pfg_edge(src, dst, FlowKind::Cast(*ty));
                }
                Statement::LoadStatic { lhs, field } => {
                    let src = self.csm.get_static_field_ptr(*field);
                    let dst = self.csm.get_var_ptr(m.ctx, *lhs);
                    self.add_pfg_edge(src, dst, FlowKind::StaticLoad);
                }
                Statement::StoreStatic { field, rhs } => {
                    let src = self.csm.get_var_ptr(m.ctx, *rhs);
                    let dst = self.csm.get_static_field_ptr(*field);
                    self.add_pfg_edge(src, dst, FlowKind::StaticStore);
                }
                Statement::LoadField { .. }
                | Statement::StoreField { .. }
                | Statement::LoadArray { .. }
                | Statement::StoreArray { .. } => {}
                Statement::Invoke(site_id) => {
                    if program.call_site(*site_id).kind.is_statically_resolvable() {
                        self.process_static_call(m.ctx, *site_id);
                    }
                }
            }
        }
    }

    /// A statically resolvable (static/special) call: the callee is known
    /// without receiver objects.
    fn process_static_call(&mut self, caller_ctx: ContextId, site_id: CallSiteId) {
        let program = self.program;
        let site = program.call_site(site_id);
        let Some(callee) = program.resolve_ref(&site.method_ref) else {
            warn!(
                "unresolved {:?} call to {}{} at {:?}",
                site.kind, site.method_ref.name, site.method_ref.descriptor, site_id
            );
            self.diagnostics.push(Diagnostic::UnresolvedRef { site: site_id });
            return;
        };
        let callee_ctx = self.selector.select_call_context(caller_ctx, site_id, callee);

        // Special calls still pass their receiver into the callee's `this`.
        if let Some(recv) = site.receiver {
            if let Some(this_var) = program.method(callee).body().and_then(|b| b.this_var) {
                let src = self.csm.get_var_ptr(caller_ctx, recv);
                let dst = self.csm.get_var_ptr(callee_ctx, this_var);
                self.add_pfg_edge(src, dst, FlowKind::LocalAssign);
            }
        }

        let cs_callsite = self.csm.get_cs_call_site(caller_ctx, site_id);
        self.process_call_edge(cs_callsite, callee_ctx, callee);
    }

    /// A virtual/interface call reacting to a newly discovered receiver
    /// object: resolve the override, qualify the callee, bind the receiver.
    fn process_instance_call(&mut self, caller_ctx: ContextId, site_id: CallSiteId, recv: CSObjId) {
        let program = self.program;
        let site = program.call_site(site_id);
        let recv_pair = self.csm.cs_obj(recv);
        let recv_ty = self.heap.obj(recv_pair.obj).ty;

        let Some(callee) = program.dispatch(recv_ty, &site.method_ref) else {
            warn!(
                "no dispatch target for {}{} on receiver type {:?} at {:?}",
                site.method_ref.name, site.method_ref.descriptor, recv_ty, site_id
            );
            self.diagnostics.push(Diagnostic::UnresolvedDispatch {
                site: site_id,
                recv_obj: recv_pair.obj,
                recv_ty,
            });
            return;
        };

        let info = self.obj_info(recv_pair.ctx, recv_pair.obj);
        let callee_ctx = self
            .selector
            .select_instance_context(caller_ctx, site_id, &info, callee);

        if let Some(this_var) = program.method(callee).body().and_then(|b| b.this_var) {
            let this_ptr = self.csm.get_var_ptr(callee_ctx, this_var);
            self.add_work_delta(this_ptr, P::singleton(recv));
        }

        let cs_callsite = self.csm.get_cs_call_site(caller_ctx, site_id);
        self.process_call_edge(cs_callsite, callee_ctx, callee);
    }

    /// Records a call edge; on the first edge for this (call site, callee)
    /// pair, schedules the callee and binds arguments and return values.
    fn process_call_edge(
        &mut self,
        cs_callsite: crate::cs::CSCallSiteId,
        callee_ctx: ContextId,
        callee: crate::program::MethodId,
    ) {
        let program = self.program;
        let cs = self.csm.cs_call_site(cs_callsite);
        let site = program.call_site(cs.site);
        let caller = self.csm.get_cs_method(cs.ctx, site.caller);
        let cs_callee = self.csm.get_cs_method(callee_ctx, callee);

        if !self.call_graph.add_edge(site.kind, cs_callsite, caller, cs_callee) {
            return;
        }
        self.add_reachable(cs_callee);

        let Some(body) = program.method(callee).body() else {
            return;
        };
        if body.params.len() != site.args.len() {
            warn!(
                "arity mismatch at {:?}: {} args against {} params",
                cs.site,
                site.args.len(),
                body.params.len()
            );
            self.diagnostics.push(Diagnostic::ArityMismatch {
                site: cs.site,
                callee,
            });
        }
        for (&arg, &param) in site.args.iter().zip(&body.params) {
            let src = self.csm.get_var_ptr(cs.ctx, arg);
            let dst = self.csm.get_var_ptr(callee_ctx, param);
            self.add_pfg_edge(src, dst, FlowKind::LocalAssign);
        }
        if let Some(result) = site.result {
            for &ret in &body.ret_vars {
                let src = self.csm.get_var_ptr(callee_ctx, ret);
                let dst = self.csm.get_var_ptr(cs.ctx, result);
                self.add_pfg_edge(src, dst, FlowKind::LocalAssign);
            }
        }
    }

    /// Absorbs a delta into the pointer's set and reacts to the objects that
    /// are genuinely new: forward them along out-edges, and if the pointer
    /// is a variable, re-run the object-driven rules for its accesses.
    fn process_delta(&mut self, pointer: PointerId, objs: &P) {
        let program = self.program;
        let diff = self.propagate(pointer, objs);
        if diff.is_empty() {
            return;
        }

        if let Pointer::Var(cs_var) = self.csm.pointer(pointer) {
            let v = self.csm.cs_var(cs_var);
            let var = program.var(v.var);
            for base in diff.iter() {
                for access in var.field_stores() {
                    let src = self.csm.get_var_ptr(v.ctx, access.var);
                    let dst = self.csm.get_instance_field_ptr(base, access.field);
                    self.add_pfg_edge(src, dst, FlowKind::InstanceStore);
                }
                for access in var.field_loads() {
                    let src = self.csm.get_instance_field_ptr(base, access.field);
                    let dst = self.csm.get_var_ptr(v.ctx, access.var);
                    self.add_pfg_edge(src, dst, FlowKind::InstanceLoad);
                }
                for access in var.array_stores() {
                    let src = self.csm.get_var_ptr(v.ctx, access.var);
                    let dst = self.csm.get_array_ptr(base);
                    self.add_pfg_edge(src, dst, FlowKind::ArrayStore);
                }
                for access in var.array_loads() {
                    let src = self.csm.get_array_ptr(base);
                    let dst = self.csm.get_var_ptr(v.ctx, access.var);
                    self.add_pfg_edge(src, dst, FlowKind::ArrayLoad);
                }
                for &site in var.invokes() {
                    self.process_instance_call(v.ctx, site, base);
                }
            }
        }
    }

    /// Adds `objs` into the pointer's set and forwards the diff to every
    /// successor, cast-filtered where the edge requires it. Returns the
    /// diff.
    fn propagate(&mut self, pointer: PointerId, objs: &P) -> P {
        let diff = self.pts_of_mut(pointer).add_all(objs);
        if diff.is_empty() {
            return diff;
        }
        let out_edges = self.pfg.out_edges_of(pointer).collect_vec();
        for (target, kind) in out_edges {
            let forwarded = self.filtered(&diff, kind);
            self.add_work_delta(target, forwarded);
        }
        diff
    }

    /// Adds a pointer-flow edge; if it is new and the source already has
    /// points-to content, seeds that content across the edge.
    fn add_pfg_edge(&mut self, src: PointerId, dst: PointerId, kind: FlowKind) {
        if !self.pfg.add_edge(src, dst, kind) {
            return;
        }
        let src_pts = match self.pts.get(src.index()) {
            Some(pts) if !pts.is_empty() => pts.clone(),
            _ => return,
        };
        let forwarded = self.filtered(&src_pts, kind);
        self.add_work_delta(dst, forwarded);
    }

    /// Applies the edge's flow filter: only objects assignable to a cast
    /// edge's target type cross it.
    fn filtered(&self, objs: &P, kind: FlowKind) -> P {
        match kind {
            FlowKind::Cast(ty) => {
                let mut out = P::new();
                for cs_obj in objs.iter() {
                    let obj = self.csm.cs_obj(cs_obj).obj;
                    if self.program.is_assignable(self.heap.obj(obj).ty, ty) {
                        out.insert(cs_obj);
                    }
                }
                out
            }
            _ => objs.clone(),
        }
    }

    fn add_work_delta(&mut self, pointer: PointerId, objs: P) {
        if objs.is_empty() {
            return;
        }
        self.worklist.push_back(WorkItem::Delta { pointer, objs });
    }

    /// The heap context for an allocated object. Synthetic objects are
    /// context-free.
    fn heap_context(&mut self, alloc_ctx: ContextId, obj: ObjId) -> ContextId {
        if self.heap.obj(obj).is_synthetic() {
            return self.selector.empty_context_id();
        }
        let info = self.obj_info(alloc_ctx, obj);
        self.selector.select_heap_context(alloc_ctx, &info)
    }

    fn obj_info(&self, ctx: ContextId, obj: ObjId) -> ObjInfo {
        ObjInfo {
            obj,
            ctx,
            ty: self.heap.obj(obj).ty,
            container: self.heap.alloc_container(obj, self.program),
        }
    }

    fn pts_of_mut(&mut self, pointer: PointerId) -> &mut P {
        let idx = pointer.index();
        while self.pts.len() <= idx {
            self.pts.push(P::new());
        }
        &mut self.pts[idx]
    }
}
