// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The worklist-driven fixed-point solver, interleaving points-to
//! propagation with on-the-fly call-graph construction.

use thiserror::Error;

use crate::cs::{CSMethodId, PointerId};
use crate::heap::ObjId;
use crate::program::{CallSiteId, MethodId, TypeId};

pub mod entry_point;
pub mod result;
#[allow(clippy::module_inception)]
pub mod solver;

pub use entry_point::{EntryPoint, SpecifiedEntryPoint};
pub use result::PointerAnalysisResult;
pub use solver::Solver;

/// Fatal solve failures. Recoverable resolution failures never surface
/// here; they become [`Diagnostic`]s on the result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    #[error("no entry points configured; refusing to run")]
    NoEntryPoints,
    #[error("step budget of {budget} exhausted after {steps} work units; the partial result is unsound and has been discarded")]
    StepBudgetExhausted { budget: usize, steps: usize },
}

#[derive(Clone, Debug, Default)]
pub struct SolverOptions {
    /// Cap on processed work units. `None` runs to the fixed point.
    pub max_steps: Option<usize>,
}

/// One unit of pending work. Statement processing for newly reachable
/// methods and delta propagation share a single queue, so the mutually
/// recursive call-graph/points-to computation cannot desynchronize.
pub(crate) enum WorkItem<P> {
    /// A context-qualified method entered the reachable set.
    Reachable(CSMethodId),
    /// Newly discovered objects for a pointer.
    Delta { pointer: PointerId, objs: P },
}

/// A recoverable failure observed during the solve. The solver skips the
/// affected dispatch/binding and records the occurrence; formatting and
/// aggregation are the consuming driver's concern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// A virtual/interface call had no concrete target for a receiver type.
    UnresolvedDispatch {
        site: CallSiteId,
        recv_obj: ObjId,
        recv_ty: TypeId,
    },
    /// A static/special method reference did not resolve.
    UnresolvedRef { site: CallSiteId },
    /// A resolved callee disagrees with the call site about arity; the
    /// matching prefix of arguments was still bound.
    ArityMismatch { site: CallSiteId, callee: MethodId },
}
