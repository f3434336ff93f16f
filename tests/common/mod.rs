// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Shared helpers for the end-to-end solver tests.

#![allow(dead_code)]

use cspta::context::selector::ContextSelector;
use cspta::context::ContextId;
use cspta::cs::CSObjId;
use cspta::heap::HeapModel;
use cspta::program::Program;
use cspta::pts::PointsToSet;
use cspta::solver::{PointerAnalysisResult, Solver, SpecifiedEntryPoint};

/// The designated initial context. Every selector interns the empty context
/// first, so its id is stable.
pub fn empty_ctx() -> ContextId {
    ContextId::new(0)
}

/// Builds a solver over `program`, seeds it with `entry_points` and solves.
pub fn solve_with<S, P>(
    program: &Program,
    heap: HeapModel,
    selector: S,
    entry_points: Vec<SpecifiedEntryPoint>,
) -> PointerAnalysisResult<P>
where
    S: ContextSelector,
    P: PointsToSet<CSObjId>,
{
    let mut solver: Solver<'_, S, P> = Solver::new(program, heap, selector);
    for ep in entry_points {
        solver.add_entry_point(Box::new(ep));
    }
    solver.solve().expect("solve failed")
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
