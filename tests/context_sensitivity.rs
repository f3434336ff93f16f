// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The solver core must run unchanged under every context selector, and the
//! selectors must make their characteristic precision trade-offs: call-site
//! strings split static calls, object contexts split per-receiver state,
//! the insensitive selector merges everything.

mod common;

use std::collections::HashSet;

use common::{empty_ctx, solve_with};
use cspta::context::selector::ContextSelector;
use cspta::context::{ContextInsensitive, KCallSiteSensitive, KObjectSensitive, KTypeSensitive};
use cspta::cs::CSObjId;
use cspta::heap::{HeapModel, ObjId};
use cspta::program::{AllocSiteId, CallKind, MethodId, Program, ProgramBuilder, VarId};
use cspta::pts::{HashPointsToSet, HybridPointsToSet, PointsToSet};
use cspta::solver::SpecifiedEntryPoint;

/// `id(v) { return v; }` called from two sites with different objects.
struct IdProgram {
    program: Program,
    main: MethodId,
    r1: VarId,
    r2: VarId,
}

fn id_program() -> IdProgram {
    let mut b = ProgramBuilder::new();
    let object = b.add_class("Object", None);
    let main_class = b.add_class("Main", Some(object));
    let a = b.add_class("A", Some(object));
    let t_object = b.class_type(object);
    let t_a = b.class_type(a);

    let id = b.add_static_method(main_class, "id", "(Object)");
    let mut id_body = b.body(id);
    let v = id_body.var("v", t_object);
    id_body.add_param(v);
    id_body.add_ret(v);
    id_body.finish();

    let main = b.add_static_method(main_class, "main", "()");
    let id_ref = b.method_ref(main_class, "id", "(Object)");
    let mut body = b.body(main);
    let x1 = body.var("x1", t_a);
    let x2 = body.var("x2", t_a);
    let r1 = body.var("r1", t_object);
    let r2 = body.var("r2", t_object);
    body.alloc(x1, t_a);
    body.alloc(x2, t_a);
    body.invoke(CallKind::Static, id_ref.clone(), None, vec![x1], Some(r1));
    body.invoke(CallKind::Static, id_ref, None, vec![x2], Some(r2));
    body.finish();

    IdProgram {
        program: b.finish(),
        main,
        r1,
        r2,
    }
}

#[test]
fn insensitive_merges_call_sites() {
    common::init_logger();
    let fixture = id_program();
    let result = solve_with::<_, HybridPointsToSet<CSObjId>>(
        &fixture.program,
        HeapModel::new(),
        ContextInsensitive,
        vec![SpecifiedEntryPoint::bare(fixture.main)],
    );
    // Both objects conflate through the one copy of `id`.
    assert_eq!(result.var_objs(empty_ctx(), fixture.r1).len(), 2);
    assert_eq!(result.var_objs(empty_ctx(), fixture.r2).len(), 2);
}

#[test]
fn call_site_sensitivity_splits_call_sites() {
    common::init_logger();
    let fixture = id_program();
    let result = solve_with::<_, HashPointsToSet<CSObjId>>(
        &fixture.program,
        HeapModel::new(),
        KCallSiteSensitive::new(1),
        vec![SpecifiedEntryPoint::bare(fixture.main)],
    );
    let r1 = result.var_objs(empty_ctx(), fixture.r1);
    let r2 = result.var_objs(empty_ctx(), fixture.r2);
    assert_eq!(r1.len(), 1);
    assert_eq!(r2.len(), 1);
    assert_ne!(r1, r2);
}

/// Two boxes with a field set through virtual calls; reads go through
/// virtual getters. The classic receiver-splitting benchmark.
struct BoxProgram {
    program: Program,
    main: MethodId,
    r1: VarId,
    r2: VarId,
    s_v1: AllocSiteId,
    s_v2: AllocSiteId,
}

fn box_program() -> BoxProgram {
    let mut b = ProgramBuilder::new();
    let object = b.add_class("Object", None);
    let main_class = b.add_class("Main", Some(object));
    let box_class = b.add_class("Box", Some(object));
    let a = b.add_class("A", Some(object));
    let t_object = b.class_type(object);
    let t_box = b.class_type(box_class);
    let t_a = b.class_type(a);
    let f = b.add_field(box_class, "f", t_object, false);

    // Box.set(v) { this.f = v; }
    let set = b.add_method(box_class, "set", "(Object)");
    let mut set_body = b.body(set);
    let set_this = set_body.var("this", t_box);
    let set_v = set_body.var("v", t_object);
    set_body.set_this(set_this);
    set_body.add_param(set_v);
    set_body.store_field(set_this, f, set_v);
    set_body.finish();

    // Box.get() { return this.f; }
    let get = b.add_method(box_class, "get", "()");
    let mut get_body = b.body(get);
    let get_this = get_body.var("this", t_box);
    let get_r = get_body.var("r", t_object);
    get_body.set_this(get_this);
    get_body.load_field(get_r, get_this, f);
    get_body.add_ret(get_r);
    get_body.finish();

    let main = b.add_static_method(main_class, "main", "()");
    let set_ref = b.method_ref(box_class, "set", "(Object)");
    let get_ref = b.method_ref(box_class, "get", "()");
    let mut body = b.body(main);
    let b1 = body.var("b1", t_box);
    let b2 = body.var("b2", t_box);
    let v1 = body.var("v1", t_a);
    let v2 = body.var("v2", t_a);
    let r1 = body.var("r1", t_object);
    let r2 = body.var("r2", t_object);
    body.alloc(b1, t_box);
    body.alloc(b2, t_box);
    let s_v1 = body.alloc(v1, t_a);
    let s_v2 = body.alloc(v2, t_a);
    body.invoke(CallKind::Virtual, set_ref.clone(), Some(b1), vec![v1], None);
    body.invoke(CallKind::Virtual, set_ref, Some(b2), vec![v2], None);
    body.invoke(CallKind::Virtual, get_ref.clone(), Some(b1), vec![], Some(r1));
    body.invoke(CallKind::Virtual, get_ref, Some(b2), vec![], Some(r2));
    body.finish();

    BoxProgram {
        program: b.finish(),
        main,
        r1,
        r2,
        s_v1,
        s_v2,
    }
}

fn solve_boxes<S, P>(fixture: &BoxProgram, selector: S) -> (Vec<ObjId>, Vec<ObjId>, ObjId, ObjId)
where
    S: ContextSelector,
    P: PointsToSet<CSObjId>,
{
    let result = solve_with::<S, P>(
        &fixture.program,
        HeapModel::new(),
        selector,
        vec![SpecifiedEntryPoint::bare(fixture.main)],
    );
    let o_v1 = result.heap().site_obj(fixture.s_v1).unwrap();
    let o_v2 = result.heap().site_obj(fixture.s_v2).unwrap();
    (
        result.var_objs(empty_ctx(), fixture.r1),
        result.var_objs(empty_ctx(), fixture.r2),
        o_v1,
        o_v2,
    )
}

#[test]
fn object_sensitivity_splits_receivers() {
    common::init_logger();
    let fixture = box_program();
    let (r1, r2, o_v1, o_v2) =
        solve_boxes::<_, HybridPointsToSet<CSObjId>>(&fixture, KObjectSensitive::new(1));
    assert_eq!(r1, vec![o_v1]);
    assert_eq!(r2, vec![o_v2]);
}

#[test]
fn insensitive_conflates_receivers() {
    common::init_logger();
    let fixture = box_program();
    let (r1, r2, o_v1, o_v2) =
        solve_boxes::<_, HybridPointsToSet<CSObjId>>(&fixture, ContextInsensitive);
    let both: HashSet<_> = [o_v1, o_v2].into();
    assert_eq!(r1.iter().copied().collect::<HashSet<_>>(), both);
    assert_eq!(r2.iter().copied().collect::<HashSet<_>>(), both);
}

/// Every selector/representation combination must stay sound on the same
/// program: each read sees at least the object stored through its box.
#[test]
fn all_variants_remain_sound() {
    common::init_logger();
    let fixture = box_program();

    let check = |(r1, r2, o_v1, o_v2): (Vec<ObjId>, Vec<ObjId>, ObjId, ObjId)| {
        assert!(r1.contains(&o_v1));
        assert!(r2.contains(&o_v2));
    };

    check(solve_boxes::<_, HybridPointsToSet<CSObjId>>(
        &fixture,
        ContextInsensitive,
    ));
    check(solve_boxes::<_, HashPointsToSet<CSObjId>>(
        &fixture,
        KCallSiteSensitive::new(2),
    ));
    check(solve_boxes::<_, HybridPointsToSet<CSObjId>>(
        &fixture,
        KObjectSensitive::new(2),
    ));
    check(solve_boxes::<_, HashPointsToSet<CSObjId>>(
        &fixture,
        KTypeSensitive::new(1),
    ));
}

/// Call-site sensitivity also splits the box program, since each `set` call
/// is a distinct site.
#[test]
fn call_site_sensitivity_splits_receivers_too() {
    common::init_logger();
    let fixture = box_program();
    let (r1, r2, o_v1, o_v2) =
        solve_boxes::<_, HashPointsToSet<CSObjId>>(&fixture, KCallSiteSensitive::new(1));
    assert_eq!(r1, vec![o_v1]);
    assert_eq!(r2, vec![o_v2]);
}
