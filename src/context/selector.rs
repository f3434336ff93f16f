// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Pluggable context-sensitivity policies. The solver is generic over
//! [`ContextSelector`] and runs unchanged whichever policy is active; each
//! selector owns its own [`ContextCache`] so element kinds never mix.

use std::rc::Rc;

use crate::context::{Context, ContextCache, ContextElement, ContextId};
use crate::heap::ObjId;
use crate::program::{CallSiteId, ClassId, MethodId, TypeId};

/// What a selector gets to know about a context-qualified object: the
/// receiver of an instance call, or the object being allocated.
#[derive(Clone, Debug)]
pub struct ObjInfo {
    pub obj: ObjId,
    /// The context qualifying the object: its heap context when it is a
    /// receiver, the allocating method's context during heap-context
    /// selection.
    pub ctx: ContextId,
    pub ty: TypeId,
    /// The class containing the object's allocation, if known.
    pub container: Option<ClassId>,
}

pub trait ContextSelector {
    type E: ContextElement;

    /// The designated initial context, used for entry points.
    fn empty_context_id(&mut self) -> ContextId;

    /// Context for the callee of a static/special call.
    fn select_call_context(
        &mut self,
        caller_ctx: ContextId,
        site: CallSiteId,
        callee: MethodId,
    ) -> ContextId;

    /// Context for the callee of a virtual/interface call dispatched on
    /// receiver object `recv`.
    fn select_instance_context(
        &mut self,
        caller_ctx: ContextId,
        site: CallSiteId,
        recv: &ObjInfo,
        callee: MethodId,
    ) -> ContextId;

    /// Heap context for an object allocated under `alloc_ctx`.
    fn select_heap_context(&mut self, alloc_ctx: ContextId, obj: &ObjInfo) -> ContextId;
}

/// The trivial policy: one context for everything.
pub struct ContextInsensitive;

impl ContextSelector for ContextInsensitive {
    type E = CallSiteId;

    fn empty_context_id(&mut self) -> ContextId {
        ContextId::new(0)
    }

    fn select_call_context(
        &mut self,
        _caller_ctx: ContextId,
        _site: CallSiteId,
        _callee: MethodId,
    ) -> ContextId {
        ContextId::new(0)
    }

    fn select_instance_context(
        &mut self,
        _caller_ctx: ContextId,
        _site: CallSiteId,
        _recv: &ObjInfo,
        _callee: MethodId,
    ) -> ContextId {
        ContextId::new(0)
    }

    fn select_heap_context(&mut self, _alloc_ctx: ContextId, _obj: &ObjInfo) -> ContextId {
        ContextId::new(0)
    }
}

/// k-limited call-site sensitivity: method contexts are the k newest call
/// sites on the abstract call stack, heap contexts keep k-1 of them.
pub struct KCallSiteSensitive {
    k: usize,
    cache: ContextCache<CallSiteId>,
}

impl KCallSiteSensitive {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            cache: ContextCache::new(),
        }
    }

    fn context_of(&self, id: ContextId) -> Rc<Context<CallSiteId>> {
        self.cache.get_context(id).unwrap_or(Context::new_empty())
    }
}

impl ContextSelector for KCallSiteSensitive {
    type E = CallSiteId;

    fn empty_context_id(&mut self) -> ContextId {
        self.cache.get_context_id(&Context::new_empty())
    }

    fn select_call_context(
        &mut self,
        caller_ctx: ContextId,
        site: CallSiteId,
        _callee: MethodId,
    ) -> ContextId {
        let caller = self.context_of(caller_ctx);
        let callee_ctx = Context::new_k_limited(&caller, site, self.k);
        self.cache.get_context_id(&callee_ctx)
    }

    fn select_instance_context(
        &mut self,
        caller_ctx: ContextId,
        site: CallSiteId,
        _recv: &ObjInfo,
        callee: MethodId,
    ) -> ContextId {
        self.select_call_context(caller_ctx, site, callee)
    }

    fn select_heap_context(&mut self, alloc_ctx: ContextId, _obj: &ObjInfo) -> ContextId {
        let ctx = self.context_of(alloc_ctx);
        let heap_ctx = Context::k_limited(&ctx, self.k.saturating_sub(1));
        self.cache.get_context_id(&heap_ctx)
    }
}

/// k-limited object sensitivity: instance calls are qualified by the k
/// newest receiver allocation sites; static calls inherit the caller
/// context.
pub struct KObjectSensitive {
    k: usize,
    cache: ContextCache<ObjId>,
}

impl KObjectSensitive {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            cache: ContextCache::new(),
        }
    }

    fn context_of(&self, id: ContextId) -> Rc<Context<ObjId>> {
        self.cache.get_context(id).unwrap_or(Context::new_empty())
    }
}

impl ContextSelector for KObjectSensitive {
    type E = ObjId;

    fn empty_context_id(&mut self) -> ContextId {
        self.cache.get_context_id(&Context::new_empty())
    }

    fn select_call_context(
        &mut self,
        caller_ctx: ContextId,
        _site: CallSiteId,
        _callee: MethodId,
    ) -> ContextId {
        caller_ctx
    }

    fn select_instance_context(
        &mut self,
        _caller_ctx: ContextId,
        _site: CallSiteId,
        recv: &ObjInfo,
        _callee: MethodId,
    ) -> ContextId {
        let recv_ctx = self.context_of(recv.ctx);
        let callee_ctx = Context::new_k_limited(&recv_ctx, recv.obj, self.k);
        self.cache.get_context_id(&callee_ctx)
    }

    fn select_heap_context(&mut self, alloc_ctx: ContextId, _obj: &ObjInfo) -> ContextId {
        let ctx = self.context_of(alloc_ctx);
        let heap_ctx = Context::k_limited(&ctx, self.k.saturating_sub(1));
        self.cache.get_context_id(&heap_ctx)
    }
}

/// k-limited type sensitivity: like object sensitivity, but the context
/// element is the class containing the receiver's allocation, trading
/// precision for fewer contexts.
pub struct KTypeSensitive {
    k: usize,
    cache: ContextCache<ClassId>,
}

impl KTypeSensitive {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            cache: ContextCache::new(),
        }
    }

    fn context_of(&self, id: ContextId) -> Rc<Context<ClassId>> {
        self.cache.get_context(id).unwrap_or(Context::new_empty())
    }
}

impl ContextSelector for KTypeSensitive {
    type E = ClassId;

    fn empty_context_id(&mut self) -> ContextId {
        self.cache.get_context_id(&Context::new_empty())
    }

    fn select_call_context(
        &mut self,
        caller_ctx: ContextId,
        _site: CallSiteId,
        _callee: MethodId,
    ) -> ContextId {
        caller_ctx
    }

    fn select_instance_context(
        &mut self,
        _caller_ctx: ContextId,
        _site: CallSiteId,
        recv: &ObjInfo,
        _callee: MethodId,
    ) -> ContextId {
        let recv_ctx = self.context_of(recv.ctx);
        match recv.container {
            Some(container) => {
                let callee_ctx = Context::new_k_limited(&recv_ctx, container, self.k);
                self.cache.get_context_id(&callee_ctx)
            }
            // No containing class (array allocations): keep the receiver's
            // context rather than inventing an element.
            None => {
                let callee_ctx = Context::k_limited(&recv_ctx, self.k);
                self.cache.get_context_id(&callee_ctx)
            }
        }
    }

    fn select_heap_context(&mut self, alloc_ctx: ContextId, _obj: &ObjInfo) -> ContextId {
        let ctx = self.context_of(alloc_ctx);
        let heap_ctx = Context::k_limited(&ctx, self.k.saturating_sub(1));
        self.cache.get_context_id(&heap_ctx)
    }
}
