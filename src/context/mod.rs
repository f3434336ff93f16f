// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Calling/allocation contexts: immutable element sequences compared by
//! value, interned to dense [`ContextId`]s. Which element kind a run uses is
//! determined by the active [`selector::ContextSelector`]; contexts of
//! different selectors are never mixed in one run.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result};
use std::hash::Hash;
use std::rc::Rc;

use crate::heap::ObjId;
use crate::new_index;
use crate::program::{CallSiteId, ClassId};

pub mod selector;

pub use selector::{
    ContextInsensitive, ContextSelector, KCallSiteSensitive, KObjectSensitive, KTypeSensitive,
};

new_index! {
    /// The unique identifier for each context.
    pub struct ContextId
}

pub trait ContextElement: Clone + Eq + PartialEq + Debug + Hash {}

/// A context: the most recent elements of a calling/allocation history,
/// newest first.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Context<E: ContextElement> {
    elems: Vec<E>,
}

impl<E: ContextElement> Debug for Context<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.elems.fmt(f)
    }
}

impl<E: ContextElement> Context<E> {
    pub fn new_empty() -> Rc<Self> {
        Rc::new(Context { elems: Vec::new() })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn elems(&self) -> &[E] {
        &self.elems
    }

    /// Compose a new context by pushing `elem` onto `old_ctx`, keeping at
    /// most `k` elements (the oldest are discarded).
    pub fn new_k_limited(old_ctx: &Rc<Context<E>>, elem: E, k: usize) -> Rc<Self> {
        let mut elems = Vec::with_capacity(k);
        if k > 0 {
            elems.push(elem);
            if old_ctx.len() < k {
                elems.extend_from_slice(&old_ctx.elems);
            } else {
                elems.extend_from_slice(&old_ctx.elems[..k - 1]);
            }
        }
        Rc::new(Context { elems })
    }

    /// Truncate `ctx` to its `k` newest elements.
    pub fn k_limited(ctx: &Rc<Context<E>>, k: usize) -> Rc<Self> {
        if ctx.len() <= k {
            ctx.clone()
        } else {
            Rc::new(Context {
                elems: ctx.elems[..k].to_vec(),
            })
        }
    }
}

/// Interns contexts so that equal contexts share one [`ContextId`]. The id
/// for the empty context is allocated first and is therefore stable.
#[derive(Debug)]
pub struct ContextCache<E: ContextElement> {
    contexts: Vec<Rc<Context<E>>>,
    index_map: HashMap<Rc<Context<E>>, ContextId>,
}

impl<E: ContextElement> Default for ContextCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ContextElement> ContextCache<E> {
    pub fn new() -> ContextCache<E> {
        ContextCache {
            contexts: Vec::new(),
            index_map: HashMap::new(),
        }
    }

    pub fn get_context_id(&mut self, context: &Rc<Context<E>>) -> ContextId {
        if let Some(id) = self.index_map.get(context) {
            *id
        } else {
            let id = ContextId::new(self.contexts.len());
            self.contexts.push(context.clone());
            self.index_map.insert(context.clone(), id);
            id
        }
    }

    pub fn get_context(&self, id: ContextId) -> Option<Rc<Context<E>>> {
        self.contexts.get(id.index()).cloned()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

// The context element kinds selectors compose from.
impl ContextElement for CallSiteId {}

impl ContextElement for ObjId {}

impl ContextElement for ClassId {}

#[cfg(test)]
mod test {
    use super::{Context, ContextCache, ContextElement};

    impl ContextElement for u32 {}

    #[test]
    fn k_limited_composition() {
        let empty = Context::<u32>::new_empty();
        let c1 = Context::new_k_limited(&empty, 1, 2);
        let c2 = Context::new_k_limited(&c1, 2, 2);
        let c3 = Context::new_k_limited(&c2, 3, 2);
        assert_eq!(c3.elems(), &[3, 2]);

        let truncated = Context::k_limited(&c3, 1);
        assert_eq!(truncated.elems(), &[3]);

        let zero = Context::new_k_limited(&c3, 4, 0);
        assert!(zero.is_empty());
    }

    #[test]
    fn cache_interns_by_value() {
        let mut cache = ContextCache::<u32>::new();
        let empty = Context::new_empty();
        let a = Context::new_k_limited(&empty, 7, 2);
        let b = Context::new_k_limited(&empty, 7, 2);
        let id_a = cache.get_context_id(&a);
        let id_b = cache.get_context_id(&b);
        assert_eq!(id_a, id_b);
        assert_eq!(cache.get_context(id_a).unwrap().elems(), &[7]);
    }
}
