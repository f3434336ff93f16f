// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The context-sensitive call graph, built incrementally as a side effect of
//! points-to propagation.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use petgraph::graph::{DefaultIx, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Graph;

use crate::cs::{CSCallSiteId, CSMethodId};
use crate::program::CallKind;

/// Unique identifiers for call graph nodes.
pub type CGNodeId = NodeIndex<DefaultIx>;
/// Unique identifiers for call graph edges.
pub type CGEdgeId = EdgeIndex<DefaultIx>;

#[derive(Debug)]
pub struct CallGraphNode {
    method: CSMethodId,
}

#[derive(Debug)]
pub struct CallGraphEdge {
    pub kind: CallKind,
    pub callsite: CSCallSiteId,
}

pub struct CallGraph {
    /// The graph structure capturing call relationships.
    graph: Graph<CallGraphNode, CallGraphEdge>,
    /// A map from methods to their corresponding call graph nodes.
    method_nodes: HashMap<CSMethodId, CGNodeId>,
    /// A map from call sites to call graph edges.
    callsite_edges: HashMap<CSCallSiteId, HashSet<CGEdgeId>>,
    /// Methods that have entered the reachable set. Insertion succeeds
    /// exactly once per method.
    reachable: HashSet<CSMethodId>,
}

impl CallGraph {
    pub fn new() -> Self {
        CallGraph {
            graph: Graph::new(),
            method_nodes: HashMap::new(),
            callsite_edges: HashMap::new(),
            reachable: HashSet::new(),
        }
    }

    /// Helper function to get a node or insert a new node if the method is
    /// not yet in the graph.
    fn get_or_insert_node(&mut self, method: CSMethodId) -> CGNodeId {
        match self.method_nodes.entry(method) {
            Entry::Occupied(o) => *o.get(),
            Entry::Vacant(v) => {
                let node_id = self.graph.add_node(CallGraphNode { method });
                *v.insert(node_id)
            }
        }
    }

    /// Marks `method` reachable. Returns true on the first (and only
    /// effective) transition.
    pub fn add_reachable(&mut self, method: CSMethodId) -> bool {
        if self.reachable.insert(method) {
            self.get_or_insert_node(method);
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn is_reachable(&self, method: CSMethodId) -> bool {
        self.reachable.contains(&method)
    }

    /// The callees already recorded for a call site.
    pub fn callees_of(&self, callsite: CSCallSiteId) -> HashSet<CSMethodId> {
        match self.callsite_edges.get(&callsite) {
            Some(edges) => edges
                .iter()
                .filter_map(|edge_id| {
                    let (_, target) = self.graph.edge_endpoints(*edge_id)?;
                    Some(self.graph[target].method)
                })
                .collect(),
            None => HashSet::new(),
        }
    }

    /// Adds a call edge. Returns false if an edge to `callee` already exists
    /// for this call site.
    pub fn add_edge(
        &mut self,
        kind: CallKind,
        callsite: CSCallSiteId,
        caller: CSMethodId,
        callee: CSMethodId,
    ) -> bool {
        if self.callees_of(callsite).contains(&callee) {
            return false;
        }
        let caller_node = self.get_or_insert_node(caller);
        let callee_node = self.get_or_insert_node(callee);
        let edge_id = self
            .graph
            .add_edge(caller_node, callee_node, CallGraphEdge { kind, callsite });
        self.callsite_edges
            .entry(callsite)
            .or_default()
            .insert(edge_id);
        true
    }

    pub fn reachable_methods(&self) -> impl Iterator<Item = CSMethodId> + '_ {
        self.reachable.iter().copied()
    }

    #[inline]
    pub fn reachable_count(&self) -> usize {
        self.reachable.len()
    }

    /// Every call edge, as (caller, callee, kind, call site).
    pub fn edge_iter(
        &self,
    ) -> impl Iterator<Item = (CSMethodId, CSMethodId, CallKind, CSCallSiteId)> + '_ {
        self.graph.edge_references().map(|edge| {
            (
                self.graph[edge.source()].method,
                self.graph[edge.target()].method,
                edge.weight().kind,
                edge.weight().callsite,
            )
        })
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl Default for CallGraph {
    fn default() -> Self {
        Self::new()
    }
}
