// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The pointer flow graph: directed data-flow edges between pointers, driving
//! points-to propagation.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use petgraph::graph::{DefaultIx, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Graph;

use crate::cs::PointerId;
use crate::program::TypeId;

// Unique identifiers for graph nodes and edges.
pub type PFGNodeId = NodeIndex<DefaultIx>;
pub type PFGEdgeId = EdgeIndex<DefaultIx>;

/// The data-flow kinds an edge can model. A `Cast` edge carries its target
/// type; objects not assignable to it are filtered out during propagation,
/// never at edge-creation time.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum FlowKind {
    LocalAssign,
    Cast(TypeId),
    InstanceLoad,
    InstanceStore,
    ArrayLoad,
    ArrayStore,
    StaticLoad,
    StaticStore,
}

pub struct PFGNode {
    pointer: PointerId,
}

pub struct PFGEdge {
    pub kind: FlowKind,
}

pub struct PointerFlowGraph {
    /// The graph structure capturing flow relations between pointers.
    graph: Graph<PFGNode, PFGEdge>,
    /// A map from pointers to node ids.
    nodes: HashMap<PointerId, PFGNodeId>,
}

impl PointerFlowGraph {
    pub fn new() -> Self {
        PointerFlowGraph {
            graph: Graph::new(),
            nodes: HashMap::new(),
        }
    }

    /// Helper function to get a node or insert a new node if the pointer has
    /// not been seen yet.
    pub fn get_or_insert_node(&mut self, pointer: PointerId) -> PFGNodeId {
        match self.nodes.entry(pointer) {
            Entry::Occupied(o) => *o.get(),
            Entry::Vacant(v) => {
                let node_id = self.graph.add_node(PFGNode { pointer });
                *v.insert(node_id)
            }
        }
    }

    /// Returns true if the edge from `src` to `dst` of the `kind` exists.
    fn contains_edge(&self, src: PFGNodeId, dst: PFGNodeId, kind: FlowKind) -> bool {
        self.graph
            .edges_connecting(src, dst)
            .any(|edge| edge.weight().kind == kind)
    }

    /// Adds an edge from `src` to `dst`. Returns whether the edge is new;
    /// redundant insertion is a cheap no-op.
    pub fn add_edge(&mut self, src: PointerId, dst: PointerId, kind: FlowKind) -> bool {
        let src_id = self.get_or_insert_node(src);
        let dst_id = self.get_or_insert_node(dst);
        if self.contains_edge(src_id, dst_id, kind) {
            return false;
        }
        self.graph.add_edge(src_id, dst_id, PFGEdge { kind });
        true
    }

    /// The successor edges of `pointer`, empty if it has none.
    pub fn out_edges_of(&self, pointer: PointerId) -> impl Iterator<Item = (PointerId, FlowKind)> + '_ {
        self.nodes
            .get(&pointer)
            .copied()
            .into_iter()
            .flat_map(move |node_id| {
                self.graph
                    .edges(node_id)
                    .map(|edge| (self.graph[edge.target()].pointer, edge.weight().kind))
            })
    }

    /// Every pointer that appears in the graph.
    pub fn pointer_iter(&self) -> impl Iterator<Item = PointerId> + '_ {
        self.nodes.keys().copied()
    }

    /// Every edge, as (source pointer, target pointer, kind).
    pub fn edge_iter(&self) -> impl Iterator<Item = (PointerId, PointerId, FlowKind)> + '_ {
        self.graph.edge_references().map(|edge| {
            (
                self.graph[edge.source()].pointer,
                self.graph[edge.target()].pointer,
                edge.weight().kind,
            )
        })
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl Default for PointerFlowGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::{FlowKind, PointerFlowGraph};
    use crate::cs::PointerId;
    use crate::program::TypeId;

    #[test]
    fn edge_insertion_is_idempotent() {
        let mut pfg = PointerFlowGraph::new();
        let p = PointerId::new(0);
        let q = PointerId::new(1);

        assert!(pfg.add_edge(p, q, FlowKind::LocalAssign));
        assert!(!pfg.add_edge(p, q, FlowKind::LocalAssign));
        assert_eq!(pfg.edge_count(), 1);

        // A different kind between the same endpoints is a distinct edge.
        assert!(pfg.add_edge(p, q, FlowKind::InstanceLoad));
        // Cast edges are distinguished by their target type.
        assert!(pfg.add_edge(p, q, FlowKind::Cast(TypeId::new(0))));
        assert!(pfg.add_edge(p, q, FlowKind::Cast(TypeId::new(1))));
        assert!(!pfg.add_edge(p, q, FlowKind::Cast(TypeId::new(0))));
        assert_eq!(pfg.edge_count(), 4);
    }

    #[test]
    fn out_edges_of_unknown_pointer_is_empty() {
        let pfg = PointerFlowGraph::new();
        assert_eq!(pfg.out_edges_of(PointerId::new(5)).count(), 0);
    }
}
