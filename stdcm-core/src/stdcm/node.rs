//! Search nodes and edges, stored in an append-only arena.
//!
//! Each edge points back at the node it leaves from and each node at the
//! edge that reached it. Nothing is mutated once pushed, so these links
//! always form finite chains ending at a departure edge.

use super::explorer::ExplorerHandle;
use crate::domain::{BlockId, Distance};
use crate::envelope::Envelope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub(crate) u32);

/// A point of the search space: a position at a given time and speed.
#[derive(Debug, Clone)]
pub struct Node {
    /// Absolute time, departure shift included.
    pub time: f64,

    /// Running time since departure, stops included.
    pub time_since_departure: f64,

    pub speed: f64,

    /// Index of the last step satisfied. The origin is satisfied from the start.
    pub waypoint_index: usize,

    pub block: BlockId,
    pub offset: Distance,

    /// Departure shift accumulated along the chain.
    pub total_prev_added_delay: f64,

    /// How much more the departure may still be shifted.
    pub maximum_added_delay: f64,

    /// Lower bound on the running time left.
    pub remaining_time_estimation: f64,

    pub previous_edge: EdgeId,
}

/// The traversal of one block, or part of one, under one timing hypothesis.
#[derive(Debug, Clone)]
pub struct Edge {
    pub block: BlockId,
    pub explorer: ExplorerHandle,

    /// Envelope of the traversed portion, without allowance.
    pub envelope: Envelope,

    pub start_offset: Distance,
    pub end_offset: Distance,

    /// Absolute time at which the edge starts, added delay included.
    pub time_start: f64,

    /// Running time over the edge, allowances included.
    pub duration: f64,

    /// Part of `duration` added by slowing the train down to reach a later
    /// opening downstream. Spread evenly over the running time.
    pub engineering_allowance: f64,

    /// Step at which the edge ends with a stop.
    pub stop_step: Option<usize>,

    /// Time spent stopped at the end of the edge.
    pub stop_duration: f64,

    /// Departure shift accumulated up to this edge, inclusive.
    pub total_departure_shift: f64,

    /// How much more the departure may be shifted after this edge.
    pub maximum_added_delay_after: f64,

    pub previous_node: Option<NodeId>,

    /// Index of the last step satisfied at the end of the edge.
    pub waypoint_index: usize,

    /// Running time since departure at the end of the edge, stop included.
    pub time_since_departure_end: f64,

    pub remaining_time_estimation: f64,
}

impl Edge {
    pub fn length(&self) -> Distance {
        self.end_offset - self.start_offset
    }

    /// Absolute time at which the train leaves the edge.
    pub fn time_end(&self) -> f64 {
        self.time_start + self.duration + self.stop_duration
    }
}

/// Owner of every node and edge of one search.
#[derive(Debug, Default)]
pub struct SearchArena {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl SearchArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() as u32 - 1)
    }

    pub fn push_edge(&mut self, edge: Edge) -> EdgeId {
        self.edges.push(edge);
        EdgeId(self.edges.len() as u32 - 1)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0 as usize]
    }

    #[cfg(test)]
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Node the edge leaving from `id` came from, if any.
    #[cfg(test)]
    pub fn previous_node(&self, id: NodeId) -> Option<NodeId> {
        self.edge(self.node(id).previous_edge).previous_node
    }

    /// Edges leading to `id`, from the departure edge on.
    pub fn edge_chain(&self, id: NodeId) -> Vec<EdgeId> {
        let mut chain = Vec::new();
        let mut edge_id = self.node(id).previous_edge;
        loop {
            chain.push(edge_id);
            match self.edge(edge_id).previous_node {
                Some(prev) => edge_id = self.node(prev).previous_edge,
                None => break,
            }
        }
        chain.reverse();
        chain
    }
}
