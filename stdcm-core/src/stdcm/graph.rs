//! The search graph.
//!
//! Nodes and edges are built on demand: the pathfinder only ever asks for
//! the edges leaving a node it pops.

use tracing::trace;

use super::delay::DelayManager;
use super::edge_builder::EdgeStart;
use super::explorer::{ExplorerHandle, InfraExplorer};
use super::heuristic::RemainingTimeEstimator;
use super::node::{Edge, EdgeId, Node, NodeId, SearchArena};
use super::visited::VisitedEdges;
use super::{StdcmConfig, StdcmError, StdcmRequest};
use crate::availability::BlockAvailability;
use crate::domain::Distance;
use crate::envelope::EnvelopeEngine;
use crate::infra::Infra;

fn braking_lookahead(infra: &Infra, request: &StdcmRequest) -> Distance {
    let stock = &request.rolling_stock;
    stock.braking_distance(stock.max_speed.min(infra.max_line_speed()))
}

/// Graph state of one search.
pub struct StdcmGraph<'a, A: BlockAvailability, E: EnvelopeEngine> {
    pub(super) infra: &'a Infra,
    pub(super) request: &'a StdcmRequest,
    pub(super) config: &'a StdcmConfig,
    pub(super) engine: &'a E,
    pub(super) delays: DelayManager<'a, A>,
    pub(super) explorer: InfraExplorer<'a>,
    pub(super) estimator: RemainingTimeEstimator,
    pub(super) visited: VisitedEdges,
    pub(super) arena: SearchArena,
    /// Distance the train needs to brake from its top speed on this infra.
    /// Lookaheads are at least that long, so that every edge anticipates
    /// the braking for what comes after it.
    pub(super) lookahead_distance: Distance,
}

impl<'a, A: BlockAvailability, E: EnvelopeEngine> StdcmGraph<'a, A, E> {
    pub fn new(
        infra: &'a Infra,
        request: &'a StdcmRequest,
        config: &'a StdcmConfig,
        availability: &'a A,
        engine: &'a E,
        explorer: InfraExplorer<'a>,
    ) -> Self {
        Self {
            infra,
            request,
            config,
            engine,
            delays: DelayManager::new(availability, config.max_openings),
            explorer,
            estimator: RemainingTimeEstimator::new(infra, request),
            visited: VisitedEdges::new(config.visited_bucket().num_milliseconds() as f64 / 1000.0),
            arena: SearchArena::new(),
            lookahead_distance: braking_lookahead(infra, request),
        }
    }

    pub fn arena(&self) -> &SearchArena {
        &self.arena
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.arena.node(id)
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        self.arena.edge(id)
    }

    /// Edges leaving every location of the origin at the earliest departure.
    pub fn departure_edges(&mut self) -> Result<Vec<EdgeId>, StdcmError> {
        let request = self.request;
        let mut edges = Vec::new();
        for location in request.steps.first().map_or(&[][..], |s| &s.locations[..]) {
            let root = self.explorer.start(location.block);
            let start = EdgeStart::departure(request, location.offset);
            let handles =
                self.explorer
                    .extend_until(root, self.config.lookahead_blocks, self.lookahead_distance);
            for handle in handles {
                edges.extend(self.build_edges(&start, handle)?);
            }
        }
        Ok(edges)
    }

    /// Edges leaving a node.
    ///
    /// A node inside a block (after a stop) continues on the same block;
    /// a node at the end of a block moves on to every possible next block.
    pub fn adjacent_edges(&mut self, id: NodeId) -> Result<Vec<EdgeId>, StdcmError> {
        let node = self.arena.node(id).clone();
        let handle = self.arena.edge(node.previous_edge).explorer;
        let length = self.infra.block(node.block).length;

        let (handles, offset) = if node.offset < length {
            (vec![handle], node.offset)
        } else {
            (self.next_blocks(handle), Distance::ZERO)
        };

        let start = EdgeStart::from_node(id, &node, offset);
        let mut edges = Vec::new();
        for handle in handles {
            edges.extend(self.build_edges(&start, handle)?);
        }
        trace!(node = id.0, edges = edges.len(), "expanded node");
        Ok(edges)
    }

    fn next_blocks(&mut self, handle: ExplorerHandle) -> Vec<ExplorerHandle> {
        let extended = if handle.ahead() == 0 {
            self.explorer.extend(handle)
        } else {
            vec![handle]
        };
        let mut handles = Vec::new();
        for candidate in extended {
            if let Some(next) = self.explorer.move_forward(candidate) {
                handles.extend(
                    self.explorer.extend_until(
                        next,
                        self.config.lookahead_blocks,
                        self.lookahead_distance,
                    ),
                );
            }
        }
        handles
    }

    /// Create the node at the end of an edge.
    pub fn edge_end(&mut self, id: EdgeId) -> NodeId {
        let edge = self.arena.edge(id);
        let node = Node {
            time: edge.time_end(),
            time_since_departure: edge.time_since_departure_end,
            speed: edge.envelope.end_speed(),
            waypoint_index: edge.waypoint_index,
            block: edge.block,
            offset: edge.end_offset,
            total_prev_added_delay: edge.total_departure_shift,
            maximum_added_delay: edge.maximum_added_delay_after,
            remaining_time_estimation: edge.remaining_time_estimation,
            previous_edge: id,
        };
        self.arena.push_node(node)
    }
}
