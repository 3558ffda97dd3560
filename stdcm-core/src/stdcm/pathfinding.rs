//! Best-first search over the STDCM graph.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::explorer::InfraExplorer;
use super::graph::StdcmGraph;
use super::node::{Edge, NodeId};
use super::postprocessing::make_result;
use super::result::{PathWaypoint, StdcmResult};
use super::{StdcmConfig, StdcmError, StdcmRequest};
use crate::availability::BlockAvailability;
use crate::constraints::{ConstraintCombiner, init_constraints};
use crate::domain::{Distance, StdcmStep};
use crate::envelope::EnvelopeEngine;
use crate::infra::Infra;

/// Queue entry, ordered so that the binary heap pops the smallest
/// `time since departure + estimate` first, then the oldest entry.
#[derive(Debug)]
struct QueueEntry {
    key: f64,
    seq: u64,
    node: NodeId,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .key
            .total_cmp(&self.key)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue of nodes to expand.
#[derive(Debug, Default)]
struct NodeQueue {
    heap: BinaryHeap<QueueEntry>,
    seq: u64,
}

impl NodeQueue {
    fn push(&mut self, node: NodeId, key: f64) {
        self.heap.push(QueueEntry {
            key,
            seq: self.seq,
            node,
        });
        self.seq += 1;
    }

    fn pop(&mut self) -> Option<NodeId> {
        self.heap.pop().map(|e| e.node)
    }
}

/// STDCM planner.
pub struct StdcmPlanner<'a, A: BlockAvailability, E: EnvelopeEngine> {
    infra: &'a Infra,
    availability: &'a A,
    engine: &'a E,
    config: &'a StdcmConfig,
}

impl<'a, A: BlockAvailability, E: EnvelopeEngine> StdcmPlanner<'a, A, E> {
    /// Create a new planner.
    pub fn new(infra: &'a Infra, availability: &'a A, engine: &'a E, config: &'a StdcmConfig) -> Self {
        Self {
            infra,
            availability,
            engine,
            config,
        }
    }

    /// Search for a path.
    ///
    /// Returns `Ok(None)` when no path fits, and [`StdcmError::Timeout`]
    /// when the search ran out of wall-clock time before deciding.
    pub fn search(&self, request: &StdcmRequest) -> Result<Option<StdcmResult>, StdcmError> {
        request.validate(self.infra)?;
        let timeout = request.timeout()?;
        let started = Instant::now();

        info!(
            steps = request.steps.len(),
            start_time = request.start_time,
            max_departure_delay = request.max_departure_delay,
            max_run_time = request.max_run_time,
            "starting stdcm search"
        );

        let constraints = init_constraints(self.infra, &request.rolling_stock);
        let mut graph = self.graph(request, &constraints);
        let found = find_path(&mut graph, request, started, timeout)?;

        let Some(id) = found else {
            info!(
                nodes = graph.arena().node_count(),
                elapsed = ?started.elapsed(),
                "no path found"
            );
            return Ok(None);
        };

        let chain: Vec<&Edge> = graph
            .arena()
            .edge_chain(id)
            .into_iter()
            .map(|e| graph.edge(e))
            .collect();
        let waypoints = make_waypoints(&request.steps, &chain);
        let result = make_result(self.infra, request, self.engine, self.availability, &chain, waypoints)?;

        info!(
            nodes = graph.arena().node_count(),
            edges = chain.len(),
            departure = result.departure_time,
            run_time = result.run_time,
            elapsed = ?started.elapsed(),
            "path found"
        );
        Ok(Some(result))
    }

    fn graph<'g>(
        &'g self,
        request: &'g StdcmRequest,
        constraints: &'g ConstraintCombiner<'g>,
    ) -> StdcmGraph<'g, A, E> {
        let explorer = InfraExplorer::new(self.infra, constraints);
        StdcmGraph::new(
            self.infra,
            request,
            self.config,
            self.availability,
            self.engine,
            explorer,
        )
    }

    /// Run the search without post-processing and hand the explored graph
    /// and terminal node to `inspect`.
    #[cfg(test)]
    pub(super) fn explore<R>(
        &self,
        request: &StdcmRequest,
        inspect: impl FnOnce(&StdcmGraph<'_, A, E>, Option<NodeId>) -> R,
    ) -> Result<R, StdcmError> {
        request.validate(self.infra)?;
        let constraints = init_constraints(self.infra, &request.rolling_stock);
        let mut graph = self.graph(request, &constraints);
        let found = find_path(&mut graph, request, Instant::now(), request.timeout()?)?;
        Ok(inspect(&graph, found))
    }
}

/// The search loop. Returns the first terminal node popped.
fn find_path<A: BlockAvailability, E: EnvelopeEngine>(
    graph: &mut StdcmGraph<'_, A, E>,
    request: &StdcmRequest,
    started: Instant,
    timeout: Duration,
) -> Result<Option<NodeId>, StdcmError> {
    let mut queue = NodeQueue::default();
    for edge in graph.departure_edges()? {
        let node = graph.edge_end(edge);
        queue.push(node, priority(graph, node));
    }

    let last_step = request.last_step();
    let mut expanded = 0usize;
    loop {
        if started.elapsed() >= timeout {
            info!(expanded, elapsed = ?started.elapsed(), "stdcm search timed out");
            return Err(StdcmError::Timeout);
        }
        let Some(id) = queue.pop() else {
            debug!(expanded, "queue exhausted");
            return Ok(None);
        };
        let node = graph.node(id);
        if node.time_since_departure + node.remaining_time_estimation > request.max_run_time {
            debug!(expanded, "no remaining node can finish in time");
            return Ok(None);
        }
        if node.waypoint_index >= last_step {
            return Ok(Some(id));
        }

        expanded += 1;
        let edges = graph.adjacent_edges(id)?;
        debug!(
            node = id.0,
            block = %node_block(graph, id),
            time = graph.node(id).time,
            edges = edges.len(),
            "expanded node"
        );
        for edge in edges {
            let next = graph.edge_end(edge);
            queue.push(next, priority(graph, next));
        }
    }
}

fn priority<A: BlockAvailability, E: EnvelopeEngine>(graph: &StdcmGraph<'_, A, E>, id: NodeId) -> f64 {
    let node = graph.node(id);
    node.time_since_departure + node.remaining_time_estimation
}

fn node_block<A: BlockAvailability, E: EnvelopeEngine>(graph: &StdcmGraph<'_, A, E>, id: NodeId) -> String {
    let block = graph.node(id).block;
    graph.infra.block(block).name.clone()
}

/// Place every step on the edges of the path.
///
/// Stops are placed on the edge that ended with them. Other steps go on
/// the first edge, in order, whose span contains one of their locations.
///
/// # Panics
///
/// Panics if some step can't be placed: the search only reaches the last
/// step after satisfying all of them, so this means the edge builder and
/// this function disagree.
pub(super) fn make_waypoints(steps: &[StdcmStep], edges: &[&Edge]) -> Vec<PathWaypoint> {
    let mut waypoints = Vec::with_capacity(steps.len());
    let mut path_offset = Distance::ZERO;

    for (edge_index, edge) in edges.iter().enumerate() {
        while let Some(step) = steps.get(waypoints.len()) {
            let step_index = waypoints.len();
            let offset = if step.stop && step_index > 0 {
                (edge.stop_step == Some(step_index)).then_some(edge.end_offset)
            } else {
                step.first_location_on(edge.block, edge.start_offset, edge.end_offset)
            };
            let Some(offset) = offset else {
                break;
            };
            waypoints.push(PathWaypoint {
                step_index,
                edge_index,
                offset: offset - edge.start_offset,
                path_offset: path_offset + offset - edge.start_offset,
            });
        }
        path_offset += edge.length();
    }

    assert_eq!(
        waypoints.len(),
        steps.len(),
        "every step must be placed on the path"
    );
    waypoints
}
