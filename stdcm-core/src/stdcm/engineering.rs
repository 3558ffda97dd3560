//! Slowing the train down to reach a later opening.
//!
//! When the wait before a block is longer than the departure may still be
//! shifted, the train can lose that time on the way instead. The edges
//! leading to the current one are run slower, each taking a share of the
//! wait in proportion to its running time, as long as every one of them
//! still fits in its own opening once late. Stops end the slowed part.
//!
//! Slowed edges are pushed again as new edges with their new timing: the
//! arena is append-only, and the original edges stay valid for every other
//! branch of the search.

use tracing::trace;

use super::StdcmError;
use super::edge_builder::EdgeStart;
use super::graph::StdcmGraph;
use super::node::{Edge, EdgeId, NodeId};
use crate::availability::{BlockAvailability, TIME_EPSILON, TimeWindow};
use crate::envelope::EnvelopeEngine;

/// The new timing of one slowed edge.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Slowdown {
    edge: EdgeId,
    /// Departure shift decided since the edge was built.
    shift: f64,
    /// Time already lost on the edges before this one.
    late_before: f64,
    /// Time lost on this edge.
    extra: f64,
    maximum_added_delay_after: f64,
}

/// Edges to slow down, in path order.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct SlowdownPlan {
    slowdowns: Vec<Slowdown>,
    /// How much more the departure may be shifted once the train is late.
    pub maximum_added_delay_after: f64,
}

impl<'a, A: BlockAvailability, E: EnvelopeEngine> StdcmGraph<'a, A, E> {
    /// Plan how to arrive `extra` later at `start` without leaving later.
    ///
    /// Returns `None` when the edges before `start` can't absorb it.
    pub(super) fn plan_slowdown(
        &self,
        start: &EdgeStart,
        extra: f64,
    ) -> Result<Option<SlowdownPlan>, StdcmError> {
        let mut affected = Vec::new();
        let mut current = start.previous_node;

        // Departure shift budget left before the first slowed edge
        let budget = loop {
            let Some(node_id) = current else {
                break self.request.max_departure_delay - start.total_departure_shift;
            };
            let node = self.arena.node(node_id);
            let budget =
                node.maximum_added_delay - (start.total_departure_shift - node.total_prev_added_delay);
            let edge = self.arena.edge(node.previous_edge);
            if edge.stop_step.is_some() {
                break budget;
            }
            let shift = start.total_departure_shift - edge.total_departure_shift;
            let window = TimeWindow::new(edge.time_start + shift, edge.time_end() + shift);
            match self.delays.slack(edge.block, window)? {
                Some(slack) if slack >= extra - TIME_EPSILON => {
                    affected.push((node.previous_edge, shift, slack));
                }
                _ => break budget,
            }
            current = edge.previous_node;
        };

        let total: f64 = affected
            .iter()
            .map(|&(id, _, _)| self.arena.edge(id).duration)
            .sum();
        if affected.is_empty() || !(total > 0.0) {
            trace!(extra, "no edge can absorb the wait");
            return Ok(None);
        }

        let mut late = 0.0;
        let mut budget = budget.max(0.0);
        let mut slowdowns = Vec::with_capacity(affected.len());
        for (edge, shift, slack) in affected.into_iter().rev() {
            let part = extra * self.arena.edge(edge).duration / total;
            budget = budget.min(slack - late - part).max(0.0);
            slowdowns.push(Slowdown {
                edge,
                shift,
                late_before: late,
                extra: part,
                maximum_added_delay_after: budget,
            });
            late += part;
        }
        Ok(Some(SlowdownPlan {
            slowdowns,
            maximum_added_delay_after: budget,
        }))
    }

    /// Push the slowed copies of the planned edges and return the node at
    /// the end of the last one.
    pub(super) fn apply_slowdown(&mut self, plan: &SlowdownPlan, total_departure_shift: f64) -> Option<NodeId> {
        let mut previous = plan
            .slowdowns
            .first()
            .and_then(|s| self.arena.edge(s.edge).previous_node);
        for slowdown in &plan.slowdowns {
            let original = self.arena.edge(slowdown.edge).clone();
            let late_after = slowdown.late_before + slowdown.extra;
            let id = self.arena.push_edge(Edge {
                time_start: original.time_start + slowdown.shift + slowdown.late_before,
                duration: original.duration + slowdown.extra,
                engineering_allowance: original.engineering_allowance + slowdown.extra,
                total_departure_shift,
                maximum_added_delay_after: slowdown.maximum_added_delay_after,
                previous_node: previous,
                time_since_departure_end: original.time_since_departure_end + late_after,
                ..original
            });
            previous = Some(self.edge_end(id));
        }
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::OccupancyTable;
    use crate::constraints::ConstraintCombiner;
    use crate::domain::{Distance, StdcmStep};
    use crate::envelope::MaxEffortEngine;
    use crate::infra::{BlockSpec, InfraBuilder};
    use crate::stdcm::test_fixtures::{at, electric_stock};
    use crate::stdcm::{InfraExplorer, StdcmConfig, StdcmRequest};

    type Graph<'g> = StdcmGraph<'g, OccupancyTable, MaxEffortEngine>;

    /// Runs `f` on a fresh graph for A (1000 m) -> B (3000 m) -> C (1000 m),
    /// with the train about to enter C on the earliest edges.
    fn at_the_start_of_c<R>(table: &OccupancyTable, f: impl FnOnce(&mut Graph<'_>, EdgeStart) -> R) -> R {
        let infra = InfraBuilder::new()
            .block(BlockSpec::new("A", 1000.0).next("B"))
            .block(BlockSpec::new("B", 3000.0).next("C"))
            .block(BlockSpec::new("C", 1000.0))
            .build()
            .unwrap();
        let request = StdcmRequest::new(
            electric_stock(),
            vec![
                StdcmStep::pass(at(&infra, "A", 0.0)),
                StdcmStep::stop(at(&infra, "C", 1000.0), 0.0),
            ],
            3600.0,
        );
        let config = StdcmConfig::default();
        let engine = MaxEffortEngine::default();
        let constraints = ConstraintCombiner::default();
        let mut graph = StdcmGraph::new(
            &infra,
            &request,
            &config,
            table,
            &engine,
            InfraExplorer::new(&infra, &constraints),
        );

        let departure = graph.departure_edges().unwrap()[0];
        let after_a = graph.edge_end(departure);
        let through_b = graph.adjacent_edges(after_a).unwrap()[0];
        let after_b = graph.edge_end(through_b);
        let start = EdgeStart::from_node(after_b, graph.node(after_b), Distance::ZERO);
        f(&mut graph, start)
    }

    #[test]
    fn wait_is_shared_in_proportion_to_running_time() {
        let table = OccupancyTable::new();
        at_the_start_of_c(&table, |graph, start| {
            let plan = graph.plan_slowdown(&start, 50.0).unwrap().unwrap();
            assert_eq!(plan.slowdowns.len(), 2);
            let a = graph.edge(plan.slowdowns[0].edge).duration;
            let b = graph.edge(plan.slowdowns[1].edge).duration;
            assert!((plan.slowdowns[0].extra - 50.0 * a / (a + b)).abs() < 1e-9);
            assert!((plan.slowdowns[0].extra + plan.slowdowns[1].extra - 50.0).abs() < 1e-9);
            assert_eq!(plan.slowdowns[1].late_before, plan.slowdowns[0].extra);

            let end = graph.apply_slowdown(&plan, 0.0).unwrap();
            let node = graph.node(end);
            assert!((node.time - (start.time + 50.0)).abs() < 1e-9);
            assert!((node.time_since_departure - (start.time_since_departure + 50.0)).abs() < 1e-9);
            assert_eq!(node.speed, start.speed);

            let chain = graph.arena().edge_chain(end);
            assert_eq!(chain.len(), 2);
            assert!(graph.edge(chain[0]).previous_node.is_none());
            assert!(graph.edge(chain[1]).engineering_allowance > 0.0);
        });
    }

    #[test]
    fn slowing_down_stops_at_a_block_without_room() {
        // A is taken again 9.7 s after the train leaves it
        let table = OccupancyTable::new()
            .with(crate::domain::BlockId(0), 73.0, 1000.0)
            .with(crate::domain::BlockId(1), 500.0, 600.0);
        at_the_start_of_c(&table, |graph, start| {
            // Only B can lose time, and only until its next occupancy
            let plan = graph.plan_slowdown(&start, 100.0).unwrap().unwrap();
            assert_eq!(plan.slowdowns.len(), 1);
            assert!((plan.slowdowns[0].extra - 100.0).abs() < 1e-9);
            assert!(plan.maximum_added_delay_after <= 10.0);

            assert_eq!(graph.plan_slowdown(&start, 400.0).unwrap(), None);
        });
    }
}
