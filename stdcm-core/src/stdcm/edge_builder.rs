//! Building the edges that traverse one block.
//!
//! For a given entry point and lookahead, a block can be traversed in a few
//! ways: to its end, or up to a stop location. Each way is simulated once,
//! then turned into one edge per availability opening the train can reach
//! by leaving later, or by running slower on the way when the departure
//! can't be shifted that much.

use tracing::trace;

use super::graph::StdcmGraph;
use super::explorer::ExplorerHandle;
use super::node::{Edge, EdgeId, Node, NodeId};
use super::visited::Fingerprint;
use super::{StdcmError, StdcmRequest};
use crate::availability::{BlockAvailability, TIME_EPSILON, TimeWindow};
use crate::domain::{BlockId, Distance, StdcmStep};
use crate::envelope::{EnvelopeEngine, PhysicsPath, SimulationParameters};

/// State of the train where an edge begins.
#[derive(Debug, Clone)]
pub struct EdgeStart {
    pub previous_node: Option<NodeId>,
    pub time: f64,
    pub time_since_departure: f64,
    pub speed: f64,
    pub waypoint_index: usize,
    pub offset: Distance,
    pub total_departure_shift: f64,
    pub maximum_added_delay: f64,
}

impl EdgeStart {
    /// The train at rest on the origin, at the earliest departure time.
    pub fn departure(request: &StdcmRequest, offset: Distance) -> Self {
        Self {
            previous_node: None,
            time: request.start_time,
            time_since_departure: 0.0,
            speed: 0.0,
            waypoint_index: 0,
            offset,
            total_departure_shift: 0.0,
            maximum_added_delay: request.max_departure_delay,
        }
    }

    /// The train as it is at a node, at `offset` on the next block it uses.
    pub fn from_node(id: NodeId, node: &Node, offset: Distance) -> Self {
        Self {
            previous_node: Some(id),
            time: node.time,
            time_since_departure: node.time_since_departure,
            speed: node.speed,
            waypoint_index: node.waypoint_index,
            offset,
            total_departure_shift: node.total_prev_added_delay,
            maximum_added_delay: node.maximum_added_delay,
        }
    }
}

/// One way of traversing a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant {
    pub end: Distance,
    /// Last step satisfied at the end of the traversal.
    pub waypoint_index: usize,
    /// Set when the traversal ends with a stop for this step.
    pub stop_step: Option<usize>,
}

/// Ways of traversing `block` from `start`, given the steps satisfied so far.
///
/// Pass-through steps on the block are satisfied on the way. When the next
/// pending step is a stop on the block, the traversal may end there; it may
/// only go on past it when the stop has a location elsewhere.
pub fn variants(
    steps: &[StdcmStep],
    waypoint_index: usize,
    block: BlockId,
    start: Distance,
    length: Distance,
) -> Vec<Variant> {
    let mut res = Vec::new();
    let mut satisfied = waypoint_index;
    let mut position = start;

    while let Some(step) = steps.get(satisfied + 1) {
        let found = step.first_location_on(block, position, length);
        if !step.stop {
            match found {
                Some(offset) => {
                    satisfied += 1;
                    position = offset;
                    continue;
                }
                None => break,
            }
        }
        if let Some(offset) = found {
            res.push(Variant {
                end: offset,
                waypoint_index: satisfied + 1,
                stop_step: Some(satisfied + 1),
            });
        }
        if !step.has_location_off(block) {
            return res;
        }
        break;
    }

    // Nothing left to do but reach the end of the block
    if satisfied + 1 < steps.len() {
        res.push(Variant {
            end: length,
            waypoint_index: satisfied,
            stop_step: None,
        });
    }
    res
}

impl<'a, A: BlockAvailability, E: EnvelopeEngine> StdcmGraph<'a, A, E> {
    /// Geometry to simulate for a variant: the traversed portion, then the
    /// lookahead blocks up to the next stop.
    fn simulation_path(
        &self,
        handle: ExplorerHandle,
        block: BlockId,
        start: Distance,
        variant: &Variant,
    ) -> (PhysicsPath, Vec<Distance>) {
        let mut path = PhysicsPath::new();
        path.push_block(self.infra, block, start, variant.end);
        let mut covered = variant.end - start;
        if variant.stop_step.is_some() {
            return (path, vec![covered]);
        }

        let steps = &self.request.steps;
        let next_stop = (variant.waypoint_index + 1..steps.len()).find(|&i| steps[i].stop);
        for next in self.explorer.lookahead(handle) {
            let length = self.infra.block(next).length;
            let stop_at = next_stop.and_then(|i| steps[i].first_location_on(next, Distance::ZERO, length));
            match stop_at {
                Some(offset) => {
                    path.push_block(self.infra, next, Distance::ZERO, offset);
                    return (path, vec![covered + offset]);
                }
                None => {
                    path.push_block(self.infra, next, Distance::ZERO, length);
                    covered += length;
                }
            }
        }
        (path, Vec::new())
    }

    /// Build every edge traversing the current block of `handle` from `start`.
    pub(super) fn build_edges(
        &mut self,
        start: &EdgeStart,
        handle: ExplorerHandle,
    ) -> Result<Vec<EdgeId>, StdcmError> {
        let request = self.request;
        let block = self.explorer.current_block(handle);
        let length = self.infra.block(block).length;
        if start.offset > length {
            return Ok(Vec::new());
        }
        let blocked = self.explorer.blocked_ranges(block);
        let lookahead = self.explorer.lookahead(handle);
        let mut edges = Vec::new();

        for variant in variants(&request.steps, start.waypoint_index, block, start.offset, length) {
            if blocked.intersects(start.offset, variant.end) {
                trace!(block = %block, end = %variant.end, "traversal crosses a blocked range");
                continue;
            }

            let (path, stops) = self.simulation_path(handle, block, start.offset, &variant);
            let envelope = self.engine.simulate(
                &path,
                &request.rolling_stock,
                request.comfort,
                &SimulationParameters {
                    start_speed: start.speed,
                    stops,
                    time_step: request.time_step,
                },
            )?;
            let portion_length = (variant.end - start.offset).meters();
            let envelope = envelope.slice(0.0, portion_length);
            let duration = match &request.standard_allowance {
                Some(allowance) => allowance.apply(envelope.total_time(), portion_length),
                None => envelope.total_time(),
            };
            let stop_duration = variant.stop_step.map_or(0.0, |s| request.stop_duration(s));

            let time_since_departure_end = start.time_since_departure + duration + stop_duration;
            let remaining = self
                .estimator
                .estimate(self.infra, block, variant.end, variant.waypoint_index);
            if time_since_departure_end + remaining > request.max_run_time {
                trace!(block = %block, "traversal can't finish in time");
                continue;
            }

            // Waiting longer than the departure may be shifted is still
            // possible by running slower, as long as the run time allows it
            let run_time_slack = request.max_run_time - time_since_departure_end - remaining;
            let window = TimeWindow::new(start.time, start.time + duration + stop_duration);
            let openings = self.delays.minimum_delays_per_opening(
                block,
                window,
                start.maximum_added_delay.max(run_time_slack),
            )?;

            for opening in openings {
                let slowdown = if opening.delay <= start.maximum_added_delay + TIME_EPSILON {
                    None
                } else if opening.delay > run_time_slack {
                    continue;
                } else {
                    match self.plan_slowdown(start, opening.delay)? {
                        Some(plan) => Some(plan),
                        None => continue,
                    }
                };
                let (maximum_added_delay_after, total_departure_shift, late) = match &slowdown {
                    None => (
                        (start.maximum_added_delay - opening.delay).min(opening.slack),
                        start.total_departure_shift + opening.delay,
                        0.0,
                    ),
                    Some(plan) => (
                        plan.maximum_added_delay_after.min(opening.slack),
                        start.total_departure_shift,
                        opening.delay,
                    ),
                };
                let maximum_added_delay_after = maximum_added_delay_after.max(0.0);
                let time_start = start.time + opening.delay;

                let fingerprint = Fingerprint {
                    block,
                    lookahead: lookahead.clone(),
                    start_offset_mm: start.offset.millis(),
                    end_offset_mm: variant.end.millis(),
                    waypoint_index: variant.waypoint_index,
                    time_bucket: self.visited.bucket(time_start),
                };
                if self.visited.check_and_mark(fingerprint, maximum_added_delay_after) {
                    trace!(block = %block, time = time_start, "equivalent edge already visited");
                    continue;
                }

                let previous_node = match &slowdown {
                    Some(plan) => self.apply_slowdown(plan, total_departure_shift),
                    None => start.previous_node,
                };
                trace!(
                    block = %block,
                    start = %start.offset,
                    end = %variant.end,
                    time = time_start,
                    duration,
                    delay = opening.delay,
                    slowed_down = slowdown.is_some(),
                    "new edge"
                );
                edges.push(self.arena.push_edge(Edge {
                    block,
                    explorer: handle,
                    envelope: envelope.clone(),
                    start_offset: start.offset,
                    end_offset: variant.end,
                    time_start,
                    duration,
                    engineering_allowance: 0.0,
                    stop_step: variant.stop_step,
                    stop_duration,
                    total_departure_shift,
                    maximum_added_delay_after,
                    previous_node,
                    waypoint_index: variant.waypoint_index,
                    time_since_departure_end: time_since_departure_end + late,
                    remaining_time_estimation: remaining,
                }));
            }
        }
        Ok(edges)
    }
}
