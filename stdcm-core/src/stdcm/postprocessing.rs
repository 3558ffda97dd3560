//! Turning the edges found by the search into a simulated result.
//!
//! During the search each block is simulated on its own, with a short
//! lookahead. The final path is simulated again in one piece, and the
//! resulting schedule is checked against the availability once more. The
//! time the search chose to lose on some blocks is added back on them.

use tracing::{debug, warn};

use super::node::Edge;
use super::result::{BlockOccupancy, BlockRange, PathStop, PathWaypoint, StdcmResult};
use super::{StdcmError, StdcmRequest};
use crate::availability::{Availability, BlockAvailability, TIME_EPSILON, TimeWindow};
use crate::domain::Distance;
use crate::envelope::{EnvelopeEngine, PhysicsPath, SimulationParameters};
use crate::infra::Infra;

/// Build the result for the edges of a path, in order.
pub(super) fn make_result<A: BlockAvailability, E: EnvelopeEngine>(
    infra: &Infra,
    request: &StdcmRequest,
    engine: &E,
    availability: &A,
    edges: &[&Edge],
    waypoints: Vec<PathWaypoint>,
) -> Result<StdcmResult, StdcmError> {
    let mut path = PhysicsPath::new();
    let mut starts = Vec::with_capacity(edges.len());
    let mut stops = Vec::new();
    let mut sim_stops = Vec::new();
    let mut offset = Distance::ZERO;

    for edge in edges {
        path.push_block(infra, edge.block, edge.start_offset, edge.end_offset);
        starts.push(offset);
        offset += edge.length();
        if let Some(step_index) = edge.stop_step {
            sim_stops.push(offset);
            if step_index != request.last_step() {
                stops.push(PathStop {
                    step_index,
                    path_offset: offset,
                    duration: edge.stop_duration,
                });
            }
        }
    }

    let envelope = engine.simulate(
        &path,
        &request.rolling_stock,
        request.comfort,
        &SimulationParameters {
            start_speed: 0.0,
            stops: sim_stops,
            time_step: request.time_step,
        },
    )?;
    let mut envelope = match &request.standard_allowance {
        Some(allowance) => envelope.with_allowance(allowance),
        None => envelope,
    };
    for (edge, start) in edges.iter().zip(&starts) {
        if edge.engineering_allowance > 0.0 {
            let end = *start + edge.length();
            envelope = envelope.stretched(start.meters(), end.meters(), edge.engineering_allowance);
        }
    }

    let departure_delay = edges.last().map_or(0.0, |e| e.total_departure_shift);
    let departure_time = request.start_time + departure_delay;

    let mut occupancies = Vec::with_capacity(edges.len());
    let mut stopped = 0.0;
    for (edge, start) in edges.iter().zip(&starts) {
        let entry = departure_time + envelope.interpolate_time(start.meters()) + stopped;
        stopped += edge.stop_duration;
        let end = *start + edge.length();
        let exit = departure_time + envelope.interpolate_time(end.meters()) + stopped;
        occupancies.push(BlockOccupancy {
            block: edge.block,
            entry,
            exit,
        });
    }

    for occupancy in &occupancies {
        let window = TimeWindow::new(occupancy.entry, occupancy.exit.max(occupancy.entry));
        if let Availability::Unavailable { .. } = availability.query(occupancy.block, window)? {
            warn!(
                block = %occupancy.block,
                entry = occupancy.entry,
                exit = occupancy.exit,
                "final schedule conflicts with an occupancy"
            );
            return Err(StdcmError::ScheduleConflict {
                block: occupancy.block,
                start: occupancy.entry,
                end: occupancy.exit,
            });
        }
    }

    let run_time = envelope.total_time() + stopped;
    if run_time > request.max_run_time + TIME_EPSILON {
        return Err(StdcmError::RunTimeExceeded {
            run_time,
            max_run_time: request.max_run_time,
        });
    }
    debug!(departure_time, run_time, edges = edges.len(), "post-processed path");

    let blocks = edges
        .iter()
        .map(|edge| BlockRange {
            block: edge.block,
            name: infra.block(edge.block).name.clone(),
            start: edge.start_offset,
            end: edge.end_offset,
            engineering_allowance: edge.engineering_allowance,
        })
        .collect();

    Ok(StdcmResult {
        blocks,
        waypoints,
        stops,
        envelope,
        departure_time,
        departure_delay,
        run_time,
        occupancies,
        tag: request.tag.clone(),
    })
}
