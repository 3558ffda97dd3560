//! Lower bound of the running time left to the destination.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::domain::{BlockId, Distance};
use crate::infra::Infra;

use super::StdcmRequest;

/// Remaining-time estimator for one request.
///
/// Precomputes, for every block, the shortest distance from its entry to
/// any location of the last step. Dividing a distance by the highest speed
/// the train could ever reach gives a time no real run can beat.
#[derive(Debug)]
pub struct RemainingTimeEstimator {
    /// Distance from each block entry to the destination, if reachable.
    distance_from_entry: Vec<Option<Distance>>,
    destinations: Vec<(BlockId, Distance)>,
    speed: f64,
    /// Stop time of the intermediate stops from each step on.
    remaining_stops: Vec<f64>,
    last_step: usize,
}

impl RemainingTimeEstimator {
    pub fn new(infra: &Infra, request: &StdcmRequest) -> Self {
        let last_step = request.last_step();
        let destinations: Vec<(BlockId, Distance)> = request
            .steps
            .last()
            .map(|step| step.locations.iter().map(|l| (l.block, l.offset)).collect())
            .unwrap_or_default();

        let mut distance_from_entry: Vec<Option<Distance>> = vec![None; infra.len()];
        let mut queue = BinaryHeap::new();
        for &(block, offset) in &destinations {
            let best = &mut distance_from_entry[block.index()];
            if best.is_none_or(|d| offset < d) {
                *best = Some(offset);
                queue.push(Reverse((offset, block)));
            }
        }
        while let Some(Reverse((distance, block))) = queue.pop() {
            if distance_from_entry[block.index()].is_some_and(|d| d < distance) {
                continue;
            }
            for &prev in infra.predecessors(block) {
                let through = distance + infra.block(prev).length;
                let best = &mut distance_from_entry[prev.index()];
                if best.is_none_or(|d| through < d) {
                    *best = Some(through);
                    queue.push(Reverse((through, prev)));
                }
            }
        }

        let mut remaining_stops = vec![0.0; request.steps.len() + 1];
        for idx in (0..request.steps.len()).rev() {
            remaining_stops[idx] = remaining_stops[idx + 1] + request.stop_duration(idx);
        }

        Self {
            distance_from_entry,
            destinations,
            speed: request.rolling_stock.max_speed.min(infra.max_line_speed()),
            remaining_stops,
            last_step,
        }
    }

    /// Shortest distance from `offset` on `block` to the destination.
    pub fn distance(&self, infra: &Infra, block: BlockId, offset: Distance) -> Option<Distance> {
        let on_block = self
            .destinations
            .iter()
            .filter(|&&(b, o)| b == block && o >= offset)
            .map(|&(_, o)| o - offset)
            .min();
        let length = infra.block(block).length;
        let through = infra
            .successors(block)
            .iter()
            .filter_map(|next| self.distance_from_entry[next.index()])
            .min()
            .map(|d| d + length - offset);
        match (on_block, through) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Lower bound on the time left once `waypoint_index` steps are satisfied
    /// and the train is at `offset` on `block`. Infinite when unreachable.
    pub fn estimate(&self, infra: &Infra, block: BlockId, offset: Distance, waypoint_index: usize) -> f64 {
        if waypoint_index >= self.last_step {
            return 0.0;
        }
        let Some(distance) = self.distance(infra, block, offset) else {
            return f64::INFINITY;
        };
        if !(self.speed > 0.0) {
            return f64::INFINITY;
        }
        distance.meters() / self.speed + self.remaining_stops[waypoint_index + 1]
    }
}
