//! In-memory block occupancy table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Availability, AvailabilityError, BlockAvailability, TimeWindow};
use crate::domain::BlockId;

/// Tolerance used when comparing times. Touching intervals never conflict.
pub const TIME_EPSILON: f64 = 1e-3;

/// A time interval during which a block is used by another train.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Occupancy {
    pub start: f64,
    pub end: f64,
}

impl Occupancy {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    fn overlaps(&self, start: f64, end: f64) -> bool {
        self.start < end - TIME_EPSILON && start < self.end - TIME_EPSILON
    }
}

/// Occupancies of every block, sorted and merged per block.
#[derive(Debug, Clone, Default)]
pub struct OccupancyTable {
    occupancies: HashMap<BlockId, Vec<Occupancy>>,
}

impl OccupancyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `block` between `start` and `end`.
    pub fn occupy(&mut self, block: BlockId, start: f64, end: f64) {
        if end <= start {
            return;
        }
        let list = self.occupancies.entry(block).or_default();
        list.push(Occupancy::new(start, end));
        list.sort_by(|a, b| a.start.total_cmp(&b.start));

        let mut merged: Vec<Occupancy> = Vec::with_capacity(list.len());
        for occ in list.drain(..) {
            match merged.last_mut() {
                Some(last) if occ.start <= last.end => last.end = last.end.max(occ.end),
                _ => merged.push(occ),
            }
        }
        *list = merged;
    }

    /// Builder-style variant of [`OccupancyTable::occupy`].
    pub fn with(mut self, block: BlockId, start: f64, end: f64) -> Self {
        self.occupy(block, start, end);
        self
    }

    /// Returns the occupancies of `block`, in increasing order.
    pub fn occupancies(&self, block: BlockId) -> &[Occupancy] {
        self.occupancies.get(&block).map_or(&[], Vec::as_slice)
    }
}

impl BlockAvailability for OccupancyTable {
    fn query(&self, block: BlockId, window: TimeWindow) -> Result<Availability, AvailabilityError> {
        if !(window.start <= window.end) {
            return Err(AvailabilityError::InvalidWindow {
                start: window.start,
                end: window.end,
            });
        }
        let duration = window.duration();
        let mut start = window.start;
        let mut shifted = false;

        // Occupancies are sorted: pushing the window past one can only make
        // it collide with a later one.
        for occ in self.occupancies(block) {
            if occ.overlaps(start, start + duration) {
                start = occ.end;
                shifted = true;
            }
        }

        let next_occupancy = self
            .occupancies(block)
            .iter()
            .find(|occ| occ.end > start + TIME_EPSILON && occ.start >= start + duration - TIME_EPSILON)
            .map_or(f64::INFINITY, |occ| occ.start);

        if shifted {
            Ok(Availability::Unavailable {
                earliest_free: start,
                free_duration: next_occupancy - start,
            })
        } else {
            Ok(Availability::Available {
                maximum_delay: (next_occupancy - window.end).max(0.0),
                next_occupancy,
            })
        }
    }
}
