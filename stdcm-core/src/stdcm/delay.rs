//! Finding the delays that fit a block traversal between occupancies.

use crate::availability::{Availability, AvailabilityError, BlockAvailability, TIME_EPSILON, TimeWindow};
use crate::domain::BlockId;

/// A way to fit a block traversal between other trains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Opening {
    /// Shift of the traversal needed to reach the opening.
    pub delay: f64,

    /// How much more the traversal could still be shifted within the opening.
    pub slack: f64,
}

/// Turns availability answers into openings.
pub struct DelayManager<'a, A: BlockAvailability> {
    availability: &'a A,
    max_openings: usize,
}

impl<'a, A: BlockAvailability> DelayManager<'a, A> {
    pub fn new(availability: &'a A, max_openings: usize) -> Self {
        Self {
            availability,
            max_openings,
        }
    }

    /// Returns the smallest delay of every opening reachable with at most
    /// `max_delay` of delay, earliest first.
    pub fn minimum_delays_per_opening(
        &self,
        block: BlockId,
        window: TimeWindow,
        max_delay: f64,
    ) -> Result<Vec<Opening>, AvailabilityError> {
        let mut openings = Vec::new();
        let mut delay = 0.0;

        while openings.len() < self.max_openings && delay <= max_delay + TIME_EPSILON {
            let next_delay = match self.availability.query(block, window.shifted(delay))? {
                Availability::Available { maximum_delay, .. } => {
                    openings.push(Opening {
                        delay,
                        slack: maximum_delay,
                    });
                    if !maximum_delay.is_finite() {
                        break;
                    }
                    // Just past the start of the next occupancy
                    delay + maximum_delay + 2.0 * TIME_EPSILON
                }
                Availability::Unavailable { earliest_free, .. } => earliest_free - window.start,
            };
            if next_delay <= delay {
                break;
            }
            delay = next_delay;
        }
        Ok(openings)
    }

    /// How much `window` could be delayed while the block stays free, or
    /// `None` when the block is already used during it.
    pub fn slack(&self, block: BlockId, window: TimeWindow) -> Result<Option<f64>, AvailabilityError> {
        Ok(match self.availability.query(block, window)? {
            Availability::Available { maximum_delay, .. } => Some(maximum_delay),
            Availability::Unavailable { .. } => None,
        })
    }
}
