//! Block availability: the conflict-avoidance oracle.
//!
//! The search asks whether a block can be used over a time window. The
//! answer either leaves room to spare (how much later the same use could
//! still happen) or says when the block frees up.

mod occupancy;

use serde::Serialize;

use crate::domain::BlockId;

pub use occupancy::{Occupancy, OccupancyTable, TIME_EPSILON};

/// A time interval `[start, end]` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Returns the same window moved by `delay` seconds.
    pub fn shifted(&self, delay: f64) -> Self {
        Self {
            start: self.start + delay,
            end: self.end + delay,
        }
    }
}

/// Answer to an availability query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Availability {
    /// The block is free over the window.
    Available {
        /// How much the window could be delayed and still be free.
        /// Infinite when no later occupancy exists.
        maximum_delay: f64,

        /// Start of the next occupancy after the window, or infinity.
        next_occupancy: f64,
    },

    /// The block is used by another train during the window.
    Unavailable {
        /// Earliest start time at which the whole window would be free.
        earliest_free: f64,

        /// How long the block stays free from `earliest_free` on.
        free_duration: f64,
    },
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available { .. })
    }
}

/// Error from an availability provider.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AvailabilityError {
    /// The provider has no knowledge of the block
    #[error("unknown block {0}")]
    UnknownBlock(BlockId),

    /// The window is malformed
    #[error("invalid time window [{start}, {end}]")]
    InvalidWindow { start: f64, end: f64 },

    /// The underlying provider failed
    #[error("availability provider failed: {0}")]
    Provider(String),
}

/// Trait for providing block availability.
///
/// This abstraction allows the search to run against a static occupancy
/// table, a live timetable, or a mock.
pub trait BlockAvailability {
    /// Check whether `block` can be used over `window`.
    fn query(&self, block: BlockId, window: TimeWindow) -> Result<Availability, AvailabilityError>;
}

impl<T: BlockAvailability + ?Sized> BlockAvailability for &T {
    fn query(&self, block: BlockId, window: TimeWindow) -> Result<Availability, AvailabilityError> {
        (**self).query(block, window)
    }
}
