//! Path steps (waypoints).

use serde::{Deserialize, Serialize};

use super::{BlockId, Distance};

/// A location on a block.
///
/// The offset is exact. A step that tolerates some distance around a point
/// lists the acceptable positions as alternative locations instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepLocation {
    pub block: BlockId,
    pub offset: Distance,
}

impl StepLocation {
    pub fn new(block: BlockId, offset: Distance) -> Self {
        Self { block, offset }
    }
}

/// A step the path must go through, in order.
///
/// Several locations model equivalent alternatives (e.g. either end of a
/// platform); reaching any of them satisfies the step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdcmStep {
    pub locations: Vec<StepLocation>,

    /// Whether the train has to stop at this step.
    #[serde(default)]
    pub stop: bool,

    /// Stop duration in seconds. Ignored when `stop` is false, and for the
    /// last step.
    #[serde(default)]
    pub stop_duration: f64,
}

impl StdcmStep {
    /// A step the train passes through without stopping.
    pub fn pass(locations: Vec<StepLocation>) -> Self {
        Self {
            locations,
            stop: false,
            stop_duration: 0.0,
        }
    }

    /// A step where the train stops for `duration` seconds.
    pub fn stop(locations: Vec<StepLocation>, duration: f64) -> Self {
        Self {
            locations,
            stop: true,
            stop_duration: duration,
        }
    }

    /// Returns the smallest offset of this step's locations on `block`
    /// within the closed span `[from, to]`.
    pub fn first_location_on(&self, block: BlockId, from: Distance, to: Distance) -> Option<Distance> {
        self.locations
            .iter()
            .filter(|l| l.block == block && l.offset >= from && l.offset <= to)
            .map(|l| l.offset)
            .min()
    }

    /// Returns true if some location of this step is on another block.
    pub fn has_location_off(&self, block: BlockId) -> bool {
        self.locations.iter().any(|l| l.block != block)
    }
}
