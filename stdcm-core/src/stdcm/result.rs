//! Search results.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::domain::{BlockId, Distance};
use crate::envelope::Envelope;

/// A portion of block used by the path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockRange {
    pub block: BlockId,
    pub name: String,
    pub start: Distance,
    pub end: Distance,
    /// Time lost on purpose over the range by running slower (s).
    pub engineering_allowance: f64,
}

/// Where a step of the request lies on the path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathWaypoint {
    pub step_index: usize,
    /// Index in [`StdcmResult::blocks`].
    pub edge_index: usize,
    /// Offset from the start of that block range.
    pub offset: Distance,
    /// Offset from the start of the path.
    pub path_offset: Distance,
}

/// An intermediate stop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathStop {
    pub step_index: usize,
    pub path_offset: Distance,
    /// Time spent stopped (s).
    pub duration: f64,
}

/// When the train holds a block range, in absolute time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlockOccupancy {
    pub block: BlockId,
    pub entry: f64,
    pub exit: f64,
}

/// A path fitted into the existing capacity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StdcmResult {
    pub blocks: Vec<BlockRange>,
    pub waypoints: Vec<PathWaypoint>,
    pub stops: Vec<PathStop>,

    /// Simulated run over the whole path, allowance included. Stop
    /// durations are not part of its times.
    pub envelope: Envelope,

    /// Absolute departure time.
    pub departure_time: f64,

    /// How much later than requested the train leaves.
    pub departure_delay: f64,

    /// Running time, stops included.
    pub run_time: f64,

    /// One entry per block range, in path order.
    pub occupancies: Vec<BlockOccupancy>,

    pub tag: Option<String>,
}

impl StdcmResult {
    /// Absolute arrival time.
    pub fn arrival_time(&self) -> f64 {
        self.departure_time + self.run_time
    }

    /// Length of the path.
    pub fn length(&self) -> Distance {
        self.blocks
            .iter()
            .fold(Distance::ZERO, |acc, b| acc + (b.end - b.start))
    }

    /// Departure as a date and time, given what time zero stands for.
    pub fn departure_at(&self, reference: NaiveDateTime) -> NaiveDateTime {
        at(reference, self.departure_time)
    }

    /// Arrival as a date and time, given what time zero stands for.
    pub fn arrival_at(&self, reference: NaiveDateTime) -> NaiveDateTime {
        at(reference, self.arrival_time())
    }
}

fn at(reference: NaiveDateTime, seconds: f64) -> NaiveDateTime {
    reference + Duration::milliseconds((seconds * 1000.0).round() as i64)
}
