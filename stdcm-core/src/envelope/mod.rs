//! Speed envelopes and the engine that computes them.
//!
//! An envelope is the speed and elapsed time of a train at every position of
//! a path. The search only needs it to turn distances into running times, so
//! the engine is consumed through the [`EnvelopeEngine`] trait.

mod max_effort;

use serde::{Deserialize, Serialize};

use crate::domain::{AllowanceValue, BlockId, Comfort, Distance, DomainError, RollingStock};
use crate::infra::Infra;

pub use max_effort::MaxEffortEngine;

/// Error from an envelope engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnvelopeError {
    /// The rolling stock can't be simulated
    #[error(transparent)]
    InvalidRollingStock(#[from] DomainError),

    /// The path has no segment
    #[error("cannot simulate an empty path")]
    EmptyPath,

    /// The simulation time step is zero, negative or not a number
    #[error("invalid simulation time step: {0}")]
    InvalidTimeStep(f64),

    /// The train can never leave some position
    #[error("train stalls at {0}")]
    Stalled(Distance),
}

/// A point of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopePoint {
    /// Position along the simulated path (m).
    pub position: f64,
    /// Speed (m/s).
    pub speed: f64,
    /// Time since the start of the path (s).
    pub time: f64,
}

/// Speed and time along a path, sampled at increasing positions.
///
/// The train is assumed to accelerate uniformly between two points, which
/// makes the square of its speed linear in position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    points: Vec<EnvelopePoint>,
}

impl Envelope {
    /// Create an envelope from points sorted by position.
    pub fn new(points: Vec<EnvelopePoint>) -> Self {
        Self { points }
    }

    /// An envelope covering no distance.
    pub fn at_rest(speed: f64) -> Self {
        Self::new(vec![EnvelopePoint {
            position: 0.0,
            speed,
            time: 0.0,
        }])
    }

    pub fn points(&self) -> &[EnvelopePoint] {
        &self.points
    }

    /// Length of the envelope (m).
    pub fn length(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.position)
    }

    /// Running time over the whole envelope (s).
    pub fn total_time(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.time)
    }

    pub fn begin_speed(&self) -> f64 {
        self.points.first().map_or(0.0, |p| p.speed)
    }

    pub fn end_speed(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.speed)
    }

    /// Index `i` such that `position` lies in `[points[i], points[i + 1]]`.
    fn segment_at(&self, position: f64) -> usize {
        let idx = self.points.partition_point(|p| p.position <= position);
        idx.saturating_sub(1).min(self.points.len().saturating_sub(2))
    }

    /// Speed at the given position, clamped to the envelope bounds.
    pub fn interpolate_speed(&self, position: f64) -> f64 {
        if self.points.len() < 2 {
            return self.begin_speed();
        }
        let i = self.segment_at(position);
        let (a, b) = (self.points[i], self.points[i + 1]);
        let dx = b.position - a.position;
        if dx <= 0.0 {
            return b.speed;
        }
        let ratio = ((position - a.position) / dx).clamp(0.0, 1.0);
        let v2 = a.speed * a.speed + (b.speed * b.speed - a.speed * a.speed) * ratio;
        v2.max(0.0).sqrt()
    }

    /// Time at which the given position is reached, clamped to the bounds.
    ///
    /// Exact at sample points. In between, the sampled time is split in
    /// proportion to the uniform-acceleration travel time.
    pub fn interpolate_time(&self, position: f64) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        if position <= self.points[0].position {
            return self.points[0].time;
        }
        if position >= self.length() {
            return self.total_time();
        }
        let i = self.segment_at(position);
        let (a, b) = (self.points[i], self.points[i + 1]);
        if position <= a.position {
            return a.time;
        }
        if position >= b.position {
            return b.time;
        }
        let v = self.interpolate_speed(position);
        let partial = 2.0 * (position - a.position) / (a.speed + v);
        let full = 2.0 * (b.position - a.position) / (a.speed + b.speed);
        if !partial.is_finite() || !full.is_finite() || full <= 0.0 {
            return a.time;
        }
        a.time + (b.time - a.time) * (partial / full).min(1.0)
    }

    /// Returns the part of the envelope between two positions, moved so that
    /// it starts at position and time zero.
    pub fn slice(&self, from: f64, to: f64) -> Envelope {
        let from = from.clamp(0.0, self.length());
        let to = to.clamp(from, self.length());
        let t0 = self.interpolate_time(from);
        let mut points = vec![EnvelopePoint {
            position: 0.0,
            speed: self.interpolate_speed(from),
            time: 0.0,
        }];
        for p in self.points.iter().filter(|p| p.position > from && p.position < to) {
            points.push(EnvelopePoint {
                position: p.position - from,
                speed: p.speed,
                time: p.time - t0,
            });
        }
        if to > from {
            points.push(EnvelopePoint {
                position: to - from,
                speed: self.interpolate_speed(to),
                time: self.interpolate_time(to) - t0,
            });
        }
        Envelope::new(points)
    }

    /// Returns the envelope slowed down to include the given margin.
    ///
    /// Times are recomputed point by point; speeds follow so that the time
    /// spent between two points stays consistent with them.
    pub fn with_allowance(&self, allowance: &AllowanceValue) -> Envelope {
        let points = self
            .points
            .iter()
            .map(|p| {
                let speed = match *allowance {
                    AllowanceValue::Percentage { percentage } => p.speed / (1.0 + percentage / 100.0),
                    AllowanceValue::TimePerDistance { minutes_per_100km } => {
                        let pace = minutes_per_100km * 60.0 / 100_000.0;
                        if p.speed > 0.0 {
                            1.0 / (1.0 / p.speed + pace)
                        } else {
                            0.0
                        }
                    }
                };
                EnvelopePoint {
                    position: p.position,
                    speed,
                    time: allowance.apply(p.time, p.position),
                }
            })
            .collect();
        Envelope::new(points)
    }
}

impl Envelope {
    /// Returns the envelope with `extra` seconds spent between two
    /// positions, spread evenly over the running time between them.
    ///
    /// Speeds in between are lowered in proportion. Positions after `to`
    /// are reached `extra` later.
    pub fn stretched(&self, from: f64, to: f64, extra: f64) -> Envelope {
        let from = from.clamp(0.0, self.length());
        let to = to.clamp(from, self.length());
        let t0 = self.interpolate_time(from);
        let t1 = self.interpolate_time(to);
        let span = t1 - t0;
        if !(span > 0.0) || !(extra > 0.0) {
            return self.clone();
        }
        let factor = span / (span + extra);

        let mut points = Vec::with_capacity(self.points.len() + 2);
        for bound in [from, to] {
            if !self.points.iter().any(|p| p.position == bound) {
                points.push(EnvelopePoint {
                    position: bound,
                    speed: self.interpolate_speed(bound),
                    time: self.interpolate_time(bound),
                });
            }
        }
        points.extend(self.points.iter().copied());
        points.sort_by(|a, b| a.position.total_cmp(&b.position));

        for p in &mut points {
            if p.position >= to {
                p.time += extra;
            } else if p.position > from {
                p.time += extra * (p.time - t0) / span;
                p.speed *= factor;
            }
        }
        Envelope::new(points)
    }
}

/// A stretch of path with a single line speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathSegment {
    pub length: Distance,
    /// Line speed (m/s).
    pub max_speed: f64,
}

/// Geometry the envelope engine runs on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhysicsPath {
    pub segments: Vec<PathSegment>,
}

impl PhysicsPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the `[from, to)` portion of a block.
    pub fn push_block(&mut self, infra: &Infra, block: BlockId, from: Distance, to: Distance) {
        self.segments.push(PathSegment {
            length: to - from,
            max_speed: infra.block(block).max_speed,
        });
    }

    pub fn length(&self) -> Distance {
        self.segments
            .iter()
            .fold(Distance::ZERO, |acc, s| acc + s.length)
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Run parameters besides the geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParameters {
    /// Speed at the start of the path (m/s).
    pub start_speed: f64,

    /// Positions along the path where the train must be stopped.
    pub stops: Vec<Distance>,

    /// Simulation time step (s).
    pub time_step: f64,
}

/// Trait for computing speed envelopes.
pub trait EnvelopeEngine {
    /// Simulate the fastest run of `stock` along `path`.
    fn simulate(
        &self,
        path: &PhysicsPath,
        stock: &RollingStock,
        comfort: Comfort,
        params: &SimulationParameters,
    ) -> Result<Envelope, EnvelopeError>;
}

impl<T: EnvelopeEngine + ?Sized> EnvelopeEngine for &T {
    fn simulate(
        &self,
        path: &PhysicsPath,
        stock: &RollingStock,
        comfort: Comfort,
        params: &SimulationParameters,
    ) -> Result<Envelope, EnvelopeError> {
        (**self).simulate(path, stock, comfort, params)
    }
}
