//! Max-effort kinematic envelope engine.
//!
//! The train accelerates as hard as it can, holds the line speed, and brakes
//! as late as it can before speed restrictions and stops. Acceleration and
//! braking are constant, so the whole computation is two passes over a
//! position grid.

use super::{Envelope, EnvelopeEngine, EnvelopeError, EnvelopePoint, PhysicsPath, SimulationParameters};
use crate::domain::{Comfort, Distance, RollingStock};

const DEFAULT_MIN_STEP_METERS: f64 = 1.0;
const DEFAULT_MAX_STEP_METERS: f64 = 50.0;

/// Engine running the fastest possible run.
///
/// The grid spacing is the distance covered in one time step at the
/// train's top speed, clamped to the configured bounds. Grid points are
/// cut per path segment in whole millimeters, so simulating a portion of a
/// path samples it exactly like simulating the whole path does.
#[derive(Debug, Clone, PartialEq)]
pub struct MaxEffortEngine {
    min_step: f64,
    max_step: f64,
}

impl MaxEffortEngine {
    /// Create an engine with grid spacing bounds in meters.
    pub fn new(min_step_meters: f64, max_step_meters: f64) -> Self {
        Self {
            min_step: min_step_meters,
            max_step: max_step_meters.max(min_step_meters),
        }
    }

    fn step(&self, stock: &RollingStock, time_step: f64) -> Distance {
        let meters = (time_step * stock.max_speed).clamp(self.min_step, self.max_step);
        Distance::from_meters(meters).max(Distance::from_millis(1))
    }
}

impl Default for MaxEffortEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_STEP_METERS, DEFAULT_MAX_STEP_METERS)
    }
}

/// Sample positions with, for each gap, the speed limit that applies.
struct Grid {
    positions: Vec<Distance>,
    gap_limits: Vec<f64>,
}

fn build_grid(path: &PhysicsPath, stops: &[Distance], step: Distance, stock_max: f64) -> Grid {
    let mut positions = vec![Distance::ZERO];
    let mut gap_limits = Vec::new();
    let mut cursor = Distance::ZERO;

    for segment in &path.segments {
        let end = cursor + segment.length;
        let mut cuts: Vec<Distance> = stops
            .iter()
            .copied()
            .filter(|s| *s > cursor && *s < end)
            .collect();
        cuts.sort();
        cuts.dedup();
        cuts.push(end);

        let limit = segment.max_speed.min(stock_max);
        let mut piece_start = cursor;
        for cut in cuts {
            let span = cut - piece_start;
            if span > Distance::ZERO {
                let parts = (span.millis() + step.millis() - 1) / step.millis();
                for i in 1..=parts {
                    positions.push(piece_start + span.fraction(i, parts));
                    gap_limits.push(limit);
                }
            }
            piece_start = cut;
        }
        cursor = end;
    }

    Grid {
        positions,
        gap_limits,
    }
}

/// Time to cover `dx` from rest to rest under a speed limit.
fn hop_time(dx: f64, acceleration: f64, deceleration: f64, limit: f64) -> f64 {
    let peak = (2.0 * dx * acceleration * deceleration / (acceleration + deceleration))
        .sqrt()
        .min(limit);
    let ramps = peak * peak / (2.0 * acceleration) + peak * peak / (2.0 * deceleration);
    peak / acceleration + peak / deceleration + (dx - ramps).max(0.0) / peak
}

impl EnvelopeEngine for MaxEffortEngine {
    fn simulate(
        &self,
        path: &PhysicsPath,
        stock: &RollingStock,
        comfort: Comfort,
        params: &SimulationParameters,
    ) -> Result<Envelope, EnvelopeError> {
        stock.validate()?;
        if !(params.time_step > 0.0) {
            return Err(EnvelopeError::InvalidTimeStep(params.time_step));
        }
        if path.is_empty() {
            return Err(EnvelopeError::EmptyPath);
        }

        let grid = build_grid(
            path,
            &params.stops,
            self.step(stock, params.time_step),
            stock.max_speed,
        );
        let n = grid.positions.len();
        if n == 1 {
            return Ok(Envelope::at_rest(params.start_speed));
        }

        // Speed limit at each point: the train must respect the limits of
        // the gaps on both sides.
        let mut limits: Vec<f64> = (0..n)
            .map(|i| {
                let before = if i > 0 { grid.gap_limits[i - 1] } else { f64::INFINITY };
                let after = grid.gap_limits.get(i).copied().unwrap_or(f64::INFINITY);
                before.min(after)
            })
            .collect();
        for (i, pos) in grid.positions.iter().enumerate() {
            if i > 0 && params.stops.contains(pos) {
                limits[i] = 0.0;
            }
        }

        let dx = |i: usize| (grid.positions[i + 1] - grid.positions[i]).meters();

        let mut braking = limits.clone();
        for i in (0..n - 1).rev() {
            let reachable = (braking[i + 1].powi(2) + 2.0 * stock.deceleration * dx(i)).sqrt();
            braking[i] = braking[i].min(reachable);
        }

        let acceleration = stock.acceleration * comfort.traction_factor();
        let mut speeds = vec![params.start_speed.max(0.0).min(braking[0]); n];
        for i in 1..n {
            let reachable = (speeds[i - 1].powi(2) + 2.0 * acceleration * dx(i - 1)).sqrt();
            speeds[i] = braking[i].min(reachable);
        }

        let mut points = Vec::with_capacity(n);
        let mut time = 0.0;
        points.push(EnvelopePoint {
            position: 0.0,
            speed: speeds[0],
            time,
        });
        for i in 1..n {
            let mean = speeds[i - 1] + speeds[i];
            time += if mean > 0.0 {
                2.0 * dx(i - 1) / mean
            } else {
                // Stopped at both ends of a single gap: accelerate, then brake.
                let limit = grid.gap_limits[i - 1];
                if !(limit > 0.0) {
                    return Err(EnvelopeError::Stalled(grid.positions[i - 1]));
                }
                hop_time(dx(i - 1), acceleration, stock.deceleration, limit)
            };
            points.push(EnvelopePoint {
                position: grid.positions[i].meters(),
                speed: speeds[i],
                time,
            });
        }
        Ok(Envelope::new(points))
    }
}
