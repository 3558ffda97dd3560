//! Search configuration for the STDCM planner.

use chrono::Duration;

use crate::envelope::MaxEffortEngine;

/// Tunables of the STDCM search.
///
/// Request-specific parameters live in [`StdcmRequest`](super::StdcmRequest);
/// these are the knobs that stay the same across requests.
#[derive(Debug, Clone)]
pub struct StdcmConfig {
    /// Minimum number of blocks the explorer looks ahead of the current
    /// one. The lookahead also always spans the train's braking distance.
    pub lookahead_blocks: usize,

    /// Width of the time buckets used to recognize equivalent edges (seconds).
    pub visited_bucket_secs: i64,

    /// Maximum number of availability openings tried per block traversal.
    pub max_openings: usize,

    /// Smallest simulation grid spacing (meters).
    pub min_simulation_step_m: f64,

    /// Largest simulation grid spacing (meters).
    pub max_simulation_step_m: f64,
}

impl StdcmConfig {
    /// Create a new configuration with the given parameters.
    pub fn new(
        lookahead_blocks: usize,
        visited_bucket_secs: i64,
        max_openings: usize,
        min_simulation_step_m: f64,
        max_simulation_step_m: f64,
    ) -> Self {
        Self {
            lookahead_blocks,
            visited_bucket_secs,
            max_openings,
            min_simulation_step_m,
            max_simulation_step_m,
        }
    }

    /// Returns the visited-state time bucket as a Duration.
    pub fn visited_bucket(&self) -> Duration {
        Duration::seconds(self.visited_bucket_secs)
    }

    /// Returns an envelope engine using the configured grid spacing.
    pub fn envelope_engine(&self) -> MaxEffortEngine {
        MaxEffortEngine::new(self.min_simulation_step_m, self.max_simulation_step_m)
    }
}

impl Default for StdcmConfig {
    fn default() -> Self {
        Self {
            lookahead_blocks: 3,
            visited_bucket_secs: 60,
            max_openings: 32,
            min_simulation_step_m: 1.0,
            max_simulation_step_m: 50.0,
        }
    }
}
