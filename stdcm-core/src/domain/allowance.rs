//! Standard allowances (scheduled margins).

use serde::{Deserialize, Serialize};

/// Extra running time added on top of the fastest achievable run.
///
/// Both variants are linear in time and distance, so the margin of a whole
/// path is the sum of the margins of its parts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AllowanceValue {
    /// A percentage of the running time.
    Percentage { percentage: f64 },

    /// A number of minutes per 100 kilometers travelled.
    TimePerDistance { minutes_per_100km: f64 },
}

impl AllowanceValue {
    /// Returns the margin to add to a run of `base_time` seconds over
    /// `distance` meters.
    pub fn extra_time(&self, base_time: f64, distance: f64) -> f64 {
        match self {
            AllowanceValue::Percentage { percentage } => base_time * percentage / 100.0,
            AllowanceValue::TimePerDistance { minutes_per_100km } => {
                minutes_per_100km * 60.0 * distance / 100_000.0
            }
        }
    }

    /// Returns the running time once the margin is added.
    pub fn apply(&self, base_time: f64, distance: f64) -> f64 {
        base_time + self.extra_time(base_time, distance)
    }
}
