//! Rolling stock characteristics used by the search.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{Distance, DomainError};

/// Loading gauges, from the most to the least restrictive.
///
/// A train fits on a block when its gauge is no larger than the block's.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LoadingGauge {
    G1,
    G2,
    GA,
    #[default]
    GB,
    GB1,
    GC,
}

/// Train comfort setting, which reduces the traction available for running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Comfort {
    #[default]
    Standard,
    AirConditioning,
    Heating,
}

impl Comfort {
    /// Share of the nominal acceleration available under this setting.
    pub fn traction_factor(self) -> f64 {
        match self {
            Comfort::Standard => 1.0,
            Comfort::AirConditioning => 0.95,
            Comfort::Heating => 0.93,
        }
    }
}

/// Physical and electrical profile of a train.
///
/// Accelerations are constant approximations of the traction and braking
/// curves, in m/s². Speeds are in m/s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingStock {
    pub name: String,

    pub length: Distance,

    /// Maximum speed of the train (m/s).
    pub max_speed: f64,

    /// Acceleration under full traction (m/s²).
    pub acceleration: f64,

    /// Comfortable service braking deceleration, as a positive value (m/s²).
    pub deceleration: f64,

    /// Supported power modes: catenary voltages such as `"25000V"`, and
    /// `"thermal"` for onboard power.
    #[serde(default)]
    pub modes: BTreeSet<String>,

    #[serde(default)]
    pub loading_gauge: LoadingGauge,

    /// Signaling systems the train is equipped for. Empty means no restriction.
    #[serde(default)]
    pub signaling_systems: Vec<String>,
}

impl RollingStock {
    /// Check that the train can be simulated.
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(self.max_speed > 0.0) {
            return Err(DomainError::InvalidRollingStock(
                "max speed must be positive",
            ));
        }
        if !(self.acceleration > 0.0) {
            return Err(DomainError::InvalidRollingStock(
                "acceleration must be positive",
            ));
        }
        if !(self.deceleration > 0.0) {
            return Err(DomainError::InvalidRollingStock(
                "deceleration must be positive",
            ));
        }
        if self.length < Distance::ZERO {
            return Err(DomainError::InvalidRollingStock(
                "length must not be negative",
            ));
        }
        Ok(())
    }

    /// Distance needed to brake from `speed` to a standstill.
    pub fn braking_distance(&self, speed: f64) -> Distance {
        if !(self.deceleration > 0.0) {
            return Distance::ZERO;
        }
        Distance::from_meters(speed * speed / (2.0 * self.deceleration))
    }

    /// Returns true if the train can draw power from the given catenary voltage.
    pub fn supports_mode(&self, mode: &str) -> bool {
        self.modes.contains(mode)
    }

    /// Returns true if the train is only powered by onboard engines.
    pub fn is_thermal_only(&self) -> bool {
        self.modes.len() == 1 && self.modes.contains("thermal")
    }

    /// Returns true if the train may run under the given signaling system.
    pub fn supports_signaling(&self, system: &str) -> bool {
        self.signaling_systems.is_empty() || self.signaling_systems.iter().any(|s| s == system)
    }
}
