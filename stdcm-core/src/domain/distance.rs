//! Track distances.
//!
//! Offsets along blocks and paths are stored as whole millimeters so that
//! range arithmetic and block boundaries compare exactly. They are read and
//! written as meters.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

/// A distance or offset along the track, with millimeter precision.
///
/// # Examples
///
/// ```
/// use stdcm_core::domain::Distance;
///
/// let d = Distance::from_meters(12.5);
/// assert_eq!(d.millis(), 12_500);
/// assert_eq!(d.meters(), 12.5);
/// assert_eq!(d.to_string(), "12.500m");
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Distance(i64);

impl Distance {
    /// The zero distance.
    pub const ZERO: Distance = Distance(0);

    /// Create a distance from a number of millimeters.
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Create a distance from meters, rounded to the nearest millimeter.
    pub fn from_meters(meters: f64) -> Self {
        Self((meters * 1000.0).round() as i64)
    }

    /// Returns the distance in millimeters.
    pub const fn millis(self) -> i64 {
        self.0
    }

    /// Returns the distance in meters.
    pub fn meters(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Split `self` into `parts` equal pieces and return the end of piece `i`.
    ///
    /// Computed in whole millimeters, so the same span always yields the same
    /// cut points wherever it starts.
    pub fn fraction(self, i: i64, parts: i64) -> Distance {
        Distance(self.0 * i / parts)
    }
}

impl From<f64> for Distance {
    fn from(meters: f64) -> Self {
        Self::from_meters(meters)
    }
}

impl From<Distance> for f64 {
    fn from(distance: Distance) -> Self {
        distance.meters()
    }
}

impl Add for Distance {
    type Output = Distance;

    fn add(self, rhs: Distance) -> Distance {
        Distance(self.0 + rhs.0)
    }
}

impl AddAssign for Distance {
    fn add_assign(&mut self, rhs: Distance) {
        self.0 += rhs.0;
    }
}

impl Sub for Distance {
    type Output = Distance;

    fn sub(self, rhs: Distance) -> Distance {
        Distance(self.0 - rhs.0)
    }
}

impl fmt::Debug for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Distance({}mm)", self.0)
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}m", self.meters())
    }
}
