//! Shared fixtures for tests.

use crate::domain::{Distance, LoadingGauge, RollingStock, StepLocation};
use crate::infra::Infra;

fn stock(name: &str, mode: &str) -> RollingStock {
    RollingStock {
        name: name.to_string(),
        length: Distance::from_meters(200.0),
        max_speed: 44.0,
        acceleration: 0.5,
        deceleration: 0.5,
        modes: [mode.to_string()].into(),
        loading_gauge: LoadingGauge::GB,
        signaling_systems: vec![],
    }
}

/// A train running under 25000V catenary only.
pub fn electric_stock() -> RollingStock {
    stock("electric", "25000V")
}

/// A train with onboard power only.
pub fn thermal_stock() -> RollingStock {
    stock("thermal", "thermal")
}

/// Location on a block looked up by name.
pub fn at(infra: &Infra, block: &str, meters: f64) -> Vec<StepLocation> {
    let id = infra
        .block_id(block)
        .unwrap_or_else(|| panic!("no block named {block}"));
    vec![StepLocation::new(id, Distance::from_meters(meters))]
}
