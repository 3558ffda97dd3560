//! JSON scenario files for the command line runner.
//!
//! A scenario bundles everything a search needs: the network, the train,
//! the steps, and the occupancies already booked. Blocks are referred to by
//! name throughout.

use std::path::Path;

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::availability::OccupancyTable;
use crate::domain::{AllowanceValue, Comfort, Distance, DomainError, RollingStock, StdcmStep, StepLocation};
use crate::infra::{Infra, InfraDescription};
use crate::stdcm::StdcmRequest;

/// Errors that can occur when loading a scenario.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed scenario: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[derive(Debug, Clone, Deserialize)]
struct LocationDescription {
    block: String,
    offset: Distance,
}

#[derive(Debug, Clone, Deserialize)]
struct StepDescription {
    locations: Vec<LocationDescription>,
    #[serde(default)]
    stop: bool,
    #[serde(default)]
    stop_duration: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct OccupancyDescription {
    block: String,
    start: f64,
    end: f64,
}

/// On-disk layout of a scenario.
#[derive(Debug, Clone, Deserialize)]
struct ScenarioFile {
    #[serde(default)]
    reference_time: Option<NaiveDateTime>,
    infra: InfraDescription,
    rolling_stock: RollingStock,
    #[serde(default)]
    comfort: Comfort,
    steps: Vec<StepDescription>,
    #[serde(default)]
    start_time: f64,
    #[serde(default)]
    max_departure_delay: f64,
    max_run_time: f64,
    #[serde(default)]
    time_step: Option<f64>,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    standard_allowance: Option<AllowanceValue>,
    #[serde(default)]
    pathfinding_timeout: Option<f64>,
    #[serde(default)]
    occupancies: Vec<OccupancyDescription>,
}

/// A loaded scenario, with names resolved.
#[derive(Debug)]
pub struct Scenario {
    pub infra: Infra,
    pub request: StdcmRequest,
    pub occupancies: OccupancyTable,

    /// Instant that request times are counted from, if the file gives one.
    pub reference_time: Option<NaiveDateTime>,
}

impl Scenario {
    /// Load a scenario from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse a scenario from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        let file: ScenarioFile = serde_json::from_str(json)?;
        let infra = file.infra.build()?;

        let resolve = |name: &str| {
            infra
                .block_id(name)
                .ok_or_else(|| DomainError::UnknownBlock(name.to_string()))
        };

        let steps = file
            .steps
            .iter()
            .map(|step| -> Result<StdcmStep, DomainError> {
                let locations = step
                    .locations
                    .iter()
                    .map(|loc| Ok(StepLocation::new(resolve(&loc.block)?, loc.offset)))
                    .collect::<Result<Vec<_>, DomainError>>()?;
                Ok(if step.stop {
                    StdcmStep::stop(locations, step.stop_duration)
                } else {
                    StdcmStep::pass(locations)
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        let mut occupancies = OccupancyTable::new();
        for occupancy in &file.occupancies {
            occupancies.occupy(resolve(&occupancy.block)?, occupancy.start, occupancy.end);
        }

        let mut request = StdcmRequest::new(file.rolling_stock, steps, file.max_run_time)
            .start_time(file.start_time)
            .max_departure_delay(file.max_departure_delay)
            .comfort(file.comfort);
        if let Some(time_step) = file.time_step {
            request.time_step = time_step;
        }
        if let Some(timeout) = file.pathfinding_timeout {
            request = request.pathfinding_timeout(timeout);
        }
        request.tag = file.tag;
        request.standard_allowance = file.standard_allowance;

        Ok(Self {
            infra,
            request,
            occupancies,
            reference_time: file.reference_time,
        })
    }
}
