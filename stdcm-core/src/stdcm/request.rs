//! STDCM search requests.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::StdcmError;
use crate::domain::{AllowanceValue, Comfort, Distance, RollingStock, StdcmStep};
use crate::infra::Infra;

const DEFAULT_TIME_STEP: f64 = 2.0;
const DEFAULT_PATHFINDING_TIMEOUT: f64 = 120.0;

fn default_time_step() -> f64 {
    DEFAULT_TIME_STEP
}

fn default_pathfinding_timeout() -> f64 {
    DEFAULT_PATHFINDING_TIMEOUT
}

/// A request for a single train path fitted into the existing capacity.
///
/// Times are in seconds, relative to the same reference as the
/// availability provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdcmRequest {
    pub rolling_stock: RollingStock,

    #[serde(default)]
    pub comfort: Comfort,

    /// Steps in visiting order. The first is the origin, the last a stop.
    pub steps: Vec<StdcmStep>,

    /// Earliest departure time.
    #[serde(default)]
    pub start_time: f64,

    /// How much later than `start_time` the train may leave.
    #[serde(default)]
    pub max_departure_delay: f64,

    /// Upper bound on the run time, stops included.
    pub max_run_time: f64,

    /// Simulation time step.
    #[serde(default = "default_time_step")]
    pub time_step: f64,

    #[serde(default)]
    pub tag: Option<String>,

    #[serde(default)]
    pub standard_allowance: Option<AllowanceValue>,

    /// Wall-clock budget of the search.
    #[serde(default = "default_pathfinding_timeout")]
    pub pathfinding_timeout: f64,
}

impl StdcmRequest {
    /// Create a request leaving at time zero, with no departure flexibility.
    pub fn new(rolling_stock: RollingStock, steps: Vec<StdcmStep>, max_run_time: f64) -> Self {
        Self {
            rolling_stock,
            comfort: Comfort::default(),
            steps,
            start_time: 0.0,
            max_departure_delay: 0.0,
            max_run_time,
            time_step: DEFAULT_TIME_STEP,
            tag: None,
            standard_allowance: None,
            pathfinding_timeout: DEFAULT_PATHFINDING_TIMEOUT,
        }
    }

    pub fn start_time(mut self, start_time: f64) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn max_departure_delay(mut self, delay: f64) -> Self {
        self.max_departure_delay = delay;
        self
    }

    pub fn comfort(mut self, comfort: Comfort) -> Self {
        self.comfort = comfort;
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }

    pub fn standard_allowance(mut self, allowance: AllowanceValue) -> Self {
        self.standard_allowance = Some(allowance);
        self
    }

    pub fn pathfinding_timeout(mut self, seconds: f64) -> Self {
        self.pathfinding_timeout = seconds;
        self
    }

    /// Index of the last step.
    pub fn last_step(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    /// Stop duration of a step, counted only for intermediate stops.
    pub fn stop_duration(&self, step: usize) -> f64 {
        match self.steps.get(step) {
            Some(s) if s.stop && step != self.last_step() => s.stop_duration,
            _ => 0.0,
        }
    }

    /// Returns the wall-clock budget as a Duration.
    pub fn timeout(&self) -> Result<Duration, StdcmError> {
        Duration::try_from_secs_f64(self.pathfinding_timeout).map_err(|_| {
            StdcmError::InvalidRequest(format!(
                "invalid pathfinding timeout: {}",
                self.pathfinding_timeout
            ))
        })
    }

    /// Validate the request against the infra it will run on.
    pub fn validate(&self, infra: &Infra) -> Result<(), StdcmError> {
        let invalid = |msg: String| Err(StdcmError::InvalidRequest(msg));

        if self.steps.len() < 2 {
            return invalid("at least an origin and a destination are required".to_string());
        }
        if !self.steps[self.last_step()].stop {
            return invalid("the last step must be a stop".to_string());
        }
        for (idx, step) in self.steps.iter().enumerate() {
            if step.locations.is_empty() {
                return invalid(format!("step {idx} has no location"));
            }
            if !(step.stop_duration >= 0.0) {
                return invalid(format!("step {idx} has a negative stop duration"));
            }
            for loc in &step.locations {
                let Some(block) = infra.get(loc.block) else {
                    return invalid(format!("step {idx} is on unknown block {}", loc.block));
                };
                if loc.offset < Distance::ZERO || loc.offset > block.length {
                    return invalid(format!(
                        "step {idx} offset {} is outside block {}",
                        loc.offset, block.name
                    ));
                }
            }
        }

        if !(self.time_step > 0.0) {
            return invalid("time step must be positive".to_string());
        }
        if !(self.max_run_time > 0.0) {
            return invalid("maximum run time must be positive".to_string());
        }
        if !(self.max_departure_delay >= 0.0) {
            return invalid("maximum departure delay must not be negative".to_string());
        }
        if !self.start_time.is_finite() {
            return invalid("start time must be finite".to_string());
        }
        self.timeout()?;

        self.rolling_stock
            .validate()
            .map_err(|e| StdcmError::InvalidRequest(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BlockId, StepLocation};
    use crate::infra::{BlockSpec, InfraBuilder};
    use crate::stdcm::test_fixtures::electric_stock;

    fn infra() -> Infra {
        InfraBuilder::new()
            .block(BlockSpec::new("A", 1000.0).next("B"))
            .block(BlockSpec::new("B", 500.0))
            .build()
            .unwrap()
    }

    fn at(block: u32, meters: f64) -> Vec<StepLocation> {
        vec![StepLocation::new(BlockId(block), Distance::from_meters(meters))]
    }

    fn request() -> StdcmRequest {
        StdcmRequest::new(
            electric_stock(),
            vec![StdcmStep::pass(at(0, 0.0)), StdcmStep::stop(at(1, 500.0), 0.0)],
            3600.0,
        )
    }

    fn message(request: &StdcmRequest) -> String {
        match request.validate(&infra()) {
            Err(StdcmError::InvalidRequest(msg)) => msg,
            other => panic!("expected an invalid request, got {other:?}"),
        }
    }

    #[test]
    fn valid_request() {
        assert!(request().validate(&infra()).is_ok());
    }

    #[test]
    fn step_rules() {
        let mut r = request();
        r.steps.truncate(1);
        assert!(message(&r).contains("origin and a destination"));

        let mut r = request();
        r.steps[1].stop = false;
        assert_eq!(message(&r), "the last step must be a stop");

        let mut r = request();
        r.steps[0].locations.clear();
        assert_eq!(message(&r), "step 0 has no location");

        let mut r = request();
        r.steps[1].locations = at(7, 0.0);
        assert_eq!(message(&r), "step 1 is on unknown block #7");

        let mut r = request();
        r.steps[1].locations = at(1, 600.0);
        assert_eq!(message(&r), "step 1 offset 600.000m is outside block B");
    }

    #[test]
    fn numeric_rules() {
        assert!(message(&request().max_departure_delay(-1.0)).contains("departure delay"));
        assert!(message(&StdcmRequest { time_step: 0.0, ..request() }).contains("time step"));
        assert!(message(&StdcmRequest { max_run_time: f64::NAN, ..request() }).contains("run time"));
        assert!(message(&request().pathfinding_timeout(-3.0)).contains("timeout"));

        let mut r = request();
        r.rolling_stock.acceleration = 0.0;
        assert!(message(&r).contains("acceleration"));
    }

    #[test]
    fn only_intermediate_stops_count() {
        let r = StdcmRequest::new(
            electric_stock(),
            vec![
                StdcmStep::pass(at(0, 0.0)),
                StdcmStep::stop(at(0, 500.0), 60.0),
                StdcmStep::pass(at(1, 100.0)),
                StdcmStep::stop(at(1, 500.0), 300.0),
            ],
            3600.0,
        );
        assert_eq!(r.stop_duration(1), 60.0);
        assert_eq!(r.stop_duration(2), 0.0);
        assert_eq!(r.stop_duration(3), 0.0);
    }

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{
            "rolling_stock": {
                "name": "loco", "length": 20.0, "max_speed": 40.0,
                "acceleration": 0.4, "deceleration": 0.6, "modes": ["thermal"]
            },
            "steps": [
                {"locations": [{"block": 0, "offset": 0.0}]},
                {"locations": [{"block": 1, "offset": 500.0}], "stop": true}
            ],
            "max_run_time": 900.0,
            "standard_allowance": {"type": "percentage", "percentage": 5.0}
        }"#;
        let r: StdcmRequest = serde_json::from_str(json).unwrap();

        assert_eq!(r.pathfinding_timeout, 120.0);
        assert_eq!(r.timeout().unwrap(), Duration::from_secs(120));
        assert_eq!(r.time_step, 2.0);
        assert_eq!(r.comfort, Comfort::Standard);
        assert!(r.validate(&infra()).is_ok());
    }
}
