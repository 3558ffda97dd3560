//! STDCM search: fitting one more train into an existing timetable.
//!
//! The search runs best-first over a graph whose edges traverse one block
//! each, under one timing hypothesis. Edges are built lazily from:
//!
//! - an explorer that enumerates block sequences while honoring the static
//!   constraints of the rolling stock,
//! - an envelope engine that turns distances into running times,
//! - the availability of each block, which decides how much the departure
//!   must be shifted for the train to slot in, or how much it must slow
//!   down on the way when the departure can't be shifted that much.
//!
//! The first node reaching the last step is post-processed into a result.

mod config;
mod delay;
mod edge_builder;
mod engineering;
mod error;
mod explorer;
mod graph;
mod heuristic;
mod node;
mod pathfinding;
mod postprocessing;
mod request;
mod result;
mod visited;

#[cfg(test)]
mod pathfinding_tests;
#[cfg(test)]
pub(crate) mod test_fixtures;

pub use config::StdcmConfig;
pub use delay::{DelayManager, Opening};
pub use error::StdcmError;
pub use explorer::{ExplorerHandle, InfraExplorer};
pub use heuristic::RemainingTimeEstimator;
pub use pathfinding::StdcmPlanner;
pub use request::StdcmRequest;
pub use result::{BlockOccupancy, BlockRange, PathStop, PathWaypoint, StdcmResult};
