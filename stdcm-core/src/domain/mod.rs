//! Domain types for the STDCM search.
//!
//! This module contains the core domain model types: distances and ranges
//! along blocks, rolling stock, path steps and allowances. Types validate
//! their invariants at construction where they have any.

mod allowance;
mod block_id;
mod distance;
mod error;
mod range;
mod rolling_stock;
mod step;

pub use allowance::AllowanceValue;
pub use block_id::BlockId;
pub use distance::Distance;
pub use error::DomainError;
pub use range::{DistanceRange, RangeSet};
pub use rolling_stock::{Comfort, LoadingGauge, RollingStock};
pub use step::{StdcmStep, StepLocation};
