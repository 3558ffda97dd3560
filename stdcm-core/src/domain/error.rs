//! Domain error types.
//!
//! These errors represent validation failures when building infrastructure
//! and rolling stock descriptions. They are distinct from search errors.

use super::Distance;

/// Domain-level errors for validation and data consistency.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// A block name was referenced but never declared
    #[error("unknown block: {0}")]
    UnknownBlock(String),

    /// Two blocks were declared with the same name
    #[error("duplicate block: {0}")]
    DuplicateBlock(String),

    /// A block has a zero or negative length
    #[error("block {0} must have a positive length")]
    InvalidLength(String),

    /// A range ends before it starts
    #[error("invalid range: [{start}, {end})")]
    InvalidRange { start: Distance, end: Distance },

    /// Rolling stock parameters can't be simulated
    #[error("invalid rolling stock: {0}")]
    InvalidRollingStock(&'static str),
}
