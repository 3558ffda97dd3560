//! Errors surfaced by the STDCM search.

use crate::availability::AvailabilityError;
use crate::domain::BlockId;
use crate::envelope::EnvelopeError;

/// Error from an STDCM search.
///
/// Not finding a path is not an error: the search returns `Ok(None)`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StdcmError {
    /// The wall-clock budget ran out before the search converged
    #[error("pathfinding timed out")]
    Timeout,

    /// Invalid search request
    #[error("invalid stdcm request: {0}")]
    InvalidRequest(String),

    /// The availability provider failed
    #[error(transparent)]
    Availability(#[from] AvailabilityError),

    /// The envelope engine failed
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// The simulated schedule of the final path overlaps another train
    #[error("final schedule conflicts on block {block} between {start:.1}s and {end:.1}s")]
    ScheduleConflict { block: BlockId, start: f64, end: f64 },

    /// The simulated run time of the final path is over the limit
    #[error("run time {run_time:.1}s exceeds the maximum of {max_run_time:.1}s")]
    RunTimeExceeded { run_time: f64, max_run_time: f64 },
}
