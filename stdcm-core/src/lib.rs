//! Short-term train path search.
//!
//! Finds a path and schedule for one more train through a network whose
//! blocks are already partly booked, shifting the departure where needed so
//! the new train never enters a block while it is occupied.

pub mod availability;
pub mod constraints;
pub mod domain;
pub mod envelope;
pub mod infra;
pub mod scenario;
pub mod stdcm;
