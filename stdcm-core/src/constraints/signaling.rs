//! Signaling system compatibility.

use super::{BlockConstraint, ConstraintKind, whole_block};
use crate::domain::{RangeSet, RollingStock};
use crate::infra::Infra;

/// Blocks the whole block when the train isn't equipped for its signaling.
pub fn signaling_constraint<'a>(infra: &'a Infra, stock: &'a RollingStock) -> BlockConstraint<'a> {
    BlockConstraint::new(ConstraintKind::Signaling, move |block| {
        if stock.supports_signaling(&infra.block(block).signaling_system) {
            RangeSet::new()
        } else {
            whole_block(infra, block)
        }
    })
}
