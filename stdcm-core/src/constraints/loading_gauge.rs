//! Loading gauge compatibility.

use super::{BlockConstraint, ConstraintKind, whole_block};
use crate::domain::{RangeSet, RollingStock};
use crate::infra::Infra;

/// Blocks the whole block when the train is larger than the block allows.
pub fn loading_gauge_constraint<'a>(infra: &'a Infra, stock: &'a RollingStock) -> BlockConstraint<'a> {
    BlockConstraint::new(ConstraintKind::LoadingGauge, move |block| {
        if stock.loading_gauge > infra.block(block).loading_gauge {
            whole_block(infra, block)
        } else {
            RangeSet::new()
        }
    })
}
