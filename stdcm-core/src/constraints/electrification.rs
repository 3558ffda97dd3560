//! Electrification compatibility.

use super::{BlockConstraint, ConstraintKind};
use crate::domain::{DistanceRange, RangeSet, RollingStock};
use crate::infra::{Block, Infra};

/// Returns the sections of `block` the train can't run on because they are
/// powered at a voltage it doesn't support.
///
/// Neutral sections are carved out: power is cut there anyway, so any train
/// may coast through.
pub fn electrification_blocked_ranges(block: &Block, stock: &RollingStock) -> RangeSet {
    let neutral: RangeSet = block.neutral_sections.iter().copied().collect();
    let mut blocked = RangeSet::new();
    for section in &block.electrification {
        if section.range.is_empty() || stock.supports_mode(&section.voltage) {
            continue;
        }
        let bounds = DistanceRange {
            start: section.range.start,
            end: section.range.end.min(block.length),
        };
        blocked = blocked.union(&neutral.complement_within(bounds));
    }
    blocked
}

/// Electrification constraint for a rolling stock.
pub fn electrification_constraint<'a>(infra: &'a Infra, stock: &'a RollingStock) -> BlockConstraint<'a> {
    BlockConstraint::new(ConstraintKind::Electrification, move |block| {
        electrification_blocked_ranges(infra.block(block), stock)
    })
}
