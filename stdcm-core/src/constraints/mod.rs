//! Static block constraints.
//!
//! A constraint maps a block to the distance ranges of that block the rolling
//! stock can't use. Providers are plain closures tagged with the kind of
//! constraint they check; the combiner unions their answers.

mod electrification;
mod loading_gauge;
mod signaling;

use std::fmt;

use crate::domain::{BlockId, RangeSet, RollingStock};
use crate::infra::Infra;

pub use electrification::{electrification_blocked_ranges, electrification_constraint};
pub use loading_gauge::loading_gauge_constraint;
pub use signaling::signaling_constraint;

/// What a constraint checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    Electrification,
    LoadingGauge,
    Signaling,
}

/// A tagged "block to blocked ranges" function.
pub struct BlockConstraint<'a> {
    kind: ConstraintKind,
    blocked: Box<dyn Fn(BlockId) -> RangeSet + 'a>,
}

impl<'a> BlockConstraint<'a> {
    pub fn new(kind: ConstraintKind, blocked: impl Fn(BlockId) -> RangeSet + 'a) -> Self {
        Self {
            kind,
            blocked: Box::new(blocked),
        }
    }

    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    /// Returns the ranges of `block` this constraint forbids.
    pub fn blocked_ranges(&self, block: BlockId) -> RangeSet {
        (self.blocked)(block)
    }
}

impl fmt::Debug for BlockConstraint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockConstraint")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Union of several constraints.
#[derive(Debug, Default)]
pub struct ConstraintCombiner<'a> {
    constraints: Vec<BlockConstraint<'a>>,
}

impl<'a> ConstraintCombiner<'a> {
    pub fn new(constraints: Vec<BlockConstraint<'a>>) -> Self {
        Self { constraints }
    }

    pub fn push(&mut self, constraint: BlockConstraint<'a>) {
        self.constraints.push(constraint);
    }

    pub fn kinds(&self) -> impl Iterator<Item = ConstraintKind> + '_ {
        self.constraints.iter().map(|c| c.kind)
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Returns every range of `block` forbidden by at least one constraint.
    pub fn blocked_ranges(&self, block: BlockId) -> RangeSet {
        self.constraints
            .iter()
            .fold(RangeSet::new(), |acc, c| acc.union(&c.blocked_ranges(block)))
    }
}

/// Build the default constraints for a rolling stock on an infra.
pub fn init_constraints<'a>(infra: &'a Infra, stock: &'a RollingStock) -> ConstraintCombiner<'a> {
    ConstraintCombiner::new(vec![
        electrification_constraint(infra, stock),
        loading_gauge_constraint(infra, stock),
        signaling_constraint(infra, stock),
    ])
}

/// The whole length of a block, as a single range.
fn whole_block(infra: &Infra, block: BlockId) -> RangeSet {
    let length = infra.block(block).length;
    [crate::domain::DistanceRange {
        start: crate::domain::Distance::ZERO,
        end: length,
    }]
    .into_iter()
    .collect()
}
