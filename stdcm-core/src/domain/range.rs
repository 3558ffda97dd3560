//! Distance ranges along a block.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Distance, DomainError};

/// A half-open range `[start, end)` of offsets along a block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistanceRange {
    pub start: Distance,
    pub end: Distance,
}

impl DistanceRange {
    /// Create a range, rejecting reversed bounds.
    pub fn new(start: Distance, end: Distance) -> Result<Self, DomainError> {
        if end < start {
            return Err(DomainError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Create a range from meter bounds.
    pub fn meters(start: f64, end: f64) -> Result<Self, DomainError> {
        Self::new(Distance::from_meters(start), Distance::from_meters(end))
    }

    /// Returns true if the range covers no distance.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Returns the length of the range.
    pub fn length(&self) -> Distance {
        self.end - self.start
    }

    /// Returns true if `offset` lies within `[start, end)`.
    pub fn contains(&self, offset: Distance) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Returns true if the range shares a positive length with the closed
    /// span `[from, to]`, or contains `from` when the span is a single point.
    pub fn intersects(&self, from: Distance, to: Distance) -> bool {
        if from == to {
            return self.contains(from);
        }
        self.start < to && from < self.end
    }
}

impl fmt::Debug for DistanceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A set of disjoint, sorted, non-empty distance ranges.
///
/// Touching or overlapping ranges are merged on insertion.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<DistanceRange>,
}

impl RangeSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ranges in increasing order.
    pub fn ranges(&self) -> &[DistanceRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Add a range to the set, merging it with its neighbours.
    pub fn insert(&mut self, range: DistanceRange) {
        if range.is_empty() {
            return;
        }
        let mut merged = range;
        let mut kept = Vec::with_capacity(self.ranges.len() + 1);
        let mut placed = false;
        for existing in self.ranges.drain(..) {
            if existing.end < merged.start {
                kept.push(existing);
            } else if merged.end < existing.start {
                if !placed {
                    kept.push(merged);
                    placed = true;
                }
                kept.push(existing);
            } else {
                merged.start = merged.start.min(existing.start);
                merged.end = merged.end.max(existing.end);
            }
        }
        if !placed {
            kept.push(merged);
        }
        self.ranges = kept;
    }

    /// Returns the union of both sets.
    pub fn union(&self, other: &RangeSet) -> RangeSet {
        let mut res = self.clone();
        for range in &other.ranges {
            res.insert(*range);
        }
        res
    }

    /// Returns the parts of `bounds` not covered by this set.
    pub fn complement_within(&self, bounds: DistanceRange) -> RangeSet {
        let mut res = RangeSet::new();
        let mut cursor = bounds.start;
        for range in &self.ranges {
            if range.end <= cursor {
                continue;
            }
            if range.start >= bounds.end {
                break;
            }
            if range.start > cursor {
                res.insert(DistanceRange {
                    start: cursor,
                    end: range.start,
                });
            }
            cursor = cursor.max(range.end);
        }
        if cursor < bounds.end {
            res.insert(DistanceRange {
                start: cursor,
                end: bounds.end,
            });
        }
        res
    }

    /// Returns true if some range contains `offset`.
    pub fn contains(&self, offset: Distance) -> bool {
        self.ranges.iter().any(|r| r.contains(offset))
    }

    /// Returns true if some range intersects the closed span `[from, to]`.
    pub fn intersects(&self, from: Distance, to: Distance) -> bool {
        self.ranges.iter().any(|r| r.intersects(from, to))
    }
}

impl FromIterator<DistanceRange> for RangeSet {
    fn from_iter<I: IntoIterator<Item = DistanceRange>>(iter: I) -> Self {
        let mut set = RangeSet::new();
        for range in iter {
            set.insert(range);
        }
        set
    }
}

impl fmt::Debug for RangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ranges.iter()).finish()
    }
}
