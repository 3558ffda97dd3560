//! Recognizing equivalent edges.

use std::collections::HashMap;

use crate::domain::BlockId;

/// What makes two edges interchangeable for the rest of the search.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub block: BlockId,
    pub lookahead: Vec<BlockId>,
    pub start_offset_mm: i64,
    pub end_offset_mm: i64,
    pub waypoint_index: usize,
    pub time_bucket: i64,
}

/// Fingerprints already seen, with the best departure slack they had.
#[derive(Debug)]
pub struct VisitedEdges {
    bucket_secs: f64,
    seen: HashMap<Fingerprint, f64>,
}

impl VisitedEdges {
    pub fn new(bucket_secs: f64) -> Self {
        Self {
            bucket_secs: bucket_secs.max(f64::MIN_POSITIVE),
            seen: HashMap::new(),
        }
    }

    /// Bucket index of an absolute time.
    pub fn bucket(&self, time: f64) -> i64 {
        (time / self.bucket_secs).floor() as i64
    }

    /// Record the fingerprint and returns true if an equivalent edge with at
    /// least as much slack was seen before.
    pub fn check_and_mark(&mut self, fingerprint: Fingerprint, slack: f64) -> bool {
        match self.seen.get_mut(&fingerprint) {
            Some(best) if *best >= slack => true,
            Some(best) => {
                *best = slack;
                false
            }
            None => {
                self.seen.insert(fingerprint, slack);
                false
            }
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.seen.len()
    }
}
