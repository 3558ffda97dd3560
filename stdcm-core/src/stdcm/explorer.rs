//! Lazy exploration of block sequences.
//!
//! Every path prefix the search ever considers is stored once in an arena.
//! A handle points at a prefix and tells how many of its last blocks are
//! lookahead: blocks already chosen but not traversed yet. Extending a
//! prefix is memoized, so all search branches sharing a prefix share its
//! extensions.

use std::collections::{HashMap, VecDeque};

use crate::constraints::ConstraintCombiner;
use crate::domain::{BlockId, Distance, RangeSet};
use crate::infra::Infra;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PrefixId(u32);

#[derive(Debug)]
struct Prefix {
    block: BlockId,
    parent: Option<PrefixId>,
    children: Option<Vec<PrefixId>>,
}

/// A position in the explored prefixes.
///
/// The current block is `ahead` blocks before the tip of the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExplorerHandle {
    tip: PrefixId,
    ahead: usize,
}

impl ExplorerHandle {
    /// Number of lookahead blocks after the current one.
    pub fn ahead(&self) -> usize {
        self.ahead
    }
}

/// Arena of explored path prefixes.
pub struct InfraExplorer<'a> {
    infra: &'a Infra,
    constraints: &'a ConstraintCombiner<'a>,
    prefixes: Vec<Prefix>,
    roots: HashMap<BlockId, PrefixId>,
    blocked: HashMap<BlockId, RangeSet>,
}

impl<'a> InfraExplorer<'a> {
    pub fn new(infra: &'a Infra, constraints: &'a ConstraintCombiner<'a>) -> Self {
        Self {
            infra,
            constraints,
            prefixes: Vec::new(),
            roots: HashMap::new(),
            blocked: HashMap::new(),
        }
    }

    fn alloc(&mut self, block: BlockId, parent: Option<PrefixId>) -> PrefixId {
        let id = PrefixId(self.prefixes.len() as u32);
        self.prefixes.push(Prefix {
            block,
            parent,
            children: None,
        });
        id
    }

    fn prefix(&self, id: PrefixId) -> &Prefix {
        &self.prefixes[id.0 as usize]
    }

    /// Handle on a path made of a single block.
    pub fn start(&mut self, block: BlockId) -> ExplorerHandle {
        let tip = match self.roots.get(&block) {
            Some(&id) => id,
            None => {
                let id = self.alloc(block, None);
                self.roots.insert(block, id);
                id
            }
        };
        ExplorerHandle { tip, ahead: 0 }
    }

    /// Walk `steps` parents up from `id`.
    fn ancestor(&self, mut id: PrefixId, steps: usize) -> PrefixId {
        for _ in 0..steps {
            match self.prefix(id).parent {
                Some(parent) => id = parent,
                None => break,
            }
        }
        id
    }

    /// The block the handle is currently on.
    pub fn current_block(&self, handle: ExplorerHandle) -> BlockId {
        self.prefix(self.ancestor(handle.tip, handle.ahead)).block
    }

    /// Blocks after the current one, in path order.
    pub fn lookahead(&self, handle: ExplorerHandle) -> Vec<BlockId> {
        let mut blocks = Vec::with_capacity(handle.ahead);
        let mut id = handle.tip;
        for _ in 0..handle.ahead {
            let prefix = self.prefix(id);
            blocks.push(prefix.block);
            match prefix.parent {
                Some(parent) => id = parent,
                None => break,
            }
        }
        blocks.reverse();
        blocks
    }

    /// Every block of the prefix, lookahead included, from the first one.
    pub fn path_blocks(&self, handle: ExplorerHandle) -> Vec<BlockId> {
        let mut blocks = Vec::new();
        let mut id = Some(handle.tip);
        while let Some(current) = id {
            let prefix = self.prefix(current);
            blocks.push(prefix.block);
            id = prefix.parent;
        }
        blocks.reverse();
        blocks
    }

    fn prefix_contains(&self, tip: PrefixId, block: BlockId) -> bool {
        let mut id = Some(tip);
        while let Some(current) = id {
            let prefix = self.prefix(current);
            if prefix.block == block {
                return true;
            }
            id = prefix.parent;
        }
        false
    }

    /// Ranges of `block` the rolling stock can't use. Cached per block.
    pub fn blocked_ranges(&mut self, block: BlockId) -> RangeSet {
        if let Some(ranges) = self.blocked.get(&block) {
            return ranges.clone();
        }
        let ranges = self.constraints.blocked_ranges(block);
        self.blocked.insert(block, ranges.clone());
        ranges
    }

    /// Add one block at the tip of the prefix, for every usable successor.
    ///
    /// A successor is unusable when it already appears in the prefix or when
    /// the train can't even enter it.
    pub fn extend(&mut self, handle: ExplorerHandle) -> Vec<ExplorerHandle> {
        let children = match &self.prefix(handle.tip).children {
            Some(children) => children.clone(),
            None => {
                let tip_block = self.prefix(handle.tip).block;
                let mut children = Vec::new();
                for &next in self.infra.successors(tip_block) {
                    if self.prefix_contains(handle.tip, next) {
                        continue;
                    }
                    if self.blocked_ranges(next).contains(Distance::ZERO) {
                        continue;
                    }
                    children.push(self.alloc(next, Some(handle.tip)));
                }
                self.prefixes[handle.tip.0 as usize].children = Some(children.clone());
                children
            }
        };
        children
            .into_iter()
            .map(|tip| ExplorerHandle {
                tip,
                ahead: handle.ahead + 1,
            })
            .collect()
    }

    /// Total length of the lookahead blocks.
    pub fn lookahead_length(&self, handle: ExplorerHandle) -> Distance {
        self.lookahead(handle)
            .into_iter()
            .fold(Distance::ZERO, |acc, b| acc + self.infra.block(b).length)
    }

    /// Extend until every handle looks at least `blocks` blocks and
    /// `distance` ahead, or can't go further.
    pub fn extend_until(
        &mut self,
        handle: ExplorerHandle,
        blocks: usize,
        distance: Distance,
    ) -> Vec<ExplorerHandle> {
        let mut done = Vec::new();
        let mut pending = VecDeque::from([handle]);
        while let Some(current) = pending.pop_front() {
            if current.ahead >= blocks && self.lookahead_length(current) >= distance {
                done.push(current);
                continue;
            }
            let next = self.extend(current);
            if next.is_empty() {
                done.push(current);
            } else {
                pending.extend(next);
            }
        }
        done
    }

    /// Move to the next block of the lookahead.
    pub fn move_forward(&self, handle: ExplorerHandle) -> Option<ExplorerHandle> {
        (handle.ahead > 0).then(|| ExplorerHandle {
            tip: handle.tip,
            ahead: handle.ahead - 1,
        })
    }

    /// Number of prefixes allocated so far.
    pub fn explored(&self) -> usize {
        self.prefixes.len()
    }
}
