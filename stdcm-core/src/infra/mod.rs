//! Block graph of the rail network.
//!
//! Blocks are the atomic signaling sections the search traverses. Each block
//! lists the blocks that can follow it, along with the static properties the
//! constraint providers and the envelope engine read.

mod builder;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{BlockId, Distance, DistanceRange, LoadingGauge};

pub use builder::{BlockSpec, InfraBuilder, InfraDescription};

/// A catenary section powered at a given voltage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Electrification {
    pub range: DistanceRange,
    pub voltage: String,
}

/// A signaling block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: BlockId,
    pub name: String,
    pub length: Distance,

    /// Line speed on the block (m/s).
    pub max_speed: f64,

    pub successors: Vec<BlockId>,
    pub electrification: Vec<Electrification>,

    /// Sections where catenary power is cut and trains coast through.
    pub neutral_sections: Vec<DistanceRange>,

    pub loading_gauge: LoadingGauge,
    pub signaling_system: String,
}

/// The block graph.
#[derive(Debug, Clone, Default)]
pub struct Infra {
    blocks: Vec<Block>,
    names: HashMap<String, BlockId>,
    predecessors: Vec<Vec<BlockId>>,
}

impl Infra {
    fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut predecessors = vec![Vec::new(); blocks.len()];
        for block in &blocks {
            for next in &block.successors {
                predecessors[next.index()].push(block.id);
            }
        }
        let names = blocks.iter().map(|b| (b.name.clone(), b.id)).collect();
        Self {
            blocks,
            names,
            predecessors,
        }
    }

    /// Returns the block with the given id.
    ///
    /// # Panics
    ///
    /// Panics if the id was not issued by this infra.
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    /// Returns the block with the given id, if it exists.
    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    /// Look up a block by name.
    pub fn block_id(&self, name: &str) -> Option<BlockId> {
        self.names.get(name).copied()
    }

    pub fn successors(&self, id: BlockId) -> &[BlockId] {
        &self.block(id).successors
    }

    pub fn predecessors(&self, id: BlockId) -> &[BlockId] {
        &self.predecessors[id.index()]
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns the highest line speed of the network, or zero when empty.
    pub fn max_line_speed(&self) -> f64 {
        self.blocks.iter().map(|b| b.max_speed).fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Infra {
        InfraBuilder::new()
            .block(BlockSpec::new("A", 1000.0).max_speed(30.0).next("B").next("C"))
            .block(BlockSpec::new("B", 500.0).max_speed(40.0).next("D"))
            .block(BlockSpec::new("C", 800.0).next("D"))
            .block(BlockSpec::new("D", 200.0))
            .build()
            .unwrap()
    }

    #[test]
    fn lookups() {
        let infra = sample();
        assert_eq!(infra.len(), 4);

        let a = infra.block_id("A").unwrap();
        let block = infra.block(a);
        assert_eq!(block.name, "A");
        assert_eq!(block.length, Distance::from_meters(1000.0));
        assert!(infra.block_id("Z").is_none());
        assert!(infra.get(BlockId(42)).is_none());
    }

    #[test]
    fn predecessors_mirror_successors() {
        let infra = sample();
        let id = |n| infra.block_id(n).unwrap();

        assert_eq!(infra.successors(id("A")), &[id("B"), id("C")]);
        assert_eq!(infra.predecessors(id("D")), &[id("B"), id("C")]);
        assert!(infra.predecessors(id("A")).is_empty());
    }

    #[test]
    fn max_line_speed() {
        assert_eq!(sample().max_line_speed(), 40.0);
        assert_eq!(Infra::default().max_line_speed(), 0.0);
    }
}
