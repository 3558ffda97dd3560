//! Building an [`Infra`] from named block descriptions.
//!
//! Descriptions refer to each other by name, which keeps them readable in
//! scenario files and tests. Names are resolved to ids when building.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Block, Electrification, Infra};
use crate::domain::{BlockId, Distance, DistanceRange, DomainError, LoadingGauge};

const DEFAULT_MAX_SPEED: f64 = 30.0;

fn default_max_speed() -> f64 {
    DEFAULT_MAX_SPEED
}

fn default_signaling_system() -> String {
    "BAL".to_string()
}

/// Description of a block, with its successors given by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub name: String,
    pub length: Distance,

    #[serde(default = "default_max_speed")]
    pub max_speed: f64,

    #[serde(default)]
    pub successors: Vec<String>,

    #[serde(default)]
    pub electrification: Vec<Electrification>,

    #[serde(default)]
    pub neutral_sections: Vec<DistanceRange>,

    #[serde(default)]
    pub loading_gauge: LoadingGauge,

    #[serde(default = "default_signaling_system")]
    pub signaling_system: String,
}

impl BlockSpec {
    /// Create a block description of the given length in meters.
    pub fn new(name: &str, length_meters: f64) -> Self {
        Self {
            name: name.to_string(),
            length: Distance::from_meters(length_meters),
            max_speed: DEFAULT_MAX_SPEED,
            successors: Vec::new(),
            electrification: Vec::new(),
            neutral_sections: Vec::new(),
            loading_gauge: LoadingGauge::default(),
            signaling_system: default_signaling_system(),
        }
    }

    /// Set the line speed (m/s).
    pub fn max_speed(mut self, speed: f64) -> Self {
        self.max_speed = speed;
        self
    }

    /// Add a successor block.
    pub fn next(mut self, name: &str) -> Self {
        self.successors.push(name.to_string());
        self
    }

    /// Add a catenary section.
    pub fn electrified(mut self, range: DistanceRange, voltage: &str) -> Self {
        self.electrification.push(Electrification {
            range,
            voltage: voltage.to_string(),
        });
        self
    }

    /// Add a neutral section.
    pub fn neutral_section(mut self, range: DistanceRange) -> Self {
        self.neutral_sections.push(range);
        self
    }

    pub fn loading_gauge(mut self, gauge: LoadingGauge) -> Self {
        self.loading_gauge = gauge;
        self
    }

    pub fn signaling_system(mut self, system: &str) -> Self {
        self.signaling_system = system.to_string();
        self
    }
}

/// Serializable description of a whole network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfraDescription {
    pub blocks: Vec<BlockSpec>,
}

impl InfraDescription {
    /// Resolve names and build the block graph.
    pub fn build(self) -> Result<Infra, DomainError> {
        InfraBuilder { specs: self.blocks }.build()
    }
}

/// Builder for an [`Infra`].
///
/// Provides a fluent API for adding blocks.
#[derive(Debug, Default)]
pub struct InfraBuilder {
    specs: Vec<BlockSpec>,
}

impl InfraBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block.
    pub fn block(mut self, spec: BlockSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Build the infra, resolving successor names.
    pub fn build(self) -> Result<Infra, DomainError> {
        let mut ids: HashMap<&str, BlockId> = HashMap::new();
        for (idx, spec) in self.specs.iter().enumerate() {
            if ids.insert(spec.name.as_str(), BlockId(idx as u32)).is_some() {
                return Err(DomainError::DuplicateBlock(spec.name.clone()));
            }
            if spec.length <= Distance::ZERO {
                return Err(DomainError::InvalidLength(spec.name.clone()));
            }
        }

        let mut blocks = Vec::with_capacity(self.specs.len());
        for (idx, spec) in self.specs.iter().enumerate() {
            let successors = spec
                .successors
                .iter()
                .map(|name| {
                    ids.get(name.as_str())
                        .copied()
                        .ok_or_else(|| DomainError::UnknownBlock(name.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;

            blocks.push(Block {
                id: BlockId(idx as u32),
                name: spec.name.clone(),
                length: spec.length,
                max_speed: spec.max_speed,
                successors,
                electrification: spec.electrification.clone(),
                neutral_sections: spec.neutral_sections.clone(),
                loading_gauge: spec.loading_gauge,
                signaling_system: spec.signaling_system.clone(),
            });
        }

        Ok(Infra::from_blocks(blocks))
    }
}
