//! Run configuration: everything needed to reproduce one simulation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use voter_core::{
    BoundaryPolicy, DriverConfig, InitConfig, InitPolicy, LatticeSpec, RewiringPolicy,
    StateInitializer, TopologyConfig,
};
use voter_env::{VoterError, VoterResult};

/// Configuration for a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Lattice, boundary and rewiring
    pub topology: TopologyConfig,

    /// Initial status assignment
    pub init: InitConfig,

    /// Step budget, sampling and snapshot strides
    pub driver: DriverConfig,

    /// Master seed for determinism
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            topology: TopologyConfig::default(),
            init: InitConfig::default(),
            driver: DriverConfig::default(),
            seed: 3407,
        }
    }
}

impl RunConfig {
    /// Checks every value before any simulation work begins.
    pub fn validate(&self) -> VoterResult<()> {
        self.topology.validate()?;
        self.init.validate()?;
        self.driver.validate()?;

        if self.init.policy == InitPolicy::ExactFraction {
            let nodes = self.node_count()?;
            StateInitializer::new(self.init)?.exact_count(nodes)?;
        }
        Ok(())
    }

    /// Number of lattice nodes this config produces.
    pub fn node_count(&self) -> VoterResult<usize> {
        self.topology
            .lattice
            .node_count()
            .map(|n| n as usize)
            .ok_or_else(|| VoterError::invalid("lattice exceeds the maximum node count"))
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_lattice(mut self, lattice: LatticeSpec) -> Self {
        self.topology.lattice = lattice;
        self
    }

    /// Square lattice with side ⌈√nodes⌉.
    pub fn with_population(self, nodes: u32) -> Self {
        self.with_lattice(LatticeSpec::Population { nodes })
    }

    pub fn with_dimensions(self, width: u32, height: u32) -> Self {
        self.with_lattice(LatticeSpec::Dimensions { width, height })
    }

    pub fn with_boundary(mut self, boundary: BoundaryPolicy) -> Self {
        self.topology.boundary = boundary;
        self
    }

    pub fn with_rewiring(mut self, rewiring: RewiringPolicy, p: f64) -> Self {
        self.topology.rewiring = rewiring;
        self.topology.p = p;
        self
    }

    pub fn with_p(mut self, p: f64) -> Self {
        self.topology.p = p;
        self
    }

    pub fn with_init(mut self, policy: InitPolicy, fraction: f64) -> Self {
        self.init = InitConfig { policy, fraction };
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.driver.max_steps = max_steps;
        self
    }

    pub fn with_sample_stride(mut self, stride: u64) -> Self {
        self.driver.sample_stride = stride;
        self
    }

    pub fn with_snapshot_stride(mut self, stride: Option<u64>) -> Self {
        self.driver.snapshot_stride = stride;
        self
    }

    /// Loads a config from a JSON file and validates it.
    pub fn from_json_file(path: impl AsRef<Path>) -> VoterResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_file(&self, path: impl AsRef<Path>) -> VoterResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
