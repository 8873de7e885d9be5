//! Voter Model Core - imitation dynamics on small-world lattices
//!
//! This library simulates binary opinion spreading over a 2D lattice
//! augmented with random long-range edges, and measures how fast the
//! population reaches consensus:
//! 1. **Topology**: lattice (periodic or open) plus pairwise or per-node rewiring
//! 2. **Dynamics**: pick a node, copy a random neighbor's status
//! 3. **Diversity**: fraction of disagreeing edges, the convergence test
//!
//! Every random draw goes through a caller-owned generator, so a run is a
//! pure function of (graph, initial state, config, seed).

pub mod diversity;
pub mod driver;
pub mod state;
pub mod stats;
pub mod topology;
pub mod update;

// Re-export key types for convenience
pub use diversity::{DiversityMetric, EdgeDiversity};
pub use driver::{
    DriverConfig, NoSnapshots, RunPhase, RunReport, Sample, SimulationDriver, SnapshotSink,
    Trajectory,
};
pub use state::{InitConfig, InitPolicy, SimulationState, StateInitializer, StatusSnapshot};
pub use stats::EnsembleStats;
pub use topology::{
    BoundaryPolicy, Graph, LatticeSpec, RewiringPolicy, TopologyBuilder, TopologyConfig,
    TopologyStats,
};
pub use update::{StepEffect, UpdateEngine};
