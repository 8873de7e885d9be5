//! Named experiment presets.

use crate::config::RunConfig;
use crate::runner::SweepConfig;
use voter_core::{BoundaryPolicy, InitPolicy, RewiringPolicy};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// 100x100 open lattice with sparse pairwise shortcuts, snapshots every 100 steps
    LatticeEvolution,

    /// 100-node torus with per-node shortcuts, quick demo run
    SmallWorld,

    /// Consensus time vs N for p = 0 and p = 0.0001
    SizeSweep,

    /// Consensus time vs p at N = 1600
    RewiringSweep,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::LatticeEvolution,
            ScenarioId::SmallWorld,
            ScenarioId::SizeSweep,
            ScenarioId::RewiringSweep,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::LatticeEvolution => "lattice_evolution",
            ScenarioId::SmallWorld => "small_world",
            ScenarioId::SizeSweep => "size_sweep",
            ScenarioId::RewiringSweep => "rewiring_sweep",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::LatticeEvolution => {
                "100x100 open lattice, pairwise p=0.0001, half ones, snapshots every 100 steps"
            }
            ScenarioId::SmallWorld => "N=100 torus, per-node p=0.1, Bernoulli(0.5) start, 1000 steps",
            ScenarioId::SizeSweep => "N in {100, 1600, 10000} x p in {0, 0.0001}, per-node rewiring",
            ScenarioId::RewiringSweep => "N=1600, p in {0, 0.0001, 0.001, 0.01}, 4 seeds each",
        }
    }

    /// Returns true if this scenario runs a parameter sweep.
    pub fn is_sweep(&self) -> bool {
        matches!(self, ScenarioId::SizeSweep | ScenarioId::RewiringSweep)
    }

    /// Single-run configuration (for sweeps, the template of every job).
    pub fn run_config(&self) -> RunConfig {
        match self {
            ScenarioId::LatticeEvolution => RunConfig::default()
                .with_dimensions(100, 100)
                .with_boundary(BoundaryPolicy::Open)
                .with_rewiring(RewiringPolicy::Pairwise, 0.0001)
                .with_init(InitPolicy::ExactFraction, 0.5)
                .with_max_steps(100_000)
                .with_sample_stride(100)
                .with_snapshot_stride(Some(100)),
            ScenarioId::SmallWorld => RunConfig::default()
                .with_population(100)
                .with_boundary(BoundaryPolicy::Periodic)
                .with_rewiring(RewiringPolicy::PerNode, 0.1)
                .with_init(InitPolicy::Bernoulli, 0.5)
                .with_max_steps(1_000)
                .with_sample_stride(10),
            ScenarioId::SizeSweep | ScenarioId::RewiringSweep => RunConfig::default()
                .with_boundary(BoundaryPolicy::Periodic)
                .with_rewiring(RewiringPolicy::PerNode, 0.0)
                .with_init(InitPolicy::ExactFraction, 0.5)
                .with_max_steps(10_000_000)
                .with_sample_stride(100),
        }
    }

    /// Sweep grid, if this scenario is a sweep.
    pub fn sweep_config(&self) -> Option<SweepConfig> {
        match self {
            ScenarioId::SizeSweep => Some(SweepConfig {
                base: self.run_config(),
                p_values: vec![0.0, 0.0001],
                populations: vec![100, 1600, 10_000],
                seeds_per_point: 1,
            }),
            ScenarioId::RewiringSweep => Some(SweepConfig {
                base: self.run_config(),
                p_values: vec![0.0, 0.0001, 0.001, 0.01],
                populations: vec![1600],
                seeds_per_point: 4,
            }),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lattice_evolution" | "latticeevolution" | "lattice" => Ok(ScenarioId::LatticeEvolution),
            "small_world" | "smallworld" | "demo" => Ok(ScenarioId::SmallWorld),
            "size_sweep" | "sizesweep" => Ok(ScenarioId::SizeSweep),
            "rewiring_sweep" | "rewiringsweep" | "p_sweep" => Ok(ScenarioId::RewiringSweep),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
