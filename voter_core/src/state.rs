//! Simulation state and the initial status assignment.

use crate::topology::Graph;
use rand::Rng;
use rand_distr::{Bernoulli, Distribution};
use serde::{Deserialize, Serialize};
use voter_env::{NodeId, Status, VoterError, VoterResult};

/// How initial status-1 nodes are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitPolicy {
    /// Exactly `round(N * fraction)` nodes, sampled without replacement
    #[default]
    ExactFraction,
    /// Each node independently with probability `fraction`
    Bernoulli,
}

impl InitPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            InitPolicy::ExactFraction => "exact",
            InitPolicy::Bernoulli => "bernoulli",
        }
    }
}

impl std::fmt::Display for InitPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for InitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" | "exact_fraction" | "sample" => Ok(InitPolicy::ExactFraction),
            "bernoulli" | "independent" => Ok(InitPolicy::Bernoulli),
            _ => Err(format!("Unknown init policy: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitConfig {
    pub policy: InitPolicy,
    /// Target share of status-1 nodes in [0, 1]
    pub fraction: f64,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            policy: InitPolicy::ExactFraction,
            fraction: 0.5,
        }
    }
}

impl InitConfig {
    pub fn validate(&self) -> VoterResult<()> {
        if !(0.0..=1.0).contains(&self.fraction) {
            return Err(VoterError::invalid(format!(
                "initial fraction {} outside [0, 1]",
                self.fraction
            )));
        }
        Ok(())
    }
}

/// Per-node status plus the elementary step counters of a run.
///
/// Decoupled from `Graph`: the graph is shared read-only, the state is
/// owned and mutated by exactly one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationState {
    statuses: Vec<Status>,
    ones: usize,
    step: u64,
    noop_steps: u64,
}

impl SimulationState {
    /// Creates a state at step 0 from explicit statuses (node enumeration order).
    pub fn from_statuses(statuses: Vec<Status>) -> Self {
        let ones = statuses.iter().filter(|s| s.is_one()).count();
        Self {
            statuses,
            ones,
            step: 0,
            noop_steps: 0,
        }
    }

    /// Every node set to `status`.
    pub fn uniform(node_count: usize, status: Status) -> Self {
        Self::from_statuses(vec![status; node_count])
    }

    pub fn node_count(&self) -> usize {
        self.statuses.len()
    }

    pub fn status(&self, node: NodeId) -> Status {
        self.statuses[node.index()]
    }

    pub fn statuses(&self) -> &[Status] {
        &self.statuses
    }

    /// Overwrites one node's status, keeping the ones counter in sync.
    pub fn set_status(&mut self, node: NodeId, status: Status) {
        let slot = &mut self.statuses[node.index()];
        match (*slot, status) {
            (Status::Zero, Status::One) => self.ones += 1,
            (Status::One, Status::Zero) => self.ones -= 1,
            _ => {}
        }
        *slot = status;
    }

    pub fn ones_count(&self) -> usize {
        self.ones
    }

    /// Population density n_a of status-1 nodes.
    pub fn ones_fraction(&self) -> f64 {
        if self.statuses.is_empty() {
            0.0
        } else {
            self.ones as f64 / self.statuses.len() as f64
        }
    }

    /// True when every node holds the same status.
    pub fn is_consensus(&self) -> bool {
        self.ones == 0 || self.ones == self.statuses.len()
    }

    /// Elementary steps applied so far.
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Steps that picked an isolated node and changed nothing.
    pub fn noop_steps(&self) -> u64 {
        self.noop_steps
    }

    pub(crate) fn record_step(&mut self) {
        self.step += 1;
    }

    pub(crate) fn record_noop(&mut self) {
        self.noop_steps += 1;
    }

    /// Grid of statuses keyed by lattice coordinate, for external rendering.
    pub fn snapshot(&self, graph: &Graph) -> StatusSnapshot {
        let cells = self
            .statuses
            .chunks(graph.width() as usize)
            .map(|row| row.to_vec())
            .collect();

        StatusSnapshot {
            step: self.step,
            width: graph.width(),
            height: graph.height(),
            ones_fraction: self.ones_fraction(),
            cells,
        }
    }
}

/// Serializable status map of one step: `cells[row][col]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub step: u64,
    pub width: u32,
    pub height: u32,
    pub ones_fraction: f64,
    pub cells: Vec<Vec<Status>>,
}

/// Assigns initial statuses under one of the two `InitPolicy`s.
#[derive(Debug, Clone)]
pub struct StateInitializer {
    config: InitConfig,
}

impl StateInitializer {
    pub fn new(config: InitConfig) -> VoterResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &InitConfig {
        &self.config
    }

    /// Number of status-1 nodes the exact policy places among `node_count`.
    pub fn exact_count(&self, node_count: usize) -> VoterResult<usize> {
        let count = (node_count as f64 * self.config.fraction).round() as usize;
        if count > node_count {
            return Err(VoterError::invalid(format!(
                "cannot sample {} nodes without replacement from {}",
                count, node_count
            )));
        }
        Ok(count)
    }

    pub fn initialize<R: Rng>(&self, node_count: usize, rng: &mut R) -> VoterResult<SimulationState> {
        match self.config.policy {
            InitPolicy::ExactFraction => {
                let count = self.exact_count(node_count)?;
                let mut statuses = vec![Status::Zero; node_count];
                for index in rand::seq::index::sample(rng, node_count, count) {
                    statuses[index] = Status::One;
                }
                Ok(SimulationState::from_statuses(statuses))
            }
            InitPolicy::Bernoulli => {
                let bernoulli = Bernoulli::new(self.config.fraction).map_err(|e| {
                    VoterError::invalid(format!("initial fraction {}: {}", self.config.fraction, e))
                })?;
                let statuses = (0..node_count)
                    .map(|_| Status::from(bernoulli.sample(rng)))
                    .collect();
                Ok(SimulationState::from_statuses(statuses))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{BoundaryPolicy, LatticeSpec, RewiringPolicy, TopologyBuilder, TopologyConfig};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use voter_env::Coord;

    fn initializer(policy: InitPolicy, fraction: f64) -> StateInitializer {
        StateInitializer::new(InitConfig { policy, fraction }).unwrap()
    }

    #[test]
    fn test_exact_fraction_is_exact() {
        let init = initializer(InitPolicy::ExactFraction, 0.5);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        for _ in 0..50 {
            let state = init.initialize(100, &mut rng).unwrap();
            assert_eq!(state.ones_count(), 50);
            assert_eq!(state.step(), 0);
        }
    }

    #[test]
    fn test_exact_fraction_rounds() {
        let init = initializer(InitPolicy::ExactFraction, 0.333);
        assert_eq!(init.exact_count(10).unwrap(), 3);
        assert_eq!(init.exact_count(1000).unwrap(), 333);
    }

    #[test]
    fn test_bernoulli_count_matches_binomial() {
        let init = initializer(InitPolicy::Bernoulli, 0.5);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let trials = 2000;
        let counts: Vec<f64> = (0..trials)
            .map(|_| init.initialize(100, &mut rng).unwrap().ones_count() as f64)
            .collect();

        let mean = counts.iter().sum::<f64>() / trials as f64;
        let variance =
            counts.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / (trials - 1) as f64;

        // Binomial(100, 0.5): mean 50, variance 25
        assert!((mean - 50.0).abs() < 0.6, "mean {}", mean);
        assert!((variance - 25.0).abs() < 4.0, "variance {}", variance);
        assert!(counts.iter().any(|&c| c != 50.0));
    }

    #[test]
    fn test_extreme_fractions() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let all = initializer(InitPolicy::Bernoulli, 1.0).initialize(30, &mut rng).unwrap();
        assert_eq!(all.ones_count(), 30);
        assert!(all.is_consensus());

        let none = initializer(InitPolicy::ExactFraction, 0.0).initialize(30, &mut rng).unwrap();
        assert_eq!(none.ones_count(), 0);
        assert!(none.is_consensus());
    }

    #[test]
    fn test_invalid_fraction_rejected() {
        for fraction in [-0.1, 1.01, f64::NAN] {
            let err = StateInitializer::new(InitConfig {
                policy: InitPolicy::ExactFraction,
                fraction,
            })
            .unwrap_err();
            assert!(err.is_invalid_configuration());
        }
    }

    #[test]
    fn test_set_status_tracks_ones() {
        let mut state = SimulationState::from_statuses(vec![Status::One, Status::Zero, Status::Zero]);
        assert_eq!(state.ones_count(), 1);

        state.set_status(NodeId(1), Status::One);
        assert_eq!(state.ones_count(), 2);

        state.set_status(NodeId(1), Status::One);
        assert_eq!(state.ones_count(), 2);

        state.set_status(NodeId(0), Status::Zero);
        assert_eq!(state.ones_count(), 1);
        assert!((state.ones_fraction() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_snapshot_is_row_major() {
        let graph = TopologyBuilder::new(TopologyConfig {
            lattice: LatticeSpec::Dimensions { width: 3, height: 2 },
            boundary: BoundaryPolicy::Open,
            rewiring: RewiringPolicy::PerNode,
            p: 0.0,
        })
        .unwrap()
        .build(&mut ChaCha8Rng::seed_from_u64(0))
        .unwrap();

        let mut state = SimulationState::uniform(6, Status::Zero);
        let node = graph.node_at(Coord::new(1, 2)).unwrap();
        state.set_status(node, Status::One);

        let snapshot = state.snapshot(&graph);
        assert_eq!(snapshot.height, 2);
        assert_eq!(snapshot.cells.len(), 2);
        assert_eq!(snapshot.cells[1][2], Status::One);
        assert_eq!(snapshot.cells[0], vec![Status::Zero; 3]);
    }
}
