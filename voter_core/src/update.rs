//! Update Engine - one elementary voter step.
//!
//! Pick a node uniformly at random, pick one of its neighbors uniformly
//! at random, copy the neighbor's status. Statuses are only ever copied,
//! so the all-0 and all-1 configurations are absorbing.

use crate::state::SimulationState;
use crate::topology::Graph;
use rand::seq::SliceRandom;
use rand::Rng;
use voter_env::NodeId;

/// What a single elementary step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEffect {
    /// `node` copied the status of `from`; `changed` is false if they already agreed
    Copied { node: NodeId, from: NodeId, changed: bool },
    /// `node` has no neighbors; the step is a no-op
    Isolated { node: NodeId },
}

/// Applies elementary steps against a frozen graph.
#[derive(Debug, Clone, Copy)]
pub struct UpdateEngine<'g> {
    graph: &'g Graph,
}

impl<'g> UpdateEngine<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self { graph }
    }

    /// Performs one pick-and-copy update on `state`.
    ///
    /// Does not advance the step counter; the driver owns it. Isolated
    /// picks are recorded as no-ops on the state.
    pub fn step<R: Rng>(&self, state: &mut SimulationState, rng: &mut R) -> StepEffect {
        let node = NodeId(rng.gen_range(0..self.graph.node_count() as u32));

        match self.graph.neighbors(node).choose(rng) {
            Some(&from) => {
                let status = state.status(from);
                let changed = state.status(node) != status;
                if changed {
                    state.set_status(node, status);
                }
                StepEffect::Copied { node, from, changed }
            }
            None => {
                state.record_noop();
                StepEffect::Isolated { node }
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
    use voter_env::Status;

    fn graph(width: u32, height: u32, boundary: BoundaryPolicy) -> Graph {
        TopologyBuilder::new(TopologyConfig {
            lattice: LatticeSpec::Dimensions { width, height },
            boundary,
            rewiring: RewiringPolicy::PerNode,
            p: 0.0,
        })
        .unwrap()
        .build(&mut ChaCha8Rng::seed_from_u64(0))
        .unwrap()
    }

    #[test]
    fn test_copies_from_actual_neighbor() {
        let graph = graph(4, 4, BoundaryPolicy::Periodic);
        let engine = UpdateEngine::new(&graph);
        let mut state = SimulationState::from_statuses(
            (0..16).map(|i| Status::from(i % 3 == 0)).collect(),
        );
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        for _ in 0..500 {
            let before = state.clone();
            match engine.step(&mut state, &mut rng) {
                StepEffect::Copied { node, from, changed } => {
                    assert!(graph.has_edge(node, from));
                    assert_eq!(state.status(node), before.status(from));
                    assert_eq!(changed, before.status(node) != before.status(from));
                }
                StepEffect::Isolated { .. } => panic!("torus has no isolated nodes"),
            }
        }
    }

    #[test]
    fn test_consensus_is_absorbing() {
        let graph = graph(5, 5, BoundaryPolicy::Open);
        let engine = UpdateEngine::new(&graph);
        let mut state = SimulationState::uniform(25, Status::One);
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        for _ in 0..1000 {
            engine.step(&mut state, &mut rng);
        }
        assert_eq!(state.ones_count(), 25);
    }

    #[test]
    fn test_isolated_node_is_noop() {
        let graph = graph(1, 1, BoundaryPolicy::Open);
        let engine = UpdateEngine::new(&graph);
        let mut state = SimulationState::uniform(1, Status::One);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let effect = engine.step(&mut state, &mut rng);
        assert_eq!(effect, StepEffect::Isolated { node: NodeId(0) });
        assert_eq!(state.noop_steps(), 1);
        assert_eq!(state.status(NodeId(0)), Status::One);
    }

    #[test]
    fn test_never_invents_status() {
        let graph = graph(3, 3, BoundaryPolicy::Periodic);
        let engine = UpdateEngine::new(&graph);
        let mut state = SimulationState::uniform(9, Status::Zero);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        for _ in 0..200 {
            let effect = engine.step(&mut state, &mut rng);
            assert!(matches!(effect, StepEffect::Copied { changed: false, .. }));
        }
        assert_eq!(state.ones_count(), 0);
    }
}
