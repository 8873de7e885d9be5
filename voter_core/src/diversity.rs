//! Diversity Metric - fraction of edges whose endpoints disagree.
//!
//! Serves as the order parameter recorded in trajectories and as the
//! driver's convergence test. O(|E|) per evaluation, so the driver only
//! evaluates it at the sampling stride.

use crate::state::SimulationState;
use crate::topology::Graph;
use serde::{Deserialize, Serialize};

/// Disagreeing and total edge counts at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDiversity {
    pub disagreeing: usize,
    pub total: usize,
}

impl EdgeDiversity {
    /// `disagreeing / total`, in [0, 1]. An edgeless graph counts as 0.
    pub fn value(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.disagreeing as f64 / self.total as f64
        }
    }

    /// Exactly zero disagreeing edges.
    pub fn is_consensus(&self) -> bool {
        self.disagreeing == 0
    }
}

pub struct DiversityMetric;

impl DiversityMetric {
    /// Counts disagreeing edges over the full edge set.
    pub fn measure(graph: &Graph, state: &SimulationState) -> EdgeDiversity {
        let disagreeing = graph
            .edges()
            .iter()
            .filter(|&&(a, b)| state.status(a) != state.status(b))
            .count();

        EdgeDiversity {
            disagreeing,
            total: graph.edge_count(),
        }
    }

    pub fn value(graph: &Graph, state: &SimulationState) -> f64 {
        Self::measure(graph, state).value()
    }
}
