//! Simulation Driver - the elementary step loop.
//!
//! ```text
//!            ┌──────────┐  diversity == 0   ┌───────────┐
//!  start ──► │ Running  │ ────────────────► │ Converged │
//!            └────┬─────┘                   └───────────┘
//!                 │ step == max_steps
//!                 ▼
//!         ┌──────────────────┐
//!         │ StepLimitReached │
//!         └──────────────────┘
//! ```
//!
//! The driver is a pure function of (graph, initial state, config, rng):
//! it owns nothing shared, so independent runs can be fanned out freely.

use crate::diversity::DiversityMetric;
use crate::state::SimulationState;
use crate::topology::Graph;
use crate::update::{StepEffect, UpdateEngine};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use voter_env::{VoterError, VoterResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Maximum elementary steps before giving up
    pub max_steps: u64,
    /// Diversity is sampled every `sample_stride` steps
    pub sample_stride: u64,
    /// Snapshots are taken at step 0 and every `snapshot_stride` steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_stride: Option<u64>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_steps: 100_000,
            sample_stride: 100,
            snapshot_stride: None,
        }
    }
}

impl DriverConfig {
    pub fn validate(&self) -> VoterResult<()> {
        if self.max_steps == 0 {
            return Err(VoterError::invalid("max_steps must be positive"));
        }
        if self.sample_stride == 0 {
            return Err(VoterError::invalid("sample_stride must be positive"));
        }
        if self.snapshot_stride == Some(0) {
            return Err(VoterError::invalid("snapshot_stride must be positive"));
        }
        Ok(())
    }
}

/// Lifecycle of a run. Both terminal phases return the full trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Running,
    /// Diversity hit zero: an absorbing state was reached
    Converged,
    /// Step budget exhausted without observing consensus
    StepLimitReached,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunPhase::Running)
    }

    pub fn name(&self) -> &'static str {
        match self {
            RunPhase::Running => "running",
            RunPhase::Converged => "converged",
            RunPhase::StepLimitReached => "step_limit_reached",
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One trajectory record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub step: u64,
    pub diversity: f64,
}

/// Ordered `(step, diversity)` samples, strictly increasing in step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trajectory {
    samples: Vec<Sample>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample. Steps must be strictly increasing.
    pub fn push(&mut self, step: u64, diversity: f64) {
        debug_assert!(
            self.samples.last().map_or(true, |s| s.step < step),
            "trajectory steps must increase"
        );
        self.samples.push(Sample { step, diversity });
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }
}

/// Receives status snapshots while a run progresses.
///
/// Implemented by exporters that hand snapshots to external renderers.
/// An error aborts the run and is returned to the caller.
pub trait SnapshotSink {
    fn record(&mut self, graph: &Graph, state: &SimulationState) -> VoterResult<()>;
}

/// Sink that discards every snapshot.
pub struct NoSnapshots;

impl SnapshotSink for NoSnapshots {
    fn record(&mut self, _graph: &Graph, _state: &SimulationState) -> VoterResult<()> {
        Ok(())
    }
}

/// Results of one finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// `Converged` or `StepLimitReached`
    pub outcome: RunPhase,
    pub trajectory: Trajectory,
    pub final_state: SimulationState,
}

impl RunReport {
    pub fn converged(&self) -> bool {
        self.outcome == RunPhase::Converged
    }

    /// Elementary steps executed, including no-ops.
    pub fn steps(&self) -> u64 {
        self.final_state.step()
    }

    pub fn noop_steps(&self) -> u64 {
        self.final_state.noop_steps()
    }

    /// Step at which consensus was observed, if it was.
    pub fn convergence_step(&self) -> Option<u64> {
        if self.converged() {
            Some(self.final_state.step())
        } else {
            None
        }
    }

    pub fn final_diversity(&self) -> Option<f64> {
        self.trajectory.last().map(|s| s.diversity)
    }
}

/// Runs the voter dynamic on one frozen graph.
#[derive(Debug, Clone, Copy)]
pub struct SimulationDriver<'g> {
    graph: &'g Graph,
    config: DriverConfig,
}

impl<'g> SimulationDriver<'g> {
    pub fn new(graph: &'g Graph, config: DriverConfig) -> VoterResult<Self> {
        config.validate()?;
        Ok(Self { graph, config })
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Runs to convergence or step limit without snapshots.
    pub fn run<R: Rng>(&self, initial: SimulationState, rng: &mut R) -> VoterResult<RunReport> {
        self.run_with_snapshots(initial, rng, &mut NoSnapshots)
    }

    pub fn run_with_snapshots<R: Rng, S: SnapshotSink + ?Sized>(
        &self,
        initial: SimulationState,
        rng: &mut R,
        sink: &mut S,
    ) -> VoterResult<RunReport> {
        if initial.node_count() != self.graph.node_count() {
            return Err(VoterError::invalid(format!(
                "state has {} nodes but graph has {}",
                initial.node_count(),
                self.graph.node_count()
            )));
        }

        let engine = UpdateEngine::new(self.graph);
        let mut state = initial;
        let mut trajectory = Trajectory::new();
        let mut phase = RunPhase::Running;
        let mut warned_isolated = false;

        debug!(
            "Starting run: {} nodes, {} edges, max_steps={}, stride={}",
            self.graph.node_count(),
            self.graph.edge_count(),
            self.config.max_steps,
            self.config.sample_stride
        );

        if self.config.snapshot_stride.is_some() {
            sink.record(self.graph, &state)?;
        }

        while phase == RunPhase::Running {
            if let StepEffect::Isolated { node } = engine.step(&mut state, rng) {
                if !warned_isolated {
                    warn!("Picked isolated node {}; step is a no-op", node);
                    warned_isolated = true;
                } else {
                    debug!("Picked isolated node {}", node);
                }
            }
            state.record_step();
            let step = state.step();

            if let Some(stride) = self.config.snapshot_stride {
                if step % stride == 0 {
                    sink.record(self.graph, &state)?;
                }
            }

            if step % self.config.sample_stride == 0 {
                let diversity = DiversityMetric::measure(self.graph, &state);
                trajectory.push(step, diversity.value());
                debug!(
                    "  step={} | diversity={:.6} | n_a={:.4}",
                    step,
                    diversity.value(),
                    state.ones_fraction()
                );

                if diversity.is_consensus() {
                    phase = RunPhase::Converged;
                    continue;
                }
            }

            if step >= self.config.max_steps {
                phase = RunPhase::StepLimitReached;
            }
        }

        info!(
            "Run finished: {} after {} steps ({} samples, {} no-ops)",
            phase,
            state.step(),
            trajectory.len(),
            state.noop_steps()
        );

        Ok(RunReport {
            outcome: phase,
            trajectory,
            final_state: state,
        })
    }
}
