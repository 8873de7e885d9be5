//! Ensemble statistics over independent runs.
//!
//! Consensus time is only defined for runs that converged; runs that hit
//! the step limit are counted separately and excluded from the timing
//! figures, since their "time" is just the budget.

use crate::driver::RunReport;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnsembleStats {
    pub runs: usize,
    pub converged: usize,
    /// Mean convergence step over converged runs
    pub mean_convergence_step: Option<f64>,
    pub min_convergence_step: Option<u64>,
    pub max_convergence_step: Option<u64>,
    /// Mean of the last sampled diversity over all runs with samples
    pub mean_final_diversity: Option<f64>,
    pub mean_final_density: f64,
}

impl EnsembleStats {
    pub fn from_reports<'a, I>(reports: I) -> Self
    where
        I: IntoIterator<Item = &'a RunReport>,
    {
        let mut stats = EnsembleStats::default();
        let mut step_sum = 0.0;
        let mut diversity_sum = 0.0;
        let mut diversity_count = 0usize;
        let mut density_sum = 0.0;

        for report in reports {
            stats.runs += 1;
            density_sum += report.final_state.ones_fraction();

            if let Some(d) = report.final_diversity() {
                diversity_sum += d;
                diversity_count += 1;
            }

            if let Some(step) = report.convergence_step() {
                stats.converged += 1;
                step_sum += step as f64;
                stats.min_convergence_step =
                    Some(stats.min_convergence_step.map_or(step, |m| m.min(step)));
                stats.max_convergence_step =
                    Some(stats.max_convergence_step.map_or(step, |m| m.max(step)));
            }
        }

        if stats.converged > 0 {
            stats.mean_convergence_step = Some(step_sum / stats.converged as f64);
        }
        if diversity_count > 0 {
            stats.mean_final_diversity = Some(diversity_sum / diversity_count as f64);
        }
        if stats.runs > 0 {
            stats.mean_final_density = density_sum / stats.runs as f64;
        }

        stats
    }

    /// Share of runs that reached consensus, in [0, 1].
    pub fn convergence_rate(&self) -> f64 {
        if self.runs == 0 {
            0.0
        } else {
            self.converged as f64 / self.runs as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{RunPhase, Trajectory};
    use crate::state::SimulationState;
    use approx::assert_relative_eq;
    use voter_env::Status;

    fn report(outcome: RunPhase, steps: u64, last_diversity: f64, ones: usize) -> RunReport {
        let mut state = SimulationState::from_statuses(
            (0..4).map(|i| Status::from(i < ones)).collect(),
        );
        for _ in 0..steps {
            state.record_step();
        }
        let mut trajectory = Trajectory::new();
        trajectory.push(steps, last_diversity);
        RunReport {
            outcome,
            trajectory,
            final_state: state,
        }
    }

    #[test]
    fn test_empty_ensemble() {
        let reports: Vec<RunReport> = Vec::new();
        let stats = EnsembleStats::from_reports(&reports);
        assert_eq!(stats.runs, 0);
        assert_eq!(stats.convergence_rate(), 0.0);
        assert!(stats.mean_convergence_step.is_none());
    }

    #[test]
    fn test_mixed_outcomes() {
        let reports = vec![
            report(RunPhase::Converged, 100, 0.0, 4),
            report(RunPhase::Converged, 300, 0.0, 0),
            report(RunPhase::StepLimitReached, 1000, 0.5, 2),
        ];
        let stats = EnsembleStats::from_reports(&reports);

        assert_eq!(stats.runs, 3);
        assert_eq!(stats.converged, 2);
        assert_relative_eq!(stats.convergence_rate(), 2.0 / 3.0);
        assert_relative_eq!(stats.mean_convergence_step.unwrap(), 200.0);
        assert_eq!(stats.min_convergence_step, Some(100));
        assert_eq!(stats.max_convergence_step, Some(300));
        assert_relative_eq!(stats.mean_final_diversity.unwrap(), 0.5 / 3.0);
        assert_relative_eq!(stats.mean_final_density, 0.5);
    }
}
