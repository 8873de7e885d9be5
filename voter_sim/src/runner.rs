//! Experiment runner - single runs and parallel parameter sweeps.
//!
//! A run is fully determined by its `RunConfig`: the master seed is split
//! into topology, initialization and dynamics streams, each owned by the
//! run. Independent runs share nothing, so sweeps fan them out across a
//! rayon pool and collect results in (p, N, seed) order.

use crate::config::RunConfig;
use crate::exporter::{sweep_snapshot_dir_name, SnapshotWriter};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use voter_core::{
    EnsembleStats, NoSnapshots, RunReport, SimulationDriver, SnapshotSink, StateInitializer,
    TopologyBuilder, TopologyStats,
};
use voter_env::{SeedStreams, VoterError, VoterResult};

/// Results from running one configuration.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Configuration that was run
    pub config: RunConfig,

    /// Shape of the graph the run used
    pub topology: TopologyStats,

    /// Outcome, trajectory and final state
    pub report: RunReport,
}

/// Builds the graph, initial state and driver for `config` and runs it.
pub fn run_experiment(config: &RunConfig) -> VoterResult<RunResult> {
    run_experiment_with_snapshots(config, &mut NoSnapshots)
}

pub fn run_experiment_with_snapshots<S: SnapshotSink + ?Sized>(
    config: &RunConfig,
    sink: &mut S,
) -> VoterResult<RunResult> {
    config.validate()?;
    let streams = SeedStreams::new(config.seed);

    let graph = TopologyBuilder::new(config.topology)?.build(&mut streams.topology_rng())?;
    let initial = StateInitializer::new(config.init)?
        .initialize(graph.node_count(), &mut streams.init_rng())?;

    debug!(
        "seed={} | {} nodes | {} long-range edges | initial n_a={:.4}",
        config.seed,
        graph.node_count(),
        graph.long_range_edge_count(),
        initial.ones_fraction()
    );

    let driver = SimulationDriver::new(&graph, config.driver)?;
    let report = driver.run_with_snapshots(initial, &mut streams.dynamics_rng(), sink)?;

    Ok(RunResult {
        config: config.clone(),
        topology: graph.stats(),
        report,
    })
}

/// A grid of (p, N) points, each run with several seeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Template for every run; lattice size, p and seed are overridden per job
    pub base: RunConfig,

    pub p_values: Vec<f64>,

    /// Target populations N (square lattices of side ⌈√N⌉)
    pub populations: Vec<u32>,

    pub seeds_per_point: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            base: RunConfig::default(),
            p_values: vec![0.0, 0.0001],
            populations: vec![100, 1600, 10_000],
            seeds_per_point: 1,
        }
    }
}

/// One (p, N) point of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub p: f64,
    pub nodes: u32,
}

impl std::fmt::Display for SweepPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p={} N={}", self.p, self.nodes)
    }
}

/// All runs of one sweep point plus their ensemble statistics.
#[derive(Debug, Clone)]
pub struct PointResult {
    pub point: SweepPoint,
    pub runs: Vec<RunResult>,
    pub stats: EnsembleStats,
}

/// One job of a sweep, labeled with where it belongs.
#[derive(Debug, Clone)]
struct SweepJob {
    point: SweepPoint,
    replicate: u64,
    config: RunConfig,
}

/// Runs sweeps.
#[derive(Debug)]
pub struct SweepRunner {
    config: SweepConfig,

    /// Worker threads (None = rayon default)
    threads: Option<usize>,

    /// Parent of the per-job snapshot directories
    snapshot_root: Option<PathBuf>,
}

impl SweepRunner {
    /// Creates a sweep runner, validating every job's config up front.
    pub fn new(config: SweepConfig) -> VoterResult<Self> {
        if config.p_values.is_empty() || config.populations.is_empty() {
            return Err(VoterError::invalid("sweep needs at least one p and one N"));
        }
        if config.seeds_per_point == 0 {
            return Err(VoterError::invalid("seeds_per_point must be positive"));
        }

        let runner = Self {
            config,
            threads: None,
            snapshot_root: None,
        };
        for job in runner.jobs() {
            job.validate()?;
        }
        Ok(runner)
    }

    /// Sets the number of worker threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }

    /// Writes snapshots of every job under `dir`, one subdirectory per job,
    /// whenever the base config has a snapshot stride.
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_root = Some(dir.into());
        self
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Sweep points, p-major then N.
    pub fn points(&self) -> Vec<SweepPoint> {
        self.config
            .p_values
            .iter()
            .flat_map(|&p| {
                self.config
                    .populations
                    .iter()
                    .map(move |&nodes| SweepPoint { p, nodes })
            })
            .collect()
    }

    /// Every run config of the sweep, point by point, replicate by replicate.
    pub fn jobs(&self) -> Vec<RunConfig> {
        self.labeled_jobs().into_iter().map(|job| job.config).collect()
    }

    fn labeled_jobs(&self) -> Vec<SweepJob> {
        let base_seed = SeedStreams::new(self.config.base.seed);
        self.points()
            .into_iter()
            .flat_map(|point| {
                (0..self.config.seeds_per_point).map(move |replicate| SweepJob {
                    point,
                    replicate,
                    config: self
                        .config
                        .base
                        .clone()
                        .with_population(point.nodes)
                        .with_p(point.p)
                        .with_seed(base_seed.replicate(replicate).seed()),
                })
            })
            .collect()
    }

    fn run_job(&self, job: &SweepJob) -> VoterResult<RunResult> {
        match (&self.snapshot_root, job.config.driver.snapshot_stride) {
            (Some(root), Some(_)) => {
                let nodes = job.config.node_count()? as u32;
                let dir = root.join(sweep_snapshot_dir_name(job.point.p, nodes, job.replicate));
                let mut writer = SnapshotWriter::new(dir)?;
                run_experiment_with_snapshots(&job.config, &mut writer)
            }
            _ => run_experiment(&job.config),
        }
    }

    /// Runs every job in parallel and groups results by point.
    pub fn run(&self) -> VoterResult<Vec<PointResult>> {
        let jobs = self.labeled_jobs();
        if self.config.base.driver.snapshot_stride.is_some() && self.snapshot_root.is_none() {
            warn!("Sweep has a snapshot stride but no snapshot directory; snapshots are not written");
        }
        info!(
            "Sweep: {} points x {} seeds = {} runs",
            self.points().len(),
            self.config.seeds_per_point,
            jobs.len()
        );

        let run_all = || {
            jobs.par_iter()
                .map(|job| self.run_job(job))
                .collect::<VoterResult<Vec<RunResult>>>()
        };

        let results = match self.threads {
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| VoterError::runtime(format!("thread pool: {}", e)))?
                .install(run_all)?,
            None => run_all()?,
        };

        let per_point = self.config.seeds_per_point as usize;
        let mut results = results.into_iter();
        let grouped = self
            .points()
            .into_iter()
            .map(|point| {
                let runs: Vec<RunResult> = results.by_ref().take(per_point).collect();
                let reports: Vec<&RunReport> = runs.iter().map(|r| &r.report).collect();
                let stats = EnsembleStats::from_reports(reports);

                info!(
                    "  {} | converged {}/{} | mean T={}",
                    point,
                    stats.converged,
                    stats.runs,
                    stats
                        .mean_convergence_step
                        .map(|t| format!("{:.0}", t))
                        .unwrap_or_else(|| "-".to_string())
                );

                PointResult { point, runs, stats }
            })
            .collect();

        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voter_core::{BoundaryPolicy, InitPolicy, RewiringPolicy};

    fn small_config() -> RunConfig {
        RunConfig::default()
            .with_population(16)
            .with_boundary(BoundaryPolicy::Periodic)
            .with_rewiring(RewiringPolicy::PerNode, 0.1)
            .with_init(InitPolicy::ExactFraction, 0.5)
            .with_max_steps(20_000)
            .with_sample_stride(10)
    }

    #[test]
    fn test_run_experiment_deterministic() {
        let config = small_config().with_seed(42);

        let a = run_experiment(&config).unwrap();
        let b = run_experiment(&config).unwrap();

        assert_eq!(a.report.trajectory, b.report.trajectory);
        assert_eq!(a.report.final_state, b.report.final_state);
        assert_eq!(a.topology, b.topology);
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = run_experiment(&small_config().with_seed(1)).unwrap();
        let b = run_experiment(&small_config().with_seed(2)).unwrap();
        assert_ne!(a.report.trajectory, b.report.trajectory);
    }

    #[test]
    fn test_two_by_two_single_step_run() {
        // One update from a two-ones start leaves either an adjacent pair or a diagonal
        let config = RunConfig::default()
            .with_dimensions(2, 2)
            .with_rewiring(RewiringPolicy::Pairwise, 0.0)
            .with_sample_stride(1)
            .with_max_steps(1);
        let result = run_experiment(&config).unwrap();

        assert_eq!(result.topology.edges, 4);
        assert_eq!(result.report.trajectory.len(), 1);
        let d = result.report.trajectory.first().unwrap().diversity;
        assert!(d == 0.5 || d == 1.0, "diversity {}", d);
        assert_eq!(result.report.outcome, voter_core::RunPhase::StepLimitReached);
    }

    #[test]
    fn test_invalid_config_fails_before_running() {
        let err = run_experiment(&small_config().with_p(2.0)).unwrap_err();
        assert!(err.is_invalid_configuration());
    }

    #[test]
    fn test_sweep_points_and_jobs() {
        let runner = SweepRunner::new(SweepConfig {
            base: small_config().with_seed(10),
            p_values: vec![0.0, 0.01],
            populations: vec![16, 25, 36],
            seeds_per_point: 2,
        })
        .unwrap();

        let points = runner.points();
        assert_eq!(points.len(), 6);
        assert_eq!(points[0], SweepPoint { p: 0.0, nodes: 16 });
        assert_eq!(points[3], SweepPoint { p: 0.01, nodes: 16 });

        let jobs = runner.jobs();
        assert_eq!(jobs.len(), 12);
        assert_eq!(jobs[0].seed, 10);
        assert_eq!(jobs[1].seed, 11);
        assert_eq!(jobs[2].seed, 10);
    }

    #[test]
    fn test_sweep_results_are_ordered_and_reproducible() {
        let config = SweepConfig {
            base: small_config(),
            p_values: vec![0.0, 0.05],
            populations: vec![9, 16],
            seeds_per_point: 3,
        };

        let parallel = SweepRunner::new(config.clone()).unwrap().with_threads(4).run().unwrap();
        let serial = SweepRunner::new(config).unwrap().with_threads(1).run().unwrap();

        assert_eq!(parallel.len(), 4);
        for (a, b) in parallel.iter().zip(serial.iter()) {
            assert_eq!(a.point, b.point);
            assert_eq!(a.runs.len(), 3);
            assert_eq!(a.stats, b.stats);
            for (ra, rb) in a.runs.iter().zip(b.runs.iter()) {
                assert_eq!(ra.config.seed, rb.config.seed);
                assert_eq!(ra.report.trajectory, rb.report.trajectory);
            }
        }
    }

    #[test]
    fn test_sweep_writes_snapshots_per_job() {
        let dir = tempfile::tempdir().unwrap();
        let config = SweepConfig {
            base: small_config()
                .with_max_steps(200)
                .with_sample_stride(50)
                .with_snapshot_stride(Some(100)),
            p_values: vec![0.0],
            populations: vec![9, 16],
            seeds_per_point: 2,
        };

        let points = SweepRunner::new(config)
            .unwrap()
            .with_snapshot_dir(dir.path())
            .run()
            .unwrap();
        assert_eq!(points.len(), 2);

        for nodes in [9u32, 16] {
            for r in 0..2 {
                let job_dir = dir.path().join(sweep_snapshot_dir_name(0.0, nodes, r));
                assert!(
                    job_dir.join(crate::exporter::snapshot_file_name(0)).is_file(),
                    "missing step-0 snapshot in {}",
                    job_dir.display()
                );
            }
        }
    }

    #[test]
    fn test_sweep_without_snapshot_stride_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = SweepConfig {
            base: small_config().with_max_steps(100),
            p_values: vec![0.0],
            populations: vec![9],
            seeds_per_point: 1,
        };

        SweepRunner::new(config)
            .unwrap()
            .with_snapshot_dir(dir.path())
            .run()
            .unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_invalid_sweep_rejected() {
        let empty = SweepConfig {
            p_values: vec![],
            ..Default::default()
        };
        assert!(SweepRunner::new(empty).is_err());

        let bad_p = SweepConfig {
            p_values: vec![0.5, 1.5],
            ..Default::default()
        };
        assert!(SweepRunner::new(bad_p).unwrap_err().is_invalid_configuration());

        let no_seeds = SweepConfig {
            seeds_per_point: 0,
            ..Default::default()
        };
        assert!(SweepRunner::new(no_seeds).is_err());
    }
}
