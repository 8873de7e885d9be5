//! Voter Model Experiment Harness
//!
//! Wraps the engine in `voter_core` into reproducible experiments: a
//! `RunConfig` fully determines one run, a `SweepConfig` fans a grid of
//! (p, N) points out over a thread pool, and the exporter writes the
//! results in the formats the plotting scripts read.
//!
//! # Usage
//!
//! ```ignore
//! use voter_sim::{run_experiment, RunConfig};
//! use voter_core::RewiringPolicy;
//!
//! let config = RunConfig::default()
//!     .with_population(1600)
//!     .with_rewiring(RewiringPolicy::PerNode, 0.0001)
//!     .with_seed(42);
//!
//! let result = run_experiment(&config)?;
//! println!("{} after {} steps", result.report.outcome, result.report.steps());
//! ```

mod config;
mod exporter;
mod runner;
pub mod scenarios;

#[cfg(test)]
mod properties;

pub use config::RunConfig;
pub use exporter::{
    parse_trajectory, replicate_file_name, result_file_name, snapshot_file_name,
    sweep_snapshot_dir_name, trajectory_file_name, write_trajectory, write_trajectory_file,
    Delimiter, RunExport, SnapshotWriter,
};
pub use runner::{
    run_experiment, run_experiment_with_snapshots, PointResult, RunResult, SweepConfig,
    SweepPoint, SweepRunner,
};
