//! Output writers for external analysis and rendering.
//!
//! - Trajectories: one `step<delim>diversity` line per sample
//! - Run exports: JSON with config, outcome, topology and trajectory
//! - Snapshots: one JSON status grid per file, named by zero-padded step
//!   so lexicographic order is step order
//!
//! Write failures are returned to the caller as `VoterError::Io`.

use crate::config::RunConfig;
use crate::runner::RunResult;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use voter_core::{Graph, RunPhase, SimulationState, SnapshotSink, TopologyStats, Trajectory};
use voter_env::{VoterError, VoterResult};

/// Field separator of trajectory files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delimiter {
    #[default]
    Whitespace,
    Comma,
}

impl Delimiter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Delimiter::Whitespace => " ",
            Delimiter::Comma => ",",
        }
    }
}

impl std::fmt::Display for Delimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Delimiter::Whitespace => write!(f, "space"),
            Delimiter::Comma => write!(f, "comma"),
        }
    }
}

impl std::str::FromStr for Delimiter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "space" | "whitespace" | " " => Ok(Delimiter::Whitespace),
            "comma" | "csv" | "," => Ok(Delimiter::Comma),
            _ => Err(format!("Unknown delimiter: {}", s)),
        }
    }
}

/// File name the plotting scripts expect for a (p, N) trajectory.
pub fn trajectory_file_name(p: f64, nodes: u32) -> String {
    format!("p_{}_N_{}.txt", p, nodes)
}

/// Same as `trajectory_file_name`, with a replicate suffix for multi-seed sweeps.
pub fn replicate_file_name(p: f64, nodes: u32, replicate: usize) -> String {
    format!("p_{}_N_{}_r{}.txt", p, nodes, replicate)
}

/// Trajectory file name of a finished run.
///
/// Keyed by the node count the lattice actually has, so a population of
/// 101 (side 11) lands in `N_121` whether it ran alone or in a sweep.
pub fn result_file_name(result: &RunResult, replicate: Option<usize>) -> String {
    let p = result.config.topology.p;
    let nodes = result.topology.nodes as u32;
    match replicate {
        Some(r) => replicate_file_name(p, nodes, r),
        None => trajectory_file_name(p, nodes),
    }
}

/// Snapshot directory of one sweep job.
pub fn sweep_snapshot_dir_name(p: f64, nodes: u32, replicate: u64) -> String {
    format!("snapshots_p{}_N{}_r{}", p, nodes, replicate)
}

/// Zero-padded snapshot name: sorts in step order.
pub fn snapshot_file_name(step: u64) -> String {
    format!("{:010}.json", step)
}

pub fn write_trajectory<W: Write>(
    writer: &mut W,
    trajectory: &Trajectory,
    delimiter: Delimiter,
) -> VoterResult<()> {
    for sample in trajectory.iter() {
        writeln!(writer, "{}{}{}", sample.step, delimiter.as_str(), sample.diversity)?;
    }
    Ok(())
}

pub fn write_trajectory_file(
    path: impl AsRef<Path>,
    trajectory: &Trajectory,
    delimiter: Delimiter,
) -> VoterResult<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    write_trajectory(&mut writer, trajectory, delimiter)?;
    writer.flush()?;
    debug!("Wrote {} samples to {}", trajectory.len(), path.as_ref().display());
    Ok(())
}

/// Parses a trajectory file written with either delimiter.
pub fn parse_trajectory(text: &str) -> VoterResult<Trajectory> {
    let mut trajectory = Trajectory::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();
        let bad_line = || {
            VoterError::Serialization(format!("trajectory line {}: {:?}", line_no + 1, line))
        };

        let [step, diversity] = fields.as_slice() else {
            return Err(bad_line());
        };
        let step: u64 = step.parse().map_err(|_| bad_line())?;
        let diversity: f64 = diversity.parse().map_err(|_| bad_line())?;

        if trajectory.last().is_some_and(|s| s.step >= step) {
            return Err(bad_line());
        }
        trajectory.push(step, diversity);
    }

    Ok(trajectory)
}

/// Complete run export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunExport {
    pub config: RunConfig,

    /// `converged` or `step_limit_reached`
    pub outcome: RunPhase,

    pub steps: u64,

    pub noop_steps: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub convergence_step: Option<u64>,

    /// Final share of status-1 nodes
    pub final_density: f64,

    pub topology: TopologyStats,

    pub trajectory: Trajectory,
}

impl RunExport {
    pub fn from_result(result: &RunResult) -> Self {
        let report = &result.report;
        Self {
            config: result.config.clone(),
            outcome: report.outcome,
            steps: report.steps(),
            noop_steps: report.noop_steps(),
            convergence_step: report.convergence_step(),
            final_density: report.final_state.ones_fraction(),
            topology: result.topology.clone(),
            trajectory: report.trajectory.clone(),
        }
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> VoterResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

/// Writes one JSON status grid per snapshot into a directory.
pub struct SnapshotWriter {
    dir: PathBuf,
    written: usize,
}

impl SnapshotWriter {
    /// Creates the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> VoterResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, written: 0 })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of snapshot files written so far.
    pub fn written(&self) -> usize {
        self.written
    }
}

impl SnapshotSink for SnapshotWriter {
    fn record(&mut self, graph: &Graph, state: &SimulationState) -> VoterResult<()> {
        let snapshot = state.snapshot(graph);
        let path = self.dir.join(snapshot_file_name(snapshot.step));
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer(writer, &snapshot)?;
        self.written += 1;
        Ok(())
    }
}
