//! Voter model simulation CLI
//!
//! Runs a preset scenario or a JSON config, with optional flag overrides,
//! and writes trajectories, run exports and snapshots to an output directory.

use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use voter_core::{BoundaryPolicy, InitPolicy, NoSnapshots, RewiringPolicy};
use voter_env::{SeedStreams, VoterError, VoterResult};
use voter_sim::scenarios::ScenarioId;
use voter_sim::{
    result_file_name, run_experiment_with_snapshots, write_trajectory_file, Delimiter,
    PointResult, RunConfig, RunExport, RunResult, SnapshotWriter, SweepConfig, SweepRunner,
};

/// Voter model on a 2D lattice with long-range edges
#[derive(Parser, Debug)]
#[command(name = "voter-sim")]
#[command(about = "Run voter model consensus experiments", long_about = None)]
struct Args {
    /// Preset to run (lattice_evolution, small_world, size_sweep, rewiring_sweep)
    #[arg(short = 'S', long, default_value = "small_world")]
    scenario: String,

    /// JSON RunConfig file; replaces the preset
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lattice columns
    #[arg(long)]
    width: Option<u32>,

    /// Lattice rows
    #[arg(long)]
    height: Option<u32>,

    /// Target population N (square lattice of side ⌈√N⌉)
    #[arg(short = 'n', long)]
    population: Option<u32>,

    /// Long-range edge probability
    #[arg(short, long)]
    p: Option<f64>,

    /// Rewiring policy (pairwise, per_node)
    #[arg(long)]
    rewiring: Option<RewiringPolicy>,

    /// Boundary policy (periodic, open)
    #[arg(long)]
    boundary: Option<BoundaryPolicy>,

    /// Initial status policy (exact, bernoulli)
    #[arg(long)]
    init: Option<InitPolicy>,

    /// Initial fraction of status-1 nodes
    #[arg(long)]
    fraction: Option<f64>,

    /// Step budget per run
    #[arg(long)]
    max_steps: Option<u64>,

    /// Steps between diversity samples
    #[arg(long)]
    stride: Option<u64>,

    /// Master seed (0 = random from time)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Runs per configuration (per sweep point; default 1, or the preset's)
    #[arg(long)]
    seeds: Option<u64>,

    /// Worker threads for sweeps (default: all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    out: PathBuf,

    /// Write status snapshots every STRIDE steps
    #[arg(long, value_name = "STRIDE", num_args = 0..=1, default_missing_value = "100")]
    snapshots: Option<u64>,

    /// Trajectory field separator (space, comma)
    #[arg(long, default_value = "space")]
    delimiter: Delimiter,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON summary on stdout
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    // Logs go to stderr so --json output stays parseable; RUST_LOG wins when set
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> VoterResult<()> {
    if args.seeds == Some(0) {
        return Err(VoterError::invalid("--seeds must be positive"));
    }

    let scenario: ScenarioId = args.scenario.parse().map_err(VoterError::InvalidConfiguration)?;

    let preset = match &args.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            RunConfig::from_json_file(path)?
        }
        None => scenario.run_config(),
    };
    let config = apply_overrides(preset, args);
    config.validate()?;

    std::fs::create_dir_all(&args.out)?;

    let sweep = sweep_for(scenario, &config, args);

    if !args.json {
        match &args.config {
            Some(path) => info!("voter-sim | config {}", path.display()),
            None => info!("voter-sim | {} - {}", scenario, scenario.description()),
        }
    }

    match sweep {
        Some(sweep) => {
            if args.width.is_some() || args.height.is_some() {
                warn!("--width/--height are ignored by sweeps; use --population");
            }

            let mut runner = SweepRunner::new(sweep)?.with_snapshot_dir(&args.out);
            if let Some(threads) = args.threads {
                runner = runner.with_threads(threads);
            }
            let points = runner.run()?;
            write_sweep(&points, runner.config().seeds_per_point, args)
        }
        None => run_single(&config, args),
    }
}

/// Sweep grid of a sweep preset with command-line overrides applied.
///
/// A config file always describes a single configuration.
fn sweep_for(scenario: ScenarioId, config: &RunConfig, args: &Args) -> Option<SweepConfig> {
    if args.config.is_some() {
        return None;
    }
    let mut sweep = scenario.sweep_config()?;
    sweep.base = config.clone();
    if let Some(p) = args.p {
        sweep.p_values = vec![p];
    }
    if let Some(nodes) = args.population {
        sweep.populations = vec![nodes];
    }
    if let Some(seeds) = args.seeds {
        sweep.seeds_per_point = seeds;
    }
    Some(sweep)
}

/// Applies command-line overrides on top of a preset or file config.
fn apply_overrides(mut config: RunConfig, args: &Args) -> RunConfig {
    if let Some(nodes) = args.population {
        config = config.with_population(nodes);
    }
    if args.width.is_some() || args.height.is_some() {
        let (width, height) = config.topology.lattice.dimensions();
        config = config.with_dimensions(
            args.width.unwrap_or(width),
            args.height.unwrap_or(height),
        );
    }
    if let Some(boundary) = args.boundary {
        config = config.with_boundary(boundary);
    }
    if let Some(rewiring) = args.rewiring {
        config.topology.rewiring = rewiring;
    }
    if let Some(p) = args.p {
        config = config.with_p(p);
    }
    if let Some(policy) = args.init {
        config.init.policy = policy;
    }
    if let Some(fraction) = args.fraction {
        config.init.fraction = fraction;
    }
    if let Some(max_steps) = args.max_steps {
        config = config.with_max_steps(max_steps);
    }
    if let Some(stride) = args.stride {
        config = config.with_sample_stride(stride);
    }
    if args.snapshots.is_some() {
        config = config.with_snapshot_stride(args.snapshots);
    }

    let seed = match args.seed {
        Some(0) => {
            let seed = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(1);
            info!("Using seed {} from wall clock", seed);
            seed
        }
        Some(seed) => seed,
        None => config.seed,
    };
    config.with_seed(seed)
}

fn run_single(config: &RunConfig, args: &Args) -> VoterResult<()> {
    let nodes = config.node_count()?;
    let p = config.topology.p;
    let seeds = args.seeds.unwrap_or(1);
    let mut results = Vec::new();

    for r in 0..seeds {
        let run_config = config
            .clone()
            .with_seed(SeedStreams::new(config.seed).replicate(r).seed());

        let result = match run_config.driver.snapshot_stride {
            Some(_) => {
                let dir = if seeds > 1 {
                    args.out.join(format!("snapshots_r{}", r))
                } else {
                    args.out.join("snapshots")
                };
                let mut writer = SnapshotWriter::new(&dir)?;
                let result = run_experiment_with_snapshots(&run_config, &mut writer)?;
                info!("Wrote {} snapshots to {}", writer.written(), dir.display());
                result
            }
            None => run_experiment_with_snapshots(&run_config, &mut NoSnapshots)?,
        };

        let name = result_file_name(&result, (seeds > 1).then_some(r as usize));
        let trajectory_path = args.out.join(&name);
        write_trajectory_file(&trajectory_path, &result.report.trajectory, args.delimiter)?;
        RunExport::from_result(&result).write_to_file(trajectory_path.with_extension("json"))?;

        if !args.json {
            log_run(&result, &trajectory_path);
        }
        results.push((result, trajectory_path));
    }

    if args.json {
        let summary = serde_json::json!({
            "p": p,
            "nodes": nodes,
            "runs": results.iter().map(|(r, path)| run_summary(r, path)).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

fn write_sweep(points: &[PointResult], seeds_per_point: u64, args: &Args) -> VoterResult<()> {
    let mut summaries = Vec::new();

    for point in points {
        let mut runs = Vec::new();
        for (r, result) in point.runs.iter().enumerate() {
            let name = result_file_name(result, (seeds_per_point > 1).then_some(r));
            let path = args.out.join(name);
            write_trajectory_file(&path, &result.report.trajectory, args.delimiter)?;
            runs.push(run_summary(result, &path));
        }

        if !args.json {
            info!(
                "{} | converged {}/{} | files in {}",
                point.point,
                point.stats.converged,
                point.stats.runs,
                args.out.display()
            );
        }

        summaries.push(serde_json::json!({
            "p": point.point.p,
            "nodes": point.point.nodes,
            "stats": point.stats,
            "runs": runs,
        }));
    }

    let summary = serde_json::json!({ "points": summaries });
    let text = serde_json::to_string_pretty(&summary)?;
    std::fs::write(args.out.join("sweep.json"), &text)?;

    if args.json {
        println!("{}", text);
    } else {
        info!("Sweep summary written to {}", args.out.join("sweep.json").display());
    }
    Ok(())
}

fn run_summary(result: &RunResult, trajectory_path: &Path) -> serde_json::Value {
    let report = &result.report;
    serde_json::json!({
        "seed": result.config.seed,
        "outcome": report.outcome,
        "steps": report.steps(),
        "noop_steps": report.noop_steps(),
        "convergence_step": report.convergence_step(),
        "final_diversity": report.final_diversity(),
        "final_density": report.final_state.ones_fraction(),
        "long_range_edges": result.topology.long_range_edges,
        "trajectory": trajectory_path.display().to_string(),
    })
}

fn log_run(result: &RunResult, trajectory_path: &Path) {
    let report = &result.report;
    match report.convergence_step() {
        Some(step) => info!(
            "✓ seed={} converged at step {} (n_a={:.2})",
            result.config.seed,
            step,
            report.final_state.ones_fraction()
        ),
        None => warn!(
            "seed={} reached the step limit {} (diversity {:.4})",
            result.config.seed,
            report.steps(),
            report.final_diversity().unwrap_or(0.0)
        ),
    }
    info!("  trajectory: {}", trajectory_path.display());
}
