//! Property tests over randomly drawn configurations.

use crate::config::RunConfig;
use crate::runner::run_experiment;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use voter_core::{
    BoundaryPolicy, DiversityMetric, InitConfig, InitPolicy, LatticeSpec, RewiringPolicy,
    RunPhase, StateInitializer, TopologyBuilder, TopologyConfig,
};

fn boundary() -> impl Strategy<Value = BoundaryPolicy> {
    prop_oneof![Just(BoundaryPolicy::Periodic), Just(BoundaryPolicy::Open)]
}

fn rewiring() -> impl Strategy<Value = RewiringPolicy> {
    prop_oneof![Just(RewiringPolicy::Pairwise), Just(RewiringPolicy::PerNode)]
}

fn init_policy() -> impl Strategy<Value = InitPolicy> {
    prop_oneof![Just(InitPolicy::ExactFraction), Just(InitPolicy::Bernoulli)]
}

prop_compose! {
    fn small_config()(
        width in 1u32..8,
        height in 1u32..8,
        boundary in boundary(),
        rewiring in rewiring(),
        p in 0.0f64..=1.0,
        policy in init_policy(),
        fraction in 0.0f64..=1.0,
        max_steps in 1u64..400,
        stride in 1u64..50,
        seed in any::<u64>(),
    ) -> RunConfig {
        RunConfig::default()
            .with_dimensions(width, height)
            .with_boundary(boundary)
            .with_rewiring(rewiring, p)
            .with_init(policy, fraction)
            .with_max_steps(max_steps)
            .with_sample_stride(stride)
            .with_seed(seed)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_diversity_stays_in_unit_interval(config in small_config()) {
        let result = run_experiment(&config).unwrap();
        let stride = config.driver.sample_stride;

        let mut previous = 0;
        for sample in result.report.trajectory.iter() {
            prop_assert!((0.0..=1.0).contains(&sample.diversity));
            prop_assert!(sample.step > previous);
            prop_assert_eq!(sample.step % stride, 0);
            previous = sample.step;
        }
    }

    #[test]
    fn test_same_seed_same_run(config in small_config()) {
        let a = run_experiment(&config).unwrap();
        let b = run_experiment(&config).unwrap();

        prop_assert_eq!(&a.topology, &b.topology);
        prop_assert_eq!(&a.report.trajectory, &b.report.trajectory);
        prop_assert_eq!(&a.report.final_state, &b.report.final_state);
        prop_assert_eq!(a.report.outcome, b.report.outcome);
    }

    #[test]
    fn test_outcome_matches_last_sample(config in small_config()) {
        let report = run_experiment(&config).unwrap().report;
        prop_assert!(report.outcome.is_terminal());
        prop_assert!(report.steps() <= config.driver.max_steps);

        match report.outcome {
            RunPhase::Converged => {
                prop_assert_eq!(report.final_diversity(), Some(0.0));
                prop_assert_eq!(report.convergence_step(), Some(report.steps()));
            }
            RunPhase::StepLimitReached => {
                prop_assert_eq!(report.steps(), config.driver.max_steps);
                prop_assert!(report.convergence_step().is_none());
            }
            RunPhase::Running => prop_assert!(false, "run returned while still running"),
        }
    }

    #[test]
    fn test_topology_invariants(
        width in 1u32..10,
        height in 1u32..10,
        boundary in boundary(),
        rewiring in rewiring(),
        p in 0.0f64..=0.3,
        seed in any::<u64>(),
    ) {
        let config = TopologyConfig {
            lattice: LatticeSpec::Dimensions { width, height },
            boundary,
            rewiring,
            p,
        };
        let graph = TopologyBuilder::new(config)
            .unwrap()
            .build(&mut ChaCha8Rng::seed_from_u64(seed))
            .unwrap();

        prop_assert_eq!(graph.node_count(), (width * height) as usize);
        prop_assert_eq!(
            graph.edge_count(),
            graph.structural_edge_count() + graph.long_range_edge_count()
        );

        let degree_sum: usize = graph.nodes().map(|n| graph.degree(n)).sum();
        prop_assert_eq!(degree_sum, 2 * graph.edge_count());

        for &(a, b) in graph.edges() {
            prop_assert_ne!(a, b);
            prop_assert!(graph.has_edge(a, b));
            prop_assert!(graph.has_edge(b, a));
        }

        for node in graph.nodes() {
            let mut neighbors = graph.neighbors(node).to_vec();
            let before = neighbors.len();
            neighbors.sort();
            neighbors.dedup();
            prop_assert_eq!(neighbors.len(), before);
        }

        // Structural edges alone connect any lattice
        if width * height > 1 {
            prop_assert!(graph.is_connected());
        }
    }

    #[test]
    fn test_no_long_range_edges_at_zero_p(
        width in 1u32..10,
        height in 1u32..10,
        boundary in boundary(),
        rewiring in rewiring(),
        seed in any::<u64>(),
    ) {
        let config = TopologyConfig {
            lattice: LatticeSpec::Dimensions { width, height },
            boundary,
            rewiring,
            p: 0.0,
        };
        let graph = TopologyBuilder::new(config)
            .unwrap()
            .build(&mut ChaCha8Rng::seed_from_u64(seed))
            .unwrap();

        prop_assert_eq!(graph.long_range_edge_count(), 0);
    }

    #[test]
    fn test_exact_init_count_and_initial_diversity(
        side in 2u32..12,
        fraction in 0.0f64..=1.0,
        seed in any::<u64>(),
    ) {
        let nodes = (side * side) as usize;
        let init = StateInitializer::new(InitConfig {
            policy: InitPolicy::ExactFraction,
            fraction,
        })
        .unwrap();
        let state = init
            .initialize(nodes, &mut ChaCha8Rng::seed_from_u64(seed))
            .unwrap();

        prop_assert_eq!(state.ones_count(), (nodes as f64 * fraction).round() as usize);

        let graph = TopologyBuilder::new(TopologyConfig {
            lattice: LatticeSpec::Dimensions { width: side, height: side },
            boundary: BoundaryPolicy::Periodic,
            rewiring: RewiringPolicy::PerNode,
            p: 0.0,
        })
        .unwrap()
        .build(&mut ChaCha8Rng::seed_from_u64(seed))
        .unwrap();

        let diversity = DiversityMetric::measure(&graph, &state);
        prop_assert!(diversity.disagreeing <= diversity.total);
        prop_assert_eq!(diversity.is_consensus(), state.is_consensus());
    }
}
