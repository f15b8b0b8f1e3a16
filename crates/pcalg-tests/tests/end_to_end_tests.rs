//! End-to-end PC runs on exact-frequency datasets.

use pcalg_core::{
    estimate_cpdag, estimate_skeleton, run_pc, run_pc_with_sink, BinaryGSquare, DataMatrix,
    Diagnostic, DiscreteGSquare, GSquareConfig, IndependenceTest, PcResult, RecordingSink,
    SepEntry, SkeletonMethod, SkeletonOptions,
};
use pcalg_tests::{binary_dataset, discrete_dataset, sorted_arcs, DISCRETE_LEVELS};

const ALPHA: f64 = 0.01;

const BINARY_SKELETON: [(usize, usize); 5] = [(0, 1), (1, 3), (1, 4), (2, 3), (2, 4)];
const BINARY_ARCS: [(usize, usize); 7] = [(0, 1), (2, 3), (2, 4), (3, 1), (3, 2), (4, 1), (4, 2)];

const DISCRETE_SKELETON: [(usize, usize); 4] = [(0, 2), (1, 2), (1, 3), (3, 4)];
const DISCRETE_ARCS: [(usize, usize); 4] = [(0, 2), (1, 2), (1, 3), (4, 3)];

fn methods() -> [SkeletonOptions; 2] {
    [SkeletonOptions::default(), SkeletonOptions::stable()]
}

fn separating_set(result: &PcResult, i: usize, j: usize) -> Vec<usize> {
    result
        .skeleton
        .sep_sets
        .get(i, j)
        .as_set()
        .expect("pair was tested")
        .to_vec()
}

#[test]
fn binary_dataset_recovers_cpdag() {
    let data = binary_dataset();
    for options in methods() {
        let result = run_pc(&BinaryGSquare::default(), &data, ALPHA, &options).unwrap();
        assert_eq!(
            result.skeleton.graph.edges().collect::<Vec<_>>(),
            BINARY_SKELETON.to_vec(),
            "{:?}",
            options.method
        );
        assert_eq!(sorted_arcs(result.cpdag.arcs()), BINARY_ARCS.to_vec());
    }
}

#[test]
fn binary_dataset_separating_sets() {
    let data = binary_dataset();
    for options in methods() {
        let result = run_pc(&BinaryGSquare::default(), &data, ALPHA, &options).unwrap();
        for (i, j) in [(0, 2), (0, 3), (0, 4)] {
            assert!(separating_set(&result, i, j).is_empty());
        }
        assert_eq!(separating_set(&result, 3, 4), vec![2]);
        assert_eq!(separating_set(&result, 2, 1), vec![3, 4]);
    }
}

#[test]
fn binary_dataset_stats() {
    let data = binary_dataset();
    let result = run_pc(&BinaryGSquare::default(), &data, ALPHA, &SkeletonOptions::default()).unwrap();
    let stats = result.skeleton.stats;
    assert_eq!(stats.edges_removed, 5);
    assert_eq!(stats.max_depth, Some(2));
    assert_eq!(stats.tests_run, 51);
}

#[test]
fn discrete_dataset_recovers_cpdag() {
    let data = discrete_dataset();
    let test = DiscreteGSquare::new(DISCRETE_LEVELS.to_vec());
    for options in methods() {
        let result = run_pc(&test, &data, ALPHA, &options).unwrap();
        assert_eq!(
            result.skeleton.graph.edges().collect::<Vec<_>>(),
            DISCRETE_SKELETON.to_vec()
        );
        assert_eq!(sorted_arcs(result.cpdag.arcs()), DISCRETE_ARCS.to_vec());
        for (i, j) in [(0, 1), (0, 3), (0, 4), (1, 4), (2, 4)] {
            assert!(separating_set(&result, i, j).is_empty());
        }
        assert_eq!(separating_set(&result, 2, 3), vec![1]);
    }
}

#[test]
fn discrete_dataset_with_observed_levels() {
    let data = discrete_dataset();
    let explicit = run_pc(
        &DiscreteGSquare::new(DISCRETE_LEVELS.to_vec()),
        &data,
        ALPHA,
        &SkeletonOptions::default(),
    )
    .unwrap();
    let observed = run_pc(
        &DiscreteGSquare::with_observed_levels(),
        &data,
        ALPHA,
        &SkeletonOptions::default(),
    )
    .unwrap();
    assert_eq!(explicit, observed);
    assert_eq!(observed.skeleton.stats.tests_run, 25);
    assert_eq!(observed.skeleton.stats.max_depth, Some(1));
}

#[test]
fn sparse_cubes_give_the_same_result() {
    let data = binary_dataset();
    let dense = BinaryGSquare::default();
    let sparse = BinaryGSquare::new(GSquareConfig::binary().with_dense_limit(0));
    for options in methods() {
        assert_eq!(
            run_pc(&dense, &data, ALPHA, &options).unwrap(),
            run_pc(&sparse, &data, ALPHA, &options).unwrap()
        );
    }
}

#[test]
fn relabeled_columns_give_relabeled_cpdag() {
    let order = [4, 3, 2, 1, 0];
    let cases: [(DataMatrix, Box<dyn IndependenceTest>, &[(usize, usize)]); 2] = [
        (binary_dataset(), Box::new(BinaryGSquare::default()), &BINARY_ARCS),
        (
            discrete_dataset(),
            Box::new(DiscreteGSquare::with_observed_levels()),
            &DISCRETE_ARCS,
        ),
    ];
    for (data, test, expected) in &cases {
        let reversed = data.select_columns(&order).unwrap();
        for options in methods() {
            let result = run_pc(test.as_ref(), &reversed, ALPHA, &options).unwrap();
            let arcs = sorted_arcs(result.cpdag.arcs().map(|(a, b)| (order[a], order[b])));
            assert_eq!(arcs, expected.to_vec(), "{:?}", options.method);
        }
    }
}

#[test]
fn staged_api_matches_run_pc() {
    let data = binary_dataset();
    let options = SkeletonOptions::default().with_method(SkeletonMethod::Stable);
    let skeleton = estimate_skeleton(&BinaryGSquare::default(), &data, ALPHA, &options).unwrap();
    let cpdag = estimate_cpdag(&skeleton.graph, &skeleton.sep_sets).unwrap();
    let combined = run_pc(&BinaryGSquare::default(), &data, ALPHA, &options).unwrap();
    assert_eq!(combined.skeleton, skeleton);
    assert_eq!(combined.cpdag, cpdag);
}

#[test]
fn diagnostics_match_stats() {
    let data = binary_dataset();
    let mut sink = RecordingSink::new();
    let result = run_pc_with_sink(
        &BinaryGSquare::default(),
        &data,
        ALPHA,
        &SkeletonOptions::default(),
        &mut sink,
    )
    .unwrap();
    assert_eq!(sink.tests(), result.skeleton.stats.tests_run);
    let removed = sink
        .events
        .iter()
        .filter(|e| matches!(e, Diagnostic::EdgeRemoved { .. }))
        .count();
    assert_eq!(removed, result.skeleton.stats.edges_removed);
    let colliders = sink
        .events
        .iter()
        .filter(|e| matches!(e, Diagnostic::ColliderOriented { .. }))
        .count();
    // x0 → x1 ← x3, x0 → x1 ← x4 and x3 → x1 ← x4
    assert_eq!(colliders, 3);
    assert!(matches!(
        sink.events.last(),
        Some(Diagnostic::OrientationConverged { .. })
    ));
}

#[test]
fn max_reach_zero_keeps_conditionally_separated_edges() {
    let data = binary_dataset();
    let options = SkeletonOptions::default().with_max_reach(0);
    let result = run_pc(&BinaryGSquare::default(), &data, ALPHA, &options).unwrap();
    // 3 - 4 needs {2} and 1 - 2 needs {3, 4}
    assert!(result.skeleton.graph.has_edge(3, 4));
    assert!(result.skeleton.graph.has_edge(1, 2));
    assert_eq!(result.skeleton.stats.max_depth, Some(0));
    assert!(matches!(result.skeleton.sep_sets.get(3, 4), SepEntry::Set(s) if s.is_empty()));
}
