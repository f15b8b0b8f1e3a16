//! Statistic sanity checks on the exact-frequency fixtures and on sampled
//! independent data.

use pcalg_core::engine::contingency::degrees_of_freedom;
use pcalg_core::engine::contingency::Levels;
use pcalg_core::{BinaryGSquare, DiscreteGSquare, IndependenceTest};
use pcalg_tests::{binary_dataset, discrete_dataset, uniform_noise, DISCRETE_LEVELS};

/// Fraction of `replicates` seeded samples of three independent variables in
/// which `x0 ⊥ x1 | cond` is rejected at `alpha`.
fn rejection_rate<T: IndependenceTest>(
    test: &T,
    levels: u32,
    replicates: u64,
    cond: &[usize],
    alpha: f64,
) -> f64 {
    let rejected = (1..=replicates)
        .filter(|&seed| {
            let data = uniform_noise(500, 3, levels, seed);
            let outcome = test.test(&data, 0, 1, cond).unwrap();
            assert!(!outcome.is_inconclusive());
            outcome.p_value <= alpha
        })
        .count();
    rejected as f64 / replicates as f64
}

#[test]
fn binary_rejection_rate_tracks_alpha_under_independence() {
    let test = BinaryGSquare::default();
    for cond in [&[][..], &[2][..]] {
        let rate = rejection_rate(&test, 2, 400, cond, 0.05);
        assert!((0.02..=0.10).contains(&rate), "given {cond:?}: rate {rate}");
    }
}

#[test]
fn discrete_rejection_rate_tracks_alpha_under_independence() {
    let test = DiscreteGSquare::new(vec![3; 3]);
    for cond in [&[][..], &[2][..]] {
        let rate = rejection_rate(&test, 3, 200, cond, 0.05);
        assert!((0.02..=0.12).contains(&rate), "given {cond:?}: rate {rate}");
    }
}

#[test]
fn exact_independencies_have_unit_p_value() {
    let binary = binary_dataset();
    let test = BinaryGSquare::default();
    for (x, y, cond) in [(0, 2, vec![]), (3, 4, vec![2]), (1, 2, vec![3, 4]), (0, 3, vec![])] {
        let outcome = test.test(&binary, x, y, &cond).unwrap();
        assert!(outcome.p_value > 0.999, "{x} vs {y} given {cond:?}: {}", outcome.p_value);
    }

    let discrete = discrete_dataset();
    let test = DiscreteGSquare::new(DISCRETE_LEVELS.to_vec());
    for (x, y, cond) in [(0, 1, vec![]), (2, 3, vec![1]), (0, 4, vec![]), (2, 4, vec![])] {
        let outcome = test.test(&discrete, x, y, &cond).unwrap();
        assert!(outcome.p_value > 0.999, "{x} vs {y} given {cond:?}: {}", outcome.p_value);
    }
}

#[test]
fn true_edges_are_strongly_dependent() {
    let binary = binary_dataset();
    let test = BinaryGSquare::default();
    for (x, y) in [(0, 1), (1, 3), (1, 4), (2, 3), (2, 4)] {
        assert!(test.test(&binary, x, y, &[]).unwrap().p_value < 1e-6);
    }
    let discrete = discrete_dataset();
    let test = DiscreteGSquare::new(DISCRETE_LEVELS.to_vec());
    for (x, y) in [(0, 2), (1, 2), (1, 3), (3, 4)] {
        assert!(test.test(&discrete, x, y, &[]).unwrap().p_value < 1e-6);
    }
}

#[test]
fn degrees_of_freedom_follow_level_products() {
    let binary = Levels::Uniform(2);
    for size in 0..5usize {
        let cond: Vec<usize> = (2..2 + size).collect();
        assert_eq!(degrees_of_freedom(binary, 0, 1, &cond), 1 << size);
    }
    let discrete = Levels::PerColumn(&DISCRETE_LEVELS);
    assert_eq!(degrees_of_freedom(discrete, 0, 2, &[]), 4);
    assert_eq!(degrees_of_freedom(discrete, 2, 3, &[1]), 2 * 3 * 2);
    assert_eq!(degrees_of_freedom(discrete, 0, 3, &[1, 4]), 2 * 3 * 2 * 2);
}
