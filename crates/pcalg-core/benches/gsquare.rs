//! Benchmarks for the G² statistic across cube layouts.
//!
//! Run with:
//! - `cargo bench --bench gsquare`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pcalg_core::engine::contingency::{ContingencyCube, Levels};
use pcalg_core::{BinaryGSquare, DataMatrix, GSquareConfig, IndependenceTest};

/// Binary Markov chain `x0 → x1 → ...` where each variable copies its
/// predecessor with probability 0.8.
fn make_chain(rows: usize, cols: usize, seed: u64) -> DataMatrix {
    let mut state = seed;
    let mut next_unit = || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 11) as f64) / ((u64::MAX >> 11) as f64)
    };
    let mut cells = Vec::with_capacity(rows * cols);
    for _ in 0..rows {
        let mut prev = u32::from(next_unit() < 0.5);
        cells.push(prev);
        for _ in 1..cols {
            prev = if next_unit() < 0.8 { prev } else { 1 - prev };
            cells.push(prev);
        }
    }
    DataMatrix::from_vec(rows, cols, cells).expect("generated shape is consistent")
}

fn bench_cube_layouts(c: &mut Criterion) {
    let data = make_chain(20_000, 10, 7);
    let mut group = c.benchmark_group("contingency_cube");
    for depth in [0_usize, 2, 4, 6] {
        let cond: Vec<usize> = (2..2 + depth).collect();
        group.bench_with_input(BenchmarkId::new("dense", depth), &cond, |b, cond| {
            b.iter(|| {
                let cube =
                    ContingencyCube::dense(black_box(&data), Levels::Uniform(2), 0, 1, cond)
                        .expect("valid query");
                black_box(cube.g_square())
            });
        });
        group.bench_with_input(BenchmarkId::new("sparse", depth), &cond, |b, cond| {
            b.iter(|| {
                let cube =
                    ContingencyCube::sparse(black_box(&data), Levels::Uniform(2), 0, 1, cond)
                        .expect("valid query");
                black_box(cube.g_square())
            });
        });
    }
    group.finish();
}

fn bench_binary_test(c: &mut Criterion) {
    let mut group = c.benchmark_group("binary_g_square");
    for rows in [1_000_usize, 10_000, 100_000] {
        let data = make_chain(rows, 6, rows as u64);
        let test = BinaryGSquare::new(GSquareConfig::binary());
        group.bench_with_input(BenchmarkId::from_parameter(rows), &data, |b, data| {
            b.iter(|| black_box(test.test(data, 0, 5, &[2, 3])))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_cube_layouts, bench_binary_test);
criterion_main!(benches);
