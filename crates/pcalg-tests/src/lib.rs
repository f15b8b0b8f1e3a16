//! Shared fixtures for the integration tests in `tests/`.
//!
//! - Exact-frequency datasets: every joint configuration appears exactly as
//!   often as its probability under the generating DAG dictates, so the
//!   DAG's independencies hold exactly in the sample.
//! - A d-separation oracle usable as an independence test.

use pcalg_core::{Category, DataMatrix, PcError, UndirectedGraph};

/// 5000 binary observations of `x0 … x4` from
/// `x0 → x1 ← x3 ← x2 → x4 → x1`.
///
/// `x0`, `x2` uniform; `x3` and `x4` copy `x2` with probability 4/5;
/// `P(x1 = 1) = (1 + 3·x0 + 2·x3 + 3·x4) / 10`.
pub fn binary_dataset() -> DataMatrix {
    let agree = |a: u32, b: u32| if a == b { 4 } else { 1 };
    let mut rows: Vec<[Category; 5]> = Vec::with_capacity(5000);
    for x0 in 0..2u32 {
        for x2 in 0..2u32 {
            for x3 in 0..2u32 {
                for x4 in 0..2u32 {
                    let ones = 1 + 3 * x0 + 2 * x3 + 3 * x4;
                    for x1 in 0..2u32 {
                        let c = if x1 == 1 { ones } else { 10 - ones };
                        let count = 5 * agree(x3, x2) * agree(x4, x2) * c;
                        for _ in 0..count {
                            rows.push([x0, x1, x2, x3, x4]);
                        }
                    }
                }
            }
        }
    }
    DataMatrix::from_rows(rows).expect("fixture rows have equal width")
}

/// Levels of [`discrete_dataset`].
pub const DISCRETE_LEVELS: [usize; 5] = [3, 2, 3, 4, 2];

/// 10000 categorical observations from `x0 → x2 ← x1 → x3 ← x4`.
///
/// `P(x0) = (1, 2, 2)/5`; `x1`, `x4` uniform binary; `x2 | x0, x1` in fifths;
/// `x3 | x1, x4` in tenths, with 7/10 on level `2·x1 + x4`.
pub fn discrete_dataset() -> DataMatrix {
    const P0: [u32; 3] = [1, 2, 2];
    const X2_GIVEN_X1: [[u32; 3]; 3] = [[1, 1, 3], [1, 1, 3], [0, 1, 4]];
    let mut rows: Vec<[Category; 5]> = Vec::with_capacity(10_000);
    for x0 in 0..3u32 {
        for x1 in 0..2u32 {
            for x4 in 0..2u32 {
                for x2 in 0..3u32 {
                    let t2 = if x1 == 0 {
                        if x2 == x0 {
                            3
                        } else {
                            1
                        }
                    } else {
                        X2_GIVEN_X1[x0 as usize][x2 as usize]
                    };
                    for x3 in 0..4u32 {
                        let t3 = if x3 == 2 * x1 + x4 { 7 } else { 1 };
                        let count = 10 * P0[x0 as usize] * t2 * t3;
                        for _ in 0..count {
                            rows.push([x0, x1, x2, x3, x4]);
                        }
                    }
                }
            }
        }
    }
    DataMatrix::from_rows(rows).expect("fixture rows have equal width")
}

/// `rows` observations of `cols` mutually independent variables, each
/// uniform over `levels` categories, from a seeded LCG.
pub fn uniform_noise(rows: usize, cols: usize, levels: u32, seed: u64) -> DataMatrix {
    let mut state = seed;
    let mut next_unit = || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 11) as f64) / ((u64::MAX >> 11) as f64)
    };
    let cells = (0..rows * cols)
        .map(|_| ((next_unit() * f64::from(levels)) as u32).min(levels - 1))
        .collect();
    DataMatrix::from_vec(rows, cols, cells).expect("generated shape is consistent")
}

/// Sorted arcs as `(from, to)`.
pub fn sorted_arcs(arcs: impl IntoIterator<Item = (usize, usize)>) -> Vec<(usize, usize)> {
    let mut out: Vec<_> = arcs.into_iter().collect();
    out.sort_unstable();
    out
}

/// A DAG given by parent lists, used as ground truth.
#[derive(Debug, Clone)]
pub struct Dag {
    parents: Vec<Vec<usize>>,
}

impl Dag {
    /// DAG over `n` nodes with arcs `from → to`. Arcs must satisfy `from < to`.
    pub fn new(n: usize, arcs: &[(usize, usize)]) -> Self {
        let mut parents = vec![Vec::new(); n];
        for &(from, to) in arcs {
            assert!(from < to, "arcs must follow the node order");
            parents[to].push(from);
        }
        Self { parents }
    }

    pub fn n_nodes(&self) -> usize {
        self.parents.len()
    }

    pub fn has_arc(&self, from: usize, to: usize) -> bool {
        self.parents[to].contains(&from)
    }

    /// Undirected version of the DAG.
    pub fn skeleton(&self) -> UndirectedGraph {
        let mut g = UndirectedGraph::empty(self.n_nodes());
        for (child, parents) in self.parents.iter().enumerate() {
            for &p in parents {
                g.add_edge(p, child);
            }
        }
        g
    }

    /// Whether `cond` d-separates `x` and `y`, via the moralized ancestral
    /// graph of `{x, y} ∪ cond`.
    pub fn d_separated(&self, x: usize, y: usize, cond: &[usize]) -> bool {
        let n = self.n_nodes();
        let mut ancestral = vec![false; n];
        let mut stack: Vec<usize> = [x, y].iter().chain(cond).copied().collect();
        while let Some(v) = stack.pop() {
            if !ancestral[v] {
                ancestral[v] = true;
                stack.extend(self.parents[v].iter().copied());
            }
        }

        let mut moral = UndirectedGraph::empty(n);
        for child in (0..n).filter(|&c| ancestral[c]) {
            let parents = &self.parents[child];
            for (idx, &p) in parents.iter().enumerate() {
                moral.add_edge(p, child);
                for &q in &parents[idx + 1..] {
                    moral.add_edge(p, q);
                }
            }
        }

        let mut seen = vec![false; n];
        for &z in cond {
            seen[z] = true;
        }
        let mut stack = vec![x];
        seen[x] = true;
        while let Some(v) = stack.pop() {
            if v == y {
                return false;
            }
            for &w in moral.neighbors(v) {
                if !seen[w] {
                    seen[w] = true;
                    stack.push(w);
                }
            }
        }
        true
    }

    /// Independence test answering `1.0` for d-separated queries and `0.0`
    /// otherwise.
    pub fn oracle(&self) -> impl Fn(&DataMatrix, usize, usize, &[usize]) -> Result<f64, PcError> + '_ {
        move |_: &DataMatrix, x: usize, y: usize, cond: &[usize]| -> Result<f64, PcError> {
            Ok(if self.d_separated(x, y, cond) { 1.0 } else { 0.0 })
        }
    }
}

/// A one-row matrix with `n` columns, for oracle-driven runs.
pub fn placeholder_data(n: usize) -> DataMatrix {
    DataMatrix::from_vec(1, n, vec![0; n]).expect("shape matches buffer")
}
