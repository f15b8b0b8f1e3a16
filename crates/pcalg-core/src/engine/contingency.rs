//! # Contingency accounting and the G² statistic
//!
//! A [`ContingencyCube`] holds counts `n[i, j, k]` where `i` ranges over the
//! levels of `x`, `j` over the levels of `y`, and `k` over configurations of
//! the conditioning set. It is built in one of two ways:
//!
//! - **Dense**: `k` is the mixed-radix code of the conditioning tuple,
//!   `k = Σ value_z · ∏_{z' < z} levels[z']` (first conditioning variable is
//!   the least significant digit). One pass over the rows, memory
//!   `levels[x] · levels[y] · ∏ levels[z]`.
//!
//! - **Sparse**: `k` is the order in which a configuration was first seen in
//!   the data. Configurations are interned in a hash map and the count arena
//!   grows by one `levels[x] · levels[y]` block per new configuration, so
//!   memory scales with the distinct configurations actually observed.
//!
//! Both layouts produce identical G² values; only the stratum numbering
//! differs.
//!
//! The statistic is `G² = 2 Σ n_ijk ln(n_ijk / e_ijk)` with
//! `e_ijk = n_i·k · n_·jk / n_··k`. Cells with `n_ijk = 0` contribute nothing
//! and strata with `n_··k = 0` are skipped (and counted).

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::engine::data::{Category, DataMatrix};
use crate::engine::errors::PcError;

/// Minimum rows per degree of freedom for a conclusive test.
pub const MIN_ROWS_PER_DOF: u64 = 10;

/// Default dense/sparse switch for the binary test: dense below 6 conditioning variables.
pub const BINARY_DENSE_LIMIT: usize = 6;

/// Default dense/sparse switch for the discrete test: dense below 5 conditioning variables.
pub const DISCRETE_DENSE_LIMIT: usize = 5;

/// Hard cap on dense cube cells regardless of the conditioning-set size.
const MAX_DENSE_CELLS: usize = 1 << 24;

/// Conditioning tuple used as a sparse-cube key.
type ConfigKey = SmallVec<[Category; 8]>;

/// Level count per column.
#[derive(Debug, Clone, Copy)]
pub enum Levels<'a> {
    /// Every column has the same number of levels.
    Uniform(usize),
    /// One entry per column.
    PerColumn(&'a [usize]),
}

impl Levels<'_> {
    /// Levels of `col`.
    #[inline]
    pub fn of(&self, col: usize) -> usize {
        match self {
            Levels::Uniform(n) => *n,
            Levels::PerColumn(levels) => levels[col],
        }
    }
}

/// Degrees of freedom of the test of `x ⊥ y | cond`:
/// `(levels[x] - 1) · (levels[y] - 1) · ∏_{z ∈ cond} levels[z]`.
///
/// Saturates at `u64::MAX` instead of overflowing.
pub fn degrees_of_freedom(levels: Levels<'_>, x: usize, y: usize, cond: &[usize]) -> u64 {
    let base = (levels.of(x).saturating_sub(1) as u64)
        .saturating_mul(levels.of(y).saturating_sub(1) as u64);
    cond.iter()
        .fold(base, |acc, &z| acc.saturating_mul(levels.of(z) as u64))
}

/// Counts for one `(x, y | cond)` query.
#[derive(Debug, Clone)]
pub struct ContingencyCube {
    levels_x: usize,
    levels_y: usize,
    strata: usize,
    counts: Vec<u64>,
}

/// G² value plus the bookkeeping needed to interpret it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GSquare {
    /// The statistic, clamped at zero.
    pub statistic: f64,
    /// Strata in the cube.
    pub strata: usize,
    /// Strata without any observation, excluded from the sum.
    pub empty_strata: usize,
}

impl ContingencyCube {
    /// Picks the dense layout when `cond.len() < dense_limit` and the dense
    /// cube fits, the sparse layout otherwise.
    pub fn build(
        data: &DataMatrix,
        levels: Levels<'_>,
        x: usize,
        y: usize,
        cond: &[usize],
        dense_limit: usize,
    ) -> Result<Self, PcError> {
        if cond.len() < dense_limit && dense_cells(levels, x, y, cond).is_some() {
            Self::dense(data, levels, x, y, cond)
        } else {
            Self::sparse(data, levels, x, y, cond)
        }
    }

    /// Dense layout indexed by the mixed-radix code of the conditioning tuple.
    pub fn dense(
        data: &DataMatrix,
        levels: Levels<'_>,
        x: usize,
        y: usize,
        cond: &[usize],
    ) -> Result<Self, PcError> {
        let (levels_x, levels_y) = (levels.of(x), levels.of(y));
        let cells = dense_cells(levels, x, y, cond).ok_or_else(|| {
            PcError::Numerical(format!(
                "dense contingency cube for {x} vs {y} given {cond:?} exceeds {MAX_DENSE_CELLS} cells"
            ))
        })?;
        let block = levels_x * levels_y;
        let strata = cells / block.max(1);

        let radix: SmallVec<[usize; 8]> = cond
            .iter()
            .scan(1usize, |stride, &z| {
                let current = *stride;
                *stride *= levels.of(z);
                Some(current)
            })
            .collect();

        let mut counts = vec![0u64; cells];
        for (row_idx, row) in data.rows().enumerate() {
            let i = checked_code(row, x, levels_x, row_idx)?;
            let j = checked_code(row, y, levels_y, row_idx)?;
            let mut k = 0usize;
            for (&z, &stride) in cond.iter().zip(&radix) {
                k += checked_code(row, z, levels.of(z), row_idx)? * stride;
            }
            counts[(k * levels_x + i) * levels_y + j] += 1;
        }

        Ok(Self {
            levels_x,
            levels_y,
            strata,
            counts,
        })
    }

    /// Sparse layout indexed by first appearance of each configuration.
    pub fn sparse(
        data: &DataMatrix,
        levels: Levels<'_>,
        x: usize,
        y: usize,
        cond: &[usize],
    ) -> Result<Self, PcError> {
        let (levels_x, levels_y) = (levels.of(x), levels.of(y));
        let block = levels_x * levels_y;

        let mut slots: FxHashMap<ConfigKey, usize> = FxHashMap::default();
        let mut counts: Vec<u64> = Vec::new();
        let mut key = ConfigKey::with_capacity(cond.len());

        for (row_idx, row) in data.rows().enumerate() {
            let i = checked_code(row, x, levels_x, row_idx)?;
            let j = checked_code(row, y, levels_y, row_idx)?;
            key.clear();
            for &z in cond {
                checked_code(row, z, levels.of(z), row_idx)?;
                key.push(row[z]);
            }
            let k = match slots.get(key.as_slice()) {
                Some(&k) => k,
                None => {
                    let k = slots.len();
                    slots.insert(key.clone(), k);
                    counts.resize(counts.len() + block, 0);
                    k
                }
            };
            counts[(k * levels_x + i) * levels_y + j] += 1;
        }

        Ok(Self {
            levels_x,
            levels_y,
            strata: slots.len(),
            counts,
        })
    }

    /// Number of strata (conditioning configurations) in the cube.
    pub fn n_strata(&self) -> usize {
        self.strata
    }

    /// Total observations counted.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// `n[i, j, k]`.
    pub fn count(&self, i: usize, j: usize, k: usize) -> u64 {
        self.counts[(k * self.levels_x + i) * self.levels_y + j]
    }

    /// Computes G² over all non-empty strata.
    pub fn g_square(&self) -> GSquare {
        let (lx, ly) = (self.levels_x, self.levels_y);
        let block = lx * ly;
        let mut row_sums = vec![0u64; lx];
        let mut col_sums = vec![0u64; ly];
        let mut sum = 0.0f64;
        let mut empty_strata = 0usize;

        for stratum in self.counts.chunks_exact(block.max(1)).take(self.strata) {
            row_sums.fill(0);
            col_sums.fill(0);
            for i in 0..lx {
                for j in 0..ly {
                    let n = stratum[i * ly + j];
                    row_sums[i] += n;
                    col_sums[j] += n;
                }
            }
            let n_k: u64 = row_sums.iter().sum();
            if n_k == 0 {
                empty_strata += 1;
                continue;
            }
            let n_k = n_k as f64;
            for i in 0..lx {
                for j in 0..ly {
                    let n = stratum[i * ly + j];
                    if n == 0 {
                        continue;
                    }
                    let n = n as f64;
                    let expected = row_sums[i] as f64 * col_sums[j] as f64 / n_k;
                    sum += n * (n / expected).ln();
                }
            }
        }

        GSquare {
            statistic: (2.0 * sum).max(0.0),
            strata: self.strata,
            empty_strata,
        }
    }
}

fn dense_cells(levels: Levels<'_>, x: usize, y: usize, cond: &[usize]) -> Option<usize> {
    let cells = cond
        .iter()
        .try_fold(levels.of(x).checked_mul(levels.of(y))?, |acc, &z| {
            acc.checked_mul(levels.of(z))
        })?;
    (cells <= MAX_DENSE_CELLS).then_some(cells)
}

#[inline]
fn checked_code(row: &[Category], col: usize, levels: usize, row_idx: usize) -> Result<usize, PcError> {
    let value = row[col] as usize;
    if value >= levels {
        return Err(PcError::data(format!(
            "row {row_idx}, column {col}: category {value} outside 0..{levels}"
        )));
    }
    Ok(value)
}

/// Upper-tail probability of a chi-square distribution with `dof` degrees of
/// freedom at `statistic`.
pub fn chi_square_sf(statistic: f64, dof: u64) -> Result<f64, PcError> {
    if !statistic.is_finite() {
        return Err(PcError::Numerical(format!(
            "non-finite statistic {statistic}"
        )));
    }
    let dist = ChiSquared::new(dof as f64)
        .map_err(|e| PcError::Numerical(format!("chi-square with {dof} dof: {e}")))?;
    Ok(dist.sf(statistic.max(0.0)).clamp(0.0, 1.0))
}
