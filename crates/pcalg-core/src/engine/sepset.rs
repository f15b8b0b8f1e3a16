//! Separation-set table.
//!
//! One cell per unordered pair, so `get(i, j)` and `get(j, i)` always read the
//! same cell.

use smallvec::SmallVec;

use crate::engine::errors::PcError;

/// Sorted conditioning set.
pub type NodeSet = SmallVec<[usize; 8]>;

/// Contents of one cell of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SepEntry {
    /// The set that separated the pair, or empty when the pair was never
    /// separated (or was separated marginally).
    Set(NodeSet),
    /// The pair was excluded a priori by an init graph. No separation claim
    /// exists, so orientation must not reason through it.
    Unusable,
}

impl SepEntry {
    /// The recorded set, `None` for [`SepEntry::Unusable`].
    pub fn as_set(&self) -> Option<&[usize]> {
        match self {
            SepEntry::Set(set) => Some(set),
            SepEntry::Unusable => None,
        }
    }

    /// Whether `node` is in the recorded set. Always `false` when unusable.
    pub fn contains(&self, node: usize) -> bool {
        self.as_set().is_some_and(|s| s.binary_search(&node).is_ok())
    }
}

/// `n × n` table of separation sets.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawTable", into = "RawTable")
)]
pub struct SeparationSets {
    n: usize,
    /// Upper triangle, row-major, diagonal excluded.
    cells: Vec<SepEntry>,
}

impl SeparationSets {
    /// Table over `n` nodes with every cell holding the empty set.
    pub fn new(n: usize) -> Self {
        let pairs = n * n.saturating_sub(1) / 2;
        Self {
            n,
            cells: vec![SepEntry::Set(NodeSet::new()); pairs],
        }
    }

    /// Number of nodes.
    pub fn n_nodes(&self) -> usize {
        self.n
    }

    fn index(&self, i: usize, j: usize) -> usize {
        debug_assert!(i != j && i < self.n && j < self.n);
        let (a, b) = if i < j { (i, j) } else { (j, i) };
        // rows 0..a contribute (n-1) + (n-2) + ... + (n-a) cells
        a * (2 * self.n - a - 1) / 2 + (b - a - 1)
    }

    fn check(&self, i: usize, j: usize) -> Result<(), PcError> {
        if i >= self.n || j >= self.n || i == j {
            return Err(PcError::config(format!(
                "pair ({i}, {j}) invalid for {} nodes",
                self.n
            )));
        }
        Ok(())
    }

    /// The cell for `{i, j}`.
    ///
    /// Panics when `i == j` or either index is out of range.
    pub fn get(&self, i: usize, j: usize) -> &SepEntry {
        assert!(i != j && i < self.n && j < self.n, "invalid pair ({i}, {j})");
        &self.cells[self.index(i, j)]
    }

    /// Records `set` as the separating set of `{i, j}`. The set is sorted.
    pub fn set(&mut self, i: usize, j: usize, set: &[usize]) -> Result<(), PcError> {
        self.check(i, j)?;
        let mut sorted = NodeSet::from_slice(set);
        sorted.sort_unstable();
        sorted.dedup();
        let idx = self.index(i, j);
        self.cells[idx] = SepEntry::Set(sorted);
        Ok(())
    }

    /// Marks `{i, j}` as excluded a priori.
    pub fn mark_unusable(&mut self, i: usize, j: usize) -> Result<(), PcError> {
        self.check(i, j)?;
        let idx = self.index(i, j);
        self.cells[idx] = SepEntry::Unusable;
        Ok(())
    }

    /// Whether `{i, j}` is marked unusable.
    pub fn is_unusable(&self, i: usize, j: usize) -> bool {
        matches!(self.get(i, j), SepEntry::Unusable)
    }

    /// Rebuilds a table from its upper-triangle cells, re-sorting each set.
    #[cfg(feature = "serde")]
    fn from_cells(n: usize, cells: Vec<SepEntry>) -> Result<Self, PcError> {
        let expected = n.checked_mul(n.saturating_sub(1)).map(|c| c / 2);
        if expected != Some(cells.len()) {
            return Err(PcError::config(format!(
                "{} separation cells do not fit {n} nodes",
                cells.len()
            )));
        }
        let mut table = Self::new(n);
        let pairs: Vec<(usize, usize)> = table.iter().map(|(pair, _)| pair).collect();
        for ((i, j), cell) in pairs.into_iter().zip(cells) {
            match cell {
                SepEntry::Set(set) => {
                    if let Some(&bad) = set.iter().find(|&&k| k >= n || k == i || k == j) {
                        return Err(PcError::config(format!(
                            "node {bad} cannot separate ({i}, {j}) over {n} nodes"
                        )));
                    }
                    table.set(i, j, &set)?;
                }
                SepEntry::Unusable => table.mark_unusable(i, j)?,
            }
        }
        Ok(table)
    }

    /// Every pair `(i, j)` with `i < j` and its cell.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &SepEntry)> + '_ {
        let n = self.n;
        (0..n)
            .flat_map(move |i| ((i + 1)..n).map(move |j| (i, j)))
            .zip(self.cells.iter())
    }
}

/// Wire form of [`SeparationSets`].
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct RawTable {
    n: usize,
    cells: Vec<SepEntry>,
}

#[cfg(feature = "serde")]
impl From<SeparationSets> for RawTable {
    fn from(table: SeparationSets) -> Self {
        Self {
            n: table.n,
            cells: table.cells,
        }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<RawTable> for SeparationSets {
    type Error = PcError;

    fn try_from(raw: RawTable) -> Result<Self, PcError> {
        Self::from_cells(raw.n, raw.cells)
    }
}
