//! Categorical observation matrix.
//!
//! Cells are category codes stored row-major. A code is only meaningful
//! relative to a level vector: column `c` holds values in `[0, levels[c])`.
//! Range checks happen in the statistic, against whichever level vector the
//! test was configured with.

use crate::engine::errors::PcError;

/// Category code of a single cell.
pub type Category = u32;

/// An immutable `rows × cols` matrix of category codes.
///
/// The observed level vector is computed once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawMatrix", into = "RawMatrix")
)]
pub struct DataMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<Category>,
    observed: Vec<usize>,
}

impl DataMatrix {
    /// Builds a matrix from a flat row-major buffer.
    pub fn from_vec(rows: usize, cols: usize, cells: Vec<Category>) -> Result<Self, PcError> {
        let expected = rows.checked_mul(cols).ok_or_else(|| {
            PcError::data(format!("matrix shape {rows}x{cols} overflows usize"))
        })?;
        if cells.len() != expected {
            return Err(PcError::data(format!(
                "buffer holds {} cells, shape {rows}x{cols} needs {expected}",
                cells.len()
            )));
        }
        Ok(Self::assemble(rows, cols, cells))
    }

    /// Builds a matrix from row slices. All rows must have the same width.
    pub fn from_rows<I, R>(rows: I) -> Result<Self, PcError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[Category]>,
    {
        let mut cells = Vec::new();
        let mut cols = None;
        let mut count = 0usize;
        for row in rows {
            let row = row.as_ref();
            match cols {
                None => cols = Some(row.len()),
                Some(width) if width != row.len() => {
                    return Err(PcError::data(format!(
                        "row {count} has {} columns, expected {width}",
                        row.len()
                    )));
                }
                Some(_) => {}
            }
            cells.extend_from_slice(row);
            count += 1;
        }
        Ok(Self::assemble(count, cols.unwrap_or(0), cells))
    }

    fn assemble(rows: usize, cols: usize, cells: Vec<Category>) -> Self {
        let mut levels = vec![1usize; cols];
        if cols > 0 {
            for row in cells.chunks_exact(cols) {
                for (level, &value) in levels.iter_mut().zip(row) {
                    *level = (*level).max(value as usize + 1);
                }
            }
        }
        Self {
            rows,
            cols,
            cells,
            observed: levels,
        }
    }

    /// Number of observations.
    pub fn n_rows(&self) -> usize {
        self.rows
    }

    /// Number of variables.
    pub fn n_cols(&self) -> usize {
        self.cols
    }

    /// The cell at `(row, col)`. Panics when out of bounds, like slice indexing.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Category {
        self.cells[row * self.cols + col]
    }

    /// One observation.
    #[inline]
    pub fn row(&self, row: usize) -> &[Category] {
        let start = row * self.cols;
        &self.cells[start..start + self.cols]
    }

    /// Iterates over observations in order.
    pub fn rows(&self) -> impl Iterator<Item = &[Category]> + '_ {
        // chunks_exact panics on zero width, and a zero-width matrix has no cells anyway
        self.cells
            .chunks_exact(self.cols.max(1))
            .take(if self.cols == 0 { 0 } else { self.rows })
    }

    /// `max + 1` of every column, the smallest level vector the data fits.
    ///
    /// Empty columns report a single level.
    #[inline]
    pub fn observed_levels(&self) -> &[usize] {
        &self.observed
    }

    /// Returns a copy whose column `c` is column `order[c]` of `self`.
    pub fn select_columns(&self, order: &[usize]) -> Result<Self, PcError> {
        if let Some(&bad) = order.iter().find(|&&c| c >= self.cols) {
            return Err(PcError::data(format!(
                "column {bad} out of range for {} columns",
                self.cols
            )));
        }
        let mut cells = Vec::with_capacity(self.rows * order.len());
        for row in self.rows() {
            cells.extend(order.iter().map(|&c| row[c]));
        }
        Ok(Self::assemble(self.rows, order.len(), cells))
    }
}

/// Wire form of [`DataMatrix`]; the level cache is rebuilt on load.
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct RawMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<Category>,
}

#[cfg(feature = "serde")]
impl From<DataMatrix> for RawMatrix {
    fn from(data: DataMatrix) -> Self {
        Self {
            rows: data.rows,
            cols: data.cols,
            cells: data.cells,
        }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<RawMatrix> for DataMatrix {
    type Error = PcError;

    fn try_from(raw: RawMatrix) -> Result<Self, PcError> {
        Self::from_vec(raw.rows, raw.cols, raw.cells)
    }
}
