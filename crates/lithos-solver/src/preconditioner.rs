//! ILU(0) preconditioning.
//!
//! The factorization computes A ≈ L·U with zero fill-in: L (unit diagonal,
//! strictly lower part) and U (diagonal and upper part) share the original
//! matrix's sparsity pattern and are packed together into one value array.
//! Applying the preconditioner solves L·t = x then U·y = t, one forward and
//! one backward substitution, with no fusion or refinement. The external solver
//! owns the iteration; `apply` runs once per call.

use lithos_core::{CsrMatrix, SparseMatrix};

use crate::error::{IluError, Result};

/// Pivot magnitudes below this default are treated as unstable.
pub const DEFAULT_PIVOT_THRESHOLD: f64 = 1e-30;

/// Tuning knobs for the factorization.
#[derive(Clone, Debug)]
pub struct IluConfig {
    /// Reject pivots whose magnitude falls below this threshold.
    pub pivot_threshold: f64,
}

impl Default for IluConfig {
    fn default() -> Self {
        Self {
            pivot_threshold: DEFAULT_PIVOT_THRESHOLD,
        }
    }
}

/// A preconditioner M ≈ A applied as `y = M⁻¹ x`.
///
/// `apply` takes `&mut self` because implementations keep a scratch vector
/// sized to the most recent input; a preconditioner instance belongs to one
/// solver loop at a time.
pub trait Preconditioner {
    /// Dimension of the (square) preconditioned system.
    fn dim(&self) -> usize;

    /// `y = M⁻¹ x`.
    fn apply(&mut self, x: &[f64], y: &mut [f64]) -> Result<()>;
}

/// ILU(0) factorization of a square CSR matrix.
#[derive(Debug)]
pub struct Ilu0 {
    n: usize,
    row_offsets: Vec<usize>,
    column_indices: Vec<usize>,
    /// L strictly-lower entries, then the U diagonal+upper entries, packed
    /// in the original pattern's positions.
    factors: Vec<f64>,
    /// Position of each row's diagonal entry in `factors`.
    diag_positions: Vec<usize>,
    /// Forward-substitution result, resized to match the latest `apply`
    /// input.
    scratch: Vec<f64>,
}

impl Ilu0 {
    /// Factorize with the default configuration.
    pub fn new(matrix: &CsrMatrix) -> Result<Self> {
        Self::with_config(matrix, &IluConfig::default())
    }

    /// Factorize `matrix` in the original sparsity pattern.
    ///
    /// Validates that the matrix is square and nonempty, that every row's
    /// columns are strictly ascending, and that every row stores its
    /// diagonal. Pivots are checked as they are produced.
    pub fn with_config(matrix: &CsrMatrix, config: &IluConfig) -> Result<Self> {
        let n = matrix.rows();
        if n == 0 || matrix.nnz() == 0 {
            return Err(IluError::EmptyMatrix);
        }
        if matrix.columns() != n {
            return Err(IluError::NotSquare {
                rows: n,
                columns: matrix.columns(),
            });
        }

        let row_offsets = matrix.full_row_offsets();
        let column_indices = matrix.column_indices().to_vec();
        let mut factors = matrix.values().to_vec();

        // Validate ordering and locate diagonals up front; everything after
        // this relies on both.
        let mut diag_positions = Vec::with_capacity(n);
        for row in 0..n {
            let start = row_offsets[row];
            let end = row_offsets[row + 1];
            let ascending = column_indices[start..end]
                .windows(2)
                .all(|pair| pair[0] < pair[1]);
            if !ascending {
                return Err(IluError::UnsortedColumns { row });
            }
            match column_indices[start..end].binary_search(&row) {
                Ok(index) => diag_positions.push(start + index),
                Err(_) => return Err(IluError::MissingDiagonal { row }),
            }
        }

        // IKJ-ordered elimination restricted to the existing pattern
        // (Saad, Iterative Methods, ILU(0)).
        for i in 0..n {
            let row_start = row_offsets[i];
            let row_end = row_offsets[i + 1];
            let mut k_pos = row_start;
            while k_pos < diag_positions[i] {
                let k = column_indices[k_pos];
                let multiplier = factors[k_pos] / factors[diag_positions[k]];
                factors[k_pos] = multiplier;
                // subtract multiplier * row k from row i, only where row i
                // already has storage
                for j_pos in diag_positions[k] + 1..row_offsets[k + 1] {
                    let j = column_indices[j_pos];
                    if let Ok(found) = column_indices[k_pos + 1..row_end].binary_search(&j) {
                        factors[k_pos + 1 + found] -= multiplier * factors[j_pos];
                    }
                }
                k_pos += 1;
            }
            let pivot = factors[diag_positions[i]];
            if pivot == 0.0 {
                return Err(IluError::ZeroPivot { row: i });
            }
            if pivot.abs() < config.pivot_threshold {
                return Err(IluError::UnstablePivot {
                    row: i,
                    value: pivot,
                });
            }
        }

        log::debug!("ILU(0) factorized {n}x{n} system, {} stored entries", factors.len());
        Ok(Self {
            n,
            row_offsets,
            column_indices,
            factors,
            diag_positions,
            scratch: Vec::new(),
        })
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    /// Row offsets of the factor pattern (identical to the input's).
    pub fn row_offsets(&self) -> &[usize] {
        &self.row_offsets
    }

    pub fn column_indices(&self) -> &[usize] {
        &self.column_indices
    }

    /// The packed L/U factor values.
    pub fn factors(&self) -> &[f64] {
        &self.factors
    }

    /// Position of each row's diagonal within the factor arrays.
    pub fn diag_positions(&self) -> &[usize] {
        &self.diag_positions
    }

    /// Solve L·t = x (unit diagonal) then U·y = t.
    fn substitute(&mut self, x: &[f64], y: &mut [f64]) {
        debug_assert_eq!(x.len(), self.n);
        debug_assert_eq!(y.len(), self.n);
        if self.scratch.len() != x.len() {
            self.scratch.resize(x.len(), 0.0);
        }
        for i in 0..self.n {
            let mut sum = x[i];
            for pos in self.row_offsets[i]..self.diag_positions[i] {
                sum -= self.factors[pos] * self.scratch[self.column_indices[pos]];
            }
            self.scratch[i] = sum;
        }
        for i in (0..self.n).rev() {
            let mut sum = self.scratch[i];
            for pos in self.diag_positions[i] + 1..self.row_offsets[i + 1] {
                sum -= self.factors[pos] * y[self.column_indices[pos]];
            }
            y[i] = sum / self.factors[self.diag_positions[i]];
        }
    }
}

impl Preconditioner for Ilu0 {
    fn dim(&self) -> usize {
        self.n
    }

    fn apply(&mut self, x: &[f64], y: &mut [f64]) -> Result<()> {
        self.substitute(x, y);
        Ok(())
    }
}
