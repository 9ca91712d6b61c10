//! Coordinate (triplet) storage.
//!
//! Elements live in three parallel arrays kept in one global order:
//! row-major, then column-ascending. The order is both an invariant and the
//! mechanism: it makes lookup and insertion binary searches and gives the
//! assembly sweep (which naturally emits ordered elements) an O(1)
//! tail-append fast path. COO is the general fallback format and the
//! remainder partition of the hybrid format.

use crate::kernels;
use crate::matrix::{Entry, EntryCursor, SparseMatrix};

#[derive(Clone, Debug)]
pub struct CooMatrix {
    rows: usize,
    columns: usize,
    row_indices: Vec<usize>,
    column_indices: Vec<usize>,
    values: Vec<f64>,
}

impl CooMatrix {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            row_indices: Vec::new(),
            column_indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build from a stream of (row, column, value) triples. Later duplicates
    /// overwrite earlier ones.
    pub fn from_entries<I>(rows: usize, columns: usize, entries: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let mut sorted: Vec<_> = entries.into_iter().collect();
        sorted.sort_by_key(|&(row, column, _)| (row, column));
        let mut matrix = Self::new(rows, columns);
        for (row, column, value) in sorted {
            matrix.insert(row, column, value);
        }
        matrix
    }

    pub fn row_indices(&self) -> &[usize] {
        &self.row_indices
    }

    pub fn column_indices(&self) -> &[usize] {
        &self.column_indices
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Convert to CSR; the global ordering makes this a single pass.
    pub fn to_csr(&self) -> super::CsrMatrix {
        let mut row_offsets = vec![0usize; self.rows + 1];
        for &row in &self.row_indices {
            row_offsets[row + 1] += 1;
        }
        for index in 1..row_offsets.len() {
            row_offsets[index] += row_offsets[index - 1];
        }
        super::CsrMatrix::from_parts(
            self.rows,
            self.columns,
            row_offsets,
            self.column_indices.clone(),
            self.values.clone(),
        )
    }

    pub fn entries(&self) -> CooEntries<'_> {
        CooEntries {
            matrix: self,
            position: 0,
        }
    }

    /// Locate `(row, column)` in the global order: the slot holding it, or
    /// the slot where it would be spliced in.
    fn locate(&self, row: usize, column: usize) -> Result<usize, usize> {
        let start = self.row_indices.partition_point(|&r| r < row);
        let end = start + self.row_indices[start..].partition_point(|&r| r == row);
        match self.column_indices[start..end].binary_search(&column) {
            Ok(index) => Ok(start + index),
            Err(index) => Err(start + index),
        }
    }
}

impl SparseMatrix for CooMatrix {
    fn rows(&self) -> usize {
        self.rows
    }

    fn columns(&self) -> usize {
        self.columns
    }

    fn nnz(&self) -> usize {
        self.values.len()
    }

    fn value(&self, row: usize, column: usize) -> f64 {
        assert!(row < self.rows && column < self.columns, "position out of range");
        match self.locate(row, column) {
            Ok(index) => self.values[index],
            Err(_) => 0.0,
        }
    }

    fn insert(&mut self, row: usize, column: usize, value: f64) {
        assert!(row < self.rows && column < self.columns, "position out of range");
        // Fast path: the new element extends the global order.
        let extends = match (self.row_indices.last(), self.column_indices.last()) {
            (Some(&last_row), Some(&last_column)) => (row, column) > (last_row, last_column),
            _ => true,
        };
        if extends {
            self.row_indices.push(row);
            self.column_indices.push(column);
            self.values.push(value);
            return;
        }
        match self.locate(row, column) {
            Ok(index) => self.values[index] = value,
            Err(index) => {
                self.row_indices.insert(index, row);
                self.column_indices.insert(index, column);
                self.values.insert(index, value);
            }
        }
    }

    fn multiply(&self, alpha: f64, x: &[f64], beta: f64, y: &mut [f64]) {
        debug_assert_eq!(x.len(), self.columns);
        debug_assert_eq!(y.len(), self.rows);
        kernels::coo_spmv(
            alpha,
            &self.row_indices,
            &self.column_indices,
            &self.values,
            x,
            beta,
            y,
        );
    }
}

/// Bidirectional cursor over a [`CooMatrix`]; the global ordering makes it a
/// plain index walk.
pub struct CooEntries<'a> {
    matrix: &'a CooMatrix,
    position: usize,
}

impl EntryCursor for CooEntries<'_> {
    fn entry(&self) -> Option<Entry> {
        if self.position >= self.matrix.values.len() {
            return None;
        }
        Some(Entry::new(
            self.matrix.row_indices[self.position],
            self.matrix.column_indices[self.position],
            self.matrix.values[self.position],
        ))
    }

    fn advance(&mut self) -> bool {
        if self.position >= self.matrix.values.len() {
            return false;
        }
        self.position += 1;
        true
    }

    fn retreat(&mut self) -> bool {
        if self.position == 0 {
            return false;
        }
        self.position -= 1;
        true
    }
}

impl Iterator for CooEntries<'_> {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        let entry = self.entry();
        if entry.is_some() {
            self.advance();
        }
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maintains_global_order() {
        let mut m = CooMatrix::new(3, 3);
        m.insert(2, 1, 3.0);
        m.insert(0, 2, 1.0);
        m.insert(2, 0, 2.0);
        m.insert(0, 0, 0.5);
        let order: Vec<_> = m.entries().map(|e| (e.row, e.column)).collect();
        assert_eq!(order, vec![(0, 0), (0, 2), (2, 0), (2, 1)]);
    }

    #[test]
    fn tail_append_and_overwrite() {
        let mut m = CooMatrix::new(2, 2);
        m.insert(0, 0, 1.0);
        m.insert(0, 1, 2.0);
        m.insert(1, 1, 3.0);
        assert_eq!(m.nnz(), 3);
        m.insert(0, 1, 9.0);
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.value(0, 1), 9.0);
    }

    #[test]
    fn lookup_misses_return_zero() {
        let mut m = CooMatrix::new(2, 3);
        m.insert(1, 2, 4.0);
        assert_eq!(m.value(0, 0), 0.0);
        assert_eq!(m.value(1, 1), 0.0);
        assert_eq!(m.value(1, 2), 4.0);
    }

    #[test]
    fn multiply_matches_dense_arithmetic() {
        // A = [[0, 1], [2, 0]], x = [3, 4]: A*x = [4, 6]
        let m = CooMatrix::from_entries(2, 2, vec![(0, 1, 1.0), (1, 0, 2.0)]);
        let mut y = vec![0.0, 0.0];
        m.multiply(1.0, &[3.0, 4.0], 0.0, &mut y);
        assert_eq!(y, vec![4.0, 6.0]);
    }

    #[test]
    fn to_csr_preserves_structure() {
        let m = CooMatrix::from_entries(3, 3, vec![(0, 1, 1.0), (2, 0, 2.0), (2, 2, 3.0)]);
        let csr = m.to_csr();
        assert_eq!(csr.nnz(), 3);
        assert_eq!(csr.value(0, 1), 1.0);
        assert_eq!(csr.value(2, 0), 2.0);
        assert_eq!(csr.value(2, 2), 3.0);
        assert_eq!(csr.value(1, 1), 0.0);
    }

    #[test]
    fn cursor_inverse_law() {
        let m = CooMatrix::from_entries(2, 2, vec![(0, 0, 1.0), (1, 0, 2.0), (1, 1, 3.0)]);
        let mut cursor = m.entries();
        assert!(cursor.advance());
        assert!(cursor.advance());
        assert!(cursor.retreat());
        assert!(cursor.retreat());
        assert_eq!(cursor.entry(), Some(Entry::new(0, 0, 1.0)));
    }
}
