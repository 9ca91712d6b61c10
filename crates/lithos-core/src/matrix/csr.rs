//! Compressed sparse row storage.
//!
//! The canonical format: `row_offsets` marks where each row's elements start
//! in the parallel `column_indices`/`values` arrays, columns are ascending
//! within a row, and no (row, column) pair appears twice. `row_offsets` is
//! materialized lazily: it covers rows only up to the highest one touched by
//! an insertion, and untouched trailing rows are implicitly empty.
//!
//! Random insertion splices into the element arrays and bumps every later
//! row offset, which is O(nnz) per call. That is intentional: the format is
//! built once from an assembly sweep or the exchange codec and then used
//! read-only, so insertion favors a compact final layout over throughput.

use crate::kernels;
use crate::matrix::{Entry, EntryCursor, SparseMatrix};

#[derive(Clone, Debug)]
pub struct CsrMatrix {
    rows: usize,
    columns: usize,
    /// Monotonic non-decreasing, `row_offsets.len() - 1` rows materialized.
    row_offsets: Vec<usize>,
    column_indices: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// An empty matrix with fixed dimensions.
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            row_offsets: vec![0],
            column_indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build from a stream of (row, column, value) triples, as produced by an
    /// external assembly pass. Later duplicates overwrite earlier ones.
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

    /// Assemble from raw arrays, e.g. as decoded from the exchange format.
    ///
    /// `row_offsets` must cover every row and be monotonic; column ordering
    /// within rows is trusted as-is (consumers that require ascending
    /// columns, like the ILU factorization, validate it themselves).
    pub fn from_parts(
        rows: usize,
        columns: usize,
        row_offsets: Vec<usize>,
        column_indices: Vec<usize>,
        values: Vec<f64>,
    ) -> Self {
        assert_eq!(row_offsets.len(), rows + 1, "row_offsets must cover every row");
        assert_eq!(column_indices.len(), values.len());
        assert_eq!(*row_offsets.last().unwrap(), values.len());
        assert!(
            row_offsets.windows(2).all(|pair| pair[0] <= pair[1]),
            "row offsets must be non-decreasing"
        );
        Self {
            rows,
            columns,
            row_offsets,
            column_indices,
            values,
        }
    }

    /// Number of stored elements in `row`.
    pub fn row_nnz(&self, row: usize) -> usize {
        assert!(row < self.rows, "row {row} out of range ({} rows)", self.rows);
        if row + 1 >= self.row_offsets.len() {
            return 0;
        }
        self.row_offsets[row + 1] - self.row_offsets[row]
    }

    /// The materialized row-offset array; may cover fewer than `rows() + 1`
    /// entries when trailing rows were never touched.
    pub fn row_offsets(&self) -> &[usize] {
        &self.row_offsets
    }

    /// Row offsets padded out to cover every row, for consumers that need
    /// the full `rows() + 1` shape (the codec, device uploads).
    pub fn full_row_offsets(&self) -> Vec<usize> {
        let mut offsets = self.row_offsets.clone();
        let last = *offsets.last().unwrap();
        offsets.resize(self.rows + 1, last);
        offsets
    }

    pub fn column_indices(&self) -> &[usize] {
        &self.column_indices
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Cursor over stored elements in row-major, column-ascending order.
    pub fn entries(&self) -> CsrEntries<'_> {
        let mut cursor = CsrEntries {
            matrix: self,
            position: 0,
            row: 0,
        };
        cursor.settle_row();
        cursor
    }

    /// Row-parallel product; behaves exactly like
    /// [`multiply`](SparseMatrix::multiply).
    #[cfg(feature = "parallel")]
    pub fn multiply_parallel(&self, alpha: f64, x: &[f64], beta: f64, y: &mut [f64]) {
        debug_assert_eq!(x.len(), self.columns);
        debug_assert_eq!(y.len(), self.rows);
        kernels::csr_spmv_parallel(
            alpha,
            &self.row_offsets,
            &self.column_indices,
            &self.values,
            x,
            beta,
            y,
        );
    }

    /// Extend `row_offsets` so it covers `row`, adding empty rows as needed.
    fn materialize_row(&mut self, row: usize) {
        let last = *self.row_offsets.last().unwrap();
        while self.row_offsets.len() < row + 2 {
            self.row_offsets.push(last);
        }
    }
}

impl SparseMatrix for CsrMatrix {
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
        if row + 1 >= self.row_offsets.len() {
            return 0.0;
        }
        let start = self.row_offsets[row];
        let end = self.row_offsets[row + 1];
        match self.column_indices[start..end].binary_search(&column) {
            Ok(index) => self.values[start + index],
            Err(_) => 0.0,
        }
    }

    fn insert(&mut self, row: usize, column: usize, value: f64) {
        assert!(row < self.rows && column < self.columns, "position out of range");
        self.materialize_row(row);
        let start = self.row_offsets[row];
        let end = self.row_offsets[row + 1];
        match self.column_indices[start..end].binary_search(&column) {
            Ok(index) => self.values[start + index] = value,
            Err(index) => {
                self.column_indices.insert(start + index, column);
                self.values.insert(start + index, value);
                for offset in &mut self.row_offsets[row + 1..] {
                    *offset += 1;
                }
            }
        }
    }

    fn multiply(&self, alpha: f64, x: &[f64], beta: f64, y: &mut [f64]) {
        debug_assert_eq!(x.len(), self.columns);
        debug_assert_eq!(y.len(), self.rows);
        kernels::csr_spmv(
            alpha,
            &self.row_offsets,
            &self.column_indices,
            &self.values,
            x,
            beta,
            y,
        );
    }
}

/// Bidirectional cursor over a [`CsrMatrix`].
///
/// Crossing a row boundary (including over empty rows) is transparent.
pub struct CsrEntries<'a> {
    matrix: &'a CsrMatrix,
    /// Flat index into the element arrays; `nnz` is the end position.
    position: usize,
    /// Row containing `position`; meaningless at the end position.
    row: usize,
}

impl CsrEntries<'_> {
    /// Move `row` forward until it contains `position`.
    fn settle_row(&mut self) {
        while self.position < self.matrix.values.len()
            && self.matrix.row_offsets[self.row + 1] <= self.position
        {
            self.row += 1;
        }
    }
}

impl EntryCursor for CsrEntries<'_> {
    fn entry(&self) -> Option<Entry> {
        if self.position >= self.matrix.values.len() {
            return None;
        }
        Some(Entry::new(
            self.row,
            self.matrix.column_indices[self.position],
            self.matrix.values[self.position],
        ))
    }

    fn advance(&mut self) -> bool {
        if self.position >= self.matrix.values.len() {
            return false;
        }
        self.position += 1;
        self.settle_row();
        true
    }

    fn retreat(&mut self) -> bool {
        if self.position == 0 {
            return false;
        }
        self.position -= 1;
        while self.matrix.row_offsets[self.row] > self.position {
            self.row -= 1;
        }
        true
    }
}

impl Iterator for CsrEntries<'_> {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        let entry = self.entry();
        if entry.is_some() {
            self.advance();
        }
        entry
    }
}
