//! Hybrid DIA + COO storage.
//!
//! Basin pressure matrices are near-banded: a few dominant diagonals carry
//! almost every nonzero, with scattered long-range couplings (faults, wells)
//! elsewhere. The hybrid format routes the dominant diagonals into a
//! [`DiaMatrix`] (dense blocks, cache-friendly SpMV) and everything else
//! into a [`CooMatrix`]. The two partitions are disjoint and together hold
//! exactly the input's nonzeros.

use indexmap::IndexMap;
use std::collections::HashSet;

use crate::matrix::{CooMatrix, CsrMatrix, DiaMatrix, SparseMatrix};

/// Controls which diagonals the builder treats as dominant.
#[derive(Clone, Debug)]
pub struct HybridConfig {
    /// Keep at most this many diagonals; `None` selects automatically by
    /// fill ratio.
    pub max_diagonals: Option<usize>,
    /// Automatic selection keeps a diagonal when its nonzero count reaches
    /// this fraction of its full length.
    pub min_fill: f64,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            max_diagonals: None,
            min_fill: 0.5,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HybridMatrix {
    dia: DiaMatrix,
    coo: CooMatrix,
}

impl HybridMatrix {
    /// Build from a stream of (row, column, value) triples.
    ///
    /// One pass tallies nonzero counts per diagonal, the selection ranks
    /// them, and a second pass routes each element to its partition.
    /// Equal-count diagonals rank deterministically: smaller `|distance|`
    /// first, then the negative distance before the positive one.
    pub fn from_entries<I>(
        rows: usize,
        columns: usize,
        entries: I,
        config: &HybridConfig,
    ) -> Self
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let collected: Vec<_> = entries.into_iter().collect();

        let mut tally: IndexMap<isize, usize> = IndexMap::new();
        for &(row, column, _) in &collected {
            *tally.entry(column as isize - row as isize).or_insert(0) += 1;
        }
        let mut ranked: Vec<(isize, usize)> = tally.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then(a.0.abs().cmp(&b.0.abs()))
                .then(a.0.cmp(&b.0))
        });

        let selected: HashSet<isize> = match config.max_diagonals {
            Some(budget) => ranked.iter().take(budget).map(|&(d, _)| d).collect(),
            None => ranked
                .iter()
                .filter(|&&(distance, count)| {
                    let span = diagonal_len(rows, columns, distance);
                    span > 0 && count as f64 >= config.min_fill * span as f64
                })
                .map(|&(d, _)| d)
                .collect(),
        };

        let mut dia = DiaMatrix::new(rows, columns);
        let mut coo = CooMatrix::new(rows, columns);
        for (row, column, value) in collected {
            if selected.contains(&(column as isize - row as isize)) {
                dia.insert(row, column, value);
            } else {
                coo.insert(row, column, value);
            }
        }
        Self { dia, coo }
    }

    /// Partition an existing CSR matrix.
    pub fn from_csr(matrix: &CsrMatrix, config: &HybridConfig) -> Self {
        Self::from_entries(
            matrix.rows(),
            matrix.columns(),
            matrix.entries().map(|e| (e.row, e.column, e.value)),
            config,
        )
    }

    /// The dominant-diagonal partition.
    pub fn dia(&self) -> &DiaMatrix {
        &self.dia
    }

    /// The remainder partition.
    pub fn coo(&self) -> &CooMatrix {
        &self.coo
    }
}

impl SparseMatrix for HybridMatrix {
    fn rows(&self) -> usize {
        self.dia.rows()
    }

    fn columns(&self) -> usize {
        self.dia.columns()
    }

    fn nnz(&self) -> usize {
        self.dia.nnz() + self.coo.nnz()
    }

    /// The partitions are disjoint, so at most one term is nonzero.
    fn value(&self, row: usize, column: usize) -> f64 {
        self.dia.value(row, column) + self.coo.value(row, column)
    }

    /// Routes to the DIA partition when the element's diagonal is already
    /// allocated there, preserving disjointness.
    fn insert(&mut self, row: usize, column: usize, value: f64) {
        assert!(
            row < self.rows() && column < self.columns(),
            "position out of range"
        );
        if self.dia.has_diagonal(column as isize - row as isize) {
            self.dia.insert(row, column, value);
        } else {
            self.coo.insert(row, column, value);
        }
    }

    /// DIA product first, then the COO product accumulated on top with
    /// beta = 1; the remainder must add to the diagonal block's result,
    /// not overwrite it.
    fn multiply(&self, alpha: f64, x: &[f64], beta: f64, y: &mut [f64]) {
        self.dia.multiply(alpha, x, beta, y);
        self.coo.multiply(alpha, x, 1.0, y);
    }
}

fn diagonal_len(rows: usize, columns: usize, distance: isize) -> usize {
    let lo = (-distance).max(0);
    let hi = (columns as isize - distance).min(rows as isize);
    (hi - lo).max(0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn near_banded() -> Vec<(usize, usize, f64)> {
        // 4x4 tridiagonal-ish with two scattered couplings
        vec![
            (0, 0, 4.0),
            (1, 1, 4.0),
            (2, 2, 4.0),
            (3, 3, 4.0),
            (0, 1, -1.0),
            (1, 2, -1.0),
            (2, 3, -1.0),
            (0, 3, 0.5),
            (3, 0, 0.25),
        ]
    }

    #[test]
    fn automatic_selection_keeps_dense_diagonals() {
        let m = HybridMatrix::from_entries(4, 4, near_banded(), &HybridConfig::default());
        // main (4/4) and superdiagonal (3/3) are full; the corners are 1/1
        // diagonals and also pass the fill test at length 1
        assert!(m.dia().has_diagonal(0));
        assert!(m.dia().has_diagonal(1));
        assert_eq!(m.coo().nnz(), 0);
    }

    #[test]
    fn budgeted_selection_routes_remainder_to_coo() {
        let config = HybridConfig {
            max_diagonals: Some(2),
            ..HybridConfig::default()
        };
        let m = HybridMatrix::from_entries(4, 4, near_banded(), &config);
        assert_eq!(m.dia().distances(), &[0, 1]);
        assert_eq!(m.coo().nnz(), 2);
        assert_eq!(m.value(0, 3), 0.5);
        assert_eq!(m.value(3, 0), 0.25);
    }

    #[test]
    fn tie_break_prefers_small_distance_then_negative() {
        // distances 1 and -1 both have two nonzeros; only one slot in the
        // budget, and -1 must win the tie against 1
        let entries = vec![
            (1, 0, 1.0),
            (2, 1, 1.0),
            (0, 1, 2.0),
            (1, 2, 2.0),
        ];
        let config = HybridConfig {
            max_diagonals: Some(1),
            ..HybridConfig::default()
        };
        let m = HybridMatrix::from_entries(3, 3, entries, &config);
        assert_eq!(m.dia().distances(), &[-1]);
        assert_eq!(m.coo().nnz(), 2);
    }

    #[test]
    fn partitions_are_disjoint_and_exhaustive() {
        let input = near_banded();
        let config = HybridConfig {
            max_diagonals: Some(2),
            ..HybridConfig::default()
        };
        let m = HybridMatrix::from_entries(4, 4, input.clone(), &config);

        let dia_set: std::collections::HashSet<_> = m
            .dia()
            .entries()
            .filter(|e| e.value != 0.0)
            .map(|e| (e.row, e.column))
            .collect();
        let coo_set: std::collections::HashSet<_> = m
            .coo()
            .entries()
            .map(|e| (e.row, e.column))
            .collect();
        assert!(dia_set.is_disjoint(&coo_set));

        let union: std::collections::HashSet<_> =
            dia_set.union(&coo_set).copied().collect();
        let expected: std::collections::HashSet<_> =
            input.iter().map(|&(r, c, _)| (r, c)).collect();
        assert_eq!(union, expected);
    }

    #[test]
    fn multiply_accumulates_coo_onto_dia() {
        let config = HybridConfig {
            max_diagonals: Some(2),
            ..HybridConfig::default()
        };
        let m = HybridMatrix::from_entries(4, 4, near_banded(), &config);
        let x = vec![1.0, 2.0, 3.0, 4.0];
        let mut y = vec![1.0; 4];
        m.multiply(2.0, &x, 3.0, &mut y);

        // dense reference: y = 2*A*x + 3*y
        let mut expected = vec![3.0; 4];
        for &(r, c, v) in &near_banded() {
            expected[r] += 2.0 * v * x[c];
        }
        for (got, want) in y.iter().zip(&expected) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn insert_routes_by_allocated_diagonal() {
        let config = HybridConfig {
            max_diagonals: Some(1),
            ..HybridConfig::default()
        };
        let mut m = HybridMatrix::from_entries(
            3,
            3,
            vec![(0, 0, 1.0), (1, 1, 1.0), (2, 2, 1.0)],
            &config,
        );
        m.insert(1, 1, 9.0); // main diagonal lives in DIA
        m.insert(0, 2, 5.0); // unallocated diagonal goes to COO
        assert_eq!(m.dia().value(1, 1), 9.0);
        assert_eq!(m.coo().value(0, 2), 5.0);
    }
}
