//! The matrix-product seam consumed by external iterative solvers.

use lithos_core::SparseMatrix;

/// A linear operator `y = A * x`.
///
/// Iterative solvers and benchmark drivers program against this trait so
/// they stay independent of the storage format behind it.
pub trait Operator {
    fn rows(&self) -> usize;

    fn columns(&self) -> usize;

    /// `y = A * x` with `x.len() == columns()` and `y.len() == rows()`.
    fn apply(&self, x: &[f64], y: &mut [f64]);
}

impl<M: SparseMatrix> Operator for M {
    fn rows(&self) -> usize {
        SparseMatrix::rows(self)
    }

    fn columns(&self) -> usize {
        SparseMatrix::columns(self)
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) {
        self.multiply(1.0, x, 0.0, y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lithos_core::CsrMatrix;

    #[test]
    fn operator_product_matches_multiply() {
        let matrix = CsrMatrix::from_entries(2, 2, vec![(0, 0, 2.0), (1, 0, 1.0), (1, 1, 3.0)]);
        let operator: &dyn Operator = &matrix;
        let mut y = vec![0.0; 2];
        operator.apply(&[1.0, 2.0], &mut y);
        assert_eq!(y, vec![2.0, 7.0]);
    }
}
