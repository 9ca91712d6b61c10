//! Error types for preconditioner construction and application.

use thiserror::Error;

/// Failures detected while factorizing or applying the ILU(0)
/// preconditioner.
///
/// Every case is raised synchronously at the detecting call and nothing is
/// retried internally; the driver owning the solver loop decides what to do.
#[derive(Debug, Error)]
pub enum IluError {
    /// The input matrix has no rows or no stored elements.
    #[error("cannot factorize an empty matrix")]
    EmptyMatrix,

    /// ILU factorization requires a square matrix.
    #[error("matrix is {rows}x{columns}, factorization requires square")]
    NotSquare { rows: usize, columns: usize },

    /// A row's sparsity pattern omits the diagonal entirely.
    #[error("row {row} has no diagonal entry")]
    MissingDiagonal { row: usize },

    /// A pivot came out exactly zero.
    #[error("exact zero pivot at row {row}")]
    ZeroPivot { row: usize },

    /// A pivot's magnitude fell below the stability threshold.
    #[error("pivot {value:e} at row {row} is below the stability threshold")]
    UnstablePivot { row: usize, value: f64 },

    /// Column indices within a row are not strictly ascending.
    #[error("column indices in row {row} are not in ascending order")]
    UnsortedColumns { row: usize },

    /// A device backend call failed while applying the preconditioner.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// A nonzero status from a compute backend, carried verbatim.
///
/// Backend statuses are wrapped, not interpreted: the code and message are
/// whatever the backend reported at the failing call.
#[derive(Debug, Clone, Error)]
#[error("backend call failed with status {code}: {message}")]
pub struct BackendError {
    pub code: i32,
    pub message: String,
}

/// Result type for preconditioner operations.
pub type Result<T> = std::result::Result<T, IluError>;
