//! Host-side sparse matrix storage for basin-scale PDE discretizations.
//!
//! The matrices assembled from implicit pressure/temperature discretizations
//! are large, very sparse, and strongly banded. This crate provides four
//! interchangeable storage formats for them:
//!
//! - [`CsrMatrix`]: compressed sparse row, the canonical assembly and
//!   interchange format.
//! - [`CooMatrix`]: coordinate triplets in global row-major order, the
//!   general fallback format.
//! - [`DiaMatrix`]: diagonal-offset storage for near-banded matrices.
//! - [`HybridMatrix`]: a DIA block for the dominant diagonals plus a COO
//!   block for the scattered remainder.
//!
//! All formats share the [`SparseMatrix`] operation surface (insertion,
//! element lookup, `y = alpha*A*x + beta*y`) and expose restartable
//! bidirectional [`EntryCursor`]s over their stored elements. The
//! [`exchange`] module reads and writes the fixed big-endian binary
//! interchange layout used to move matrices and vectors between processes.
//!
//! Matrices are built once (by sequential insertion, a bulk element stream,
//! or the codec) and then used read-only; no type in this crate performs
//! internal locking, and a matrix must not be mutated while a cursor borrows
//! it. The borrow checker enforces both.

pub mod error;
pub mod exchange;
pub mod kernels;
pub mod matrix;

pub use error::ExchangeError;
pub use matrix::{
    CooMatrix, CsrMatrix, DiaMatrix, Entry, EntryCursor, HybridConfig, HybridMatrix, SparseMatrix,
};
