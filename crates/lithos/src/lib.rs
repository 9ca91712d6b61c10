//! Sparse linear algebra core for basin-scale PDE simulation.
//!
//! This umbrella crate re-exports the pieces an assembly or solver driver
//! needs: the host storage formats and binary exchange codec from
//! `lithos-core`, the operator and preconditioner surface from
//! `lithos-solver`, and (behind the `cuda` feature) the device-resident
//! matrix types from `lithos-backend-cuda`.

pub use lithos_core::{
    exchange, CooMatrix, CsrMatrix, DiaMatrix, Entry, EntryCursor, ExchangeError, HybridConfig,
    HybridMatrix, SparseMatrix,
};
pub use lithos_solver::{BackendError, Ilu0, IluConfig, IluError, Operator, Preconditioner};

#[cfg(feature = "cuda")]
pub use lithos_backend_cuda as cuda;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_build_store_precondition() {
        // assemble, round-trip through the codec, convert, precondition:
        // the full host-side workflow a driver runs
        let entries = vec![
            (0, 0, 4.0),
            (0, 1, -1.0),
            (1, 0, -1.0),
            (1, 1, 4.0),
            (1, 2, -1.0),
            (2, 1, -1.0),
            (2, 2, 4.0),
        ];
        let matrix = CsrMatrix::from_entries(3, 3, entries);

        let mut buffer = Vec::new();
        exchange::save_matrix(&mut buffer, &matrix).unwrap();
        let loaded = exchange::load_matrix(&mut std::io::Cursor::new(buffer)).unwrap();

        let hybrid = HybridMatrix::from_csr(&loaded, &HybridConfig::default());
        let mut product_csr = vec![0.0; 3];
        let mut product_hybrid = vec![0.0; 3];
        loaded.multiply(1.0, &[1.0, 1.0, 1.0], 0.0, &mut product_csr);
        hybrid.multiply(1.0, &[1.0, 1.0, 1.0], 0.0, &mut product_hybrid);
        assert_eq!(product_csr, product_hybrid);

        let mut ilu = Ilu0::new(&loaded).unwrap();
        let mut preconditioned = vec![0.0; 3];
        ilu.apply(&product_csr, &mut preconditioned).unwrap();
        for value in &preconditioned {
            assert!((value - 1.0).abs() < 0.2);
        }
    }
}
