//! End-to-end preconditioner sanity on the kind of matrix the solver stack
//! actually sees: diagonally dominant, banded, with some fill beyond the
//! first off-diagonals.

use lithos_core::{CsrMatrix, SparseMatrix};
use lithos_solver::{Ilu0, Preconditioner};

/// Pentadiagonal diagonally dominant operator. ILU(0) is inexact here
/// (elimination wants fill at distance 1 from the outer band), which is the
/// case the preconditioner exists for.
fn pentadiagonal(n: usize) -> CsrMatrix {
    let mut entries = Vec::new();
    for i in 0..n {
        entries.push((i, i, 6.0));
        if i + 1 < n {
            entries.push((i, i + 1, -1.0));
            entries.push((i + 1, i, -1.0));
        }
        if i + 3 < n {
            entries.push((i, i + 3, -1.0));
            entries.push((i + 3, i, -1.0));
        }
    }
    CsrMatrix::from_entries(n, n, entries)
}

#[test]
fn diagonally_dominant_construction_succeeds() {
    assert!(Ilu0::new(&pentadiagonal(50)).is_ok());
}

#[test]
fn apply_approximately_inverts_the_operator() {
    let n = 50;
    let a = pentadiagonal(n);
    let mut ilu = Ilu0::new(&a).unwrap();

    let ones = vec![1.0; n];
    let mut rhs = vec![0.0; n];
    a.multiply(1.0, &ones, 0.0, &mut rhs);

    let mut preconditioned = vec![0.0; n];
    ilu.apply(&rhs, &mut preconditioned).unwrap();

    // M⁻¹(A·1) should land near 1; loose tolerance since ILU(0) is approximate
    for (i, value) in preconditioned.iter().enumerate() {
        assert!(
            (value - 1.0).abs() < 0.5,
            "component {i} strayed: {value}"
        );
    }
}

#[test]
fn repeated_apply_is_stable() {
    // the same instance serves many iterations of an external solver loop
    let n = 20;
    let a = pentadiagonal(n);
    let mut ilu = Ilu0::new(&a).unwrap();

    let x = vec![1.0; n];
    let mut first = vec![0.0; n];
    ilu.apply(&x, &mut first).unwrap();
    for _ in 0..10 {
        let mut again = vec![0.0; n];
        ilu.apply(&x, &mut again).unwrap();
        assert_eq!(again, first);
    }
}

#[test]
fn preconditioner_reports_dimension() {
    let ilu = Ilu0::new(&pentadiagonal(12)).unwrap();
    assert_eq!(Preconditioner::dim(&ilu), 12);
}
