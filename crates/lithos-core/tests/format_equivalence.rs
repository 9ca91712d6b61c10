//! Cross-format agreement checks: every storage format must answer element
//! queries and products identically for the same element set.

use lithos_core::{
    CooMatrix, CsrMatrix, DiaMatrix, EntryCursor, HybridConfig, HybridMatrix, SparseMatrix,
};

/// A 6x6 convection-ish stencil: three bands plus a few scattered couplings.
fn element_set() -> Vec<(usize, usize, f64)> {
    let mut entries = Vec::new();
    for i in 0..6 {
        entries.push((i, i, 4.0 + i as f64));
        if i + 1 < 6 {
            entries.push((i, i + 1, -1.0 - 0.1 * i as f64));
            entries.push((i + 1, i, -0.5));
        }
    }
    entries.push((0, 5, 0.125));
    entries.push((5, 0, 0.25));
    entries.push((2, 5, -0.75));
    entries
}

fn formats() -> Vec<(&'static str, Box<dyn SparseMatrix>)> {
    let entries = element_set();
    vec![
        (
            "csr",
            Box::new(CsrMatrix::from_entries(6, 6, entries.clone())) as Box<dyn SparseMatrix>,
        ),
        ("coo", Box::new(CooMatrix::from_entries(6, 6, entries.clone()))),
        ("dia", Box::new(DiaMatrix::from_entries(6, 6, entries.clone()))),
        (
            "hybrid",
            Box::new(HybridMatrix::from_entries(
                6,
                6,
                entries,
                &HybridConfig::default(),
            )),
        ),
    ]
}

#[test]
fn all_formats_agree_on_element_lookup() {
    let reference = CsrMatrix::from_entries(6, 6, element_set());
    for (name, matrix) in formats() {
        for row in 0..6 {
            for column in 0..6 {
                assert_eq!(
                    matrix.value(row, column),
                    reference.value(row, column),
                    "{name} disagrees at ({row}, {column})"
                );
            }
        }
    }
}

#[test]
fn all_formats_agree_on_multiply() {
    let x: Vec<f64> = (0..6).map(|i| 1.0 + 0.5 * i as f64).collect();
    let y0: Vec<f64> = (0..6).map(|i| 10.0 - i as f64).collect();
    let (alpha, beta) = (1.5, -0.5);

    // dense reference via faer
    let dense = faer::Mat::from_fn(6, 6, |i, j| {
        element_set()
            .iter()
            .find(|&&(r, c, _)| r == i && c == j)
            .map(|&(_, _, v)| v)
            .unwrap_or(0.0)
    });
    let x_mat = faer::Mat::from_fn(6, 1, |i, _| x[i]);
    let product = &dense * &x_mat;
    let expected: Vec<f64> = (0..6)
        .map(|i| alpha * product[(i, 0)] + beta * y0[i])
        .collect();

    for (name, matrix) in formats() {
        let mut y = y0.clone();
        matrix.multiply(alpha, &x, beta, &mut y);
        for (i, (got, want)) in y.iter().zip(&expected).enumerate() {
            assert!(
                (got - want).abs() < 1e-12,
                "{name} row {i}: got {got}, want {want}"
            );
        }
    }
}

#[test]
fn codec_round_trip_preserves_cross_format_agreement() {
    let original = CsrMatrix::from_entries(6, 6, element_set());
    let mut buffer = Vec::new();
    lithos_core::exchange::save_matrix(&mut buffer, &original).unwrap();
    let loaded = lithos_core::exchange::load_matrix(&mut std::io::Cursor::new(buffer)).unwrap();

    let rebuilt = HybridMatrix::from_csr(&loaded, &HybridConfig::default());
    for row in 0..6 {
        for column in 0..6 {
            assert_eq!(rebuilt.value(row, column), original.value(row, column));
        }
    }
}

#[test]
fn hybrid_partition_is_disjoint_and_exhaustive() {
    let entries = element_set();
    let hybrid = HybridMatrix::from_entries(6, 6, entries.clone(), &HybridConfig::default());

    let mut dia_positions = std::collections::HashSet::new();
    let mut cursor = hybrid.dia().entries();
    while let Some(entry) = cursor.entry() {
        if entry.value != 0.0 {
            dia_positions.insert((entry.row, entry.column));
        }
        cursor.advance();
    }
    let coo_positions: std::collections::HashSet<_> =
        hybrid.coo().entries().map(|e| (e.row, e.column)).collect();

    assert!(dia_positions.is_disjoint(&coo_positions));
    let union: std::collections::HashSet<_> =
        dia_positions.union(&coo_positions).copied().collect();
    let expected: std::collections::HashSet<_> =
        entries.iter().map(|&(r, c, _)| (r, c)).collect();
    assert_eq!(union, expected);
}

#[test]
fn cursor_inverse_law_holds_for_every_format() {
    let entries = element_set();

    fn check<C: EntryCursor>(mut cursor: C, name: &str) {
        let first = cursor.entry();
        let mut steps = 0;
        while cursor.advance() {
            steps += 1;
        }
        for _ in 0..steps {
            assert!(cursor.retreat(), "{name} retreat failed mid-walk");
        }
        assert_eq!(cursor.entry(), first, "{name} did not return to start");
    }

    let csr = CsrMatrix::from_entries(6, 6, entries.clone());
    check(csr.entries(), "csr");
    let coo = CooMatrix::from_entries(6, 6, entries.clone());
    check(coo.entries(), "coo");
    let dia = DiaMatrix::from_entries(6, 6, entries);
    check(dia.entries(), "dia");
}
