//! Scalar CPU kernels for sparse matrix-vector products.
//!
//! The storage formats delegate their `multiply` implementations here. The
//! kernels operate on raw index/value slices so they can be exercised and
//! benchmarked independently of any matrix type. All of them compute
//! `y = alpha * A * x + beta * y`; the beta pass runs first over the whole
//! output so rows with no stored elements are still scaled.

/// `y = beta * y`, treating `beta == 0.0` as a fill (a NaN already in `y`
/// must not survive a zero beta).
pub fn scale(beta: f64, y: &mut [f64]) {
    if beta == 0.0 {
        y.fill(0.0);
    } else if beta != 1.0 {
        for value in y.iter_mut() {
            *value *= beta;
        }
    }
}

/// CSR product. `row_offsets` may describe fewer rows than `y` covers;
/// trailing rows hold no elements and receive only the beta scaling.
pub fn csr_spmv(
    alpha: f64,
    row_offsets: &[usize],
    column_indices: &[usize],
    values: &[f64],
    x: &[f64],
    beta: f64,
    y: &mut [f64],
) {
    debug_assert!(!row_offsets.is_empty());
    debug_assert!(row_offsets.len() <= y.len() + 1);
    scale(beta, y);
    for row in 0..row_offsets.len() - 1 {
        let mut sum = 0.0;
        for index in row_offsets[row]..row_offsets[row + 1] {
            sum += values[index] * x[column_indices[index]];
        }
        y[row] += alpha * sum;
    }
}

/// Coordinate-format product over parallel triplet slices.
pub fn coo_spmv(
    alpha: f64,
    row_indices: &[usize],
    column_indices: &[usize],
    values: &[f64],
    x: &[f64],
    beta: f64,
    y: &mut [f64],
) {
    debug_assert_eq!(row_indices.len(), values.len());
    debug_assert_eq!(column_indices.len(), values.len());
    scale(beta, y);
    for ((&row, &column), &value) in row_indices.iter().zip(column_indices).zip(values) {
        y[row] += alpha * value * x[column];
    }
}

/// Diagonal-format product. `values` holds one contiguous length-`rows`
/// block per entry of `distances`; slots outside a diagonal's valid row
/// range are padding and are never read.
pub fn dia_spmv(
    alpha: f64,
    rows: usize,
    columns: usize,
    distances: &[isize],
    values: &[f64],
    x: &[f64],
    beta: f64,
    y: &mut [f64],
) {
    debug_assert_eq!(values.len(), distances.len() * rows);
    scale(beta, y);
    for (slot, &distance) in distances.iter().enumerate() {
        let block = &values[slot * rows..(slot + 1) * rows];
        let lo = (-distance).max(0) as usize;
        let hi = (columns as isize - distance).min(rows as isize).max(0) as usize;
        for row in lo..hi {
            let column = (row as isize + distance) as usize;
            y[row] += alpha * block[row] * x[column];
        }
    }
}

/// Row-parallel CSR product. Output rows are disjoint, so no synchronization
/// is needed beyond the rayon join.
#[cfg(feature = "parallel")]
pub fn csr_spmv_parallel(
    alpha: f64,
    row_offsets: &[usize],
    column_indices: &[usize],
    values: &[f64],
    x: &[f64],
    beta: f64,
    y: &mut [f64],
) {
    use rayon::prelude::*;

    debug_assert!(!row_offsets.is_empty());
    debug_assert!(row_offsets.len() <= y.len() + 1);
    let materialized = row_offsets.len() - 1;
    scale(beta, &mut y[materialized..]);
    y[..materialized]
        .par_iter_mut()
        .enumerate()
        .for_each(|(row, out)| {
            let mut sum = 0.0;
            for index in row_offsets[row]..row_offsets[row + 1] {
                sum += values[index] * x[column_indices[index]];
            }
            let scaled = if beta == 0.0 { 0.0 } else { beta * *out };
            *out = alpha * sum + scaled;
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_clears_nan_on_zero_beta() {
        let mut y = vec![f64::NAN, 2.0];
        scale(0.0, &mut y);
        assert_eq!(y, vec![0.0, 0.0]);
    }

    #[test]
    fn csr_kernel_accumulates_with_beta() {
        // [[2, 0], [1, 3]] * [1, 1] = [2, 4]; with beta=0.5 on y=[2, 2]:
        // y = 1*[2, 4] + 0.5*[2, 2] = [3, 5]
        let mut y = vec![2.0, 2.0];
        csr_spmv(
            1.0,
            &[0, 1, 3],
            &[0, 0, 1],
            &[2.0, 1.0, 3.0],
            &[1.0, 1.0],
            0.5,
            &mut y,
        );
        assert_eq!(y, vec![3.0, 5.0]);
    }

    #[test]
    fn dia_kernel_skips_padding() {
        // 3x3 with diagonals -1 and 0; the -1 block's row 0 slot is padding
        // and deliberately poisoned.
        let distances = vec![-1isize, 0];
        let values = vec![
            f64::NAN, 4.0, 5.0, // distance -1, rows 1..3
            1.0, 2.0, 3.0, // distance 0, rows 0..3
        ];
        let mut y = vec![0.0; 3];
        dia_spmv(
            1.0,
            3,
            3,
            &distances,
            &values,
            &[1.0, 1.0, 1.0],
            0.0,
            &mut y,
        );
        assert_eq!(y, vec![1.0, 6.0, 8.0]);
    }
}
