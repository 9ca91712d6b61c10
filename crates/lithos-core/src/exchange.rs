//! Binary interchange codec for matrices and vectors.
//!
//! The layout is fixed and bit-exact so files move between machines
//! unchanged: every multi-byte field is big-endian (network order). A matrix
//! stream is
//!
//! ```text
//! magic:u32  rows:u32  columns:u32  nnz:u32
//! per-row nonzero counts  (rows x u32)
//! column indices          (nnz x u32, row-major, ascending within a row)
//! values                  (nnz x f64, IEEE-754)
//! ```
//!
//! and a vector stream is `magic:u32 length:u32` followed by `length` f64
//! values. An `nnz` of `0xFFFF_FFFF` marks the dense layout of the wider
//! toolchain, which this codec rejects rather than misreads.

use std::io::{Read, Write};

use crate::error::{ExchangeError, Result};
use crate::matrix::{CsrMatrix, SparseMatrix};

/// Magic number opening a matrix stream.
pub const MATRIX_MAGIC: u32 = 1_211_216;
/// Magic number opening a vector stream.
pub const VECTOR_MAGIC: u32 = 1_211_214;

/// `nnz` value reserved for the unsupported dense layout.
const DENSE_SENTINEL: u32 = u32::MAX;

/// Write `matrix` to `writer` in the interchange layout.
pub fn save_matrix<W: Write>(writer: &mut W, matrix: &CsrMatrix) -> Result<()> {
    let nnz = matrix.nnz();
    assert!(
        nnz < DENSE_SENTINEL as usize,
        "matrix too large for the interchange header"
    );
    put_u32(writer, MATRIX_MAGIC)?;
    put_u32(writer, matrix.rows() as u32)?;
    put_u32(writer, matrix.columns() as u32)?;
    put_u32(writer, nnz as u32)?;
    for row in 0..matrix.rows() {
        put_u32(writer, matrix.row_nnz(row) as u32)?;
    }
    for &column in matrix.column_indices() {
        put_u32(writer, column as u32)?;
    }
    for &value in matrix.values() {
        writer.write_all(&value.to_be_bytes())?;
    }
    Ok(())
}

/// Read a matrix from `reader`, rebuilding row offsets from the per-row
/// counts.
pub fn load_matrix<R: Read>(reader: &mut R) -> Result<CsrMatrix> {
    let magic = read_u32(reader)?;
    if magic != MATRIX_MAGIC {
        return Err(ExchangeError::BadMagic(magic));
    }
    let header = read_u32_block(reader, 3)?;
    let rows = header[0] as usize;
    let columns = header[1] as usize;
    let nnz = header[2];
    if nnz == DENSE_SENTINEL {
        return Err(ExchangeError::DenseNotSupported);
    }

    let counts = read_u32_block(reader, rows)?;
    let mut row_offsets = Vec::with_capacity(rows + 1);
    row_offsets.push(0usize);
    let mut total = 0u64;
    for &count in &counts {
        total += count as u64;
        row_offsets.push(total as usize);
    }
    if total != nnz as u64 {
        return Err(ExchangeError::CountMismatch {
            declared: nnz,
            computed: total,
        });
    }

    let column_indices: Vec<usize> = read_u32_block(reader, nnz as usize)?
        .into_iter()
        .map(|column| column as usize)
        .collect();
    let values = read_f64_block(reader, nnz as usize)?;

    log::debug!("loaded {rows}x{columns} matrix with {nnz} nonzeros");
    Ok(CsrMatrix::from_parts(
        rows,
        columns,
        row_offsets,
        column_indices,
        values,
    ))
}

/// Write `vector` to `writer` in the interchange layout.
pub fn save_vector<W: Write>(writer: &mut W, vector: &[f64]) -> Result<()> {
    put_u32(writer, VECTOR_MAGIC)?;
    put_u32(writer, vector.len() as u32)?;
    for &value in vector {
        writer.write_all(&value.to_be_bytes())?;
    }
    Ok(())
}

/// Read a vector from `reader`.
pub fn load_vector<R: Read>(reader: &mut R) -> Result<Vec<f64>> {
    let magic = read_u32(reader)?;
    if magic != VECTOR_MAGIC {
        return Err(ExchangeError::BadMagic(magic));
    }
    let length = read_u32(reader)? as usize;
    let values = read_f64_block(reader, length)?;
    log::debug!("loaded vector of length {length}");
    Ok(values)
}

fn put_u32<W: Write>(writer: &mut W, value: u32) -> Result<()> {
    writer.write_all(&value.to_be_bytes())?;
    Ok(())
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    Ok(read_u32_block(reader, 1)?[0])
}

/// Read exactly `count` big-endian u32 values, reporting how many complete
/// elements arrived if the stream runs dry.
fn read_u32_block<R: Read>(reader: &mut R, count: usize) -> Result<Vec<u32>> {
    let bytes = read_element_bytes(reader, count, 4)?;
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Read exactly `count` big-endian f64 values.
fn read_f64_block<R: Read>(reader: &mut R, count: usize) -> Result<Vec<f64>> {
    let bytes = read_element_bytes(reader, count, 8)?;
    Ok(bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            f64::from_be_bytes(raw)
        })
        .collect())
}

fn read_element_bytes<R: Read>(
    reader: &mut R,
    count: usize,
    element_size: usize,
) -> Result<Vec<u8>> {
    let mut buffer = vec![0u8; count * element_size];
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ExchangeError::Io(e)),
        }
    }
    if filled < buffer.len() {
        return Err(ExchangeError::ShortRead {
            expected: count,
            actual: filled / element_size,
        });
    }
    Ok(buffer)
}
