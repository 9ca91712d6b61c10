//! Device-resident hybrid (ELL + COO) matrix.
//!
//! The device analogue of the host DIA+COO hybrid: rows contribute their
//! first `width` elements to a padded, column-major ELL block whose regular
//! layout keeps device loads coalesced, and any overflow past the width goes
//! to a COO remainder applied with atomic accumulation. The split is fixed
//! at construction from a finished host CSR; there is no device-side
//! mutation afterward.

use cudarc::driver::{CudaFunction, LaunchConfig, PushKernelArg};

use lithos_core::{CsrMatrix, SparseMatrix};

use crate::array::DeviceArray;
use crate::context::GpuContext;
use crate::error::{device_index, Result};

/// How to choose the ELL width.
#[derive(Clone, Copy, Debug)]
pub enum HybridPartition {
    /// Mean nonzeros per row, the balance point between padding waste in the
    /// ELL block and traffic through the atomic COO path.
    Automatic,
    /// Explicit ELL width.
    EllWidth(usize),
}

pub struct DeviceHybridMatrix {
    context: &'static GpuContext,
    rows: usize,
    columns: usize,
    nnz: usize,
    ell_width: usize,
    /// Column-major `rows * ell_width`; -1 marks padding.
    ell_column_indices: DeviceArray<i32>,
    ell_values: DeviceArray<f64>,
    coo_row_indices: DeviceArray<i32>,
    coo_column_indices: DeviceArray<i32>,
    coo_values: DeviceArray<f64>,
    coo_nnz: usize,
    ell_kernel: CudaFunction,
    coo_kernel: CudaFunction,
}

impl DeviceHybridMatrix {
    /// Partition `matrix` and upload both blocks in one shot.
    pub fn from_host(matrix: &CsrMatrix, partition: HybridPartition) -> Result<Self> {
        let context = GpuContext::global()?;
        let rows = matrix.rows();
        let width = match partition {
            HybridPartition::EllWidth(width) => width,
            HybridPartition::Automatic => {
                if rows == 0 {
                    0
                } else {
                    matrix.nnz().div_ceil(rows)
                }
            }
        };

        let mut ell_columns = vec![-1i32; rows * width];
        let mut ell_values = vec![0.0f64; rows * width];
        let mut coo_rows = Vec::new();
        let mut coo_columns = Vec::new();
        let mut coo_values = Vec::new();

        let offsets = matrix.full_row_offsets();
        let columns = matrix.column_indices();
        let values = matrix.values();
        for row in 0..rows {
            for (slot, position) in (offsets[row]..offsets[row + 1]).enumerate() {
                if slot < width {
                    ell_columns[slot * rows + row] = device_index(columns[position])?;
                    ell_values[slot * rows + row] = values[position];
                } else {
                    coo_rows.push(device_index(row)?);
                    coo_columns.push(device_index(columns[position])?);
                    coo_values.push(values[position]);
                }
            }
        }

        log::debug!(
            "hybrid partition: width {width}, {} ELL slots, {} COO entries",
            rows * width,
            coo_values.len()
        );
        Ok(Self {
            context,
            rows,
            columns: matrix.columns(),
            nnz: matrix.nnz(),
            ell_width: width,
            ell_column_indices: DeviceArray::from_host(context, &ell_columns)?,
            ell_values: DeviceArray::from_host(context, &ell_values)?,
            coo_row_indices: DeviceArray::from_host(context, &coo_rows)?,
            coo_column_indices: DeviceArray::from_host(context, &coo_columns)?,
            coo_nnz: coo_values.len(),
            coo_values: DeviceArray::from_host(context, &coo_values)?,
            ell_kernel: context.function("ell_spmv")?,
            coo_kernel: context.function("coo_spmv_accumulate")?,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn nnz(&self) -> usize {
        self.nnz
    }

    pub fn ell_width(&self) -> usize {
        self.ell_width
    }

    /// Entries routed through the COO remainder.
    pub fn coo_nnz(&self) -> usize {
        self.coo_nnz
    }

    /// `y = alpha * A * x + beta * y` on device: the ELL pass applies alpha
    /// and beta, then the COO pass accumulates the remainder on top.
    pub fn multiply_device(
        &self,
        alpha: f64,
        x: &DeviceArray<f64>,
        beta: f64,
        y: &mut DeviceArray<f64>,
    ) -> Result<()> {
        debug_assert_eq!(x.len(), self.columns);
        debug_assert_eq!(y.len(), self.rows);
        if self.rows == 0 {
            return Ok(());
        }
        let stream = self.context.stream();

        let rows = device_index(self.rows)?;
        let width = device_index(self.ell_width)?;
        let mut ell = stream.launch_builder(&self.ell_kernel);
        ell.arg(&rows)
            .arg(&width)
            .arg(&alpha)
            .arg(&beta)
            .arg(self.ell_column_indices.buffer())
            .arg(self.ell_values.buffer())
            .arg(x.buffer())
            .arg(y.buffer_mut());
        unsafe {
            ell.launch(LaunchConfig::for_num_elems(self.rows as u32))?;
        }

        if self.coo_nnz > 0 {
            let nnz = device_index(self.coo_nnz)?;
            let mut coo = stream.launch_builder(&self.coo_kernel);
            coo.arg(&nnz)
                .arg(&alpha)
                .arg(self.coo_row_indices.buffer())
                .arg(self.coo_column_indices.buffer())
                .arg(self.coo_values.buffer())
                .arg(x.buffer())
                .arg(y.buffer_mut());
            unsafe {
                coo.launch(LaunchConfig::for_num_elems(self.coo_nnz as u32))?;
            }
        }
        stream.synchronize()?;
        Ok(())
    }

    /// Staging convenience over [`multiply_device`](Self::multiply_device).
    pub fn multiply(&self, alpha: f64, x: &[f64], beta: f64, y: &mut [f64]) -> Result<()> {
        debug_assert_eq!(x.len(), self.columns);
        debug_assert_eq!(y.len(), self.rows);
        let x_device = DeviceArray::from_host(self.context, x)?;
        let mut y_device = DeviceArray::from_host(self.context, y)?;
        self.multiply_device(alpha, &x_device, beta, &mut y_device)?;
        y_device.copy_to_host(0, y)?;
        Ok(())
    }
}
