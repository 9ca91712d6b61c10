//! Device-resident CSR matrix.

use cudarc::driver::{CudaFunction, LaunchConfig, PushKernelArg};

use lithos_core::{CsrMatrix, SparseMatrix};

use crate::array::DeviceArray;
use crate::context::GpuContext;
use crate::descriptor::MatrixDescriptor;
use crate::error::{device_index, Result};

/// A host CSR matrix copied once into device memory.
///
/// The three arrays are uploaded whole at construction and never mutated;
/// device matrices are products of a finished host assembly, not incremental
/// builders. The attached [`MatrixDescriptor`] starts as general/zero-based
/// and can be reconfigured without touching the arrays.
pub struct DeviceCsrMatrix {
    context: &'static GpuContext,
    rows: usize,
    columns: usize,
    nnz: usize,
    row_offsets: DeviceArray<i32>,
    column_indices: DeviceArray<i32>,
    values: DeviceArray<f64>,
    descriptor: MatrixDescriptor,
    spmv: CudaFunction,
}

impl DeviceCsrMatrix {
    /// Upload `matrix` to the process device.
    pub fn from_host(matrix: &CsrMatrix) -> Result<Self> {
        let context = GpuContext::global()?;

        let offsets: Vec<i32> = matrix
            .full_row_offsets()
            .into_iter()
            .map(device_index)
            .collect::<Result<_>>()?;
        let columns: Vec<i32> = matrix
            .column_indices()
            .iter()
            .map(|&column| device_index(column))
            .collect::<Result<_>>()?;

        Ok(Self {
            context,
            rows: matrix.rows(),
            columns: matrix.columns(),
            nnz: matrix.nnz(),
            row_offsets: DeviceArray::from_host(context, &offsets)?,
            column_indices: DeviceArray::from_host(context, &columns)?,
            values: DeviceArray::from_host(context, matrix.values())?,
            descriptor: MatrixDescriptor::default(),
            spmv: context.function("csr_spmv")?,
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

    pub fn descriptor(&self) -> &MatrixDescriptor {
        &self.descriptor
    }

    pub fn descriptor_mut(&mut self) -> &mut MatrixDescriptor {
        &mut self.descriptor
    }

    /// `y = alpha * A * x + beta * y` entirely on device.
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
        let rows = device_index(self.rows)?;
        let stream = self.context.stream();
        let mut launch = stream.launch_builder(&self.spmv);
        launch
            .arg(&rows)
            .arg(&alpha)
            .arg(&beta)
            .arg(self.row_offsets.buffer())
            .arg(self.column_indices.buffer())
            .arg(self.values.buffer())
            .arg(x.buffer())
            .arg(y.buffer_mut());
        unsafe {
            launch.launch(LaunchConfig::for_num_elems(self.rows as u32))?;
        }
        stream.synchronize()?;
        Ok(())
    }

    /// Staging convenience: upload `x` and `y`, multiply, download `y`.
    /// Synchronous like everything else in the backend.
    pub fn multiply(&self, alpha: f64, x: &[f64], beta: f64, y: &mut [f64]) -> Result<()> {
        debug_assert_eq!(x.len(), self.columns);
        debug_assert_eq!(y.len(), self.rows);
        let x_device = DeviceArray::from_host(self.context, x)?;
        let mut y_device = DeviceArray::from_host(self.context, y)?;
        self.multiply_device(alpha, &x_device, beta, &mut y_device)?;
        y_device.copy_to_host(0, y)?;
        Ok(())
    }

    /// Explicit deep copy: duplicates all three device arrays.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            context: self.context,
            rows: self.rows,
            columns: self.columns,
            nnz: self.nnz,
            row_offsets: self.row_offsets.try_clone()?,
            column_indices: self.column_indices.try_clone()?,
            values: self.values.try_clone()?,
            descriptor: self.descriptor.clone(),
            spmv: self.spmv.clone(),
        })
    }
}
