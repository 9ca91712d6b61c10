//! Owned device memory.

use std::sync::Arc;

use cudarc::driver::{CudaSlice, CudaStream, DeviceRepr, ValidAsZeroBits};

use crate::context::GpuContext;
use crate::error::Result;

/// One contiguous device allocation of `T` elements.
///
/// Device arrays are move-only: duplicating device memory is a deliberate,
/// costly act, so it goes through [`try_clone`](DeviceArray::try_clone)
/// rather than an implicit copy. Dropping the array releases the allocation
/// on its stream; release failures are swallowed by the driver layer, never
/// propagated.
pub struct DeviceArray<T> {
    stream: Arc<CudaStream>,
    buffer: CudaSlice<T>,
    /// Logical length. The backing allocation is never empty (the driver
    /// rejects zero-byte allocations), so a zero-length array keeps a
    /// one-element placeholder.
    len: usize,
}

impl<T: DeviceRepr + ValidAsZeroBits> DeviceArray<T> {
    /// A zero-filled array of `len` elements.
    pub fn zeroed(context: &GpuContext, len: usize) -> Result<Self> {
        let stream = context.stream().clone();
        let buffer = stream.alloc_zeros(len.max(1))?;
        Ok(Self { stream, buffer, len })
    }

    /// Allocate and upload `data` in one step.
    pub fn from_host(context: &GpuContext, data: &[T]) -> Result<Self> {
        let mut array = Self::zeroed(context, data.len())?;
        array.copy_from_host(0, data)?;
        Ok(array)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reallocate to `len` elements, zero-filled. Destructive: previous
    /// contents are discarded, callers only ever grow from empty.
    pub fn resize(&mut self, len: usize) -> Result<()> {
        if len == self.len {
            return Ok(());
        }
        self.buffer = self.stream.alloc_zeros(len.max(1))?;
        self.len = len;
        Ok(())
    }

    /// Copy `data` into the array starting at element `offset`.
    pub fn copy_from_host(&mut self, offset: usize, data: &[T]) -> Result<()> {
        assert!(offset + data.len() <= self.len, "device copy out of range");
        if data.is_empty() {
            return Ok(());
        }
        let mut view = self.buffer.slice_mut(offset..offset + data.len());
        self.stream.memcpy_htod(data, &mut view)?;
        self.stream.synchronize()?;
        Ok(())
    }

    /// Copy `out.len()` elements starting at element `offset` back to the
    /// host.
    pub fn copy_to_host(&self, offset: usize, out: &mut [T]) -> Result<()> {
        assert!(offset + out.len() <= self.len, "device copy out of range");
        if out.is_empty() {
            return Ok(());
        }
        let view = self.buffer.slice(offset..offset + out.len());
        self.stream.memcpy_dtoh(&view, out)?;
        self.stream.synchronize()?;
        Ok(())
    }

    /// Explicit deep copy into a fresh allocation.
    pub fn try_clone(&self) -> Result<Self> {
        let mut buffer = self.stream.alloc_zeros(self.buffer.len())?;
        self.stream.memcpy_dtod(&self.buffer, &mut buffer)?;
        self.stream.synchronize()?;
        Ok(Self {
            stream: self.stream.clone(),
            buffer,
            len: self.len,
        })
    }

    /// The underlying device buffer, for kernel arguments.
    pub(crate) fn buffer(&self) -> &CudaSlice<T> {
        &self.buffer
    }

    /// Mutable device buffer, for kernel output arguments.
    pub(crate) fn buffer_mut(&mut self) -> &mut CudaSlice<T> {
        &mut self.buffer
    }
}
