//! CUDA backend for Lithos device-resident sparse matrices.
//!
//! Host matrices are assembled in full, uploaded once, and then multiplied
//! (or triangularly solved, for the ILU preconditioner) on the device. The
//! process binds to one device at first use; every copy and launch is
//! synchronous. Built on cudarc with runtime-compiled kernels, so builds
//! need no CUDA toolkit, only a driver at run time.

pub mod array;
pub mod context;
pub mod csr;
pub mod descriptor;
pub mod error;
pub mod hybrid;
pub mod ilu;

pub use array::DeviceArray;
pub use context::GpuContext;
pub use csr::DeviceCsrMatrix;
pub use descriptor::{DiagKind, FillMode, IndexBase, MatrixDescriptor, MatrixKind};
pub use error::{CudaError, Result};
pub use hybrid::{DeviceHybridMatrix, HybridPartition};
pub use ilu::{DeviceIlu0, LevelSchedule};
