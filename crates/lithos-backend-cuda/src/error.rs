//! Error types for the CUDA backend.

use cudarc::driver::DriverError;
use thiserror::Error;

use lithos_solver::BackendError;

/// Errors raised by device allocation, transfer, compilation, and launch.
///
/// Clonable so the process-wide context can hand the same initialization
/// failure to every caller.
#[derive(Debug, Clone, Error)]
pub enum CudaError {
    /// A CUDA driver call returned a nonzero status.
    #[error("CUDA driver call failed: {0}")]
    Driver(#[from] DriverError),

    /// NVRTC rejected the kernel source.
    #[error("kernel compilation failed: {0}")]
    Compile(String),

    /// No usable CUDA device (driver library missing, no hardware, or
    /// context creation failed).
    #[error("no usable CUDA device: {0}")]
    Unavailable(String),

    /// The compiled module does not export the requested kernel.
    #[error("kernel `{0}` missing from compiled module")]
    MissingKernel(&'static str),

    /// A host index does not fit the device's 32-bit index convention.
    #[error("index {0} exceeds the device 32-bit index range")]
    IndexOverflow(usize),
}

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, CudaError>;

impl From<CudaError> for BackendError {
    fn from(error: CudaError) -> Self {
        let code = match &error {
            CudaError::Driver(driver) => driver.0 as i32,
            _ => -1,
        };
        BackendError {
            code,
            message: error.to_string(),
        }
    }
}

/// Convert a host index to the device convention, failing loudly instead of
/// truncating.
pub(crate) fn device_index(value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| CudaError::IndexOverflow(value))
}
