//! Process-wide CUDA context.
//!
//! The context is created lazily on first use and lives for the rest of the
//! process: device selection, the driver context with its default stream,
//! and the kernel module compiled once from [`KERNEL_SOURCE`]. Independent
//! matrix objects share it freely; every launch and copy issued through it
//! is synchronous, so callers never observe in-flight work.

use std::sync::{Arc, OnceLock};

use cudarc::driver::{CudaContext, CudaFunction, CudaModule, CudaStream};
use cudarc::nvrtc::{compile_ptx_with_opts, CompileOptions};

use crate::error::{CudaError, Result};

/// Device kernel source, compiled at context initialization.
const KERNEL_SOURCE: &str = include_str!("kernels.cu");

/// Local-rank environment variables consulted for rank-to-device binding
/// when several ranks share a node.
const LOCAL_RANK_VARS: &[&str] = &[
    "OMPI_COMM_WORLD_LOCAL_RANK",
    "MV2_COMM_WORLD_LOCAL_RANK",
    "SLURM_LOCALID",
];

static GLOBAL: OnceLock<std::result::Result<GpuContext, CudaError>> = OnceLock::new();

/// Shared handle to the device: driver context, default stream, compiled
/// kernels.
pub struct GpuContext {
    context: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    module: Arc<CudaModule>,
    ordinal: usize,
}

impl GpuContext {
    /// The process-wide context, initialized on first call.
    ///
    /// Initialization failures are cached: every subsequent caller receives
    /// the same error instead of re-probing the driver.
    pub fn global() -> Result<&'static GpuContext> {
        match GLOBAL.get_or_init(Self::initialize) {
            Ok(context) => Ok(context),
            Err(error) => Err(error.clone()),
        }
    }

    fn initialize() -> std::result::Result<GpuContext, CudaError> {
        let ordinal = select_device_ordinal();
        // The driver library may be absent entirely, which surfaces as a
        // panic out of the dynamic loader rather than an error status.
        let context = match std::panic::catch_unwind(|| CudaContext::new(ordinal)) {
            Ok(Ok(context)) => context,
            Ok(Err(error)) => {
                return Err(CudaError::Unavailable(format!(
                    "context creation failed on device {ordinal}: {error}"
                )));
            }
            Err(_) => {
                return Err(CudaError::Unavailable(
                    "CUDA driver library not found".to_string(),
                ));
            }
        };

        let options = CompileOptions {
            // atomicAdd on f64 needs compute capability 6.0+
            arch: Some("compute_70"),
            ..Default::default()
        };
        let ptx = compile_ptx_with_opts(KERNEL_SOURCE, options)
            .map_err(|error| CudaError::Compile(error.to_string()))?;
        let module = context.load_module(ptx)?;
        let stream = context.default_stream();

        log::info!("initialized CUDA backend on device {ordinal}");
        Ok(GpuContext {
            context,
            stream,
            module,
            ordinal,
        })
    }

    /// The stream all backend work is issued on.
    pub fn stream(&self) -> &Arc<CudaStream> {
        &self.stream
    }

    /// The underlying driver context, for interop with other cudarc users.
    pub fn device(&self) -> &Arc<CudaContext> {
        &self.context
    }

    /// Device ordinal this process is bound to.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub(crate) fn function(&self, name: &'static str) -> Result<CudaFunction> {
        self.module
            .load_function(name)
            .map_err(|_| CudaError::MissingKernel(name))
    }
}

/// Pick the device ordinal: explicit override, then local MPI rank modulo
/// the device count, then device 0.
fn select_device_ordinal() -> usize {
    if let Some(ordinal) = std::env::var("LITHOS_GPU_DEVICE")
        .ok()
        .and_then(|value| value.parse().ok())
    {
        return ordinal;
    }
    let local_rank = LOCAL_RANK_VARS
        .iter()
        .find_map(|name| std::env::var(name).ok()?.parse::<usize>().ok());
    match local_rank {
        Some(rank) => {
            let devices = CudaContext::device_count().unwrap_or(1).max(1) as usize;
            rank % devices
        }
        None => 0,
    }
}
