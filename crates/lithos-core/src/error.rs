//! Error types for the binary exchange codec.

use thiserror::Error;

/// Errors raised while reading or writing the binary interchange format.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The stream ended before the declared payload was complete.
    #[error("short read: expected {expected} elements, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// The stream does not start with the expected magic number.
    #[error("unrecognized magic number {0:#010x}")]
    BadMagic(u32),

    /// The header declares the dense layout, which this codec does not carry.
    #[error("dense matrix layout is not supported")]
    DenseNotSupported,

    /// The per-row counts disagree with the declared number of nonzeros.
    #[error("row counts sum to {computed} entries but header declares {declared}")]
    CountMismatch { declared: u32, computed: u64 },

    /// Underlying I/O failure other than a clean end of stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, ExchangeError>;
