//! Error types for sampling calls
//!
//! A sampling call is atomic: any error aborts the whole pipeline and no
//! partial subgraph is returned.

use crate::device::DeviceError;
use thiserror::Error;

/// Errors returned by [`sample_neighbors`](crate::sample_neighbors) and
/// [`in_subgraph`](crate::in_subgraph)
#[derive(Debug, Error)]
pub enum SamplingError {
    /// Requested configuration is not implemented (e.g. sampling with replacement)
    #[error("Unsupported sampling configuration: {0}")]
    Unsupported(String),

    /// Argument failed validation at call time
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Chosen edge-offset integer width cannot hold the maximum in-degree
    #[error("Edge offset width of {bits} bits cannot represent max in-degree {max_in_degree}")]
    Capacity {
        /// Width that was selected
        bits: u32,
        /// Largest in-degree observed among the sampled rows
        max_in_degree: u64,
    },

    /// Fatal device fault (allocation failure, thread pool, GPU)
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),
}

/// Result alias for sampling operations
pub type Result<T> = std::result::Result<T, SamplingError>;

impl SamplingError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
