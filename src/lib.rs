//! trueno-sampler: device-parallel neighbor sampling for GNN training
//!
//! # Overview
//!
//! Given a graph in CSC form (rows are destination nodes) and a set of seed
//! rows, trueno-sampler draws for every seed a bounded random subset of its
//! incoming edges: uniformly, by edge weight, per edge type, or correlated
//! across layers (LABOR). The pipeline is a sequence of data-parallel
//! kernels and primitives (prefix sum, segmented count, segmented sort,
//! gather) with no per-row host loop.
//!
//! # Quick Start
//!
//! ```
//! use trueno_sampler::{CscGraph, NodeId, RandomSeed, SampleRequest, Sampler, SamplerConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Node 0 is called by 1, 2 and 3
//! let graph = CscGraph::from_edge_list(&[
//!     (NodeId(1), NodeId(0)),
//!     (NodeId(2), NodeId(0)),
//!     (NodeId(3), NodeId(0)),
//!     (NodeId(0), NodeId(1)),
//! ])?;
//!
//! let sampler = Sampler::new(&SamplerConfig::default())?;
//! let request = SampleRequest::new(&[2])?
//!     .return_edge_ids(true)
//!     .random_seed(RandomSeed::Single(42));
//!
//! let sampled = sampler.sample_neighbors_blocking(graph.view(), Some(&[0, 1][..]), &request)?;
//! assert_eq!(sampled.indptr, vec![0, 2, 3]);
//! assert_eq!(sampled.neighbors(1), &[0]);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Device**: host-multicore execution target (rayon pool as stream,
//!   call-scoped caching allocator, one-shot events)
//! - **Sampling**: slice, plan, reservoir / weighted keys, top-k, reconstruct
//! - **Storage**: CSC views and an owned CSC builder
//! - **GPU** (feature `gpu`): wgpu reservoir kernel, bit-identical to the host

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod device;
pub mod error;
pub mod sampling;
pub mod storage;

// GPU acceleration (optional)
#[cfg(feature = "gpu")]
pub mod gpu;

// Re-export core types
pub use config::SamplerConfig;
pub use device::{Device, DeviceError, DeviceLimits};
pub use sampling::{
    in_subgraph, sample_neighbors, ContinuousSeed, EdgeIdWidth, Fanout, RandomSeed,
    SampleRequest, SampledSubgraph, Sampler,
};
pub use storage::{CscGraph, CscView, NodeId};

#[cfg(feature = "gpu")]
pub use gpu::{GpuDevice, GpuDeviceError};

// Error type
pub use error::{Result, SamplingError};
