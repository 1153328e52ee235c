//! Device-owning sampler handle

use super::pipeline;
use super::request::SampleRequest;
use super::subgraph::SampledSubgraph;
use crate::config::SamplerConfig;
use crate::device::{Device, DeviceError};
use crate::error::Result;
use crate::storage::CscView;
use std::future::Future;

/// Sampler bound to one [`Device`]
///
/// Calls are independent: the handle holds no per-call state, so it can be
/// shared across tasks and used for several layers concurrently.
///
/// # Example
///
/// ```
/// use trueno_sampler::{CscGraph, NodeId, RandomSeed, SampleRequest, Sampler, SamplerConfig};
///
/// let sampler = Sampler::new(&SamplerConfig::default().with_num_threads(2)).unwrap();
/// let graph = CscGraph::from_edge_list(&[
///     (NodeId(1), NodeId(0)),
///     (NodeId(2), NodeId(0)),
///     (NodeId(3), NodeId(0)),
/// ])
/// .unwrap();
/// let request = SampleRequest::new(&[2]).unwrap().random_seed(RandomSeed::Single(1));
///
/// let sampled = sampler
///     .sample_neighbors_blocking(graph.view(), Some(&[0][..]), &request)
///     .unwrap();
/// assert_eq!(sampled.degree(0), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Sampler {
    device: Device,
}

impl Sampler {
    /// Sampler on a new device built from `config`
    ///
    /// # Errors
    ///
    /// Returns `Device` if the device cannot be created
    pub fn new(config: &SamplerConfig) -> Result<Self> {
        Ok(Self {
            device: Device::new(config)?,
        })
    }

    /// Sampler on a new device configured from `TRUENO_SAMPLER_*` variables
    ///
    /// # Errors
    ///
    /// Returns an error if the environment is malformed or the device cannot
    /// be created
    pub fn from_env() -> Result<Self> {
        Self::new(&SamplerConfig::from_env()?)
    }

    /// Sampler on an existing device
    #[must_use]
    pub const fn with_device(device: Device) -> Self {
        Self { device }
    }

    /// Device the sampler launches on
    #[must_use]
    pub const fn device(&self) -> &Device {
        &self.device
    }

    /// See [`sample_neighbors`](crate::sample_neighbors)
    ///
    /// # Errors
    ///
    /// Same as [`sample_neighbors`](crate::sample_neighbors)
    pub async fn sample_neighbors(
        &self,
        graph: CscView<'_>,
        nodes: Option<&[u32]>,
        request: &SampleRequest,
    ) -> Result<SampledSubgraph> {
        pipeline::sample_neighbors(&self.device, graph, nodes, request).await
    }

    /// See [`in_subgraph`](crate::in_subgraph)
    ///
    /// # Errors
    ///
    /// Same as [`in_subgraph`](crate::in_subgraph)
    pub async fn in_subgraph(&self, graph: CscView<'_>, nodes: &[u32]) -> Result<SampledSubgraph> {
        pipeline::in_subgraph(&self.device, graph, nodes).await
    }

    /// Blocking [`Sampler::sample_neighbors`] for synchronous callers
    ///
    /// Must not be called from inside an async runtime.
    ///
    /// # Errors
    ///
    /// Same as [`sample_neighbors`](crate::sample_neighbors), plus
    /// `DeviceError::Runtime` if the blocking runtime cannot be built
    pub fn sample_neighbors_blocking(
        &self,
        graph: CscView<'_>,
        nodes: Option<&[u32]>,
        request: &SampleRequest,
    ) -> Result<SampledSubgraph> {
        block_on(self.sample_neighbors(graph, nodes, request))
    }

    /// Blocking [`Sampler::in_subgraph`]
    ///
    /// # Errors
    ///
    /// Same as [`Sampler::sample_neighbors_blocking`]
    pub fn in_subgraph_blocking(
        &self,
        graph: CscView<'_>,
        nodes: &[u32],
    ) -> Result<SampledSubgraph> {
        block_on(self.in_subgraph(graph, nodes))
    }
}

fn block_on<F: Future<Output = Result<SampledSubgraph>>>(future: F) -> Result<SampledSubgraph> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(|e| DeviceError::Runtime(e.to_string()))?;
    runtime.block_on(future)
}
