//! Host-multicore execution device
//!
//! A [`Device`] owns a dedicated rayon thread pool that plays the role of a GPU:
//! every pipeline stage is launched as a data-parallel kernel (one logical
//! thread per edge or per row) on a [`Stream`]. Streams are cheap, scoped to a
//! single sampling call, and own that call's [`CachingAllocator`].
//!
//! # Architecture
//!
//! - `memory`: memory budget detection
//! - `allocator`: call-scoped caching allocator and [`DeviceBuffer`]
//! - `stream`: ordered kernel launches and the [`Event`] handoff
//! - `primitives`: prefix-sum, reduce, segmented sort, gather, expand

pub mod allocator;
mod memory;
pub mod primitives;
mod stream;

pub use allocator::{CachingAllocator, DeviceBuffer, DeviceCopy};
pub use memory::DeviceLimits;
pub use stream::{Event, Stream};

use crate::config::SamplerConfig;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Device errors (fatal for the call that raised them)
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Call-scoped allocator exceeded its byte budget
    #[error("Out of device memory: requested {requested} bytes with {in_use} in use (limit {limit})")]
    OutOfMemory {
        /// Bytes requested by the failing allocation
        requested: u64,
        /// Bytes held by live buffers
        in_use: u64,
        /// Allocator budget
        limit: u64,
    },

    /// Worker thread pool could not be built
    #[error("Failed to build device thread pool: {0}")]
    ThreadPool(String),

    /// System memory could not be queried
    #[error("Failed to query system memory: {0}")]
    MemoryInfo(String),

    /// Producer side of an event was dropped before signalling
    #[error("Event was dropped before it was signalled")]
    EventDropped,

    /// Blocking runtime could not be created
    #[error("Failed to create blocking runtime: {0}")]
    Runtime(String),

    /// GPU backend fault
    #[error("GPU error: {0}")]
    Gpu(String),
}

#[derive(Debug)]
struct DeviceInner {
    pool: rayon::ThreadPool,
    limits: DeviceLimits,
    cache_allocations: bool,
    #[cfg(feature = "gpu")]
    gpu: Option<crate::gpu::GpuDevice>,
}

impl DeviceInner {
    fn build(config: &SamplerConfig) -> Result<Self, DeviceError> {
        let mut builder = rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("trueno-sampler-{i}"));
        if let Some(threads) = config.num_threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|e| DeviceError::ThreadPool(e.to_string()))?;

        let limits = match config.memory_limit_bytes {
            Some(limit) => DeviceLimits::fixed(limit),
            None => DeviceLimits::detect()?,
        };

        debug!(
            threads = pool.current_num_threads(),
            usable_memory = limits.usable_memory,
            "device ready"
        );

        Ok(Self {
            pool,
            limits,
            cache_allocations: config.cache_allocations,
            #[cfg(feature = "gpu")]
            gpu: None,
        })
    }
}

/// Data-parallel execution device
///
/// Cloning is cheap; clones share the thread pool.
///
/// # Example
///
/// ```
/// use trueno_sampler::{Device, SamplerConfig};
///
/// let device = Device::new(&SamplerConfig::default().with_num_threads(2)).unwrap();
/// assert_eq!(device.num_threads(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Device {
    inner: Arc<DeviceInner>,
}

impl Device {
    /// Create a device from configuration
    ///
    /// # Errors
    ///
    /// Returns `DeviceError` if the thread pool cannot be built or system
    /// memory cannot be queried (only when no explicit memory limit is set)
    pub fn new(config: &SamplerConfig) -> Result<Self, DeviceError> {
        Ok(Self {
            inner: Arc::new(DeviceInner::build(config)?),
        })
    }

    /// Create a device that runs the reservoir kernel on `gpu`
    ///
    /// All other stages stay on the host pool.
    ///
    /// # Errors
    ///
    /// Same as [`Device::new`]
    #[cfg(feature = "gpu")]
    pub fn with_gpu(config: &SamplerConfig, gpu: crate::gpu::GpuDevice) -> Result<Self, DeviceError> {
        debug!(adapter = gpu.adapter_name(), "gpu attached");
        Ok(Self {
            inner: Arc::new(DeviceInner {
                gpu: Some(gpu),
                ..DeviceInner::build(config)?
            }),
        })
    }

    /// GPU used for the reservoir kernel, if attached
    #[cfg(feature = "gpu")]
    #[must_use]
    pub fn gpu(&self) -> Option<&crate::gpu::GpuDevice> {
        self.inner.gpu.as_ref()
    }

    /// Open a new stream with its own call-scoped allocator
    #[must_use]
    pub fn stream(&self) -> Stream<'_> {
        Stream::new(self)
    }

    /// Number of worker threads
    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.inner.pool.current_num_threads()
    }

    /// Memory limits applied to each stream's allocator
    #[must_use]
    pub fn limits(&self) -> &DeviceLimits {
        &self.inner.limits
    }

    pub(crate) fn pool(&self) -> &rayon::ThreadPool {
        &self.inner.pool
    }

    pub(crate) fn cache_allocations(&self) -> bool {
        self.inner.cache_allocations
    }
}
