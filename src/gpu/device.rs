//! wgpu adapter and queue backing the reservoir kernel
//!
//! The sampler only ever asks for one logical device per [`crate::Device`],
//! requested with the adapter's full limits so that the storage-buffer
//! bindings of large graphs fit.

use thiserror::Error;
use wgpu::util::DeviceExt;

/// Failure to open a GPU for sampling
#[derive(Debug, Error)]
pub enum GpuDeviceError {
    /// No adapter matches the requested backends
    #[error("no wgpu adapter available for sampling")]
    NoAdapter,

    /// The adapter refused the logical device
    #[error("adapter refused the sampling device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
}

/// GPU half of a sampling [`crate::Device`]
///
/// ```ignore
/// # use trueno_sampler::{Device, GpuDevice, SamplerConfig};
/// let gpu = GpuDevice::new().await?;
/// let device = Device::with_gpu(&SamplerConfig::default(), gpu)?;
/// ```
#[derive(Debug)]
pub struct GpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_name: String,
}

impl GpuDevice {
    /// Whether a sampling GPU can be opened on this machine
    pub async fn is_gpu_available() -> bool {
        Self::new().await.is_ok()
    }

    /// Open the highest-performance adapter on any backend
    ///
    /// # Errors
    ///
    /// Returns `GpuDeviceError` if no adapter is found or it refuses the device
    pub async fn new() -> Result<Self, GpuDeviceError> {
        Self::with_backends(wgpu::Backends::all()).await
    }

    /// Open the highest-performance adapter among `backends`
    ///
    /// # Errors
    ///
    /// Returns `GpuDeviceError` if no adapter is found or it refuses the device
    pub async fn with_backends(backends: wgpu::Backends) -> Result<Self, GpuDeviceError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                ..Default::default()
            })
            .await
            .ok_or(GpuDeviceError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("trueno-sampler reservoir"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        Ok(Self {
            device,
            queue,
            adapter_name: adapter.get_info().name,
        })
    }

    /// Adapter the device was opened on
    #[must_use]
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Limits of the logical device
    #[must_use]
    pub fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }

    /// Buffer initialized with `contents`
    pub fn upload(&self, label: &str, contents: &[u8], usage: wgpu::BufferUsages) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            })
    }

    /// Zeroed buffer of `size` bytes
    pub fn zeroed(&self, label: &str, size: u64, usage: wgpu::BufferUsages) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        })
    }

    #[must_use]
    pub const fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[must_use]
    pub const fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}
