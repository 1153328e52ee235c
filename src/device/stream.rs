//! Execution stream
//!
//! Kernels are launched in issue order onto the device thread pool. The host
//! never waits on the stream as a whole; a scalar that the host must read
//! (the max in-degree) is produced by a kernel launched with
//! [`Stream::launch_recorded`] and handed over through an [`Event`] that the
//! device worker completes. The host awaits it exactly once.

use super::{CachingAllocator, Device, DeviceBuffer, DeviceCopy, DeviceError};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// Ordered launch queue scoped to one sampling call
#[derive(Debug)]
pub struct Stream<'d> {
    device: &'d Device,
    allocator: CachingAllocator,
    launches: AtomicU64,
}

impl<'d> Stream<'d> {
    pub(super) fn new(device: &'d Device) -> Self {
        Self {
            device,
            allocator: CachingAllocator::new(
                device.limits().usable_memory,
                device.cache_allocations(),
            ),
            launches: AtomicU64::new(0),
        }
    }

    /// Allocate a zero-initialized buffer from this stream's allocator
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::OutOfMemory` if the budget is exhausted
    pub fn alloc<T: DeviceCopy>(&self, len: usize) -> Result<DeviceBuffer<T>, DeviceError> {
        self.allocator.alloc(len)
    }

    /// Launch a kernel over `work` logical threads
    ///
    /// The kernel body runs inside the device pool, so rayon parallel
    /// iterators in it fan out over the device's workers.
    pub fn launch<R, K>(&self, name: &'static str, work: usize, kernel: K) -> R
    where
        R: Send,
        K: FnOnce() -> R + Send,
    {
        let id = self.launches.fetch_add(1, Ordering::Relaxed);
        trace!(kernel = name, launch = id, work, "launch");
        self.device.pool().install(kernel)
    }

    /// Launch a kernel without blocking the host and record an event for its result
    ///
    /// The kernel runs on a device worker, which completes the event when the
    /// kernel returns. A kernel that panics drops the event instead.
    pub fn launch_recorded<R, K>(&self, name: &'static str, work: usize, kernel: K) -> Event<R>
    where
        R: Send + 'static,
        K: FnOnce() -> R + Send + 'static,
    {
        let id = self.launches.fetch_add(1, Ordering::Relaxed);
        trace!(kernel = name, launch = id, work, "launch recorded");
        let (tx, rx) = oneshot::channel();
        self.device.pool().spawn(move || {
            if let Ok(value) = catch_unwind(AssertUnwindSafe(kernel)) {
                // The host may have stopped waiting
                let _ = tx.send(value);
            }
        });
        Event { rx }
    }

    /// Allocator of this stream
    #[must_use]
    pub const fn allocator(&self) -> &CachingAllocator {
        &self.allocator
    }

    /// Device the stream runs on
    #[must_use]
    pub const fn device(&self) -> &'d Device {
        self.device
    }
}

impl Drop for Stream<'_> {
    fn drop(&mut self) {
        let stats = self.allocator.stats();
        debug!(
            launches = self.launches.load(Ordering::Relaxed),
            peak_bytes = stats.peak,
            allocations = stats.allocations,
            reuses = stats.reuses,
            "stream finished"
        );
    }
}

/// One-shot host/device handoff
#[derive(Debug)]
pub struct Event<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Event<T> {
    /// Wait for the value
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::EventDropped` if the producer went away
    pub async fn wait(self) -> Result<T, DeviceError> {
        self.rx.await.map_err(|_| DeviceError::EventDropped)
    }
}
