//! Call-scoped caching allocator
//!
//! Buffers are accounted against the device budget. When a buffer is dropped
//! its storage is kept in a free list keyed by element type and length, so a
//! later allocation of the same shape within the same call reuses it. The
//! cache dies with the stream; nothing is shared between calls.

use super::DeviceError;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// Element types storable in a [`DeviceBuffer`]
pub trait DeviceCopy: Default + Send + Sync + 'static {}

impl<T: Default + Send + Sync + 'static> DeviceCopy for T {}

type FreeList = Vec<Box<dyn Any + Send>>;

#[derive(Debug, Default)]
struct AllocatorState {
    in_use: u64,
    cached: u64,
    peak: u64,
    allocations: u64,
    reuses: u64,
    free: HashMap<(TypeId, usize), FreeList>,
}

/// Allocation statistics of one allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocatorStats {
    /// Bytes held by live buffers
    pub in_use: u64,
    /// Bytes parked in the free lists
    pub cached: u64,
    /// High-water mark of `in_use + cached`
    pub peak: u64,
    /// Number of allocation requests
    pub allocations: u64,
    /// Requests served from the free lists
    pub reuses: u64,
}

/// Stream-ordered caching allocator
#[derive(Debug, Clone)]
pub struct CachingAllocator {
    state: Arc<Mutex<AllocatorState>>,
    limit: u64,
    cache: bool,
}

impl CachingAllocator {
    /// Create an allocator with a byte budget
    #[must_use]
    pub fn new(limit: u64, cache: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(AllocatorState::default())),
            limit,
            cache,
        }
    }

    fn lock(&self) -> MutexGuard<'_, AllocatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate `len` default-initialized elements
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::OutOfMemory` if the request does not fit the
    /// budget even after the free lists are released
    pub fn alloc<T: DeviceCopy>(&self, len: usize) -> Result<DeviceBuffer<T>, DeviceError> {
        let bytes = (len as u64).saturating_mul(std::mem::size_of::<T>() as u64);
        let key = (TypeId::of::<T>(), len);

        let mut state = self.lock();
        state.allocations += 1;

        let reused = state
            .free
            .get_mut(&key)
            .and_then(Vec::pop)
            .and_then(|block| block.downcast::<Vec<T>>().ok());

        let data = if let Some(mut block) = reused {
            state.cached -= bytes;
            state.reuses += 1;
            block.iter_mut().for_each(|x| *x = T::default());
            *block
        } else {
            if state.in_use + state.cached + bytes > self.limit && state.cached > 0 {
                warn!(
                    cached = state.cached,
                    requested = bytes,
                    "allocator budget pressure, releasing cached blocks"
                );
                state.free.clear();
                state.cached = 0;
            }
            if state.in_use + bytes > self.limit {
                return Err(DeviceError::OutOfMemory {
                    requested: bytes,
                    in_use: state.in_use,
                    limit: self.limit,
                });
            }
            std::iter::repeat_with(T::default).take(len).collect()
        };

        state.in_use += bytes;
        state.peak = state.peak.max(state.in_use + state.cached);
        drop(state);

        Ok(DeviceBuffer {
            data,
            bytes,
            allocator: self.clone(),
        })
    }

    fn release<T: DeviceCopy>(&self, data: Vec<T>, bytes: u64) {
        let mut state = self.lock();
        state.in_use -= bytes;
        if self.cache && !data.is_empty() {
            state.cached += bytes;
            state
                .free
                .entry((TypeId::of::<T>(), data.len()))
                .or_default()
                .push(Box::new(data));
        }
    }

    /// Current statistics
    #[must_use]
    pub fn stats(&self) -> AllocatorStats {
        let state = self.lock();
        AllocatorStats {
            in_use: state.in_use,
            cached: state.cached,
            peak: state.peak,
            allocations: state.allocations,
            reuses: state.reuses,
        }
    }

    /// Byte budget
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }
}

/// Buffer owned by a stream's allocator
///
/// Dereferences to a slice. Dropping the buffer returns its storage to the
/// allocator; [`DeviceBuffer::into_vec`] detaches it instead.
#[derive(Debug)]
pub struct DeviceBuffer<T: DeviceCopy> {
    data: Vec<T>,
    bytes: u64,
    allocator: CachingAllocator,
}

impl<T: DeviceCopy> DeviceBuffer<T> {
    /// Detach the storage from the allocator (device-to-host handoff)
    #[must_use]
    pub fn into_vec(mut self) -> Vec<T> {
        std::mem::take(&mut self.data)
    }

    /// Size in bytes charged to the allocator
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.bytes
    }
}

impl<T: DeviceCopy> Deref for DeviceBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T: DeviceCopy> DerefMut for DeviceBuffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T: DeviceCopy> Drop for DeviceBuffer<T> {
    fn drop(&mut self) {
        let data = std::mem::take(&mut self.data);
        self.allocator.release(data, self.bytes);
    }
}
