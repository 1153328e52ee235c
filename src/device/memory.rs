//! Device memory budget
//!
//! The host-multicore device has no VRAM of its own, so the allocator budget is
//! derived from available system memory with the same 70% headroom rule the
//! GPU memory limits use.

use super::DeviceError;

/// Fraction of available memory handed to the allocator
const USABLE_FRACTION: f64 = 0.7;

/// Device memory limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLimits {
    /// Memory available when the device was created (bytes)
    pub total_memory: u64,

    /// Byte budget of each stream's allocator
    pub usable_memory: u64,
}

impl DeviceLimits {
    /// Detect limits from system memory
    ///
    /// # Errors
    ///
    /// Returns `DeviceError::MemoryInfo` if the OS query fails
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn detect() -> Result<Self, DeviceError> {
        let info = sys_info::mem_info().map_err(|e| DeviceError::MemoryInfo(e.to_string()))?;

        // sys-info reports KiB
        let total_memory = info.avail.saturating_mul(1024);
        let usable_memory = (total_memory as f64 * USABLE_FRACTION) as u64;

        Ok(Self {
            total_memory,
            usable_memory,
        })
    }

    /// Limits with an explicit budget
    #[must_use]
    pub const fn fixed(limit: u64) -> Self {
        Self {
            total_memory: limit,
            usable_memory: limit,
        }
    }
}
