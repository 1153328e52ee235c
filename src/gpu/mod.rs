//! GPU acceleration for the reservoir kernel
//!
//! Based on the parallel reservoir formulation of:
//! - **`GraphBolt`** (DGL, 2023) - GPU neighbor sampling with atomic slot arbitration
//! - **`cuGraph`** (Bader et al., 2022) - GPU-accelerated graph analytics
//!
//! # Architecture
//!
//! - `device`: GPU device initialization and management
//! - `buffer`: upload of the selection layout, slot allocation
//! - `reservoir`: WGSL reservoir kernel dispatch and readback
//!
//! # Feature Flag
//!
//! This module is only available with the `gpu` feature flag:
//! ```bash
//! cargo build --features gpu
//! ```

mod buffer;
mod device;
mod reservoir;

pub use buffer::ReservoirBuffers;
pub use device::{GpuDevice, GpuDeviceError};
pub use reservoir::gpu_reservoir;
