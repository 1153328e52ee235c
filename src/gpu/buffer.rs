//! GPU buffer management for the reservoir kernel
//!
//! Uploads the selection layout (`sub_indptr`, `output_indptr`, owning row
//! per sub-edge) as `u32` arrays and allocates the zeroed slot array the
//! kernel arbitrates over.

use super::GpuDevice;

/// GPU buffers of one reservoir launch
#[derive(Debug)]
pub struct ReservoirBuffers {
    /// Number of sub-edges (kernel threads)
    pub num_edges: u32,

    /// Number of output slots
    pub num_slots: usize,

    /// Row offsets of the sub-edge space (size: rows + 1)
    pub sub_indptr: wgpu::Buffer,

    /// Row offsets of the output slots (size: rows + 1)
    pub output_indptr: wgpu::Buffer,

    /// Owning row of each sub-edge (size: `num_edges`)
    pub row_of: wgpu::Buffer,

    /// Reservoir slots, `atomic<u32>` (size: `num_slots`)
    pub slots: wgpu::Buffer,
}

impl ReservoirBuffers {
    /// Upload the layout to the GPU
    ///
    /// Returns `None` when an array exceeds the adapter's storage-buffer
    /// binding size or the sub-edges need more workgroups than one 2D
    /// dispatch can launch.
    #[allow(clippy::cast_possible_truncation)]
    pub fn upload(
        device: &GpuDevice,
        sub_indptr: &[u32],
        output_indptr: &[u32],
        row_of: &[u32],
    ) -> Option<Self> {
        let limits = device.limits();
        let max_binding = u64::from(limits.max_storage_buffer_binding_size);
        let max_groups = u64::from(limits.max_compute_workgroups_per_dimension).pow(2);
        if (row_of.len() as u64).div_ceil(256) > max_groups {
            return None;
        }
        let num_slots = output_indptr.last().map_or(0, |&n| n as usize);
        let slot_bytes = (num_slots.max(1) * std::mem::size_of::<u32>()) as u64;
        let too_large = [sub_indptr.len(), output_indptr.len(), row_of.len()]
            .iter()
            .map(|&n| (n * std::mem::size_of::<u32>()) as u64)
            .chain(std::iter::once(slot_bytes))
            .any(|bytes| bytes > max_binding);
        if too_large {
            return None;
        }

        let usage = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST;
        let sub_indptr_buffer = device.upload(
            "Reservoir sub_indptr",
            bytemuck::cast_slice(sub_indptr),
            usage,
        );
        let output_indptr_buffer = device.upload(
            "Reservoir output_indptr",
            bytemuck::cast_slice(output_indptr),
            usage,
        );
        let row_of_buffer =
            device.upload("Reservoir row_of", bytemuck::cast_slice(row_of), usage);

        // Zeroed by wgpu; a slot is always claimed by its own offset first
        let slots = device.zeroed(
            "Reservoir slots",
            slot_bytes,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        );

        Some(Self {
            num_edges: row_of.len() as u32,
            num_slots,
            sub_indptr: sub_indptr_buffer,
            output_indptr: output_indptr_buffer,
            row_of: row_of_buffer,
            slots,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_layout() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_upload_layout: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        let buffers = ReservoirBuffers::upload(&device, &[0, 2, 5], &[0, 2, 4], &[0, 0, 1, 1, 1]).unwrap();

        assert_eq!(buffers.num_edges, 5);
        assert_eq!(buffers.num_slots, 4);
        assert_eq!(buffers.slots.size(), 16);
    }

    #[tokio::test]
    async fn test_upload_without_slots() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_upload_without_slots: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        let buffers = ReservoirBuffers::upload(&device, &[0, 3], &[0, 0], &[0, 0, 0]).unwrap();

        assert_eq!(buffers.num_slots, 0);
        assert_eq!(buffers.slots.size(), 4);
    }
}
