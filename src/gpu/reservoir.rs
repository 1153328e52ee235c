//! GPU reservoir kernel
//!
//! Same arbitration as the host kernel (see `sampling::reservoir`), with the
//! slots held as `atomic<u32>` and the murmur3 counter generator reproduced
//! in WGSL, so both backends return the same sample for the same seed.

use super::{GpuDevice, ReservoirBuffers};
use anyhow::{ensure, Context, Result};

const WORKGROUP_SIZE: u32 = 256;

/// Reservoir parameters for GPU shader
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ReservoirParams {
    num_edges: u32,
    seed_lo: u32,
    seed_hi: u32,
    row_stride: u32,
}

/// 2D dispatch covering `num_edges` invocations: `(groups_x, groups_y)`
fn dispatch_shape(num_edges: u32, max_per_dimension: u32) -> (u32, u32) {
    let groups = num_edges.div_ceil(WORKGROUP_SIZE).max(1);
    let groups_x = groups.min(max_per_dimension);
    (groups_x, groups.div_ceil(groups_x))
}

/// Helper: read the slot array back from the GPU
async fn read_slots(device: &GpuDevice, slots: &wgpu::Buffer, len: usize) -> Result<Vec<u32>> {
    let size = slots.size();
    let staging_buffer = device.zeroed(
        "Reservoir slots staging",
        size,
        wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
    );

    let mut encoder = device
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
    encoder.copy_buffer_to_buffer(slots, 0, &staging_buffer, 0, size);
    device.queue().submit(Some(encoder.finish()));

    let buffer_slice = staging_buffer.slice(..);
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();

    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });

    device.device().poll(wgpu::Maintain::Wait);
    rx.receive()
        .await
        .context("Failed to receive map result")?
        .context("Buffer mapping failed")?;

    let data = buffer_slice.get_mapped_range();
    let values: Vec<u32> = bytemuck::cast_slice(&data)[..len].to_vec();
    drop(data);
    staging_buffer.unmap();

    Ok(values)
}

/// Run the reservoir kernel; returns the picked offset of every output slot
///
/// # Errors
///
/// Returns error if:
/// - the launch exceeds the adapter's dispatch limits
/// - buffer creation or shader dispatch fails
/// - result readback fails
#[allow(clippy::too_many_lines)]
#[allow(clippy::cast_possible_truncation)]
pub async fn gpu_reservoir(
    device: &GpuDevice,
    buffers: &ReservoirBuffers,
    seed: u64,
) -> Result<Vec<u32>> {
    const SHADER: &str = include_str!("shaders/reservoir.wgsl");

    let max_per_dimension = device.limits().max_compute_workgroups_per_dimension;
    let (groups_x, groups_y) = dispatch_shape(buffers.num_edges, max_per_dimension);
    ensure!(
        groups_y <= max_per_dimension,
        "{} sub-edges exceed the GPU dispatch limit",
        buffers.num_edges
    );

    let shader_module = device
        .device()
        .create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Reservoir Shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

    let storage_entry = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };

    let bind_group_layout =
        device
            .device()
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Reservoir Bind Group Layout"),
                entries: &[
                    // @binding(0): uniform params
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    // @binding(1..=3): sub_indptr, output_indptr, row_of (read)
                    storage_entry(1, true),
                    storage_entry(2, true),
                    storage_entry(3, true),
                    // @binding(4): slots (read_write, atomic)
                    storage_entry(4, false),
                ],
            });

    let pipeline_layout = device
        .device()
        .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Reservoir Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

    let compute_pipeline =
        device
            .device()
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Reservoir Pipeline"),
                layout: Some(&pipeline_layout),
                module: &shader_module,
                entry_point: "reservoir",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            });

    let params_buffer = device.upload(
        "Reservoir Params",
        bytemuck::bytes_of(&ReservoirParams {
            num_edges: buffers.num_edges,
            seed_lo: seed as u32,
            seed_hi: (seed >> 32) as u32,
            row_stride: groups_x * WORKGROUP_SIZE,
        }),
        wgpu::BufferUsages::UNIFORM,
    );

    let bind_group = device
        .device()
        .create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Reservoir Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.sub_indptr.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.output_indptr.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: buffers.row_of.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: buffers.slots.as_entire_binding(),
                },
            ],
        });

    let mut encoder = device
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Reservoir Command Encoder"),
        });

    {
        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Reservoir Compute Pass"),
            timestamp_writes: None,
        });

        compute_pass.set_pipeline(&compute_pipeline);
        compute_pass.set_bind_group(0, &bind_group, &[]);
        compute_pass.dispatch_workgroups(groups_x, groups_y, 1);
    }

    device.queue().submit(Some(encoder.finish()));

    read_slots(device, &buffers.slots, buffers.num_slots).await
}
