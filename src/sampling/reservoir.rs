//! Unweighted reservoir kernel
//!
//! Parallel form of reservoir sampling. The edge at offset `k` of a row with
//! `fanout` output slots proposes slot `k` when `k < fanout` and otherwise a
//! uniform slot in `0..=k`. Every slot keeps the largest offset that ever
//! proposed it, which is exactly the occupant the sequential algorithm would
//! leave behind after streaming the row in order. `fetch_max` is commutative,
//! so the result does not depend on thread interleaving.

use super::plan::SelectionPlan;
use super::seed::random_below;
use super::width::EdgeOffset;
use crate::device::{DeviceBuffer, DeviceError, Stream};
use rayon::prelude::*;

/// Uniform sample without replacement of `count(v)` offsets per row
///
/// Output slot `j` of row `v` lives at `output_indptr[v] + j`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn reservoir_sample<T: EdgeOffset>(
    stream: &Stream<'_>,
    plan: &SelectionPlan,
    seed: u64,
) -> Result<DeviceBuffer<T>, DeviceError> {
    let slots = stream.alloc::<T::Atomic>(plan.num_out)?;

    stream.launch("reservoir", plan.num_sub_edges, || {
        plan.row_of.par_iter().enumerate().for_each(|(i, &row)| {
            let fanout = plan.count(row);
            let k = i as u64 - plan.sub_indptr[row];
            let slot = if k < fanout {
                k
            } else {
                random_below(seed, i as u64, k + 1)
            };
            if slot < fanout {
                T::fetch_max(
                    &slots[(plan.output_indptr[row] + slot) as usize],
                    T::from_u64(k),
                );
            }
        });
    });

    let mut picked = stream.alloc::<T>(plan.num_out)?;
    stream.launch("reservoir_collect", plan.num_out, || {
        picked
            .par_iter_mut()
            .zip(slots.par_iter())
            .for_each(|(p, slot)| *p = T::load(slot));
    });
    Ok(picked)
}

/// Offsets of a plan where every row keeps every edge, in original order
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn identity_offsets<T: EdgeOffset>(
    stream: &Stream<'_>,
    plan: &SelectionPlan,
) -> Result<DeviceBuffer<T>, DeviceError> {
    let mut picked = stream.alloc::<T>(plan.num_out)?;
    stream.launch("identity_offsets", plan.num_out, || {
        picked
            .par_iter_mut()
            .zip(plan.output_row_of.par_iter())
            .enumerate()
            .for_each(|(j, (p, &row))| {
                *p = T::from_u64(j as u64 - plan.output_indptr[row]);
            });
    });
    Ok(picked)
}

/// Reservoir kernel on the GPU
///
/// Returns `None` when the plan does not fit the kernel's 32-bit indexing or
/// the adapter's buffer limits; the caller then runs the host kernel, which
/// produces the same sample.
#[cfg(feature = "gpu")]
#[allow(clippy::cast_possible_truncation)]
pub(crate) async fn reservoir_sample_gpu<T: EdgeOffset>(
    stream: &Stream<'_>,
    plan: &SelectionPlan,
    gpu: &crate::gpu::GpuDevice,
    seed: u64,
) -> Result<Option<DeviceBuffer<T>>, DeviceError> {
    use crate::gpu::{gpu_reservoir, ReservoirBuffers};

    if plan.num_sub_edges == 0 || plan.num_sub_edges >= u32::MAX as usize {
        return Ok(None);
    }

    let narrow = |values: &[u64]| -> Vec<u32> { values.par_iter().map(|&x| x as u32).collect() };
    let (sub_indptr, output_indptr, row_of) = stream.launch("gpu_stage", plan.num_sub_edges, || {
        let row_of: Vec<u32> = plan.row_of.par_iter().map(|&r| r as u32).collect();
        (narrow(&plan.sub_indptr), narrow(&plan.output_indptr), row_of)
    });

    let Some(buffers) = ReservoirBuffers::upload(gpu, &sub_indptr, &output_indptr, &row_of) else {
        return Ok(None);
    };

    let slots = gpu_reservoir(gpu, &buffers, seed)
        .await
        .map_err(|e| DeviceError::Gpu(format!("{e:#}")))?;

    let mut picked = stream.alloc::<T>(plan.num_out)?;
    stream.launch("reservoir_collect", plan.num_out, || {
        picked
            .par_iter_mut()
            .zip(slots.par_iter())
            .for_each(|(p, &slot)| *p = T::from_u64(u64::from(slot)));
    });
    Ok(Some(picked))
}
