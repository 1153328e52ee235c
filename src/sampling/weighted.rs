//! Weighted and LABOR key generation with segmented top-k selection
//!
//! Each sub-edge draws `u` in `(0, 1]` and gets the key `-ln(u) / w`. The
//! `count(v)` smallest keys of a row form a weighted sample without
//! replacement (exponential jumps). In LABOR mode `u` is keyed by the
//! edge's source node, so calls sharing a seed draw the same `u` for the same
//! source and their samples overlap.

use super::plan::SelectionPlan;
use super::seed::ContinuousSeed;
use super::width::EdgeOffset;
use crate::device::primitives::segmented_sort_pairs;
use crate::device::{DeviceBuffer, DeviceError, Stream};
use rayon::prelude::*;

/// Key of an edge with weight `w` given its uniform draw `u`
///
/// Positive-weight keys saturate at `f32::MAX` so that excluded edges
/// (`+inf`) stay strictly behind every eligible edge.
#[must_use]
pub fn edge_key(u: f32, w: f32) -> f32 {
    if w > 0.0 {
        (-u.ln() / w).min(f32::MAX)
    } else {
        f32::INFINITY
    }
}

/// Weighted (or LABOR) sample without replacement of `count(v)` offsets per row
///
/// The selected offsets of a row come out in ascending key order.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn weighted_sample<T: EdgeOffset>(
    stream: &Stream<'_>,
    plan: &SelectionPlan,
    indices: &[u32],
    seed: &ContinuousSeed,
    layer: bool,
) -> Result<DeviceBuffer<T>, DeviceError> {
    let n = plan.num_sub_edges;
    let mut keys = stream.alloc::<f32>(n)?;
    let mut offsets = stream.alloc::<T>(n)?;

    stream.launch("weighted_keys", n, || {
        keys.par_iter_mut()
            .zip(offsets.par_iter_mut())
            .enumerate()
            .for_each(|(i, (key, offset))| {
                let row = plan.row_of[i];
                *offset = T::from_u64(i as u64 - plan.sub_indptr[row]);

                let w = plan.weights.as_ref().map_or(1.0, |weights| weights[i]);
                let t = match (&plan.edge_ids, layer) {
                    (Some(ids), true) => u64::from(indices[ids[i] as usize]),
                    _ => i as u64,
                };
                *key = edge_key(seed.uniform(t), w);
            });
    });

    let mut scratch = stream.alloc::<(usize, f32, T)>(n)?;
    stream.launch("segmented_sort_pairs", n, || {
        segmented_sort_pairs(
            &plan.row_of,
            &mut keys[..],
            &mut offsets[..],
            &mut scratch[..],
            f32::total_cmp,
        );
    });
    drop(scratch);

    let mut picked = stream.alloc::<T>(plan.num_out)?;
    stream.launch("select_top_k", plan.num_out, || {
        picked
            .par_iter_mut()
            .zip(plan.output_row_of.par_iter())
            .enumerate()
            .for_each(|(j, (p, &row))| {
                let rank = j as u64 - plan.output_indptr[row];
                *p = offsets[(plan.sub_indptr[row] + rank) as usize];
            });
    });
    Ok(picked)
}
