//! Output reconstruction
//!
//! Turns picked intra-row offsets into global edge ids, gathers neighbor ids
//! and edge types, and collapses per-type virtual rows back to one row per
//! seed.

use super::plan::SelectionPlan;
use super::subgraph::SampledSubgraph;
use super::width::EdgeOffset;
use crate::device::primitives::{gather, segmented_sort, sequence};
use crate::device::{DeviceBuffer, DeviceError, Stream};
use crate::storage::CscView;
use rayon::prelude::*;

/// Sort the picked offsets of every output row ascending
///
/// Keeps edge types grouped within a row when a single fanout is applied to
/// a typed graph.
pub(crate) fn sort_within_rows<T: EdgeOffset>(
    stream: &Stream<'_>,
    plan: &SelectionPlan,
    picked: &mut DeviceBuffer<T>,
) -> Result<(), DeviceError> {
    let mut scratch = stream.alloc::<(usize, T)>(plan.num_out)?;
    stream.launch("segmented_sort", plan.num_out, || {
        segmented_sort(&plan.output_row_of, &mut picked[..], &mut scratch[..]);
    });
    Ok(())
}

/// Build the final subgraph from the picked offsets
///
/// `num_types` is the number of fanouts; output row `i` spans virtual rows
/// `i * num_types..(i + 1) * num_types`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn reconstruct<T: EdgeOffset>(
    stream: &Stream<'_>,
    plan: &SelectionPlan,
    picked: &[T],
    graph: CscView<'_>,
    nodes: Option<&[u32]>,
    num_types: usize,
    return_edge_ids: bool,
) -> Result<SampledSubgraph, DeviceError> {
    let num_out = plan.num_out;

    let mut edge_ids = stream.alloc::<u64>(num_out)?;
    stream.launch("edge_ids", num_out, || {
        edge_ids
            .par_iter_mut()
            .zip(picked.par_iter())
            .zip(plan.output_row_of.par_iter())
            .for_each(|((id, &offset), &row)| {
                *id = plan.rows.start[row] + offset.to_u64();
            });
    });

    let mut indices = stream.alloc::<u32>(num_out)?;
    stream.launch("gather_indices", num_out, || {
        gather(graph.indices(), &edge_ids, &mut indices[..]);
    });

    let type_per_edge = match graph.type_per_edge() {
        Some(types) => {
            let mut gathered = stream.alloc::<u8>(num_out)?;
            stream.launch("gather_types", num_out, || {
                gather(types, &edge_ids, &mut gathered[..]);
            });
            Some(gathered.into_vec())
        }
        None => None,
    };

    let num_seeds = plan.rows.len() / num_types;
    let mut indptr = stream.alloc::<u64>(num_seeds + 1)?;
    stream.launch("collapse_indptr", num_seeds + 1, || {
        indptr
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, offset)| *offset = plan.output_indptr[i * num_types]);
    });

    let nodes = match nodes {
        Some(nodes) => nodes.to_vec(),
        None => {
            let mut iota = stream.alloc::<u32>(num_seeds)?;
            stream.launch("sequence", num_seeds, || sequence(&mut iota[..]));
            iota.into_vec()
        }
    };

    Ok(SampledSubgraph {
        indptr: indptr.into_vec(),
        indices: indices.into_vec(),
        nodes,
        edge_ids: return_edge_ids.then(|| edge_ids.into_vec()),
        type_per_edge,
    })
}
