//! Degree and slice extraction
//!
//! Reads the requested rows out of `indptr` without touching the adjacency:
//! each sampled row is described by its in-degree and the global offset of
//! its first edge. With per-type fanouts every row is further split into one
//! virtual row per edge type (`v = row * num_types + type`).

use crate::device::primitives::adjacent_difference;
use crate::device::{DeviceBuffer, DeviceError, Stream};
use rayon::prelude::*;

/// Degree and start offset of each sampled (virtual) row
#[derive(Debug)]
pub(crate) struct RowSlice {
    /// Edges in the row
    pub(crate) degree: DeviceBuffer<u64>,
    /// Global edge id of the row's first edge
    pub(crate) start: DeviceBuffer<u64>,
}

impl RowSlice {
    pub(crate) fn len(&self) -> usize {
        self.degree.len()
    }
}

/// Slice `indptr` to the requested rows (all rows when `nodes` is `None`)
///
/// # Errors
///
/// Returns `DeviceError::OutOfMemory` if the slice buffers do not fit
pub(crate) fn slice_indptr(
    stream: &Stream<'_>,
    indptr: &[u64],
    nodes: Option<&[u32]>,
) -> Result<RowSlice, DeviceError> {
    let num_rows = nodes.map_or(indptr.len().saturating_sub(1), <[u32]>::len);
    let mut degree = stream.alloc::<u64>(num_rows)?;
    let mut start = stream.alloc::<u64>(num_rows)?;

    match nodes {
        None => stream.launch("adjacent_difference", num_rows, || {
            adjacent_difference(indptr, &mut degree);
            start.copy_from_slice(&indptr[..num_rows]);
        }),
        Some(nodes) => stream.launch("slice_indptr", num_rows, || {
            degree
                .par_iter_mut()
                .zip(start.par_iter_mut())
                .zip(nodes.par_iter())
                .for_each(|((deg, first), &node)| {
                    let row = node as usize;
                    *first = indptr[row];
                    *deg = indptr[row + 1] - indptr[row];
                });
        }),
    }

    Ok(RowSlice { degree, start })
}

/// Split each sliced row into `num_types` virtual rows, one per edge type
///
/// Edge types within a row are sorted ascending, so the edges of type `t`
/// form a contiguous run found by binary search. Types `>= num_types` fall
/// into no virtual row.
///
/// # Errors
///
/// Returns `DeviceError::OutOfMemory` if the expanded buffers do not fit
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn slice_indptr_by_type(
    stream: &Stream<'_>,
    rows: &RowSlice,
    type_per_edge: &[u8],
    num_types: usize,
) -> Result<RowSlice, DeviceError> {
    let num_virtual = rows.len() * num_types;
    let mut degree = stream.alloc::<u64>(num_virtual)?;
    let mut start = stream.alloc::<u64>(num_virtual)?;

    stream.launch("slice_indptr_by_type", num_virtual, || {
        degree
            .par_iter_mut()
            .zip(start.par_iter_mut())
            .enumerate()
            .for_each(|(v, (deg, first))| {
                let (row, ty) = (v / num_types, v % num_types);
                let row_start = rows.start[row];
                let row_types = &type_per_edge
                    [row_start as usize..(row_start + rows.degree[row]) as usize];
                let lo = row_types.partition_point(|&t| usize::from(t) < ty);
                let hi = row_types.partition_point(|&t| usize::from(t) <= ty);
                *first = row_start + lo as u64;
                *deg = (hi - lo) as u64;
            });
    });

    Ok(RowSlice { degree, start })
}
