//! Per-call selection plan
//!
//! Everything the key generators and the reconstructor share: the flattened
//! sub-edge space of the sampled (virtual) rows, the owning row of every
//! sub-edge, and the output layout derived from `min(eligible degree, fanout)`.

use super::request::Fanout;
use super::slice::RowSlice;
use crate::device::primitives::{exclusive_sum, expand_indptr, gather, segmented_count};
use crate::device::{DeviceBuffer, DeviceError, Stream};
use rayon::prelude::*;
use tracing::debug;

#[derive(Debug)]
pub(crate) struct SelectionPlan {
    /// Sampled (virtual) rows
    pub(crate) rows: RowSlice,
    /// Prefix sum of row degrees: row `v` owns sub-edges `sub_indptr[v]..sub_indptr[v + 1]`
    pub(crate) sub_indptr: DeviceBuffer<u64>,
    /// Owning row of every sub-edge
    pub(crate) row_of: DeviceBuffer<usize>,
    /// Global edge id of every sub-edge (weighted and LABOR paths)
    pub(crate) edge_ids: Option<DeviceBuffer<u64>>,
    /// Weight of every sub-edge
    pub(crate) weights: Option<DeviceBuffer<f32>>,
    /// Prefix sum of per-row sample counts
    pub(crate) output_indptr: DeviceBuffer<u64>,
    /// Owning row of every output slot
    pub(crate) output_row_of: DeviceBuffer<usize>,
    pub(crate) num_sub_edges: usize,
    pub(crate) num_out: usize,
}

impl SelectionPlan {
    /// Lay out the sub-edge and output spaces
    ///
    /// `need_edge_ids` forces the per-sub-edge global edge ids (LABOR keys
    /// read the source node of each edge); they are always built when
    /// weights are present.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn build(
        stream: &Stream<'_>,
        rows: RowSlice,
        fanouts: &[Fanout],
        probs_or_mask: Option<&[f32]>,
        need_edge_ids: bool,
    ) -> Result<Self, DeviceError> {
        let num_rows = rows.len();

        let mut sub_indptr = stream.alloc::<u64>(num_rows + 1)?;
        let num_sub_edges = stream.launch("exclusive_sum", num_rows, || {
            exclusive_sum(&rows.degree[..], &mut sub_indptr[..])
        }) as usize;

        let mut row_of = stream.alloc::<usize>(num_sub_edges)?;
        stream.launch("expand_indptr", num_sub_edges, || {
            expand_indptr(&sub_indptr, &mut row_of);
        });

        let edge_ids = if need_edge_ids || probs_or_mask.is_some() {
            let mut ids = stream.alloc::<u64>(num_sub_edges)?;
            stream.launch("sub_edge_ids", num_sub_edges, || {
                ids.par_iter_mut()
                    .zip(row_of.par_iter())
                    .enumerate()
                    .for_each(|(i, (id, &row))| {
                        *id = rows.start[row] + (i as u64 - sub_indptr[row]);
                    });
            });
            Some(ids)
        } else {
            None
        };

        let mut eligible = stream.alloc::<u64>(num_rows)?;
        let weights = match (probs_or_mask, &edge_ids) {
            (Some(probs), Some(ids)) => {
                let mut weights = stream.alloc::<f32>(num_sub_edges)?;
                stream.launch("gather_weights", num_sub_edges, || {
                    gather(probs, ids, &mut weights[..]);
                });
                stream.launch("segmented_count", num_rows, || {
                    segmented_count(&weights[..], &sub_indptr, &mut eligible, |&w| w > 0.0);
                });
                Some(weights)
            }
            _ => {
                eligible.copy_from_slice(&rows.degree);
                None
            }
        };

        let num_types = fanouts.len();
        let mut counts = stream.alloc::<u64>(num_rows)?;
        stream.launch("fanout_counts", num_rows, || {
            counts
                .par_iter_mut()
                .zip(eligible.par_iter())
                .enumerate()
                .for_each(|(v, (count, &degree))| {
                    *count = fanouts[v % num_types].cap(degree);
                });
        });

        let mut output_indptr = stream.alloc::<u64>(num_rows + 1)?;
        let num_out = stream.launch("exclusive_sum", num_rows, || {
            exclusive_sum(&counts[..], &mut output_indptr[..])
        }) as usize;

        let mut output_row_of = stream.alloc::<usize>(num_out)?;
        stream.launch("expand_indptr", num_out, || {
            expand_indptr(&output_indptr, &mut output_row_of);
        });

        debug!(rows = num_rows, num_sub_edges, num_out, "selection plan");

        Ok(Self {
            rows,
            sub_indptr,
            row_of,
            edge_ids,
            weights,
            output_indptr,
            output_row_of,
            num_sub_edges,
            num_out,
        })
    }

    /// Every row keeps all of its edges; no random stage is needed
    pub(crate) fn is_take_all(&self) -> bool {
        self.num_out == self.num_sub_edges
    }

    /// Number of edges sampled from row `v`
    pub(crate) fn count(&self, v: usize) -> u64 {
        self.output_indptr[v + 1] - self.output_indptr[v]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::slice::slice_indptr;
    use crate::{Device, SamplerConfig};

    fn test_device() -> Device {
        Device::new(
            &SamplerConfig::default()
                .with_num_threads(2)
                .with_memory_limit(1 << 20),
        )
        .unwrap()
    }

    #[test]
    fn test_plan_layout() {
        let device = test_device();
        let stream = device.stream();
        let rows = slice_indptr(&stream, &[0, 2, 5], None).unwrap();
        let plan = SelectionPlan::build(&stream, rows, &[Fanout::Limit(2)], None, false).unwrap();

        assert_eq!(&*plan.sub_indptr, &[0, 2, 5]);
        assert_eq!(&*plan.row_of, &[0, 0, 1, 1, 1]);
        assert_eq!(&*plan.output_indptr, &[0, 2, 4]);
        assert_eq!(&*plan.output_row_of, &[0, 0, 1, 1]);
        assert_eq!(plan.count(1), 2);
        assert!(!plan.is_take_all());
        assert!(plan.edge_ids.is_none());
    }

    #[test]
    fn test_plan_counts_only_positive_weights() {
        let device = test_device();
        let stream = device.stream();
        let rows = slice_indptr(&stream, &[0, 2, 5], Some(&[1][..])).unwrap();
        let probs = [1.0, 1.0, 0.0, 2.0, 0.0];
        let plan =
            SelectionPlan::build(&stream, rows, &[Fanout::All], Some(&probs[..]), false).unwrap();

        assert_eq!(plan.edge_ids.as_deref(), Some(&[2, 3, 4][..]));
        assert_eq!(plan.weights.as_deref(), Some(&[0.0, 2.0, 0.0][..]));
        assert_eq!(plan.count(0), 1);
        assert_eq!(plan.num_out, 1);
    }

    #[test]
    fn test_plan_take_all() {
        let device = test_device();
        let stream = device.stream();
        let rows = slice_indptr(&stream, &[0, 2, 5], None).unwrap();
        let plan = SelectionPlan::build(&stream, rows, &[Fanout::Limit(3)], None, true).unwrap();

        assert!(plan.is_take_all());
        assert_eq!(plan.edge_ids.as_deref(), Some(&[0, 1, 2, 3, 4][..]));
    }
}
