//! Sampling entry points
//!
//! One call runs the whole pipeline on a fresh stream of the device:
//!
//! 1. slice the requested rows out of `indptr` (and split them by edge type)
//! 2. reduce the max in-degree and hand it to the host through an event
//! 3. lay out sub-edges and output slots (`SelectionPlan`)
//! 4. await the event, pick the edge-offset width
//! 5. select offsets: take-all, reservoir, or weighted/LABOR top-k
//! 6. reconstruct the subgraph
//!
//! Every stage is a data-parallel launch; the only host wait is step 4.

use super::plan::SelectionPlan;
use super::request::SampleRequest;
use super::reconstruct::{reconstruct, sort_within_rows};
use super::reservoir::{identity_offsets, reservoir_sample};
use super::seed::ContinuousSeed;
use super::slice::{slice_indptr, slice_indptr_by_type};
use super::subgraph::SampledSubgraph;
use super::weighted::weighted_sample;
use super::width::{dispatch_edge_id, EdgeIdWidth, EdgeOffset};
use crate::device::primitives::reduce_max;
use crate::device::{Device, DeviceBuffer, Stream};
use crate::error::{Result, SamplingError};
use crate::storage::CscView;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Sample up to `fanout` in-edges of every seed row
///
/// `nodes` selects the seed rows (all rows when `None`). See
/// [`SampleRequest`] for fanout, weighting and seeding options. The call is
/// atomic: on error no partial subgraph is produced.
///
/// # Errors
///
/// - `Unsupported` if `replace` is requested
/// - `InvalidArgument` for malformed fanouts, shapes or seed nodes
/// - `Capacity` if the edge-offset width cannot hold the max in-degree
/// - `Device` on allocator exhaustion or GPU faults
///
/// # Example
///
/// ```
/// use trueno_sampler::{sample_neighbors, CscView, Device, RandomSeed, SampleRequest, SamplerConfig};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let device = Device::new(&SamplerConfig::default().with_num_threads(2)).unwrap();
/// let indptr = [0_u64, 2, 5];
/// let indices = [10_u32, 11, 20, 21, 22];
/// let graph = CscView::new(&indptr, &indices);
/// let request = SampleRequest::new(&[2]).unwrap().random_seed(RandomSeed::Single(7));
///
/// let sampled = sample_neighbors(&device, graph, None, &request).await.unwrap();
/// assert_eq!(sampled.indptr, vec![0, 2, 4]);
/// assert_eq!(sampled.neighbors(0), &[10, 11]);
/// # });
/// ```
#[instrument(
    skip_all,
    fields(
        rows = graph.num_rows(),
        seeds = nodes.map_or(graph.num_rows(), <[u32]>::len),
        fanouts = request.fanouts().len(),
        layer = request.is_layer(),
    )
)]
pub async fn sample_neighbors(
    device: &Device,
    graph: CscView<'_>,
    nodes: Option<&[u32]>,
    request: &SampleRequest,
) -> Result<SampledSubgraph> {
    request.validate(&graph)?;
    graph.validate_shape()?;

    let stream = device.stream();
    if let Some(nodes) = nodes {
        validate_nodes(&stream, nodes, graph.num_rows())?;
    }

    let rows = slice_indptr(&stream, graph.indptr(), nodes)?;
    let degree: Arc<[u64]> = Arc::from(&rows.degree[..]);
    let max_in_degree =
        stream.launch_recorded("reduce_max", degree.len(), move || reduce_max(&degree));

    let fanouts = request.fanouts();
    let rows = if fanouts.len() > 1 {
        let types = graph.type_per_edge().ok_or_else(|| {
            SamplingError::invalid("per-type fanouts require type_per_edge")
        })?;
        slice_indptr_by_type(&stream, &rows, types, fanouts.len())?
    } else {
        rows
    };

    let plan = SelectionPlan::build(
        &stream,
        rows,
        fanouts,
        graph.probs_or_mask(),
        request.is_layer(),
    )?;

    let max_in_degree = max_in_degree.wait().await?;
    let width = EdgeIdWidth::for_max_degree(max_in_degree).validate(max_in_degree)?;
    debug!(?width, max_in_degree, "edge offset width selected");

    let seed = request.continuous_seed();
    let keep_types_grouped = graph.type_per_edge().is_some() && fanouts.len() == 1;

    dispatch_edge_id!(width, T, {
        let mut picked = select::<T>(&stream, &plan, graph, request, &seed).await?;
        if keep_types_grouped && !plan.is_take_all() {
            sort_within_rows(&stream, &plan, &mut picked)?;
        }
        Ok(reconstruct(
            &stream,
            &plan,
            &picked,
            graph,
            nodes,
            fanouts.len(),
            request.returns_edge_ids(),
        )?)
    })
}

/// Full induced in-adjacency of `nodes`
///
/// Equivalent to [`sample_neighbors`] with a take-all fanout; edge ids are
/// always returned, edge types when the graph has them.
///
/// # Errors
///
/// Same as [`sample_neighbors`]
#[instrument(skip_all, fields(rows = graph.num_rows(), seeds = nodes.len()))]
pub async fn in_subgraph(
    device: &Device,
    graph: CscView<'_>,
    nodes: &[u32],
) -> Result<SampledSubgraph> {
    let graph = match graph.type_per_edge() {
        Some(types) => CscView::new(graph.indptr(), graph.indices()).with_edge_types(types),
        None => CscView::new(graph.indptr(), graph.indices()),
    };
    sample_neighbors(device, graph, Some(nodes), &SampleRequest::take_all()).await
}

async fn select<T: EdgeOffset>(
    stream: &Stream<'_>,
    plan: &SelectionPlan,
    graph: CscView<'_>,
    request: &SampleRequest,
    seed: &ContinuousSeed,
) -> Result<DeviceBuffer<T>> {
    if plan.is_take_all() {
        return Ok(identity_offsets(stream, plan)?);
    }

    if graph.probs_or_mask().is_none() && !request.is_layer() {
        #[cfg(feature = "gpu")]
        {
            if let Some(gpu) = stream.device().gpu() {
                use super::reservoir::reservoir_sample_gpu;
                if let Some(picked) = reservoir_sample_gpu(stream, plan, gpu, seed.seed(0)).await? {
                    return Ok(picked);
                }
                debug!("plan exceeds GPU limits, running reservoir on host");
            }
        }
        return Ok(reservoir_sample(stream, plan, seed.seed(0))?);
    }

    Ok(weighted_sample(
        stream,
        plan,
        graph.indices(),
        seed,
        request.is_layer(),
    )?)
}

fn validate_nodes(stream: &Stream<'_>, nodes: &[u32], num_rows: usize) -> Result<()> {
    let bad = stream.launch("validate_nodes", nodes.len(), || {
        nodes.par_iter().find_any(|&&n| n as usize >= num_rows).copied()
    });
    match bad {
        Some(node) => Err(SamplingError::invalid(format!(
            "seed node {node} out of range for graph with {num_rows} rows"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::seed::RandomSeed;
    use crate::SamplerConfig;

    fn test_device() -> Device {
        Device::new(
            &SamplerConfig::default()
                .with_num_threads(2)
                .with_memory_limit(1 << 24),
        )
        .unwrap()
    }

    const INDPTR: [u64; 3] = [0, 2, 5];
    const INDICES: [u32; 5] = [10, 11, 20, 21, 22];

    #[tokio::test]
    async fn test_basic_example() {
        let device = test_device();
        let graph = CscView::new(&INDPTR, &INDICES);
        let request = SampleRequest::new(&[2])
            .unwrap()
            .random_seed(RandomSeed::Single(42));

        let out = sample_neighbors(&device, graph, None, &request).await.unwrap();

        assert_eq!(out.indptr, vec![0, 2, 4]);
        assert_eq!(out.neighbors(0), &[10, 11]);
        let row1 = out.neighbors(1);
        assert_eq!(row1.len(), 2);
        assert_ne!(row1[0], row1[1]);
        assert!(row1.iter().all(|n| [20, 21, 22].contains(n)));
        assert!(out.edge_ids.is_none());
    }

    #[tokio::test]
    async fn test_rejects_replace_before_work() {
        let device = test_device();
        // Shape is invalid too; the replace check must win
        let graph = CscView::new(&INDPTR, &INDICES[..2]);
        let request = SampleRequest::new(&[2]).unwrap().replace(true);
        let err = sample_neighbors(&device, graph, None, &request)
            .await
            .unwrap_err();
        assert!(matches!(err, SamplingError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_seed() {
        let device = test_device();
        let graph = CscView::new(&INDPTR, &INDICES);
        let request = SampleRequest::new(&[1]).unwrap();
        let err = sample_neighbors(&device, graph, Some(&[0, 2][..]), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, SamplingError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_zero_fanout_and_empty_seeds() {
        let device = test_device();
        let graph = CscView::new(&INDPTR, &INDICES);

        let request = SampleRequest::new(&[0]).unwrap();
        let out = sample_neighbors(&device, graph, None, &request).await.unwrap();
        assert_eq!(out.indptr, vec![0, 0, 0]);
        assert!(out.indices.is_empty());

        let request = SampleRequest::new(&[3]).unwrap();
        let out = sample_neighbors(&device, graph, Some(&[][..]), &request)
            .await
            .unwrap();
        assert_eq!(out.indptr, vec![0]);
        assert!(out.nodes.is_empty());
    }

    #[tokio::test]
    async fn test_in_subgraph_returns_adjacency() {
        let device = test_device();
        let graph = CscView::new(&INDPTR, &INDICES);
        let out = in_subgraph(&device, graph, &[0, 1]).await.unwrap();

        assert_eq!(out.indptr, INDPTR.to_vec());
        assert_eq!(out.indices, INDICES.to_vec());
        assert_eq!(out.edge_ids, Some(vec![0, 1, 2, 3, 4]));
        assert_eq!(out.nodes, vec![0, 1]);
    }
}
