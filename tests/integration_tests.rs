//! Integration tests for trueno-sampler
//!
//! Tests real-world usage scenarios (minibatch sampling, typed graphs,
//! masked edges, correlated layers)

use std::collections::HashSet;
use tracing_subscriber::EnvFilter;
use trueno_sampler::{
    in_subgraph, sample_neighbors, CscGraph, CscView, Device, Fanout, NodeId, RandomSeed,
    SampleRequest, SampledSubgraph, Sampler, SamplerConfig, SamplingError,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn test_device() -> Device {
    init_tracing();
    Device::new(
        &SamplerConfig::default()
            .with_num_threads(4)
            .with_memory_limit(1 << 26),
    )
    .unwrap()
}

/// 300 rows, each with 40 in-edges from sources spread over 0..2000
fn synthetic_graph() -> CscGraph {
    let edges: Vec<_> = (0..300_u32)
        .flat_map(|dst| (0..40_u32).map(move |j| (NodeId((dst * 7 + j * 53) % 2000), NodeId(dst))))
        .collect();
    CscGraph::from_edge_list(&edges).unwrap()
}

/// Neighbors shared row by row between two samples of the same seeds
fn overlap(a: &SampledSubgraph, b: &SampledSubgraph) -> usize {
    (0..a.num_rows())
        .map(|row| {
            let picked: HashSet<_> = a.neighbors(row).iter().collect();
            b.neighbors(row).iter().filter(|n| picked.contains(n)).count()
        })
        .sum()
}

#[tokio::test]
async fn test_two_row_example() {
    let device = test_device();
    let indptr = [0_u64, 2, 5];
    let indices = [10_u32, 11, 20, 21, 22];
    let graph = CscView::new(&indptr, &indices);
    let request = SampleRequest::new(&[2])
        .unwrap()
        .return_edge_ids(true)
        .random_seed(RandomSeed::Single(3));

    let out = sample_neighbors(&device, graph, None, &request).await.unwrap();

    assert_eq!(out.indptr, vec![0, 2, 4]);
    assert_eq!(out.nodes, vec![0, 1]);
    assert_eq!(out.neighbors(0), &[10, 11]);

    let ids = out.row_edge_ids(1).unwrap();
    assert_eq!(ids.len(), 2);
    for (&id, &n) in ids.iter().zip(out.neighbors(1)) {
        assert!((2..5).contains(&id));
        assert_eq!(indices[id as usize], n);
    }
}

#[tokio::test]
async fn test_in_subgraph_two_rows() {
    let device = test_device();
    let graph = CscGraph::from_typed_edge_list(&[
        (NodeId(1), NodeId(0), 0),
        (NodeId(2), NodeId(0), 1),
        (NodeId(0), NodeId(2), 0),
        (NodeId(3), NodeId(2), 0),
    ])
    .unwrap();

    let out = in_subgraph(&device, graph.view(), &[2, 0]).await.unwrap();

    assert_eq!(out.indptr, vec![0, 2, 4]);
    assert_eq!(out.nodes, vec![2, 0]);
    assert_eq!(out.neighbors(0), &[0, 3]);
    assert_eq!(out.neighbors(1), &[1, 2]);
    assert_eq!(out.edge_ids, Some(vec![2, 3, 0, 1]));
    assert_eq!(out.type_per_edge, Some(vec![0, 0, 0, 1]));
}

#[tokio::test]
async fn test_in_subgraph_ignores_weights() {
    let device = test_device();
    let graph = CscGraph::from_parts(vec![0, 3], vec![4, 5, 6])
        .unwrap()
        .with_probs(vec![0.0, 1.0, 0.0])
        .unwrap();

    let out = in_subgraph(&device, graph.view(), &[0]).await.unwrap();
    assert_eq!(out.neighbors(0), &[4, 5, 6]);
}

#[tokio::test]
async fn test_error_cases() {
    let device = test_device();
    let indptr = [0_u64, 2, 5];
    let indices = [10_u32, 11, 20, 21, 22];
    let graph = CscView::new(&indptr, &indices);

    // Replacement is not implemented
    let request = SampleRequest::new(&[2]).unwrap().replace(true);
    let err = sample_neighbors(&device, graph, None, &request)
        .await
        .unwrap_err();
    assert!(matches!(err, SamplingError::Unsupported(_)));

    // Several fanouts need edge types
    let request = SampleRequest::new(&[2, 2]).unwrap();
    let err = sample_neighbors(&device, graph, None, &request)
        .await
        .unwrap_err();
    assert!(matches!(err, SamplingError::InvalidArgument(_)));

    // Malformed fanouts
    assert!(SampleRequest::new(&[]).is_err());
    assert!(SampleRequest::new(&[-2]).is_err());

    // Shape mismatch
    let short = CscView::new(&indptr, &indices[..4]);
    let request = SampleRequest::new(&[2]).unwrap();
    let err = sample_neighbors(&device, short, None, &request)
        .await
        .unwrap_err();
    assert!(matches!(err, SamplingError::InvalidArgument(_)));

    // Seed contribution outside [0, 1)
    let request = SampleRequest::new(&[2])
        .unwrap()
        .random_seed(RandomSeed::Pair(1, 2))
        .seed2_contribution(1.0);
    let err = sample_neighbors(&device, graph, None, &request)
        .await
        .unwrap_err();
    assert!(matches!(err, SamplingError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_per_type_fanouts() {
    let device = test_device();
    // Row 0: three type-0, two type-1, one type-2 edge
    let graph = CscGraph::from_typed_edge_list(&[
        (NodeId(1), NodeId(0), 0),
        (NodeId(2), NodeId(0), 0),
        (NodeId(3), NodeId(0), 0),
        (NodeId(4), NodeId(0), 1),
        (NodeId(5), NodeId(0), 1),
        (NodeId(6), NodeId(0), 2),
    ])
    .unwrap();
    let request = SampleRequest::with_fanouts(vec![Fanout::Limit(2), Fanout::All])
        .random_seed(RandomSeed::Single(11));

    let out = sample_neighbors(&device, graph.view(), Some(&[0][..]), &request)
        .await
        .unwrap();

    assert_eq!(out.indptr, vec![0, 4]);
    let types = out.type_per_edge.as_deref().unwrap();
    assert_eq!(types, &[0, 0, 1, 1]);
    let neighbors = out.neighbors(0);
    assert!(neighbors[..2].iter().all(|n| [1, 2, 3].contains(n)));
    assert_ne!(neighbors[0], neighbors[1]);
    assert_eq!(&neighbors[2..], &[4, 5]);
}

#[tokio::test]
async fn test_single_fanout_keeps_types_grouped() {
    let device = test_device();
    let edges: Vec<_> = (0..60_u32)
        .map(|j| (NodeId(j + 1), NodeId(0), u8::try_from(j % 4).unwrap()))
        .collect();
    let graph = CscGraph::from_typed_edge_list(&edges).unwrap();

    for seed in 0..10 {
        let request = SampleRequest::new(&[12])
            .unwrap()
            .random_seed(RandomSeed::Single(seed));
        let out = sample_neighbors(&device, graph.view(), Some(&[0][..]), &request)
            .await
            .unwrap();
        let types = out.type_per_edge.unwrap();
        assert_eq!(types.len(), 12);
        assert!(types.windows(2).all(|w| w[0] <= w[1]), "{types:?}");
    }
}

#[tokio::test]
async fn test_mask_excludes_edges() {
    let device = test_device();
    let graph = CscGraph::from_parts(vec![0, 6, 8], vec![1, 2, 3, 4, 5, 6, 7, 8])
        .unwrap()
        .with_probs(vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0])
        .unwrap();

    let request = SampleRequest::new(&[-1]).unwrap();
    let out = sample_neighbors(&device, graph.view(), None, &request)
        .await
        .unwrap();
    assert_eq!(out.indptr, vec![0, 3, 3]);
    let mut row0 = out.neighbors(0).to_vec();
    row0.sort_unstable();
    assert_eq!(row0, vec![1, 3, 5]);

    let request = SampleRequest::new(&[2])
        .unwrap()
        .random_seed(RandomSeed::Single(5));
    let out = sample_neighbors(&device, graph.view(), None, &request)
        .await
        .unwrap();
    assert_eq!(out.degree(0), 2);
    assert!(out.neighbors(0).iter().all(|n| [1, 3, 5].contains(n)));
}

#[tokio::test]
async fn test_same_seed_same_sample() {
    let device = test_device();
    let graph = synthetic_graph();
    let nodes: Vec<u32> = (0..300).step_by(3).collect();

    for layer in [false, true] {
        let request = SampleRequest::new(&[8])
            .unwrap()
            .layer(layer)
            .return_edge_ids(true)
            .random_seed(RandomSeed::Single(2024));
        let first = sample_neighbors(&device, graph.view(), Some(&nodes[..]), &request)
            .await
            .unwrap();
        let second = sample_neighbors(&device, graph.view(), Some(&nodes[..]), &request)
            .await
            .unwrap();
        assert_eq!(first, second);
    }
}

#[tokio::test]
async fn test_labor_overlap_grows_as_contribution_shrinks() {
    let device = test_device();
    let graph = synthetic_graph();

    let sample = |second: u64, r: f32| {
        let request = SampleRequest::new(&[10])
            .unwrap()
            .layer(true)
            .random_seed(RandomSeed::Pair(17, second))
            .seed2_contribution(r);
        let device = &device;
        let graph = graph.view();
        async move { sample_neighbors(device, graph, None, &request).await.unwrap() }
    };

    let base = sample(99, 0.0).await;
    let tiny = sample(99, 0.001).await;
    let near = sample(99, 0.05).await;
    let far = sample(99, 0.95).await;

    let total = base.num_edges();
    let tiny_overlap = overlap(&base, &tiny);
    let near_overlap = overlap(&base, &near);
    let far_overlap = overlap(&base, &far);
    assert!(
        tiny_overlap * 10 > total * 9,
        "overlap {tiny_overlap} of {total} at r=0.001"
    );
    assert!(
        tiny_overlap >= near_overlap && near_overlap > far_overlap,
        "overlap {tiny_overlap} (r=0.001), {near_overlap} (r=0.05), {far_overlap} (r=0.95)"
    );

    // With zero contribution the second component has no effect
    assert_eq!(base, sample(12_345, 0.0).await);
}

#[test]
fn test_sampler_blocking_facade() {
    init_tracing();
    let sampler = Sampler::new(&SamplerConfig::default().with_num_threads(2)).unwrap();
    let graph = synthetic_graph();
    let request = SampleRequest::new(&[5])
        .unwrap()
        .random_seed(RandomSeed::Single(1));

    let out = sampler
        .sample_neighbors_blocking(graph.view(), Some(&[0, 1, 2][..]), &request)
        .unwrap();
    assert_eq!(out.indptr, vec![0, 5, 10, 15]);
    for row in 0..3 {
        let expected = graph.in_neighbors(NodeId(out.nodes[row])).unwrap();
        assert!(out.neighbors(row).iter().all(|n| expected.contains(n)));
    }

    let full = sampler.in_subgraph_blocking(graph.view(), &[7]).unwrap();
    assert_eq!(full.neighbors(0), graph.in_neighbors(NodeId(7)).unwrap());
}

#[tokio::test]
async fn test_wide_rows_use_wider_offsets() {
    let device = test_device();
    // Degree 70_000 needs 32-bit offsets
    let indices: Vec<u32> = (0..70_000).collect();
    let graph = CscGraph::from_parts(vec![0, 70_000], indices).unwrap();
    let request = SampleRequest::new(&[16])
        .unwrap()
        .return_edge_ids(true)
        .random_seed(RandomSeed::Single(8));

    let out = sample_neighbors(&device, graph.view(), None, &request)
        .await
        .unwrap();
    let ids: HashSet<_> = out.edge_ids.as_deref().unwrap().iter().collect();
    assert_eq!(ids.len(), 16);
    assert!(out.edge_ids.unwrap().iter().any(|&id| id > 255));
}
