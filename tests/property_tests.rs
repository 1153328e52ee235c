//! Property-based tests for trueno-sampler
//!
//! Verifies sampling invariants hold for arbitrary graphs, fanouts and seeds

use proptest::prelude::*;
use std::collections::HashSet;
use trueno_sampler::{
    sample_neighbors, CscGraph, Device, Fanout, NodeId, RandomSeed, SampleRequest,
    SampledSubgraph, SamplerConfig,
};

fn run(graph: &CscGraph, nodes: Option<&[u32]>, request: &SampleRequest) -> SampledSubgraph {
    let device = Device::new(
        &SamplerConfig::default()
            .with_num_threads(2)
            .with_memory_limit(1 << 24),
    )
    .unwrap();
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(sample_neighbors(&device, graph.view(), nodes, request))
        .unwrap()
}

/// Strategy: edge list with `(source, destination)` pairs
fn prop_edge_list(
    num_edges: impl Strategy<Value = usize>,
    max_node: u32,
) -> impl Strategy<Value = Vec<(NodeId, NodeId)>> {
    num_edges.prop_flat_map(move |n| {
        prop::collection::vec((0..max_node, 0..max_node), n).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(src, dst)| (NodeId(src), NodeId(dst)))
                .collect()
        })
    })
}

/// Strategy: fanout, `-1` included
fn prop_fanout() -> impl Strategy<Value = i64> {
    prop_oneof![Just(-1_i64), 0_i64..8]
}

// Property: each row keeps min(eligible, fanout) distinct edges of its own
proptest! {
    #[test]
    fn prop_counts_and_membership(
        edges in prop_edge_list(1usize..200usize, 30u32),
        fanout in prop_fanout(),
        seed in any::<u64>(),
        layer in any::<bool>(),
    ) {
        let graph = CscGraph::from_edge_list(&edges).unwrap();
        let request = SampleRequest::new(&[fanout])
            .unwrap()
            .layer(layer)
            .return_edge_ids(true)
            .random_seed(RandomSeed::Single(seed));
        let out = run(&graph, None, &request);
        let (indptr, indices) = graph.csc_components();
        let fanout = Fanout::try_from(fanout).unwrap();

        prop_assert_eq!(out.num_rows(), graph.num_nodes());
        prop_assert_eq!(*out.indptr.last().unwrap() as usize, out.indices.len());

        for row in 0..out.num_rows() {
            let degree = indptr[row + 1] - indptr[row];
            prop_assert_eq!(out.degree(row), fanout.cap(degree));

            let ids = out.row_edge_ids(row).unwrap();
            let unique: HashSet<_> = ids.iter().collect();
            prop_assert_eq!(unique.len(), ids.len());

            for (&id, &neighbor) in ids.iter().zip(out.neighbors(row)) {
                prop_assert!((indptr[row]..indptr[row + 1]).contains(&id));
                prop_assert_eq!(indices[id as usize], neighbor);
            }
        }
    }
}

// Property: zero-weight edges are never sampled
proptest! {
    #[test]
    fn prop_zero_weights_never_picked(
        edges in prop_edge_list(1usize..150usize, 20u32),
        weights in prop::collection::vec(prop_oneof![Just(0.0_f32), 0.01_f32..10.0], 150),
        fanout in 1_i64..6,
        seed in any::<u64>(),
    ) {
        let graph = CscGraph::from_edge_list(&edges).unwrap();
        let probs = weights[..graph.num_edges()].to_vec();
        let graph = graph.with_probs(probs.clone()).unwrap();
        let request = SampleRequest::new(&[fanout])
            .unwrap()
            .return_edge_ids(true)
            .random_seed(RandomSeed::Single(seed));
        let out = run(&graph, None, &request);
        let (indptr, _) = graph.csc_components();

        for row in 0..out.num_rows() {
            let eligible = probs[indptr[row] as usize..indptr[row + 1] as usize]
                .iter()
                .filter(|&&w| w > 0.0)
                .count() as u64;
            prop_assert_eq!(out.degree(row), eligible.min(fanout.unsigned_abs()));
            for &id in out.row_edge_ids(row).unwrap() {
                prop_assert!(probs[id as usize] > 0.0);
            }
        }
    }
}

// Property: seed rows may repeat and come in any order
proptest! {
    #[test]
    fn prop_seed_subset_matches_rows(
        edges in prop_edge_list(1usize..120usize, 25u32),
        picks in prop::collection::vec(0usize..1000, 0..20),
        seed in any::<u64>(),
    ) {
        let graph = CscGraph::from_edge_list(&edges).unwrap();
        let nodes: Vec<u32> = picks
            .iter()
            .map(|&p| u32::try_from(p % graph.num_nodes()).unwrap())
            .collect();
        let request = SampleRequest::new(&[3])
            .unwrap()
            .random_seed(RandomSeed::Single(seed));
        let out = run(&graph, Some(&nodes[..]), &request);

        prop_assert_eq!(&out.nodes, &nodes);
        for (row, &node) in nodes.iter().enumerate() {
            let expected = graph.in_neighbors(NodeId(node)).unwrap();
            prop_assert_eq!(out.degree(row), Fanout::Limit(3).cap(expected.len() as u64));
            for neighbor in out.neighbors(row) {
                prop_assert!(expected.contains(neighbor));
            }
        }
    }
}

/// Strategy: typed edge list with up to four edge types
fn prop_typed_edge_list(
    num_edges: impl Strategy<Value = usize>,
    max_node: u32,
) -> impl Strategy<Value = Vec<(NodeId, NodeId, u8)>> {
    num_edges.prop_flat_map(move |n| {
        prop::collection::vec((0..max_node, 0..max_node, 0_u8..4), n).prop_map(|triples| {
            triples
                .into_iter()
                .map(|(src, dst, ty)| (NodeId(src), NodeId(dst), ty))
                .collect()
        })
    })
}

// Property: per-type fanouts cap each type's eligible edges separately
proptest! {
    #[test]
    fn prop_per_type_counts_and_membership(
        edges in prop_typed_edge_list(1usize..160usize, 16u32),
        fanouts in prop::collection::vec(prop_fanout(), 1..5),
        weights in prop::option::of(prop::collection::vec(
            prop_oneof![Just(0.0_f32), 0.01_f32..10.0],
            160,
        )),
        seed in any::<u64>(),
        layer in any::<bool>(),
    ) {
        let mut graph = CscGraph::from_typed_edge_list(&edges).unwrap();
        if let Some(weights) = &weights {
            let num_edges = graph.num_edges();
            graph = graph.with_probs(weights[..num_edges].to_vec()).unwrap();
        }
        let fanouts: Vec<Fanout> = fanouts
            .into_iter()
            .map(|f| Fanout::try_from(f).unwrap())
            .collect();
        let request = SampleRequest::with_fanouts(fanouts.clone())
            .layer(layer)
            .return_edge_ids(true)
            .random_seed(RandomSeed::Single(seed));
        let out = run(&graph, None, &request);

        let view = graph.view();
        let (indptr, indices) = graph.csc_components();
        let types = view.type_per_edge().unwrap();
        let eligible = |e: usize| view.probs_or_mask().map_or(true, |p| p[e] > 0.0);

        prop_assert_eq!(out.num_rows(), graph.num_nodes());
        let out_types = out.type_per_edge.as_deref().unwrap();

        for row in 0..out.num_rows() {
            let row_edges = indptr[row] as usize..indptr[row + 1] as usize;
            let expected: u64 = if fanouts.len() == 1 {
                let count = row_edges.clone().filter(|&e| eligible(e)).count() as u64;
                fanouts[0].cap(count)
            } else {
                fanouts
                    .iter()
                    .enumerate()
                    .map(|(ty, fanout)| {
                        let count = row_edges
                            .clone()
                            .filter(|&e| usize::from(types[e]) == ty && eligible(e))
                            .count() as u64;
                        fanout.cap(count)
                    })
                    .sum()
            };
            prop_assert_eq!(out.degree(row), expected);

            let ids = out.row_edge_ids(row).unwrap();
            let unique: HashSet<_> = ids.iter().collect();
            prop_assert_eq!(unique.len(), ids.len());

            let start = out.indptr[row] as usize;
            let row_types = &out_types[start..start + ids.len()];
            prop_assert!(row_types.windows(2).all(|w| w[0] <= w[1]));

            for ((&id, &neighbor), &ty) in ids.iter().zip(out.neighbors(row)).zip(row_types) {
                prop_assert!(row_edges.contains(&(id as usize)));
                prop_assert!(eligible(id as usize));
                prop_assert_eq!(indices[id as usize], neighbor);
                prop_assert_eq!(types[id as usize], ty);
            }
        }
    }
}
