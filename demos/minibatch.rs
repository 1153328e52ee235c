//! Two-layer LABOR minibatch over a synthetic graph
//!
//! Run with: cargo run --example minibatch
//! Set `RUST_LOG=trueno_sampler=debug` to see the pipeline stages.

use std::collections::BTreeSet;
use tracing_subscriber::EnvFilter;
use trueno_sampler::{CscGraph, NodeId, RandomSeed, SampleRequest, Sampler};

/// Every node receives `degree` edges from pseudo-random sources
fn synthetic_graph(num_nodes: u32, degree: u32) -> Result<CscGraph, Box<dyn std::error::Error>> {
    let mut rng_state = 7_u64; // Simple LCG for reproducibility
    let mut edges = Vec::new();
    for dst in 0..num_nodes {
        for _ in 0..degree {
            rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let src = u32::try_from((rng_state >> 33) % u64::from(num_nodes))?;
            edges.push((NodeId(src), NodeId(dst)));
        }
    }
    Ok(CscGraph::from_edge_list(&edges)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("🦀 trueno-sampler minibatch example\n");

    let graph = synthetic_graph(50_000, 25)?;
    println!(
        "📊 Graph: {} nodes, {} edges, max in-degree {}\n",
        graph.num_nodes(),
        graph.num_edges(),
        graph.max_in_degree()
    );

    let sampler = Sampler::from_env()?;
    let batch: Vec<u32> = (0..256).map(|i| i * 191).collect();

    // Both layers share seed 11 and blend in seed 29, so sources drawn by
    // the first layer are likely to be drawn again by the second.
    let mut frontier = batch;
    for (layer, fanout) in [10_i64, 5].into_iter().enumerate() {
        let request = SampleRequest::new(&[fanout])?
            .layer(true)
            .return_edge_ids(true)
            .random_seed(RandomSeed::Pair(11, 29))
            .seed2_contribution(0.1);

        let sampled = sampler
            .sample_neighbors(graph.view(), Some(&frontier[..]), &request)
            .await?;

        let sources: BTreeSet<u32> = sampled.indices.iter().copied().collect();
        println!(
            "  layer {layer}: {} seeds → {} edges, {} unique sources",
            sampled.num_rows(),
            sampled.num_edges(),
            sources.len()
        );

        frontier = sources.into_iter().collect();
    }

    println!("\n🔍 Full in-adjacency of node 0:");
    let full = sampler.in_subgraph(graph.view(), &[0]).await?;
    println!("  sources: {:?}", full.neighbors(0));
    println!("  edge ids: {:?}", full.row_edge_ids(0).unwrap_or_default());

    Ok(())
}
