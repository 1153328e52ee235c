//! Neighbor sampling pipeline
//!
//! # Architecture
//!
//! - `slice`: per-row degree and start offset, per-type virtual rows
//! - `plan`: sub-edge / output layout shared by all later stages
//! - `reservoir`: unweighted sampling via atomic slot arbitration
//! - `weighted`: exponential-key weighted and LABOR sampling, segmented top-k
//! - `reconstruct`: edge ids, gathers, per-type row collapse
//! - `width`: edge-offset width selection and monomorphized dispatch
//! - `seed`: counter-based randomness and the continuous seed
//! - `pipeline`: the `sample_neighbors` and `in_subgraph` entry points

mod pipeline;
mod plan;
mod reconstruct;
mod request;
mod reservoir;
mod sampler;
pub mod seed;
mod slice;
mod subgraph;
mod weighted;
pub mod width;

pub use pipeline::{in_subgraph, sample_neighbors};
pub use request::{Fanout, SampleRequest};
pub use sampler::Sampler;
pub use seed::{ContinuousSeed, RandomSeed};
pub use subgraph::SampledSubgraph;
pub use weighted::edge_key;
pub use width::{EdgeIdWidth, EdgeOffset};
