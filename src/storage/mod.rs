//! Graph storage layer
//!
//! Provides the CSC (Compressed Sparse Column) arrays the sampler consumes.

pub mod csc;

pub use csc::{CscGraph, CscView, NodeId};
