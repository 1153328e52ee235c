//! Sampled subgraph returned by the pipeline

/// Result of [`sample_neighbors`](crate::sample_neighbors) or
/// [`in_subgraph`](crate::in_subgraph)
///
/// Row `i` corresponds to seed `nodes[i]`; its sampled in-edges are
/// `indptr[i]..indptr[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampledSubgraph {
    /// Output row offsets (length `nodes.len() + 1`)
    pub indptr: Vec<u64>,
    /// Source node of each sampled edge
    pub indices: Vec<u32>,
    /// Seed nodes (original row ids)
    pub nodes: Vec<u32>,
    /// Original edge ids, when requested
    pub edge_ids: Option<Vec<u64>>,
    /// Edge types, when the input graph has them
    pub type_per_edge: Option<Vec<u8>>,
}

impl SampledSubgraph {
    /// Number of seed rows
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.nodes.len()
    }

    /// Number of sampled edges
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.indices.len()
    }

    /// Sampled source nodes of row `i`
    ///
    /// # Panics
    ///
    /// Panics if `i >= num_rows()`
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn neighbors(&self, i: usize) -> &[u32] {
        &self.indices[self.indptr[i] as usize..self.indptr[i + 1] as usize]
    }

    /// Original edge ids of row `i`, when requested
    ///
    /// # Panics
    ///
    /// Panics if `i >= num_rows()`
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn row_edge_ids(&self, i: usize) -> Option<&[u64]> {
        let range = self.indptr[i] as usize..self.indptr[i + 1] as usize;
        self.edge_ids.as_ref().map(|ids| &ids[range])
    }

    /// Sampled edge count of row `i`
    ///
    /// # Panics
    ///
    /// Panics if `i >= num_rows()`
    #[must_use]
    pub fn degree(&self, i: usize) -> u64 {
        self.indptr[i + 1] - self.indptr[i]
    }
}
