//! CSC (Compressed Sparse Column) graph representation
//!
//! Rows are destination nodes; each row lists its incoming edges.
//!
//! # CSC Format
//!
//! ```text
//! Graph: 10 → 0, 11 → 0, 20 → 1, 21 → 1, 22 → 1
//!
//! CSC:
//!   indptr:  [0, 2, 5]            // Node 0: edges [0..2), Node 1: [2..5)
//!   indices: [10, 11, 20, 21, 22] // Source node of each edge
//! ```
//!
//! Optional per-edge arrays (`type_per_edge`, `probs_or_mask`) are aligned
//! with `indices`. When edge types are present, edges of a row are grouped by
//! ascending type.

use crate::error::SamplingError;
use anyhow::{anyhow, ensure, Result};

/// Node identifier (zero-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Borrowed CSC arrays handed to the sampler
///
/// The sampler trusts the structure (monotone `indptr`, in-range `indices`)
/// and only checks that the array lengths agree.
#[derive(Debug, Clone, Copy)]
pub struct CscView<'a> {
    indptr: &'a [u64],
    indices: &'a [u32],
    type_per_edge: Option<&'a [u8]>,
    probs_or_mask: Option<&'a [f32]>,
}

impl<'a> CscView<'a> {
    /// View over `indptr` and `indices`
    #[must_use]
    pub const fn new(indptr: &'a [u64], indices: &'a [u32]) -> Self {
        Self {
            indptr,
            indices,
            type_per_edge: None,
            probs_or_mask: None,
        }
    }

    /// Attach per-edge types
    #[must_use]
    pub const fn with_edge_types(mut self, type_per_edge: &'a [u8]) -> Self {
        self.type_per_edge = Some(type_per_edge);
        self
    }

    /// Attach per-edge weights (zero excludes the edge)
    #[must_use]
    pub const fn with_probs(mut self, probs_or_mask: &'a [f32]) -> Self {
        self.probs_or_mask = Some(probs_or_mask);
        self
    }

    /// Row offsets (length `num_rows + 1`)
    #[must_use]
    pub const fn indptr(&self) -> &'a [u64] {
        self.indptr
    }

    /// Source node per edge
    #[must_use]
    pub const fn indices(&self) -> &'a [u32] {
        self.indices
    }

    /// Edge types, if any
    #[must_use]
    pub const fn type_per_edge(&self) -> Option<&'a [u8]> {
        self.type_per_edge
    }

    /// Edge weights, if any
    #[must_use]
    pub const fn probs_or_mask(&self) -> Option<&'a [f32]> {
        self.probs_or_mask
    }

    /// Number of rows (destination nodes)
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.indptr.len().saturating_sub(1)
    }

    /// Number of edges
    #[must_use]
    pub const fn num_edges(&self) -> usize {
        self.indices.len()
    }

    /// O(1) shape checks
    pub(crate) fn validate_shape(&self) -> Result<(), SamplingError> {
        let Some(&last) = self.indptr.last() else {
            return Err(SamplingError::invalid("indptr must have at least one element"));
        };
        check_row_count(self.num_rows())?;
        if last != self.indices.len() as u64 {
            return Err(SamplingError::invalid(format!(
                "indptr ends at {last} but indices has {} elements",
                self.indices.len()
            )));
        }
        if let Some(types) = self.type_per_edge {
            if types.len() != self.indices.len() {
                return Err(SamplingError::invalid(format!(
                    "type_per_edge has {} elements, expected {}",
                    types.len(),
                    self.indices.len()
                )));
            }
        }
        if let Some(probs) = self.probs_or_mask {
            if probs.len() != self.indices.len() {
                return Err(SamplingError::invalid(format!(
                    "probs_or_mask has {} elements, expected {}",
                    probs.len(),
                    self.indices.len()
                )));
            }
        }
        Ok(())
    }
}

/// Row ids are `u32`: at most `u32::MAX + 1` rows are addressable
fn check_row_count(num_rows: usize) -> Result<(), SamplingError> {
    if num_rows as u64 > u64::from(u32::MAX) + 1 {
        return Err(SamplingError::invalid(format!(
            "graph has {num_rows} rows; node ids must fit in u32"
        )));
    }
    Ok(())
}

/// Owned CSC graph
///
/// Builds the arrays a sampler consumes from edge lists.
///
/// # Example
///
/// ```
/// use trueno_sampler::{CscGraph, NodeId};
///
/// let graph = CscGraph::from_edge_list(&[
///     (NodeId(1), NodeId(0)),
///     (NodeId(2), NodeId(0)),
/// ])
/// .unwrap();
///
/// assert_eq!(graph.in_neighbors(NodeId(0)).unwrap(), &[1, 2]);
/// assert_eq!(graph.in_degree(NodeId(1)).unwrap(), 0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CscGraph {
    indptr: Vec<u64>,
    indices: Vec<u32>,
    type_per_edge: Option<Vec<u8>>,
    probs_or_mask: Option<Vec<f32>>,
}

impl CscGraph {
    /// Create new empty graph
    #[must_use]
    pub fn new() -> Self {
        Self {
            indptr: vec![0],
            indices: Vec::new(),
            type_per_edge: None,
            probs_or_mask: None,
        }
    }

    /// Create graph from `(source, destination)` pairs
    ///
    /// Edges of a row keep their input order.
    ///
    /// # Errors
    ///
    /// Returns error if the node count overflows `u32`
    pub fn from_edge_list(edges: &[(NodeId, NodeId)]) -> Result<Self> {
        let typed: Vec<(NodeId, NodeId, u8)> =
            edges.iter().map(|&(src, dst)| (src, dst, 0)).collect();
        let mut graph = Self::from_typed_edge_list(&typed)?;
        graph.type_per_edge = None;
        Ok(graph)
    }

    /// Create graph from `(source, destination, edge type)` triples
    ///
    /// Edges of a row are grouped by ascending type, keeping input order
    /// within a type.
    ///
    /// # Errors
    ///
    /// Returns error if the node count overflows `u32`
    pub fn from_typed_edge_list(edges: &[(NodeId, NodeId, u8)]) -> Result<Self> {
        if edges.is_empty() {
            return Ok(Self::new());
        }

        let max_node = edges
            .iter()
            .flat_map(|(src, dst, _)| [src.0, dst.0])
            .max()
            .ok_or_else(|| anyhow!("Empty edge list"))?;
        let num_nodes = usize::try_from(max_node)? + 1;
        ensure!(
            u32::try_from(num_nodes).is_ok(),
            "Graphs with more than u32::MAX nodes are not supported"
        );

        let mut sorted: Vec<&(NodeId, NodeId, u8)> = edges.iter().collect();
        sorted.sort_by_key(|(_, dst, ty)| (dst.0, *ty));

        let mut indptr = vec![0_u64; num_nodes + 1];
        for (_, dst, _) in &sorted {
            indptr[dst.0 as usize + 1] += 1;
        }
        for i in 0..num_nodes {
            indptr[i + 1] += indptr[i];
        }

        let indices = sorted.iter().map(|(src, _, _)| src.0).collect();
        let type_per_edge = sorted.iter().map(|(_, _, ty)| *ty).collect();

        Ok(Self {
            indptr,
            indices,
            type_per_edge: Some(type_per_edge),
            probs_or_mask: None,
        })
    }

    /// Create graph from raw CSC arrays
    ///
    /// # Errors
    ///
    /// Returns error if `indptr` is empty, does not start at zero, decreases,
    /// or does not end at `indices.len()`
    pub fn from_parts(indptr: Vec<u64>, indices: Vec<u32>) -> Result<Self> {
        ensure!(!indptr.is_empty(), "indptr must have at least one element");
        ensure!(indptr[0] == 0, "indptr must start at 0");
        ensure!(
            indptr.windows(2).all(|w| w[0] <= w[1]),
            "indptr must be non-decreasing"
        );
        ensure!(
            indptr[indptr.len() - 1] == indices.len() as u64,
            "indptr must end at indices.len() = {}",
            indices.len()
        );

        Ok(Self {
            indptr,
            indices,
            type_per_edge: None,
            probs_or_mask: None,
        })
    }

    /// Attach per-edge types
    ///
    /// # Errors
    ///
    /// Returns error if the length mismatches or a row is not grouped by
    /// ascending type
    pub fn with_edge_types(mut self, type_per_edge: Vec<u8>) -> Result<Self> {
        ensure!(
            type_per_edge.len() == self.indices.len(),
            "type_per_edge has {} elements, expected {}",
            type_per_edge.len(),
            self.indices.len()
        );
        for (row, w) in self.indptr.windows(2).enumerate() {
            let types = &type_per_edge[w[0] as usize..w[1] as usize];
            ensure!(
                types.windows(2).all(|t| t[0] <= t[1]),
                "edge types of row {row} are not sorted"
            );
        }
        self.type_per_edge = Some(type_per_edge);
        Ok(self)
    }

    /// Attach per-edge weights
    ///
    /// # Errors
    ///
    /// Returns error if the length mismatches or a weight is negative or NaN
    pub fn with_probs(mut self, probs_or_mask: Vec<f32>) -> Result<Self> {
        ensure!(
            probs_or_mask.len() == self.indices.len(),
            "probs_or_mask has {} elements, expected {}",
            probs_or_mask.len(),
            self.indices.len()
        );
        ensure!(
            probs_or_mask.iter().all(|&p| p >= 0.0),
            "probs_or_mask must be non-negative"
        );
        self.probs_or_mask = Some(probs_or_mask);
        Ok(self)
    }

    /// Borrow the arrays for sampling
    #[must_use]
    pub fn view(&self) -> CscView<'_> {
        CscView {
            indptr: &self.indptr,
            indices: &self.indices,
            type_per_edge: self.type_per_edge.as_deref(),
            probs_or_mask: self.probs_or_mask.as_deref(),
        }
    }

    /// Get incoming neighbors (sources) of a node
    ///
    /// # Errors
    ///
    /// Returns error if node ID is out of bounds
    pub fn in_neighbors(&self, node: NodeId) -> Result<&[u32]> {
        let (start, end) = self.row_range(node)?;
        Ok(&self.indices[start..end])
    }

    /// Get in-degree of a node
    ///
    /// # Errors
    ///
    /// Returns error if node ID is out of bounds
    pub fn in_degree(&self, node: NodeId) -> Result<u64> {
        let (start, end) = self.row_range(node)?;
        Ok((end - start) as u64)
    }

    fn row_range(&self, node: NodeId) -> Result<(usize, usize)> {
        let idx = node.0 as usize;
        if idx >= self.num_nodes() {
            return Err(anyhow!("Node ID {} out of bounds", node.0));
        }
        Ok((self.indptr[idx] as usize, self.indptr[idx + 1] as usize))
    }

    /// Largest in-degree over all rows
    #[must_use]
    pub fn max_in_degree(&self) -> u64 {
        self.indptr.windows(2).map(|w| w[1] - w[0]).max().unwrap_or(0)
    }

    /// Get number of nodes (rows)
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.indptr.len() - 1
    }

    /// Get number of edges
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.indices.len()
    }

    /// Get CSC components (`indptr`, `indices`)
    #[must_use]
    pub fn csc_components(&self) -> (&[u64], &[u32]) {
        (&self.indptr, &self.indices)
    }
}

impl Default for CscGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_graph() {
        let graph = CscGraph::new();
        assert_eq!(graph.num_nodes(), 0);
        assert_eq!(graph.num_edges(), 0);
        assert_eq!(graph.max_in_degree(), 0);
    }

    #[test]
    fn test_from_edge_list_groups_by_destination() {
        let edges = vec![
            (NodeId(0), NodeId(1)),
            (NodeId(2), NodeId(0)),
            (NodeId(1), NodeId(2)),
            (NodeId(0), NodeId(2)),
        ];

        let graph = CscGraph::from_edge_list(&edges).unwrap();

        let (indptr, indices) = graph.csc_components();
        assert_eq!(indptr, &[0, 1, 2, 4]);
        assert_eq!(indices, &[2, 0, 1, 0]);
        assert!(graph.view().type_per_edge().is_none());
    }

    #[test]
    fn test_typed_edge_list_sorted_by_type() {
        let edges = vec![
            (NodeId(5), NodeId(0), 1),
            (NodeId(6), NodeId(0), 0),
            (NodeId(7), NodeId(0), 1),
            (NodeId(8), NodeId(0), 0),
        ];

        let graph = CscGraph::from_typed_edge_list(&edges).unwrap();
        let view = graph.view();

        assert_eq!(view.indices(), &[6, 8, 5, 7]);
        assert_eq!(view.type_per_edge().unwrap(), &[0, 0, 1, 1]);
    }

    #[test]
    fn test_in_neighbors() {
        let edges = vec![(NodeId(3), NodeId(1)), (NodeId(0), NodeId(1))];
        let graph = CscGraph::from_edge_list(&edges).unwrap();

        assert_eq!(graph.in_neighbors(NodeId(1)).unwrap(), &[3, 0]);
        let empty: &[u32] = &[];
        assert_eq!(graph.in_neighbors(NodeId(0)).unwrap(), empty);
        assert!(graph.in_neighbors(NodeId(9)).is_err());
        assert_eq!(graph.max_in_degree(), 2);
    }

    #[test]
    fn test_from_parts_validation() {
        assert!(CscGraph::from_parts(vec![0, 2, 5], vec![10, 11, 20, 21, 22]).is_ok());
        assert!(CscGraph::from_parts(vec![], vec![]).is_err());
        assert!(CscGraph::from_parts(vec![1, 2], vec![0]).is_err());
        assert!(CscGraph::from_parts(vec![0, 3, 2], vec![0, 0]).is_err());
        assert!(CscGraph::from_parts(vec![0, 2], vec![0]).is_err());
    }

    #[test]
    fn test_with_edge_types_rejects_unsorted_rows() {
        let graph = CscGraph::from_parts(vec![0, 2], vec![1, 2]).unwrap();
        assert!(graph.clone().with_edge_types(vec![1, 0]).is_err());
        assert!(graph.clone().with_edge_types(vec![0]).is_err());
        assert!(graph.with_edge_types(vec![0, 1]).is_ok());
    }

    #[test]
    fn test_with_probs_validation() {
        let graph = CscGraph::from_parts(vec![0, 2], vec![1, 2]).unwrap();
        assert!(graph.clone().with_probs(vec![1.0, -0.5]).is_err());
        assert!(graph.clone().with_probs(vec![f32::NAN, 1.0]).is_err());
        assert!(graph.with_probs(vec![0.0, 2.0]).is_ok());
    }

    #[test]
    fn test_view_shape_checks() {
        let indptr = [0_u64, 2];
        let indices = [1_u32, 2];
        assert!(CscView::new(&indptr, &indices).validate_shape().is_ok());
        assert!(CscView::new(&indptr, &indices[..1]).validate_shape().is_err());
        assert!(CscView::new(&[], &[]).validate_shape().is_err());
        assert!(CscView::new(&indptr, &indices)
            .with_probs(&[1.0])
            .validate_shape()
            .is_err());
        assert!(CscView::new(&indptr, &indices)
            .with_edge_types(&[0, 0, 0])
            .validate_shape()
            .is_err());
    }

    #[test]
    fn test_row_count_must_fit_node_ids() {
        let max_rows = u32::MAX as usize + 1;
        assert!(check_row_count(0).is_ok());
        assert!(check_row_count(max_rows).is_ok());
        let err = check_row_count(max_rows + 1).unwrap_err();
        assert!(matches!(err, SamplingError::InvalidArgument(_)));
    }
}
