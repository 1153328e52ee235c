//! Sampling request and fanout semantics

use super::seed::{ContinuousSeed, RandomSeed};
use crate::error::{Result, SamplingError};
use crate::storage::CscView;

/// Per-row (or per-row-and-type) edge cap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fanout {
    /// Keep every eligible edge (`-1`)
    All,
    /// Keep at most this many edges
    Limit(u64),
}

impl Fanout {
    /// Number of edges kept out of `degree` eligible ones
    #[must_use]
    pub fn cap(self, degree: u64) -> u64 {
        match self {
            Self::All => degree,
            Self::Limit(k) => degree.min(k),
        }
    }
}

impl TryFrom<i64> for Fanout {
    type Error = SamplingError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            -1 => Ok(Self::All),
            v if v >= 0 => Ok(Self::Limit(v.unsigned_abs())),
            v => Err(SamplingError::invalid(format!(
                "fanout must be >= 0 or -1, got {v}"
            ))),
        }
    }
}

/// Parameters of one `sample_neighbors` call
///
/// # Example
///
/// ```
/// use trueno_sampler::{RandomSeed, SampleRequest};
///
/// let request = SampleRequest::new(&[10, -1])
///     .unwrap()
///     .layer(true)
///     .random_seed(RandomSeed::Pair(1, 2))
///     .seed2_contribution(0.25);
/// assert_eq!(request.fanouts().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRequest {
    fanouts: Vec<Fanout>,
    replace: bool,
    layer: bool,
    return_edge_ids: bool,
    random_seed: Option<RandomSeed>,
    seed2_contribution: f32,
}

impl SampleRequest {
    /// Request with integer fanouts (`-1` = take all)
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the list is empty or a value is below `-1`
    pub fn new(fanouts: &[i64]) -> Result<Self> {
        let fanouts = fanouts
            .iter()
            .map(|&f| Fanout::try_from(f))
            .collect::<Result<Vec<_>>>()?;
        if fanouts.is_empty() {
            return Err(SamplingError::invalid("fanouts must not be empty"));
        }
        Ok(Self::with_fanouts(fanouts))
    }

    /// Request with typed fanouts
    #[must_use]
    pub fn with_fanouts(fanouts: Vec<Fanout>) -> Self {
        Self {
            fanouts,
            replace: false,
            layer: false,
            return_edge_ids: false,
            random_seed: None,
            seed2_contribution: 0.0,
        }
    }

    /// Take-all request used by `in_subgraph`
    pub(crate) fn take_all() -> Self {
        Self::with_fanouts(vec![Fanout::All])
            .return_edge_ids(true)
            .random_seed(RandomSeed::Single(0))
    }

    /// Sample with replacement (unsupported; rejected at call time)
    #[must_use]
    pub const fn replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// LABOR keying by source node id
    #[must_use]
    pub const fn layer(mut self, layer: bool) -> Self {
        self.layer = layer;
        self
    }

    /// Return original edge ids
    #[must_use]
    pub const fn return_edge_ids(mut self, return_edge_ids: bool) -> Self {
        self.return_edge_ids = return_edge_ids;
        self
    }

    /// Explicit seed (otherwise drawn per call)
    #[must_use]
    pub const fn random_seed(mut self, seed: RandomSeed) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Contribution of the second seed component, in `[0, 1)`
    #[must_use]
    pub const fn seed2_contribution(mut self, contribution: f32) -> Self {
        self.seed2_contribution = contribution;
        self
    }

    /// Fanouts
    #[must_use]
    pub fn fanouts(&self) -> &[Fanout] {
        &self.fanouts
    }

    /// LABOR mode
    #[must_use]
    pub const fn is_layer(&self) -> bool {
        self.layer
    }

    /// Whether edge ids are returned
    #[must_use]
    pub const fn returns_edge_ids(&self) -> bool {
        self.return_edge_ids
    }

    pub(crate) fn continuous_seed(&self) -> ContinuousSeed {
        ContinuousSeed::resolve(self.random_seed, self.seed2_contribution)
    }

    /// Call-time validation; runs before any device work
    pub(crate) fn validate(&self, graph: &CscView<'_>) -> Result<()> {
        if self.replace {
            return Err(SamplingError::Unsupported(
                "sampling with replacement is not implemented".to_string(),
            ));
        }
        if self.fanouts.is_empty() {
            return Err(SamplingError::invalid("fanouts must not be empty"));
        }
        if self.fanouts.len() > 1 && graph.type_per_edge().is_none() {
            return Err(SamplingError::invalid(format!(
                "{} per-type fanouts given but type_per_edge is missing",
                self.fanouts.len()
            )));
        }
        if self.fanouts.len() > usize::from(u8::MAX) + 1 {
            return Err(SamplingError::invalid(format!(
                "at most 256 edge types are supported, got {} fanouts",
                self.fanouts.len()
            )));
        }
        if !(0.0..1.0).contains(&self.seed2_contribution) {
            return Err(SamplingError::invalid(format!(
                "seed2_contribution must be in [0, 1), got {}",
                self.seed2_contribution
            )));
        }
        Ok(())
    }
}
