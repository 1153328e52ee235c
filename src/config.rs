//! Sampler configuration
//!
//! Settings are plain fields with builder setters; `from_env` overlays
//! `TRUENO_SAMPLER_*` environment variables on the defaults.

use crate::error::{Result, SamplingError};
use std::str::FromStr;

/// Environment variable: worker threads of the host-multicore device
pub const ENV_THREADS: &str = "TRUENO_SAMPLER_THREADS";

/// Environment variable: byte budget of the call-scoped allocator
pub const ENV_MEMORY_LIMIT: &str = "TRUENO_SAMPLER_MEMORY_LIMIT";

/// Environment variable: keep freed buffers for reuse within a call (`0`/`1`)
pub const ENV_CACHE: &str = "TRUENO_SAMPLER_CACHE";

/// Configuration for a [`Device`](crate::device::Device)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Number of worker threads (`None` = one per logical core)
    pub num_threads: Option<usize>,

    /// Allocator budget in bytes (`None` = detect from system memory)
    pub memory_limit_bytes: Option<u64>,

    /// Reuse freed buffers of matching type and size within a call
    pub cache_allocations: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            memory_limit_bytes: None,
            cache_allocations: true,
        }
    }
}

impl SamplerConfig {
    /// Default configuration overlaid with `TRUENO_SAMPLER_*` variables
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if a variable is set but cannot be parsed
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_THREADS) {
            let threads: usize = parse_var(ENV_THREADS, &raw)?;
            if threads == 0 {
                return Err(SamplingError::invalid(format!(
                    "{ENV_THREADS} must be at least 1"
                )));
            }
            config.num_threads = Some(threads);
        }

        if let Some(raw) = lookup(ENV_MEMORY_LIMIT) {
            config.memory_limit_bytes = Some(parse_var(ENV_MEMORY_LIMIT, &raw)?);
        }

        if let Some(raw) = lookup(ENV_CACHE) {
            config.cache_allocations = match raw.trim() {
                "1" | "true" => true,
                "0" | "false" => false,
                other => {
                    return Err(SamplingError::invalid(format!(
                        "{ENV_CACHE} must be 0 or 1, got {other:?}"
                    )))
                }
            };
        }

        Ok(config)
    }

    /// Set the number of worker threads
    #[must_use]
    pub const fn with_num_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    /// Set the allocator budget in bytes
    #[must_use]
    pub const fn with_memory_limit(mut self, bytes: u64) -> Self {
        self.memory_limit_bytes = Some(bytes);
        self
    }

    /// Enable or disable buffer reuse within a call
    #[must_use]
    pub const fn with_cache_allocations(mut self, enabled: bool) -> Self {
        self.cache_allocations = enabled;
        self
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| SamplingError::invalid(format!("{key}: cannot parse {raw:?}")))
}
