//! # Engine Configuration
//!
//! Tunables for a [`crate::ProofEngine`]. Defaults are production-shaped;
//! override via explicit construction or environment variables. Nothing in
//! here is read from global state after engine construction.

use std::time::Duration;

/// Configuration for a proof engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base location for circuit artifacts. Built-in descriptors lay their
    /// artifacts out under `<base>/<circuit_id>/`.
    pub artifact_base: String,
    /// How long a cached proof stays servable.
    pub cache_ttl: Duration,
    /// Interval between periodic cache and witness-pool sweeps.
    pub sweep_interval: Duration,
    /// Precomputed witnesses retained per (circuit, credential) pair.
    /// Excess offers are dropped, not queued.
    pub precompute_pool_size: usize,
    /// How long a precomputed witness stays claimable.
    pub precompute_retention: Duration,
    /// Concurrent proof generations a parallel batch may run at once.
    pub max_concurrent_ops: usize,
    /// Most proof requests per batch chunk.
    pub max_batch_size: usize,
    /// Artifact fetch retry attempts after the initial try.
    pub artifact_retries: u32,
    /// Base delay between artifact fetch retries; doubles each attempt.
    pub artifact_retry_base_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            artifact_base: "circuits".to_string(),
            cache_ttl: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(60),
            precompute_pool_size: 3,
            precompute_retention: Duration::from_secs(600),
            max_concurrent_ops: 4,
            max_batch_size: 10,
            artifact_retries: 3,
            artifact_retry_base_delay: Duration::from_millis(200),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable.
    ///
    /// Variables:
    /// - `VEIL_ARTIFACT_BASE` (default: `circuits`)
    /// - `VEIL_CACHE_TTL_SECS` (default: 3600)
    /// - `VEIL_SWEEP_INTERVAL_SECS` (default: 60)
    /// - `VEIL_PRECOMPUTE_POOL_SIZE` (default: 3)
    /// - `VEIL_PRECOMPUTE_RETENTION_SECS` (default: 600)
    /// - `VEIL_MAX_CONCURRENT_OPS` (default: 4)
    /// - `VEIL_MAX_BATCH_SIZE` (default: 10)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            artifact_base: std::env::var("VEIL_ARTIFACT_BASE")
                .unwrap_or(defaults.artifact_base),
            cache_ttl: env_secs("VEIL_CACHE_TTL_SECS").unwrap_or(defaults.cache_ttl),
            sweep_interval: env_secs("VEIL_SWEEP_INTERVAL_SECS")
                .unwrap_or(defaults.sweep_interval),
            precompute_pool_size: env_usize("VEIL_PRECOMPUTE_POOL_SIZE")
                .unwrap_or(defaults.precompute_pool_size),
            precompute_retention: env_secs("VEIL_PRECOMPUTE_RETENTION_SECS")
                .unwrap_or(defaults.precompute_retention),
            max_concurrent_ops: env_usize("VEIL_MAX_CONCURRENT_OPS")
                .unwrap_or(defaults.max_concurrent_ops),
            max_batch_size: env_usize("VEIL_MAX_BATCH_SIZE")
                .unwrap_or(defaults.max_batch_size),
            artifact_retries: defaults.artifact_retries,
            artifact_retry_base_delay: defaults.artifact_retry_base_delay,
        }
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}
