//! Environment-driven configuration (§10 ambient stack).

use std::time::Duration;

/// Unified configuration for the embedder/completion provider, retry
/// budget, ingestion limits, and retrieval thresholds.
///
/// Constructed via [`CoreConfig::from_env`] (mirroring this codebase's
/// existing `from_env()` provider-client constructors), or directly for
/// tests.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Embedding vector dimension, fixed at configuration time and
    /// checked on every provider response (§4.C).
    pub embedding_dimension: usize,
    /// Chat/completion model name.
    pub completion_model: String,
    /// Embedding model name.
    pub embedding_model: String,
    /// Maximum number of retries for a transient provider error before
    /// surfacing `ProviderUnavailable` (§4.C, §4.D).
    pub retry_budget: u32,
    /// Base delay for exponential backoff between retries.
    pub retry_base_delay: Duration,
    /// Per-call timeout for completion requests (§4.D: "Timeout ≈ 120s").
    pub completion_timeout: Duration,
    /// Per-call timeout for embedding requests.
    pub embedding_timeout: Duration,
    /// Capacity (entry count) of the embedding LRU cache (§4.C).
    pub embedding_cache_capacity: usize,
    /// Maximum accepted upload size in bytes (§4.G upload step 2).
    pub max_upload_size: usize,
    /// Semantic search threshold τ (§4.F).
    pub semantic_threshold: f32,
    /// Grounding confidence above which `no_hallucination` is set (§4.J).
    pub grounding_threshold: f32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            embedding_dimension: 1536,
            completion_model: "gpt-4o".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            retry_budget: 3,
            retry_base_delay: Duration::from_millis(500),
            completion_timeout: Duration::from_secs(120),
            embedding_timeout: Duration::from_secs(30),
            embedding_cache_capacity: 10_000,
            max_upload_size: 25 * 1024 * 1024,
            semantic_threshold: 0.7,
            grounding_threshold: 0.7,
        }
    }
}

impl CoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from environment variables, falling back to defaults for any
    /// that are unset or unparseable. Does not call `dotenvy::dotenv()`
    /// itself — the composition root (binary/server) owns when `.env` is
    /// loaded.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            embedding_dimension: env_usize("CORE_EMBEDDING_DIMENSION", defaults.embedding_dimension),
            completion_model: std::env::var("CORE_COMPLETION_MODEL")
                .unwrap_or(defaults.completion_model),
            embedding_model: std::env::var("CORE_EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            retry_budget: env_u32("CORE_RETRY_BUDGET", defaults.retry_budget),
            retry_base_delay: Duration::from_millis(env_u64(
                "CORE_RETRY_BASE_DELAY_MS",
                defaults.retry_base_delay.as_millis() as u64,
            )),
            completion_timeout: Duration::from_secs(env_u64(
                "CORE_COMPLETION_TIMEOUT_SECS",
                defaults.completion_timeout.as_secs(),
            )),
            embedding_timeout: Duration::from_secs(env_u64(
                "CORE_EMBEDDING_TIMEOUT_SECS",
                defaults.embedding_timeout.as_secs(),
            )),
            embedding_cache_capacity: env_usize(
                "CORE_EMBEDDING_CACHE_CAPACITY",
                defaults.embedding_cache_capacity,
            ),
            max_upload_size: env_usize("CORE_MAX_UPLOAD_SIZE", defaults.max_upload_size),
            semantic_threshold: env_f32("CORE_SEMANTIC_THRESHOLD", defaults.semantic_threshold),
            grounding_threshold: env_f32("CORE_GROUNDING_THRESHOLD", defaults.grounding_threshold),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let c = CoreConfig::default();
        assert_eq!(c.embedding_dimension, 1536);
        assert_eq!(c.semantic_threshold, 0.7);
        assert_eq!(c.grounding_threshold, 0.7);
    }
}
