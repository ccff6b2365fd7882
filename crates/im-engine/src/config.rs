use serde::Deserialize;

use crate::error::EngineError;
use crate::matching::weights::BlendWeights;

/// Upper bound on the shortlist promoted to cross-encoder reranking,
/// regardless of what a request asks for.
pub const MAX_SHORTLIST: usize = 100;

/// Engine-wide configuration. All values have working defaults; deployments
/// override them through `IM_*` environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub weights: BlendWeights,
    /// Top-K candidates by blended score promoted to the rerank stage.
    pub shortlist_size: usize,
    pub rerank_enabled: bool,
    /// Overall request deadline. Work that misses it degrades, it does not
    /// block the response.
    pub request_timeout_ms: u64,
    /// Max concurrent embedding calls per request, independent of pool size.
    pub embed_concurrency: usize,
    /// Max concurrent cross-encoder calls; the remote model is rate limited.
    pub rerank_concurrency: usize,
    pub embed_timeout_ms: u64,
    pub rerank_timeout_ms: u64,
    /// Year / location gate recovered from the marketplace rules.
    pub eligibility_enabled: bool,
    /// Entries held by the embedding cache.
    pub embedding_cache_capacity: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: BlendWeights::default(),
            shortlist_size: 20,
            rerank_enabled: true,
            request_timeout_ms: 10_000,
            embed_concurrency: 8,
            rerank_concurrency: 4,
            embed_timeout_ms: 2_000,
            rerank_timeout_ms: 2_000,
            eligibility_enabled: true,
            embedding_cache_capacity: 10_000,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

impl EngineConfig {
    /// Load configuration from `IM_*` environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            weights: BlendWeights {
                rule: env_parse("IM_WEIGHT_RULE").unwrap_or(defaults.weights.rule),
                embedding: env_parse("IM_WEIGHT_EMBEDDING").unwrap_or(defaults.weights.embedding),
            },
            shortlist_size: env_parse("IM_SHORTLIST_SIZE").unwrap_or(defaults.shortlist_size),
            rerank_enabled: env_flag("IM_RERANK_ENABLED", defaults.rerank_enabled),
            request_timeout_ms: env_parse("IM_REQUEST_TIMEOUT_MS")
                .unwrap_or(defaults.request_timeout_ms),
            embed_concurrency: env_parse("IM_EMBED_CONCURRENCY")
                .unwrap_or(defaults.embed_concurrency),
            rerank_concurrency: env_parse("IM_RERANK_CONCURRENCY")
                .unwrap_or(defaults.rerank_concurrency),
            embed_timeout_ms: env_parse("IM_EMBED_TIMEOUT_MS").unwrap_or(defaults.embed_timeout_ms),
            rerank_timeout_ms: env_parse("IM_RERANK_TIMEOUT_MS")
                .unwrap_or(defaults.rerank_timeout_ms),
            eligibility_enabled: env_flag("IM_ELIGIBILITY_ENABLED", defaults.eligibility_enabled),
            embedding_cache_capacity: env_parse("IM_EMBEDDING_CACHE_CAPACITY")
                .unwrap_or(defaults.embedding_cache_capacity),
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.weights.validate()
    }

    /// Apply per-request overrides, clamping and re-validating the result.
    pub fn resolve(&self, options: &MatchOptions) -> Result<EngineConfig, EngineError> {
        let mut resolved = self.clone();
        if let Some(weights) = options.weights {
            resolved.weights = weights;
        }
        if let Some(size) = options.shortlist_size {
            resolved.shortlist_size = size;
        }
        if let Some(enabled) = options.rerank_enabled {
            resolved.rerank_enabled = enabled;
        }
        resolved.shortlist_size = resolved.shortlist_size.clamp(1, MAX_SHORTLIST);
        resolved.embed_concurrency = resolved.embed_concurrency.max(1);
        resolved.rerank_concurrency = resolved.rerank_concurrency.max(1);
        resolved.validate()?;
        Ok(resolved)
    }
}

/// Per-request overrides accepted by both ranking operations.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MatchOptions {
    #[serde(default)]
    pub weights: Option<BlendWeights>,
    #[serde(default)]
    pub shortlist_size: Option<usize>,
    #[serde(default)]
    pub rerank_enabled: Option<bool>,
}
