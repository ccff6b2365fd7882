pub mod cache;
pub mod hash_embedder;
pub mod http_embedder;
pub mod similarity;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

pub use cache::EmbeddingCache;
pub use hash_embedder::HashEmbedder;
pub use http_embedder::HttpEmbedder;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("embedding backend returned an empty vector")]
    EmptyVector,

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("embedding provider misconfigured: {0}")]
    Config(String),
}

/// A model turning one entity's canonical text into a dense vector.
///
/// Implementations:
/// - `HashEmbedder`: deterministic feature hashing, no model, no I/O
/// - `HttpEmbedder`: remote embedding endpoint behind reqwest
///
/// The pipeline treats every implementation as fallible and falls back to
/// rule-only scoring when calls fail; errors here never fail a request.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Implementation name recorded in logs ("hash", "http").
    fn name(&self) -> &'static str;

    /// Model generation, for cache/debug visibility across deployments.
    fn version(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Build a provider by name. Unknown names fall back to the hash embedder so
/// a misconfigured deployment still ranks; `none`/`disabled` switches the
/// embedding stage off entirely.
pub fn create_provider(name: &str, dimension: usize) -> Option<Arc<dyn EmbeddingProvider>> {
    match name {
        "none" | "disabled" => None,
        "hash" => Some(Arc::new(HashEmbedder::new(dimension))),
        "http" => match HttpEmbedder::from_env() {
            Ok(embedder) => Some(Arc::new(embedder)),
            Err(err) => {
                warn!(error = %err, "http embedder unavailable; falling back to hash embedder");
                Some(Arc::new(HashEmbedder::new(dimension)))
            }
        },
        other => {
            warn!(embedder = other, "unknown embedder name; using hash embedder");
            Some(Arc::new(HashEmbedder::new(dimension)))
        }
    }
}
