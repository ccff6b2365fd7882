pub mod http_cross_encoder;
pub mod overlap;
pub mod reranker;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

pub use http_cross_encoder::HttpCrossEncoder;
pub use overlap::OverlapCrossEncoder;

#[derive(Debug, Error)]
pub enum CrossEncoderError {
    #[error("cross-encoder request failed: {0}")]
    Request(String),

    #[error("cross-encoder returned a non-finite score")]
    InvalidScore,

    #[error("cross-encoder misconfigured: {0}")]
    Config(String),
}

/// Joint pairwise relevance model: sees both texts together, so it is the
/// most accurate and the most expensive stage. Invoked only for the
/// shortlist; per-pair failures degrade that pair, never the request.
#[async_trait]
pub trait CrossEncoder: Send + Sync {
    /// Implementation name recorded in logs ("overlap", "http").
    fn name(&self) -> &'static str;

    /// Relevance of the pair mapped to 0..=100.
    async fn score_pair(
        &self,
        anchor_text: &str,
        candidate_text: &str,
    ) -> Result<f64, CrossEncoderError>;
}

/// Build a cross-encoder by name; `none`/`disabled` turns reranking off.
pub fn create_cross_encoder(name: &str) -> Option<Arc<dyn CrossEncoder>> {
    match name {
        "none" | "disabled" => None,
        "overlap" => Some(Arc::new(OverlapCrossEncoder)),
        "http" => match HttpCrossEncoder::from_env() {
            Ok(encoder) => Some(Arc::new(encoder)),
            Err(err) => {
                warn!(error = %err, "http cross-encoder unavailable; falling back to overlap");
                Some(Arc::new(OverlapCrossEncoder))
            }
        },
        other => {
            warn!(cross_encoder = other, "unknown cross-encoder name; using overlap");
            Some(Arc::new(OverlapCrossEncoder))
        }
    }
}
