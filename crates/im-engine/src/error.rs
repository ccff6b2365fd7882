use thiserror::Error;

/// Errors that reject a ranking request outright.
///
/// Degraded-dependency failures (embedding or cross-encoder backends down,
/// timed out, rate limited) never surface here; the pipeline absorbs them
/// through the documented fallback paths and records them in the
/// `ScoreBreakdown` of each affected result.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid blend weights: rule={rule} + embedding={embedding} must sum to 1.0")]
    InvalidWeights { rule: f64, embedding: f64 },

    #[error("anchor {entity_id} carries no skills and no text to match on")]
    EmptyAnchor { entity_id: i64 },

    /// Inconsistent intermediate state. Indicates a bug, not an environmental
    /// condition, so the request fails rather than degrading.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}
