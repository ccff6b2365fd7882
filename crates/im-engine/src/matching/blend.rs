use crate::matching::explanation::SignalScore;
use crate::matching::weights::BlendWeights;

/// Outcome of blending one candidate's rule and embedding scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendOutcome {
    /// 0..=100, the candidate's `match_score` before rounding.
    pub score: f64,
    /// Weights actually applied; differs from the configured weights only in
    /// the rule-only degraded path.
    pub effective_weights: BlendWeights,
}

/// Combine the rule score with the embedding signal.
///
/// When the embedding signal is degraded the blend renormalizes to the rule
/// score alone and reports effective weights {rule: 1.0, embedding: 0.0}.
/// This is the designed degraded mode, not an error. `weights` must already
/// be validated at request entry.
pub fn blend(rule_score: f64, embedding: SignalScore, weights: BlendWeights) -> BlendOutcome {
    debug_assert!(weights.validate().is_ok(), "unvalidated weights in blend");

    match embedding.value() {
        Some(embedding_score) => BlendOutcome {
            score: (weights.rule * rule_score + weights.embedding * embedding_score)
                .clamp(0.0, 100.0),
            effective_weights: weights,
        },
        None => BlendOutcome {
            score: rule_score.clamp(0.0, 100.0),
            effective_weights: BlendWeights::RULE_ONLY,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::explanation::DegradedReason;

    #[test]
    fn blends_available_signals_with_configured_weights() {
        let weights = BlendWeights {
            rule: 0.4,
            embedding: 0.6,
        };
        let outcome = blend(50.0, SignalScore::Available(100.0), weights);
        assert!((outcome.score - 80.0).abs() < 1e-9);
        assert_eq!(outcome.effective_weights, weights);
    }

    #[test]
    fn falls_back_to_rule_only_when_embedding_degraded() {
        let outcome = blend(
            73.0,
            SignalScore::Degraded(DegradedReason::Unavailable),
            BlendWeights::default(),
        );
        assert_eq!(outcome.score, 73.0);
        assert_eq!(outcome.effective_weights, BlendWeights::RULE_ONLY);
        assert!((outcome.effective_weights.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn clamps_to_score_range() {
        let outcome = blend(
            150.0,
            SignalScore::Degraded(DegradedReason::Disabled),
            BlendWeights::default(),
        );
        assert_eq!(outcome.score, 100.0);
    }
}
