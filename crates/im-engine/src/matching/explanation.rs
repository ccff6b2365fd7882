use serde::{Serialize, Serializer};

use crate::error::EngineError;
use crate::matching::rule_score::RuleScore;
use crate::matching::weights::BlendWeights;
use crate::skill_normalizer::SkillSet;

/// Why a signal is missing from a breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
    /// Stage switched off by configuration; absence is by design.
    Disabled,
    /// Backend call failed after retries.
    Unavailable,
    /// Per-call timeout elapsed.
    Timeout,
    /// The overall request deadline was reached before this candidate ran.
    DeadlineExceeded,
    /// Candidate did not make the shortlist; absence is by design.
    NotShortlisted,
}

impl DegradedReason {
    /// True for reasons the caller should disclose as reduced confidence.
    /// `Disabled`/`NotShortlisted` absences are designed, not degraded.
    pub fn is_dependency_failure(self) -> bool {
        matches!(
            self,
            DegradedReason::Unavailable | DegradedReason::Timeout | DegradedReason::DeadlineExceeded
        )
    }
}

/// A score that either arrived or has a typed reason for its absence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalScore {
    Available(f64),
    Degraded(DegradedReason),
}

impl SignalScore {
    pub fn value(&self) -> Option<f64> {
        match self {
            SignalScore::Available(v) => Some(*v),
            SignalScore::Degraded(_) => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, SignalScore::Degraded(_))
    }

    pub fn degraded_reason(&self) -> Option<DegradedReason> {
        match self {
            SignalScore::Available(_) => None,
            SignalScore::Degraded(reason) => Some(*reason),
        }
    }

    fn serialize_value<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SignalScore::Available(v) => serializer.serialize_f64(*v),
            // Unreachable behind skip_serializing_if, but total anyway.
            SignalScore::Degraded(_) => serializer.serialize_none(),
        }
    }
}

/// Scoring stages that can report degradation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Embedding,
    CrossEncoder,
}

/// One degraded stage, surfaced so the UI can disclose reduced confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DegradedSignal {
    pub signal: Signal,
    pub reason: DegradedReason,
}

/// Transparent breakdown of one candidate's `match_score`.
///
/// Serializes to the shape the front end consumes: `embedding_score` and
/// `cross_encoder_score` are simply absent when degraded or skipped, and
/// `degraded` lists the stages that failed (as opposed to being skipped by
/// design).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub rule_based_score: f64,
    #[serde(
        skip_serializing_if = "SignalScore::is_degraded",
        serialize_with = "SignalScore::serialize_value"
    )]
    pub embedding_score: SignalScore,
    #[serde(
        skip_serializing_if = "SignalScore::is_degraded",
        serialize_with = "SignalScore::serialize_value"
    )]
    pub cross_encoder_score: SignalScore,
    /// Weights actually applied to this candidate's blend; always sum to 1.0.
    pub weights: BlendWeights,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub optional_matched_skills: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<DegradedSignal>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Assemble a breakdown from the intermediate values the pipeline already
/// computed. Pure aggregation, no recomputation.
pub fn build(
    rule: &RuleScore,
    embedding_score: SignalScore,
    cross_encoder_score: SignalScore,
    weights: BlendWeights,
) -> ScoreBreakdown {
    let mut degraded = Vec::new();
    if let Some(reason) = embedding_score.degraded_reason() {
        if reason.is_dependency_failure() {
            degraded.push(DegradedSignal {
                signal: Signal::Embedding,
                reason,
            });
        }
    }
    if let Some(reason) = cross_encoder_score.degraded_reason() {
        if reason.is_dependency_failure() {
            degraded.push(DegradedSignal {
                signal: Signal::CrossEncoder,
                reason,
            });
        }
    }

    ScoreBreakdown {
        rule_based_score: round2(rule.score),
        embedding_score,
        cross_encoder_score,
        weights,
        optional_matched_skills: rule.optional_matched.iter().cloned().collect(),
        degraded,
    }
}

/// Check the coverage invariant: `matched ∪ missing == required` with the two
/// sets disjoint. A violation is a bug in the scorer, not a runtime
/// condition, so it fails the request.
pub fn verify_coverage(
    required: &SkillSet,
    matched: &SkillSet,
    missing: &SkillSet,
) -> Result<(), EngineError> {
    if !matched.is_disjoint(missing) {
        return Err(EngineError::Internal(
            "matched and missing skill sets overlap".into(),
        ));
    }
    let union: SkillSet = matched.union(missing).cloned().collect();
    if union != *required {
        return Err(EngineError::Internal(
            "matched ∪ missing does not equal the required skill set".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::rule_score;

    fn set(skills: &[&str]) -> SkillSet {
        skills.iter().map(|s| s.to_string()).collect()
    }

    fn sample_rule() -> RuleScore {
        rule_score::score(
            &set(&["python", "sql"]),
            &set(&["docker"]),
            &set(&["python", "docker"]),
        )
    }

    #[test]
    fn serializes_available_signals_as_numbers() {
        let breakdown = build(
            &sample_rule(),
            SignalScore::Available(72.5),
            SignalScore::Available(88.0),
            BlendWeights::default(),
        );

        let json = serde_json::to_value(&breakdown).unwrap();
        assert_eq!(json["embedding_score"], 72.5);
        assert_eq!(json["cross_encoder_score"], 88.0);
        assert_eq!(json["weights"]["rule"], 0.4);
        assert!(json.get("degraded").is_none());
    }

    #[test]
    fn omits_degraded_signals_and_records_failures() {
        let breakdown = build(
            &sample_rule(),
            SignalScore::Degraded(DegradedReason::Timeout),
            SignalScore::Degraded(DegradedReason::NotShortlisted),
            BlendWeights::RULE_ONLY,
        );

        let json = serde_json::to_value(&breakdown).unwrap();
        assert!(json.get("embedding_score").is_none());
        assert!(json.get("cross_encoder_score").is_none());

        // Only the dependency failure shows up as degraded; missing the
        // shortlist is by design.
        let degraded = json["degraded"].as_array().unwrap();
        assert_eq!(degraded.len(), 1);
        assert_eq!(degraded[0]["signal"], "embedding");
        assert_eq!(degraded[0]["reason"], "timeout");
    }

    #[test]
    fn disabled_stages_are_not_reported_as_degraded() {
        let breakdown = build(
            &sample_rule(),
            SignalScore::Degraded(DegradedReason::Disabled),
            SignalScore::Degraded(DegradedReason::Disabled),
            BlendWeights::RULE_ONLY,
        );
        assert!(breakdown.degraded.is_empty());
    }

    #[test]
    fn optional_matches_surface_in_breakdown() {
        let breakdown = build(
            &sample_rule(),
            SignalScore::Available(50.0),
            SignalScore::Degraded(DegradedReason::NotShortlisted),
            BlendWeights::default(),
        );
        assert_eq!(breakdown.optional_matched_skills, vec!["docker".to_string()]);
    }

    #[test]
    fn verify_coverage_accepts_exact_partition() {
        let required = set(&["python", "sql"]);
        assert!(verify_coverage(&required, &set(&["python"]), &set(&["sql"])).is_ok());
    }

    #[test]
    fn verify_coverage_rejects_overlap_and_gaps() {
        let required = set(&["python", "sql"]);
        assert!(verify_coverage(&required, &set(&["python", "sql"]), &set(&["sql"])).is_err());
        assert!(verify_coverage(&required, &set(&["python"]), &set(&[])).is_err());
        assert!(verify_coverage(&required, &set(&["python", "react"]), &set(&["sql"])).is_err());
    }
}
