use crate::skill_normalizer::SkillSet;

/// Points available from required-skill coverage.
pub const REQUIRED_POINTS: f64 = 80.0;
/// Points available from optional (nice-to-have) coverage.
pub const OPTIONAL_POINTS: f64 = 20.0;

/// Lexical overlap score between the anchor's skill requirements and one
/// candidate's offered skills.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleScore {
    /// 0..=100.
    pub score: f64,
    /// `required ∩ candidate`. Together with `missing` this partitions the
    /// anchor's required set exactly.
    pub matched: SkillSet,
    /// `required − candidate`.
    pub missing: SkillSet,
    /// Optional skills the candidate also brings, reported separately so
    /// they never inflate required coverage.
    pub optional_matched: SkillSet,
    /// Fraction of required skills covered; 1.0 when none are required.
    pub required_coverage: f64,
    /// Fraction of optional skills covered; 1.0 when none are listed.
    pub optional_coverage: f64,
}

/// Deterministic, infallible scoring of one candidate against the anchor's
/// required/optional skill sets. All inputs are already canonicalized.
///
/// An empty required set is vacuously satisfied: the required term
/// contributes its full weight and the score varies only with the optional
/// term. Same for an empty optional set, so a candidate covering every
/// listed skill always reaches 100.
pub fn score(required: &SkillSet, optional: &SkillSet, candidate: &SkillSet) -> RuleScore {
    let matched: SkillSet = required.intersection(candidate).cloned().collect();
    let missing: SkillSet = required.difference(candidate).cloned().collect();
    let optional_matched: SkillSet = optional.intersection(candidate).cloned().collect();

    let required_coverage = if required.is_empty() {
        1.0
    } else {
        matched.len() as f64 / required.len() as f64
    };
    let optional_coverage = if optional.is_empty() {
        1.0
    } else {
        optional_matched.len() as f64 / optional.len() as f64
    };

    let score = (REQUIRED_POINTS * required_coverage + OPTIONAL_POINTS * optional_coverage)
        .clamp(0.0, 100.0);

    RuleScore {
        score,
        matched,
        missing,
        optional_matched,
        required_coverage,
        optional_coverage,
    }
}
