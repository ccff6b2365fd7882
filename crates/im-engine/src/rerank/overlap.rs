use async_trait::async_trait;

use super::{CrossEncoder, CrossEncoderError};

/// Lexical token-overlap pair scorer.
///
/// Deterministic and in-process; stands in for a learned cross-encoder in
/// offline deployments and tests. Score is the fraction of anchor tokens
/// also present in the candidate text, on the 0..=100 scale.
pub struct OverlapCrossEncoder;

impl OverlapCrossEncoder {
    fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric() && !matches!(c, '#' | '+'))
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
impl CrossEncoder for OverlapCrossEncoder {
    fn name(&self) -> &'static str {
        "overlap"
    }

    async fn score_pair(
        &self,
        anchor_text: &str,
        candidate_text: &str,
    ) -> Result<f64, CrossEncoderError> {
        let anchor_terms = Self::tokenize(anchor_text);
        let candidate_terms = Self::tokenize(candidate_text);
        if anchor_terms.is_empty() || candidate_terms.is_empty() {
            return Ok(0.0);
        }

        let matches = anchor_terms
            .iter()
            .filter(|term| candidate_terms.contains(term))
            .count();

        Ok(matches as f64 / anchor_terms.len() as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn full_overlap_scores_100() {
        let encoder = OverlapCrossEncoder;
        let score = encoder.score_pair("python sql", "python sql docker").await.unwrap();
        assert_eq!(score, 100.0);
    }

    #[tokio::test]
    async fn ranks_closer_pairs_higher() {
        let encoder = OverlapCrossEncoder;
        let close = encoder
            .score_pair("requires python sql", "student knows python sql")
            .await
            .unwrap();
        let far = encoder
            .score_pair("requires python sql", "student knows figma")
            .await
            .unwrap();
        assert!(close > far);
    }

    #[tokio::test]
    async fn empty_inputs_score_zero() {
        let encoder = OverlapCrossEncoder;
        assert_eq!(encoder.score_pair("", "anything").await.unwrap(), 0.0);
        assert_eq!(encoder.score_pair("anything", "").await.unwrap(), 0.0);
    }
}
