//! The ranking funnel.
//!
//! Stages per request: Normalizing → RuleScoring → EmbeddingScoring →
//! Blending → ShortlistSelection → Reranking → Explaining → Done.
//! Reranking is skipped when the shortlist is empty or no cross-encoder is
//! configured. The funnel always completes to a full `RankedResultSet` for a
//! non-empty pool; dependency failures degrade score quality, never
//! availability.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use crate::config::{EngineConfig, MatchOptions};
use crate::embedding::cache::{CacheKey, EmbeddingCache};
use crate::embedding::{EmbeddingProvider, similarity};
use crate::error::EngineError;
use crate::matching::blend;
use crate::matching::eligibility::{self, EligibilitySide};
use crate::matching::explanation::{self, DegradedReason, ScoreBreakdown, SignalScore};
use crate::matching::rule_score::{self, RuleScore};
use crate::matching::weights::BlendWeights;
use crate::rerank::{CrossEncoder, reranker};
use crate::skill_normalizer::{SkillSet, normalize_skill_set};
use crate::{ENGINE_VERSION, Posting, Profile, run_id, text_builder};

/// One ranked candidate with its transparent score breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub candidate_id: i64,
    /// Blended rule/embedding score, 0..=100. The cross-encoder refines
    /// order within the shortlist but never replaces this value.
    pub match_score: f64,
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub explanation: ScoreBreakdown,
}

/// Candidate excluded by the eligibility gate before scoring.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedCandidate {
    pub candidate_id: i64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchRunMeta {
    pub match_run_id: String,
    pub engine_version: String,
    pub pool_size: usize,
    pub shortlist_size: usize,
    /// Shortlist members that actually received a cross-encoder score.
    pub reranked: usize,
    pub elapsed_ms: u64,
    pub matched_at: DateTime<Utc>,
}

/// Built fresh per request, never persisted by the engine.
#[derive(Debug, Clone, Serialize)]
pub struct RankedResultSet {
    pub results: Vec<MatchResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedCandidate>,
    pub meta: MatchRunMeta,
}

/// Request-local normalized view of one entity. Output of the Normalizing
/// stage; everything downstream works on this, never on the raw snapshot.
#[derive(Debug, Clone)]
struct EntitySnapshot {
    id: i64,
    /// What this entity demands when it is the anchor.
    required: SkillSet,
    optional: SkillSet,
    /// What this entity offers when it is a candidate: union of both lists.
    offered: SkillSet,
    text: Arc<str>,
    location: Option<String>,
    remote: Option<bool>,
    year: Option<i32>,
    min_year: Option<i32>,
    /// False when the raw snapshot carried no skills and no free text.
    has_content: bool,
}

impl EntitySnapshot {
    fn from_posting(posting: &Posting) -> Self {
        let required = normalize_skill_set(&posting.required_skills);
        let optional = normalize_skill_set(&posting.preferred_skills);
        let offered: SkillSet = required.union(&optional).cloned().collect();
        let has_content = !offered.is_empty()
            || posting
                .description
                .as_deref()
                .is_some_and(|d| !d.trim().is_empty())
            || !posting.title.trim().is_empty();

        Self {
            id: posting.id,
            required,
            optional,
            offered,
            text: Arc::from(text_builder::posting_text(posting)),
            location: posting.location.clone(),
            remote: Some(posting.remote),
            year: None,
            min_year: posting.min_year,
            has_content,
        }
    }

    fn from_profile(profile: &Profile) -> Self {
        let required = normalize_skill_set(&profile.skills);
        let optional = normalize_skill_set(&profile.interests);
        let offered: SkillSet = required.union(&optional).cloned().collect();
        let has_content = !offered.is_empty()
            || profile
                .objective
                .as_deref()
                .is_some_and(|o| !o.trim().is_empty());

        Self {
            id: profile.id,
            required,
            optional,
            offered,
            text: Arc::from(text_builder::profile_text(profile)),
            location: profile.location.clone(),
            remote: None,
            year: profile.year,
            min_year: None,
            has_content,
        }
    }

    fn eligibility_side(&self) -> EligibilitySide<'_> {
        EligibilitySide {
            location: self.location.as_deref(),
            remote: self.remote,
            year: self.year,
            min_year: self.min_year,
        }
    }
}

/// Request-local scoring state for one candidate.
#[derive(Debug, Clone)]
struct ScoredCandidate {
    snapshot: EntitySnapshot,
    rule: RuleScore,
    embedding: SignalScore,
    blended: f64,
    effective_weights: BlendWeights,
    cross: SignalScore,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Blended-order comparator: score descending, candidate id ascending.
/// The id tiebreak keeps output deterministic under parallel scoring.
fn blended_order(a: &ScoredCandidate, b: &ScoredCandidate) -> std::cmp::Ordering {
    b.blended
        .total_cmp(&a.blended)
        .then_with(|| a.snapshot.id.cmp(&b.snapshot.id))
}

/// Order within the reranked shortlist: scored pairs first by cross-encoder
/// score descending, failed pairs after them in blended order.
fn shortlist_order(a: &ScoredCandidate, b: &ScoredCandidate) -> std::cmp::Ordering {
    match (a.cross.value(), b.cross.value()) {
        (Some(x), Some(y)) => y
            .total_cmp(&x)
            .then_with(|| a.snapshot.id.cmp(&b.snapshot.id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => blended_order(a, b),
    }
}

/// The funnel controller. Stateless per request; the embedding cache is the
/// only shared mutable state and is safe for concurrent requests.
pub struct RankingEngine {
    config: EngineConfig,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    cross_encoder: Option<Arc<dyn CrossEncoder>>,
    cache: Arc<EmbeddingCache>,
}

impl RankingEngine {
    pub fn new(
        config: EngineConfig,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        cross_encoder: Option<Arc<dyn CrossEncoder>>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let cache = Arc::new(EmbeddingCache::with_capacity(config.embedding_cache_capacity));
        Ok(Self {
            config,
            embedder,
            cross_encoder,
            cache,
        })
    }

    /// Rank a pool of student profiles against one internship posting.
    pub async fn rank_candidates_for_posting(
        &self,
        posting: &Posting,
        candidate_pool: &[Profile],
        options: &MatchOptions,
    ) -> Result<RankedResultSet, EngineError> {
        let anchor = EntitySnapshot::from_posting(posting);
        let candidates = candidate_pool
            .iter()
            .map(EntitySnapshot::from_profile)
            .collect();
        self.rank(anchor, candidates, options).await
    }

    /// Rank a pool of internship postings against one student profile.
    pub async fn rank_postings_for_profile(
        &self,
        profile: &Profile,
        posting_pool: &[Posting],
        options: &MatchOptions,
    ) -> Result<RankedResultSet, EngineError> {
        let anchor = EntitySnapshot::from_profile(profile);
        let candidates = posting_pool
            .iter()
            .map(EntitySnapshot::from_posting)
            .collect();
        self.rank(anchor, candidates, options).await
    }

    async fn rank(
        &self,
        anchor: EntitySnapshot,
        candidates: Vec<EntitySnapshot>,
        options: &MatchOptions,
    ) -> Result<RankedResultSet, EngineError> {
        let started = std::time::Instant::now();
        let config = self.config.resolve(options)?;

        if !anchor.has_content {
            return Err(EngineError::EmptyAnchor {
                entity_id: anchor.id,
            });
        }

        let match_run_id = run_id::generate();
        let deadline = Instant::now() + Duration::from_millis(config.request_timeout_ms);
        let pool_size = candidates.len();

        debug!(
            match_run_id = %match_run_id,
            anchor_id = anchor.id,
            pool_size,
            shortlist_size = config.shortlist_size,
            "ranking request started"
        );

        // Eligibility gate before any scoring.
        let mut eligible = Vec::with_capacity(candidates.len());
        let mut rejected = Vec::new();
        if config.eligibility_enabled {
            let anchor_side = anchor.eligibility_side();
            for candidate in candidates {
                let verdict = eligibility::check(&anchor_side, &candidate.eligibility_side());
                if verdict.eligible {
                    eligible.push(candidate);
                } else {
                    rejected.push(RejectedCandidate {
                        candidate_id: candidate.id,
                        reasons: verdict.reasons,
                    });
                }
            }
            rejected.sort_by_key(|r| r.candidate_id);
        } else {
            eligible = candidates;
        }

        // RuleScoring: cheap, always succeeds.
        let rules: Vec<RuleScore> = eligible
            .iter()
            .map(|candidate| rule_score::score(&anchor.required, &anchor.optional, &candidate.offered))
            .collect();

        // EmbeddingScoring: pool-wide, bounded parallelism, degrades per
        // candidate once the deadline is reached.
        let embeddings = self
            .embedding_scores(&anchor, &eligible, &config, deadline)
            .await;

        // Blending.
        let cross_default = if config.rerank_enabled && self.cross_encoder.is_some() {
            SignalScore::Degraded(DegradedReason::NotShortlisted)
        } else {
            SignalScore::Degraded(DegradedReason::Disabled)
        };

        let mut rows: Vec<ScoredCandidate> = eligible
            .into_iter()
            .zip(rules)
            .zip(embeddings)
            .map(|((snapshot, rule), embedding)| {
                let outcome = blend::blend(rule.score, embedding, config.weights);
                ScoredCandidate {
                    snapshot,
                    rule,
                    embedding,
                    blended: outcome.score,
                    effective_weights: outcome.effective_weights,
                    cross: cross_default,
                }
            })
            .collect();

        // ShortlistSelection.
        rows.sort_by(blended_order);
        let shortlist_len = rows.len().min(config.shortlist_size);

        // Reranking, skipped when disabled or the shortlist is empty.
        if let Some(encoder) = self.cross_encoder.as_ref().filter(|_| config.rerank_enabled) {
            if shortlist_len > 0 {
                // A lost task should read as a degraded pair, not a designed skip.
                for row in &mut rows[..shortlist_len] {
                    row.cross = SignalScore::Degraded(DegradedReason::Unavailable);
                }

                let pairs = rows[..shortlist_len]
                    .iter()
                    .enumerate()
                    .map(|(slot, row)| (slot, Arc::clone(&row.snapshot.text)))
                    .collect();

                let outcomes = reranker::rerank_shortlist(
                    Arc::clone(encoder),
                    Arc::clone(&anchor.text),
                    pairs,
                    config.rerank_concurrency,
                    Duration::from_millis(config.rerank_timeout_ms),
                    deadline,
                )
                .await;

                for (slot, outcome) in outcomes {
                    rows[slot].cross = outcome;
                }

                rows[..shortlist_len].sort_by(shortlist_order);
            }
        }

        let reranked = rows
            .iter()
            .filter(|row| row.cross.value().is_some())
            .count();

        // Explaining: pure aggregation plus the coverage invariant check.
        let mut results = Vec::with_capacity(rows.len());
        for row in &rows {
            explanation::verify_coverage(&anchor.required, &row.rule.matched, &row.rule.missing)?;

            let embedding = match row.embedding {
                SignalScore::Available(v) => SignalScore::Available(round2(v)),
                degraded => degraded,
            };
            let cross = match row.cross {
                SignalScore::Available(v) => SignalScore::Available(round2(v)),
                degraded => degraded,
            };

            results.push(MatchResult {
                candidate_id: row.snapshot.id,
                match_score: round2(row.blended),
                matching_skills: row.rule.matched.iter().cloned().collect(),
                missing_skills: row.rule.missing.iter().cloned().collect(),
                explanation: explanation::build(&row.rule, embedding, cross, row.effective_weights),
            });
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        debug!(
            match_run_id = %match_run_id,
            results = results.len(),
            rejected = rejected.len(),
            reranked,
            elapsed_ms,
            "ranking request done"
        );

        Ok(RankedResultSet {
            results,
            rejected,
            meta: MatchRunMeta {
                match_run_id,
                engine_version: ENGINE_VERSION.to_string(),
                pool_size,
                shortlist_size: shortlist_len,
                reranked,
                elapsed_ms,
                matched_at: Utc::now(),
            },
        })
    }

    /// Score the whole pool against the anchor. The anchor vector is
    /// computed (or fetched) once and reused across all comparisons.
    async fn embedding_scores(
        &self,
        anchor: &EntitySnapshot,
        candidates: &[EntitySnapshot],
        config: &EngineConfig,
        deadline: Instant,
    ) -> Vec<SignalScore> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let Some(embedder) = self.embedder.as_ref() else {
            return vec![SignalScore::Degraded(DegradedReason::Disabled); candidates.len()];
        };

        let embed_timeout = Duration::from_millis(config.embed_timeout_ms);
        let anchor_vector = match fetch_or_embed(
            embedder,
            &self.cache,
            anchor.id,
            &anchor.text,
            embed_timeout,
            deadline,
        )
        .await
        {
            Ok(vector) => vector,
            Err(reason) => {
                warn!(anchor_id = anchor.id, ?reason, "anchor embedding unavailable; rule-only blend");
                return vec![SignalScore::Degraded(reason); candidates.len()];
            }
        };

        let semaphore = Arc::new(Semaphore::new(config.embed_concurrency));
        let mut tasks = JoinSet::new();

        for (slot, candidate) in candidates.iter().enumerate() {
            let embedder = Arc::clone(embedder);
            let cache = Arc::clone(&self.cache);
            let anchor_vector = Arc::clone(&anchor_vector);
            let text = Arc::clone(&candidate.text);
            let semaphore = Arc::clone(&semaphore);
            let candidate_id = candidate.id;

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let outcome =
                    match fetch_or_embed(&embedder, &cache, candidate_id, &text, embed_timeout, deadline)
                        .await
                    {
                        Ok(vector) => SignalScore::Available(similarity::similarity_score(
                            &anchor_vector,
                            &vector,
                        )),
                        Err(reason) => SignalScore::Degraded(reason),
                    };
                (slot, outcome)
            });
        }

        // Slot-addressed collection keeps the output independent of task
        // completion order.
        let mut outcomes =
            vec![SignalScore::Degraded(DegradedReason::Unavailable); candidates.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, outcome)) => outcomes[slot] = outcome,
                Err(err) => warn!(error = %err, "embedding task failed to join"),
            }
        }
        outcomes
    }
}

/// Cache lookup by `(entity_id, content_hash)`, falling back to one model
/// call bounded by the per-call timeout and the request deadline. A miss
/// race between concurrent requests recomputes the vector; last writer wins.
async fn fetch_or_embed(
    embedder: &Arc<dyn EmbeddingProvider>,
    cache: &EmbeddingCache,
    entity_id: i64,
    text: &str,
    embed_timeout: Duration,
    deadline: Instant,
) -> Result<Arc<Vec<f32>>, DegradedReason> {
    let key = CacheKey::new(entity_id, text);
    if let Some(hit) = cache.get(&key) {
        return Ok(hit);
    }

    let now = Instant::now();
    if now >= deadline {
        return Err(DegradedReason::DeadlineExceeded);
    }
    let call_deadline = deadline.min(now + embed_timeout);

    match timeout_at(call_deadline, embedder.embed(text)).await {
        Ok(Ok(vector)) => {
            let vector = Arc::new(vector);
            cache.insert(key, Arc::clone(&vector));
            Ok(vector)
        }
        Ok(Err(err)) => {
            warn!(entity_id, error = %err, "embedding call failed");
            Err(DegradedReason::Unavailable)
        }
        Err(_) if call_deadline == deadline => Err(DegradedReason::DeadlineExceeded),
        Err(_) => Err(DegradedReason::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingError, HashEmbedder};
    use crate::rerank::{CrossEncoderError, OverlapCrossEncoder};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn version(&self) -> &str {
            "test"
        }
        fn dimension(&self) -> usize {
            8
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::Request("backend down".into()))
        }
    }

    /// Hash embedder that counts model calls, for cache assertions.
    struct CountingEmbedder {
        inner: HashEmbedder,
        calls: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                inner: HashEmbedder::default(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        fn name(&self) -> &'static str {
            "counting"
        }
        fn version(&self) -> &str {
            "test"
        }
        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(text).await
        }
    }

    struct FailingCrossEncoder;

    #[async_trait]
    impl CrossEncoder for FailingCrossEncoder {
        fn name(&self) -> &'static str {
            "failing"
        }
        async fn score_pair(&self, _a: &str, _b: &str) -> Result<f64, CrossEncoderError> {
            Err(CrossEncoderError::Request("backend down".into()))
        }
    }

    fn posting() -> Posting {
        Posting {
            id: 100,
            title: "Data Intern".into(),
            required_skills: vec!["python".into(), "sql".into()],
            preferred_skills: vec!["docker".into()],
            remote: true,
            ..Posting::default()
        }
    }

    fn candidate_a() -> Profile {
        Profile {
            id: 1,
            skills: vec!["python".into(), "sql".into(), "docker".into()],
            ..Profile::default()
        }
    }

    fn candidate_b() -> Profile {
        Profile {
            id: 2,
            skills: vec!["python".into()],
            ..Profile::default()
        }
    }

    fn rule_only_engine() -> RankingEngine {
        RankingEngine::new(EngineConfig::default(), None, None).unwrap()
    }

    #[tokio::test]
    async fn example_scenario_rule_only() {
        let engine = rule_only_engine();
        let result = engine
            .rank_candidates_for_posting(
                &posting(),
                &[candidate_b(), candidate_a()],
                &MatchOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.results.len(), 2);
        let a = &result.results[0];
        let b = &result.results[1];

        assert_eq!(a.candidate_id, 1);
        assert_eq!(a.match_score, 100.0);
        assert_eq!(b.candidate_id, 2);
        assert_eq!(b.match_score, 40.0);
        assert_eq!(b.missing_skills, vec!["sql".to_string()]);
        assert_eq!(a.matching_skills, vec!["python".to_string(), "sql".to_string()]);
    }

    #[tokio::test]
    async fn empty_pool_returns_empty_result_not_error() {
        let engine = rule_only_engine();
        let result = engine
            .rank_candidates_for_posting(&posting(), &[], &MatchOptions::default())
            .await
            .unwrap();
        assert!(result.results.is_empty());
        assert!(result.rejected.is_empty());
        assert_eq!(result.meta.pool_size, 0);
    }

    #[tokio::test]
    async fn failed_embedding_backend_degrades_not_fails() {
        let engine = RankingEngine::new(
            EngineConfig::default(),
            Some(Arc::new(FailingEmbedder)),
            None,
        )
        .unwrap();

        let result = engine
            .rank_candidates_for_posting(
                &posting(),
                &[candidate_a(), candidate_b()],
                &MatchOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.results.len(), 2);
        for item in &result.results {
            assert!(item.explanation.embedding_score.is_degraded());
            assert_eq!(item.explanation.weights, BlendWeights::RULE_ONLY);
            assert!(item
                .explanation
                .degraded
                .iter()
                .any(|d| d.reason == DegradedReason::Unavailable));
        }
        // Rule-only ordering still holds.
        assert_eq!(result.results[0].candidate_id, 1);
    }

    #[tokio::test]
    async fn determinism_same_request_twice_is_identical() {
        let engine = RankingEngine::new(
            EngineConfig::default(),
            Some(Arc::new(HashEmbedder::default())),
            Some(Arc::new(OverlapCrossEncoder)),
        )
        .unwrap();

        let pool: Vec<Profile> = (0..30)
            .map(|i| Profile {
                id: i,
                skills: vec![
                    "python".into(),
                    if i % 2 == 0 { "sql".into() } else { "react".into() },
                ],
                ..Profile::default()
            })
            .collect();

        let first = engine
            .rank_candidates_for_posting(&posting(), &pool, &MatchOptions::default())
            .await
            .unwrap();
        let second = engine
            .rank_candidates_for_posting(&posting(), &pool, &MatchOptions::default())
            .await
            .unwrap();

        let order_first: Vec<i64> = first.results.iter().map(|r| r.candidate_id).collect();
        let order_second: Vec<i64> = second.results.iter().map(|r| r.candidate_id).collect();
        assert_eq!(order_first, order_second);

        for (x, y) in first.results.iter().zip(second.results.iter()) {
            assert_eq!(x.match_score, y.match_score);
            assert_eq!(x.explanation, y.explanation);
        }
    }

    #[tokio::test]
    async fn shortlist_bound_limits_cross_encoder_scores() {
        let engine = RankingEngine::new(
            EngineConfig::default(),
            Some(Arc::new(HashEmbedder::default())),
            Some(Arc::new(OverlapCrossEncoder)),
        )
        .unwrap();

        let pool: Vec<Profile> = (0..10)
            .map(|i| Profile {
                id: i,
                skills: vec!["python".into(), "sql".into()],
                ..Profile::default()
            })
            .collect();

        let options = MatchOptions {
            shortlist_size: Some(3),
            ..Default::default()
        };
        let result = engine
            .rank_candidates_for_posting(&posting(), &pool, &options)
            .await
            .unwrap();

        let with_cross = result
            .results
            .iter()
            .filter(|r| r.explanation.cross_encoder_score.value().is_some())
            .count();
        assert!(with_cross <= 3);
        assert_eq!(result.meta.shortlist_size, 3);
        assert_eq!(result.meta.reranked, with_cross);
    }

    #[tokio::test]
    async fn cross_encoder_reorders_within_shortlist_only() {
        // Rule-only blend; the cross-encoder sees full texts, so an
        // objective echoing the posting text can outrank a higher blended
        // score inside the shortlist.
        let engine = RankingEngine::new(
            EngineConfig::default(),
            None,
            Some(Arc::new(OverlapCrossEncoder)),
        )
        .unwrap();

        let posting = Posting {
            id: 100,
            title: "Search Intern".into(),
            required_skills: vec!["python".into(), "sql".into()],
            remote: true,
            ..Posting::default()
        };

        // Lower rule score, but text overlaps the posting heavily.
        let echoing = Profile {
            id: 1,
            skills: vec!["python".into()],
            objective: Some(
                "Internship search intern requires skills python sql remote true none".into(),
            ),
            ..Profile::default()
        };
        // Higher rule score, plain text.
        let stronger = Profile {
            id: 2,
            skills: vec!["python".into(), "sql".into()],
            ..Profile::default()
        };

        let result = engine
            .rank_candidates_for_posting(
                &posting,
                &[echoing, stronger],
                &MatchOptions::default(),
            )
            .await
            .unwrap();

        // Both are shortlisted; the echoing profile wins the rerank while
        // match_score still reflects the blended values.
        assert_eq!(result.results[0].candidate_id, 1);
        assert_eq!(result.results[1].candidate_id, 2);
        assert!(result.results[0].match_score < result.results[1].match_score);
        assert!(
            result.results[0].explanation.cross_encoder_score.value()
                > result.results[1].explanation.cross_encoder_score.value()
        );
    }

    #[tokio::test]
    async fn failed_rerank_keeps_blended_order() {
        let engine = RankingEngine::new(
            EngineConfig::default(),
            None,
            Some(Arc::new(FailingCrossEncoder)),
        )
        .unwrap();

        let result = engine
            .rank_candidates_for_posting(
                &posting(),
                &[candidate_b(), candidate_a()],
                &MatchOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.results[0].candidate_id, 1);
        assert_eq!(result.results[1].candidate_id, 2);
        assert_eq!(result.meta.reranked, 0);
        for item in &result.results {
            assert!(item.explanation.cross_encoder_score.is_degraded());
        }
    }

    #[tokio::test]
    async fn expired_deadline_falls_back_to_rule_only() {
        let config = EngineConfig {
            request_timeout_ms: 0,
            ..EngineConfig::default()
        };
        let engine = RankingEngine::new(
            config,
            Some(Arc::new(HashEmbedder::default())),
            Some(Arc::new(OverlapCrossEncoder)),
        )
        .unwrap();

        let result = engine
            .rank_candidates_for_posting(
                &posting(),
                &[candidate_a(), candidate_b()],
                &MatchOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.results.len(), 2);
        for item in &result.results {
            assert_eq!(
                item.explanation.embedding_score.degraded_reason(),
                Some(DegradedReason::DeadlineExceeded)
            );
            assert!(item.explanation.cross_encoder_score.is_degraded());
        }
    }

    #[tokio::test]
    async fn embedding_cache_avoids_repeat_model_calls() {
        let embedder = Arc::new(CountingEmbedder::new());
        let engine = RankingEngine::new(
            EngineConfig::default(),
            Some(Arc::clone(&embedder) as Arc<dyn EmbeddingProvider>),
            None,
        )
        .unwrap();

        let pool = [candidate_a(), candidate_b()];
        engine
            .rank_candidates_for_posting(&posting(), &pool, &MatchOptions::default())
            .await
            .unwrap();
        let after_first = embedder.calls.load(Ordering::SeqCst);
        assert_eq!(after_first, 3); // anchor + 2 candidates

        engine
            .rank_candidates_for_posting(&posting(), &pool, &MatchOptions::default())
            .await
            .unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), after_first);
    }

    #[tokio::test]
    async fn eligibility_gate_reports_rejections() {
        let engine = rule_only_engine();
        let posting = Posting {
            id: 5,
            required_skills: vec!["python".into()],
            min_year: Some(3),
            remote: false,
            location: Some("Pune".into()),
            ..Posting::default()
        };
        let too_junior = Profile {
            id: 1,
            skills: vec!["python".into()],
            year: Some(1),
            ..Profile::default()
        };
        let wrong_city = Profile {
            id: 2,
            skills: vec!["python".into()],
            location: Some("Mumbai".into()),
            ..Profile::default()
        };
        let fits = Profile {
            id: 3,
            skills: vec!["python".into()],
            year: Some(4),
            location: Some("Pune".into()),
            ..Profile::default()
        };

        let result = engine
            .rank_candidates_for_posting(
                &posting,
                &[too_junior, wrong_city, fits],
                &MatchOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].candidate_id, 3);
        assert_eq!(result.rejected.len(), 2);
        assert_eq!(result.rejected[0].candidate_id, 1);
        assert!(result.rejected[0].reasons[0].contains("minimum year"));
    }

    #[tokio::test]
    async fn invalid_weight_override_rejects_request() {
        let engine = rule_only_engine();
        let options = MatchOptions {
            weights: Some(BlendWeights {
                rule: 0.9,
                embedding: 0.9,
            }),
            ..Default::default()
        };
        let err = engine
            .rank_candidates_for_posting(&posting(), &[candidate_a()], &options)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidWeights { .. }));
    }

    #[tokio::test]
    async fn empty_anchor_rejects_request() {
        let engine = rule_only_engine();
        let empty = Posting {
            id: 9,
            ..Posting::default()
        };
        let err = engine
            .rank_candidates_for_posting(&empty, &[candidate_a()], &MatchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::EmptyAnchor { entity_id: 9 }));
    }

    #[tokio::test]
    async fn profile_anchor_direction_ranks_postings() {
        let engine = rule_only_engine();
        let profile = Profile {
            id: 50,
            skills: vec!["react".into(), "typescript".into()],
            ..Profile::default()
        };
        let frontend = Posting {
            id: 10,
            title: "Frontend Intern".into(),
            required_skills: vec!["react".into(), "typescript".into()],
            remote: true,
            ..Posting::default()
        };
        let backend = Posting {
            id: 11,
            title: "Backend Intern".into(),
            required_skills: vec!["golang".into()],
            remote: true,
            ..Posting::default()
        };

        let result = engine
            .rank_postings_for_profile(
                &profile,
                &[backend, frontend],
                &MatchOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(result.results[0].candidate_id, 10);
        assert!(result.results[0].match_score > result.results[1].match_score);
        // Coverage invariant is over the anchor profile's own skills.
        assert_eq!(
            result.results[0].matching_skills,
            vec!["react".to_string(), "typescript".to_string()]
        );
    }

    #[tokio::test]
    async fn blended_scores_use_embedding_signal() {
        let engine = RankingEngine::new(
            EngineConfig::default(),
            Some(Arc::new(HashEmbedder::default())),
            None,
        )
        .unwrap();

        let result = engine
            .rank_candidates_for_posting(
                &posting(),
                &[candidate_a()],
                &MatchOptions::default(),
            )
            .await
            .unwrap();

        let item = &result.results[0];
        let embedding = item.explanation.embedding_score.value().unwrap();
        let expected = round2(0.4 * item.explanation.rule_based_score + 0.6 * embedding);
        assert!((item.match_score - expected).abs() <= 0.01);
        assert_eq!(item.explanation.weights, BlendWeights::default());
    }

    #[tokio::test]
    async fn ties_break_by_candidate_id() {
        let engine = rule_only_engine();
        let twin = |id: i64| Profile {
            id,
            skills: vec!["python".into(), "sql".into(), "docker".into()],
            ..Profile::default()
        };

        let result = engine
            .rank_candidates_for_posting(
                &posting(),
                &[twin(7), twin(3), twin(5)],
                &MatchOptions::default(),
            )
            .await
            .unwrap();

        let order: Vec<i64> = result.results.iter().map(|r| r.candidate_id).collect();
        assert_eq!(order, vec![3, 5, 7]);
    }
}
