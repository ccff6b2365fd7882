use axum::{Json, extract::State};
use serde::Deserialize;

use im_engine::config::MatchOptions;
use im_engine::matching::{BlendWeights, RankedResultSet};
use im_engine::{Posting, Profile};

use crate::SharedState;
use crate::error::ApiError;

/// Rank a pool of student profiles for one posting.
#[derive(Debug, Deserialize)]
pub struct RankCandidatesRequest {
    pub posting: Posting,
    #[serde(default)]
    pub candidates: Vec<Profile>,
    #[serde(default)]
    pub weights: Option<BlendWeights>,
    #[serde(default)]
    pub shortlist_size: Option<usize>,
    #[serde(default)]
    pub rerank_enabled: Option<bool>,
}

/// Rank a pool of postings for one student profile.
#[derive(Debug, Deserialize)]
pub struct RankPostingsRequest {
    pub profile: Profile,
    #[serde(default)]
    pub postings: Vec<Posting>,
    #[serde(default)]
    pub weights: Option<BlendWeights>,
    #[serde(default)]
    pub shortlist_size: Option<usize>,
    #[serde(default)]
    pub rerank_enabled: Option<bool>,
}

fn options(
    weights: Option<BlendWeights>,
    shortlist_size: Option<usize>,
    rerank_enabled: Option<bool>,
) -> MatchOptions {
    MatchOptions {
        weights,
        shortlist_size,
        rerank_enabled,
    }
}

fn record_run(direction: &'static str, started: std::time::Instant, result: &RankedResultSet) {
    metrics::histogram!("im_match_duration_seconds", "direction" => direction)
        .record(started.elapsed().as_secs_f64());
    metrics::counter!("im_match_results_total", "direction" => direction)
        .increment(result.results.len() as u64);
    metrics::counter!("im_match_rejections_total", "direction" => direction)
        .increment(result.rejected.len() as u64);
}

pub async fn rank_candidates(
    State(state): State<SharedState>,
    Json(request): Json<RankCandidatesRequest>,
) -> Result<Json<RankedResultSet>, ApiError> {
    metrics::counter!("im_match_requests_total", "direction" => "candidates").increment(1);
    let started = std::time::Instant::now();

    let result = state
        .engine
        .rank_candidates_for_posting(
            &request.posting,
            &request.candidates,
            &options(request.weights, request.shortlist_size, request.rerank_enabled),
        )
        .await?;

    record_run("candidates", started, &result);
    Ok(Json(result))
}

pub async fn rank_postings(
    State(state): State<SharedState>,
    Json(request): Json<RankPostingsRequest>,
) -> Result<Json<RankedResultSet>, ApiError> {
    metrics::counter!("im_match_requests_total", "direction" => "postings").increment(1);
    let started = std::time::Instant::now();

    let result = state
        .engine
        .rank_postings_for_profile(
            &request.profile,
            &request.postings,
            &options(request.weights, request.shortlist_size, request.rerank_enabled),
        )
        .await?;

    record_run("postings", started, &result);
    Ok(Json(result))
}
