use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{CrossEncoder, CrossEncoderError};

const DEFAULT_MODEL: &str = "ms-marco-minilm-l6-v2";
const DEFAULT_CALL_TIMEOUT_MS: u64 = 1_500;
const DEFAULT_RETRIES: u32 = 2;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 100;

#[derive(Serialize)]
struct ScorePairRequest<'a> {
    text_a: &'a str,
    text_b: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct ScorePairResponse {
    score: f64,
}

/// Client for a remote `score_pair(text_a, text_b) -> relevance` endpoint.
///
/// Raw model scores are mapped onto 0..=100 through a configured
/// `[score_min, score_max]` window, since cross-encoder output ranges vary
/// by model family.
pub struct HttpCrossEncoder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    score_min: f64,
    score_max: f64,
    retries: u32,
    retry_backoff: Duration,
}

impl HttpCrossEncoder {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        score_min: f64,
        score_max: f64,
        call_timeout: Duration,
        retries: u32,
        retry_backoff: Duration,
    ) -> Result<Self, CrossEncoderError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(CrossEncoderError::Config("empty cross-encoder endpoint".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(call_timeout)
            .build()
            .map_err(|err| CrossEncoderError::Config(err.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            model: model.into(),
            score_min,
            score_max,
            retries,
            retry_backoff,
        })
    }

    /// Build from `IM_CROSS_ENCODER_URL` and friends.
    pub fn from_env() -> Result<Self, CrossEncoderError> {
        let endpoint = std::env::var("IM_CROSS_ENCODER_URL")
            .map_err(|_| CrossEncoderError::Config("IM_CROSS_ENCODER_URL is not set".into()))?;
        let model =
            std::env::var("IM_CROSS_ENCODER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let score_min = env_parse("IM_CROSS_ENCODER_SCORE_MIN").unwrap_or(0.0);
        let score_max = env_parse("IM_CROSS_ENCODER_SCORE_MAX").unwrap_or(1.0);
        let call_timeout = Duration::from_millis(
            env_parse("IM_CROSS_ENCODER_CALL_TIMEOUT_MS").unwrap_or(DEFAULT_CALL_TIMEOUT_MS),
        );
        let retries = env_parse("IM_MODEL_RETRIES").unwrap_or(DEFAULT_RETRIES);
        let retry_backoff = Duration::from_millis(
            env_parse("IM_MODEL_RETRY_BACKOFF_MS").unwrap_or(DEFAULT_RETRY_BACKOFF_MS),
        );

        Self::new(endpoint, model, score_min, score_max, call_timeout, retries, retry_backoff)
    }

    /// Map a raw model score onto 0..=100. Degenerate windows
    /// (`score_max <= score_min`) fall back to clamping only.
    fn normalize(&self, raw: f64) -> f64 {
        if self.score_max <= self.score_min {
            return raw.clamp(0.0, 100.0);
        }
        ((raw - self.score_min) / (self.score_max - self.score_min) * 100.0).clamp(0.0, 100.0)
    }

    async fn call_once(&self, text_a: &str, text_b: &str) -> Result<f64, CrossEncoderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ScorePairRequest {
                text_a,
                text_b,
                model: &self.model,
            })
            .send()
            .await
            .map_err(|err| CrossEncoderError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrossEncoderError::Request(format!(
                "cross-encoder endpoint returned {status}"
            )));
        }

        let body: ScorePairResponse = response
            .json()
            .await
            .map_err(|err| CrossEncoderError::Request(err.to_string()))?;

        if !body.score.is_finite() {
            return Err(CrossEncoderError::InvalidScore);
        }

        Ok(self.normalize(body.score))
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

#[async_trait]
impl CrossEncoder for HttpCrossEncoder {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn score_pair(
        &self,
        anchor_text: &str,
        candidate_text: &str,
    ) -> Result<f64, CrossEncoderError> {
        let mut last_err = None;

        for attempt in 0..=self.retries {
            if attempt > 0 {
                tokio::time::sleep(self.retry_backoff * (1 << (attempt - 1))).await;
            }

            match self.call_once(anchor_text, candidate_text).await {
                Ok(score) => return Ok(score),
                Err(err @ CrossEncoderError::InvalidScore) => return Err(err),
                Err(err) => {
                    warn!(attempt, error = %err, "cross-encoder call failed");
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| CrossEncoderError::Request("no attempts made".into())))
    }
}
