use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{EmbeddingError, EmbeddingProvider};

const DEFAULT_MODEL: &str = "all-mpnet-base-v2";
const DEFAULT_DIMENSION: usize = 768;
const DEFAULT_CALL_TIMEOUT_MS: u64 = 1_500;
const DEFAULT_RETRIES: u32 = 2;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 100;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Client for a remote `embed(text) -> vector` endpoint.
///
/// Each call carries its own timeout and a small bounded number of retries
/// with exponential backoff; anything still failing after that surfaces as
/// an `EmbeddingError` for the pipeline to absorb into degraded mode.
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimension: usize,
    retries: u32,
    retry_backoff: Duration,
}

impl HttpEmbedder {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
        call_timeout: Duration,
        retries: u32,
        retry_backoff: Duration,
    ) -> Result<Self, EmbeddingError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(EmbeddingError::Config("empty embedding endpoint".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(call_timeout)
            .build()
            .map_err(|err| EmbeddingError::Config(err.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            model: model.into(),
            dimension,
            retries,
            retry_backoff,
        })
    }

    /// Build from `IM_EMBEDDING_URL` and friends.
    pub fn from_env() -> Result<Self, EmbeddingError> {
        let endpoint = std::env::var("IM_EMBEDDING_URL")
            .map_err(|_| EmbeddingError::Config("IM_EMBEDDING_URL is not set".into()))?;
        let model =
            std::env::var("IM_EMBEDDING_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let dimension = env_parse("IM_EMBEDDING_DIMENSION").unwrap_or(DEFAULT_DIMENSION);
        let call_timeout =
            Duration::from_millis(env_parse("IM_EMBEDDING_CALL_TIMEOUT_MS").unwrap_or(DEFAULT_CALL_TIMEOUT_MS));
        let retries = env_parse("IM_MODEL_RETRIES").unwrap_or(DEFAULT_RETRIES);
        let retry_backoff =
            Duration::from_millis(env_parse("IM_MODEL_RETRY_BACKOFF_MS").unwrap_or(DEFAULT_RETRY_BACKOFF_MS));

        Self::new(endpoint, model, dimension, call_timeout, retries, retry_backoff)
    }

    async fn call_once(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest {
                text,
                model: &self.model,
            })
            .send()
            .await
            .map_err(|err| EmbeddingError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::Request(format!(
                "embedding endpoint returned {status}"
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|err| EmbeddingError::Request(err.to_string()))?;

        if body.embedding.is_empty() {
            return Err(EmbeddingError::EmptyVector);
        }
        if body.embedding.len() != self.dimension {
            return Err(EmbeddingError::Dimension {
                expected: self.dimension,
                actual: body.embedding.len(),
            });
        }

        Ok(body.embedding)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

#[async_trait]
impl EmbeddingProvider for HttpEmbedder {
    fn name(&self) -> &'static str {
        "http"
    }

    fn version(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut last_err = None;

        for attempt in 0..=self.retries {
            if attempt > 0 {
                // Exponential backoff between attempts: backoff, 2*backoff, ...
                tokio::time::sleep(self.retry_backoff * (1 << (attempt - 1))).await;
            }

            match self.call_once(text).await {
                Ok(vector) => return Ok(vector),
                // Dimension/empty-vector problems are contract violations a
                // retry will not fix.
                Err(err @ (EmbeddingError::Dimension { .. } | EmbeddingError::EmptyVector)) => {
                    return Err(err);
                }
                Err(err) => {
                    warn!(attempt, error = %err, "embedding call failed");
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| EmbeddingError::Request("no attempts made".into())))
    }
}
