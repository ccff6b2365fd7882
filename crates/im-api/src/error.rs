use axum::{Json, http::StatusCode, response::IntoResponse};
use im_engine::error::EngineError;
use serde::Serialize;
use std::{borrow::Cow, future::Future};
use thiserror::Error;
use tracing::error;

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Strip anything that could leak infrastructure detail (URLs, query
/// strings, filesystem paths) before a message leaves the process, and bound
/// its length.
fn sanitize_message(message: &str) -> String {
    const MAX_CHARS: usize = 240;

    let redacted = message
        .split_whitespace()
        .map(|token| {
            let token: String = token.chars().filter(|c| !c.is_control()).collect();
            if token.contains("://") {
                "[redacted-url]".to_string()
            } else if token.contains('?') {
                "[redacted-query]".to_string()
            } else if token.starts_with('/') || token.contains('\\') {
                "[redacted-path]".to_string()
            } else {
                token
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    let mut bounded: String = redacted.chars().take(MAX_CHARS).collect();
    if redacted.chars().count() > MAX_CHARS {
        bounded.push('…');
    }

    if bounded.trim().is_empty() {
        "unexpected error".to_string()
    } else {
        bounded
    }
}

pub async fn with_request_id<Fut, T>(request_id: Option<String>, fut: Fut) -> T
where
    Fut: Future<Output = T>,
{
    if let Some(request_id) = request_id {
        REQUEST_ID.scope(request_id, fut).await
    } else {
        fut.await
    }
}

pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(|value| value.clone()).ok()
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
    request_id: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let code = self.code();
        let request_id = current_request_id();

        error!(
            code,
            status = %status,
            request_id = request_id.as_deref().unwrap_or(""),
            error = %self,
            "api_error"
        );

        let body = Json(ErrorResponse {
            code,
            message: self.public_message().into_owned(),
            request_id,
        });

        (status, body).into_response()
    }
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Internal(_) => "internal_error",
        }
    }

    fn public_message(&self) -> Cow<'static, str> {
        match self {
            ApiError::BadRequest(msg) => Cow::Owned(sanitize_message(msg)),
            ApiError::NotFound(msg) => Cow::Owned(sanitize_message(msg)),
            ApiError::Internal(_) => Cow::Borrowed("internal server error"),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(value: EngineError) -> Self {
        match value {
            // Input errors are the caller's to fix.
            err @ (EngineError::InvalidWeights { .. } | EngineError::EmptyAnchor { .. }) => {
                ApiError::BadRequest(err.to_string())
            }
            // Invariant violations are ours.
            EngineError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}
