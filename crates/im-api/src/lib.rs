pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    http::Method,
    http::header::{CONTENT_TYPE, HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use ulid::Ulid;

use im_engine::config::EngineConfig;
use im_engine::embedding::HashEmbedder;
use im_engine::matching::RankingEngine;
use im_engine::rerank::OverlapCrossEncoder;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3002,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

pub struct AppState {
    pub engine: RankingEngine,
    pub config: AppConfig,
}

pub type SharedState = Arc<AppState>;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(REQUEST_ID_HEADER)])
}

/// Propagate the caller's `x-request-id` (or mint one) through the handler's
/// task-local scope and echo it on the response.
async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Ulid::new().to_string());

    let mut response =
        error::with_request_id(Some(request_id.clone()), next.run(request)).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(
            HeaderName::from_static(REQUEST_ID_HEADER),
            value,
        );
    }
    response
}

pub fn create_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let api_routes = Router::new()
        .route("/match/candidates", post(handlers::matches::rank_candidates))
        .route("/match/postings", post(handlers::matches::rank_postings));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/livez", get(handlers::health::livez))
        .nest("/api", api_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// State for integration tests: default config, in-process embedder and
/// cross-encoder, no network.
pub fn test_state() -> SharedState {
    let engine = RankingEngine::new(
        EngineConfig::default(),
        Some(Arc::new(HashEmbedder::default())),
        Some(Arc::new(OverlapCrossEncoder)),
    )
    .expect("default config is valid");

    Arc::new(AppState {
        engine,
        config: AppConfig::default(),
    })
}
