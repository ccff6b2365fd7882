use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use tracing::info;

use im_api::{AppConfig, AppState, create_router, error::ApiError};
use im_engine::config::EngineConfig;
use im_engine::embedding::{self, HashEmbedder};
use im_engine::matching::RankingEngine;
use im_engine::rerank;

#[derive(Debug, Clone, Parser)]
#[command(name = "im-api", about = "HTTP API for the intern-match ranking engine")]
struct Cli {
    /// Server port
    #[arg(long, env = "IM_PORT", default_value_t = 3002)]
    port: u16,

    /// Comma separated list of allowed CORS origins
    #[arg(long, env = "IM_CORS_ORIGINS", default_value = "http://localhost:3000")]
    cors_origins: String,

    /// Embedding provider: hash | http | none
    #[arg(long, env = "IM_EMBEDDER", default_value = "hash")]
    embedder: String,

    /// Cross-encoder provider: overlap | http | none
    #[arg(long, env = "IM_CROSS_ENCODER", default_value = "overlap")]
    cross_encoder: String,
}

async fn run() -> Result<(), ApiError> {
    dotenv().ok();
    im_engine::logging::init_tracing_subscriber("im-api");
    im_engine::logging::install_tracing_panic_hook("im-api");

    let cli = Cli::parse();
    im_metrics::init_metrics(9102);

    let cors_origins = cli
        .cors_origins
        .split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect::<Vec<_>>();

    let dimension = std::env::var("IM_EMBEDDING_DIMENSION")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(HashEmbedder::DEFAULT_DIMENSION);

    let engine = RankingEngine::new(
        EngineConfig::from_env(),
        embedding::create_provider(&cli.embedder, dimension),
        rerank::create_cross_encoder(&cli.cross_encoder),
    )?;

    let config = AppConfig {
        port: cli.port,
        cors_origins,
    };
    let state = Arc::new(AppState {
        engine,
        config: config.clone(),
    });

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let app = create_router(state);

    info!(
        %addr,
        embedder = %cli.embedder,
        cross_encoder = %cli.cross_encoder,
        run_id = im_engine::run_id::process_id(),
        "im-api listening"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    axum::serve(listener, app)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!(error = %err, "im-api failed");
        std::process::exit(1);
    }
}
