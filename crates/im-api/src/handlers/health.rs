use axum::Json;
use axum::http::StatusCode;
use serde_json::json;

pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "engine_version": im_engine::ENGINE_VERSION,
        "run_id": im_engine::run_id::process_id(),
    }))
}

pub async fn livez() -> StatusCode {
    StatusCode::OK
}
