use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use serde::Serialize;
use serde_json::json;

use crate::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn metrics() -> Response {
    let version = env!("CARGO_PKG_VERSION");
    let body = format!(
        "# HELP uagen_up Whether the service is up\n\
         # TYPE uagen_up gauge\n\
         uagen_up 1\n\
         # HELP uagen_info Service information\n\
         # TYPE uagen_info gauge\n\
         uagen_info{{version=\"{}\"}} 1\n",
        version
    );
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

/// GET /api/version - Latest deployment manifest seen by the poller.
async fn version(State(state): State<Arc<AppState>>) -> Response {
    match state.update_checker.latest() {
        Some(info) => Json(info).into_response(),
        None => Json(json!({ "version": env!("CARGO_PKG_VERSION") })).into_response(),
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api/version", get(version))
        .with_state(state)
}
