//! Pricing routes.
//!
//! Orders are public: the pricing page is reachable before sign-in, so
//! the order endpoint takes no Bearer token. Each order is forwarded to
//! the sales Telegram chat.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::telegram::TelegramError;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct OrderRequest {
    plan_name: String,
    price: String,
    #[serde(default)]
    details: String,
}

#[derive(Debug, Serialize)]
struct OrderResponse {
    success: bool,
    message: String,
}

/// POST /api/pricing/order - Forward a plan order to the sales chat.
async fn place_order(
    State(state): State<Arc<AppState>>,
    Json(body): Json<OrderRequest>,
) -> Response {
    match state
        .telegram
        .send_order(&body.plan_name, &body.price, &body.details)
        .await
    {
        Ok(()) => {
            tracing::info!(plan = %body.plan_name, "pricing order forwarded");
            Json(OrderResponse {
                success: true,
                message: "Order received".to_string(),
            })
            .into_response()
        }
        Err(TelegramError::NotConfigured) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Order forwarding is not configured" })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("order forwarding failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/order", post(place_order))
        .with_state(state)
}
