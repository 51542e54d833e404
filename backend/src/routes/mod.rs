//! HTTP routes.
//!
//! Guarded routes share the middleware in this module: every request is
//! authenticated against the identity provider, reconciled with the
//! profile store, and classified by the route gate before a handler
//! runs. Handlers receive the reconciled [`AuthUser`] as an extension.

pub mod admin;
pub mod auth;
pub mod health;
pub mod notifications;
pub mod pricing;

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use uagen_common::AuthUser;

use crate::gate::{self, Decision, RouteClass};
use crate::AppState;

/// Authenticate the request and reconcile its session into an `AuthUser`
/// view. An invalid or missing token yields `None` (anonymous), which the
/// gate turns into the login redirect.
async fn observe_request(state: &AppState, headers: &header::HeaderMap) -> Option<AuthUser> {
    let session = match state.verifier.authenticate(headers).await {
        Ok(session) => session,
        Err(e) => {
            tracing::debug!("request authentication failed: {}", e);
            return None;
        }
    };
    Some(state.reconciler.observe_session(&session).await)
}

/// Translate a gate decision into an HTTP response. `Allow` is handled by
/// the callers; everything else terminates the request here.
fn decision_response(decision: Decision) -> Response {
    match decision {
        Decision::Allow => StatusCode::OK.into_response(),
        Decision::Wait => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "Session state not ready" })),
        )
            .into_response(),
        Decision::RedirectToLogin => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Authentication required", "redirect_to": "/login" })),
        )
            .into_response(),
        Decision::RedirectToPendingApproval => (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "Account pending approval",
                "redirect_to": "/pending-approval"
            })),
        )
            .into_response(),
        Decision::RedirectToUserHome => (
            StatusCode::SEE_OTHER,
            [(header::LOCATION, "/dashboard")],
        )
            .into_response(),
        Decision::RedirectToUnauthorized => (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Admin access required", "redirect_to": "/unauthorized" })),
        )
            .into_response(),
    }
}

async fn guard(
    state: Arc<AppState>,
    mut request: Request,
    next: Next,
    route: RouteClass,
) -> Response {
    let user = observe_request(&state, request.headers()).await;
    match gate::decide(user.as_ref(), false, route) {
        Decision::Allow => {
            // Allow implies Some(user).
            if let Some(user) = user {
                request.extensions_mut().insert(user);
            }
            next.run(request).await
        }
        decision => decision_response(decision),
    }
}

/// Middleware that requires an approved authenticated user.
pub async fn require_user(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    guard(state, request, next, RouteClass::UserArea).await
}

/// Middleware that requires an approved admin user.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    guard(state, request, next, RouteClass::AdminAction).await
}
