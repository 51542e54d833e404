//! Authentication routes.
//!
//! Credential operations are proxied to the identity provider; the
//! session view itself is derived per request from the Bearer token, so
//! these handlers never store tokens. Sign-out only clears the published
//! view, tokens stay valid until they expire.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::identity::{bearer_token, IdentityError, SignInResponse};
use crate::AppState;

#[derive(Debug, Deserialize)]
struct CredentialsRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct ProviderSignInRequest {
    provider_id: String,
    credential: String,
}

#[derive(Debug, Deserialize)]
struct PasswordResetRequest {
    email: String,
}

/// Session payload returned to the client after a credential exchange.
#[derive(Debug, Serialize)]
struct SessionResponse {
    uid: String,
    id_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
}

impl From<SignInResponse> for SessionResponse {
    fn from(r: SignInResponse) -> Self {
        SessionResponse {
            uid: r.local_id,
            id_token: r.id_token,
            refresh_token: r.refresh_token,
            email: r.email,
            display_name: r.display_name,
        }
    }
}

fn error_response(err: IdentityError) -> Response {
    match err {
        // Provider rejections carry the provider's own reason code so the
        // client can tell a bad password from a disabled account.
        IdentityError::Rejected(message) => {
            (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
        }
        IdentityError::MissingHeader | IdentityError::InvalidFormat => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Authentication required" })),
        )
            .into_response(),
        other => {
            tracing::error!("identity provider request failed: {}", other);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "Identity provider unavailable" })),
            )
                .into_response()
        }
    }
}

/// POST /api/auth/sign-in - Exchange email/password for a session.
async fn sign_in(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CredentialsRequest>,
) -> Response {
    match state.identity.sign_in(&body.email, &body.password).await {
        Ok(session) => Json(SessionResponse::from(session)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/auth/sign-up - Create an account and send the verification
/// email.
async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CredentialsRequest>,
) -> Response {
    match state.identity.sign_up(&body.email, &body.password).await {
        Ok(session) => {
            (StatusCode::CREATED, Json(SessionResponse::from(session))).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST /api/auth/sign-in-with-provider - Exchange an OAuth credential
/// for a session.
async fn sign_in_with_provider(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ProviderSignInRequest>,
) -> Response {
    match state
        .identity
        .sign_in_with_provider(&body.provider_id, &body.credential)
        .await
    {
        Ok(session) => Json(SessionResponse::from(session)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/auth/sign-out - Clear the published session view.
async fn sign_out(State(state): State<Arc<AppState>>) -> StatusCode {
    state.reconciler.observe(None).await;
    StatusCode::NO_CONTENT
}

/// POST /api/auth/password-reset - Ask the provider to send a reset
/// email.
async fn password_reset(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PasswordResetRequest>,
) -> Response {
    match state.identity.send_password_reset(&body.email).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/auth/resend-verification - Re-send the address verification
/// email for the caller's session.
async fn resend_verification(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let token = match bearer_token(&headers) {
        Ok(token) => token,
        Err(e) => return error_response(e),
    };
    match state.identity.send_verification(token).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/auth/me - The caller's reconciled account view.
async fn me(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    match state.verifier.authenticate(&headers).await {
        Ok(session) => {
            let user = state.reconciler.observe_session(&session).await;
            Json(user).into_response()
        }
        Err(e) => error_response(e),
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sign-in", post(sign_in))
        .route("/sign-up", post(sign_up))
        .route("/sign-in-with-provider", post(sign_in_with_provider))
        .route("/sign-out", post(sign_out))
        .route("/password-reset", post(password_reset))
        .route("/resend-verification", post(resend_verification))
        .route("/me", get(me))
        .with_state(state)
}
