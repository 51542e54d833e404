//! Admin API routes.
//!
//! All endpoints are JSON APIs for the admin dashboard, guarded by
//! [`require_admin`]: the caller must hold an approved admin account.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use uagen_common::Role;

use crate::models::profile::ProfileRecord;
use crate::notify::NotificationHub;
use crate::routes::require_admin;
use crate::store::{StoreError, StoreStats};
use crate::AppState;

fn store_error_response(err: StoreError) -> Response {
    match err {
        StoreError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "User not found" })),
        )
            .into_response(),
        other => {
            tracing::error!("profile store request failed: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Profile store unavailable" })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Serialize)]
struct UsersResponse {
    users: Vec<ProfileRecord>,
    total: usize,
}

/// GET /admin/api/users - List all accounts.
async fn list_users(State(state): State<Arc<AppState>>) -> Response {
    match state.store.list_users().await {
        Ok(users) => {
            let total = users.len();
            Json(UsersResponse { users, total }).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

/// GET /admin/api/approvals - List accounts awaiting approval.
async fn list_pending(State(state): State<Arc<AppState>>) -> Response {
    match state.store.list_pending().await {
        Ok(users) => {
            let total = users.len();
            Json(UsersResponse { users, total }).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

async fn approve_one(state: &AppState, id: Uuid) -> Result<ProfileRecord, StoreError> {
    let record = state.store.set_approval(id, true).await?;
    state
        .notifications
        .publish(NotificationHub::approval_notice(record.id))
        .await?;
    Ok(record)
}

/// POST /admin/api/approvals/:id/approve - Approve an account and notify
/// its owner.
async fn approve_user(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    match approve_one(&state, id).await {
        Ok(record) => {
            tracing::info!(user_id = %record.id, "account approved");
            Json(record).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

/// POST /admin/api/approvals/:id/reject - Reject a pending account by
/// deleting its row.
async fn reject_user(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    match state.store.delete(id).await {
        Ok(()) => {
            tracing::info!(user_id = %id, "account rejected");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => store_error_response(e),
    }
}

#[derive(Debug, Serialize)]
struct ApproveAllResponse {
    approved: usize,
}

/// POST /admin/api/approvals/approve-all - Approve every pending account.
async fn approve_all(State(state): State<Arc<AppState>>) -> Response {
    let pending = match state.store.list_pending().await {
        Ok(pending) => pending,
        Err(e) => return store_error_response(e),
    };
    let mut approved = 0;
    for record in pending {
        match approve_one(&state, record.id).await {
            Ok(_) => approved += 1,
            Err(e) => {
                tracing::error!(user_id = %record.id, "bulk approval failed: {}", e);
            }
        }
    }
    Json(ApproveAllResponse { approved }).into_response()
}

#[derive(Debug, Deserialize)]
struct SetRoleRequest {
    role: Role,
}

/// PATCH /admin/api/users/:id/role - Change an account's role.
async fn set_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<SetRoleRequest>,
) -> Response {
    match state.store.set_role(id, body.role).await {
        Ok(record) => {
            tracing::info!(user_id = %record.id, role = ?body.role, "role changed");
            Json(record).into_response()
        }
        Err(e) => store_error_response(e),
    }
}

#[derive(Debug, Deserialize)]
struct SetLimitRequest {
    agent_limit: i64,
    #[serde(default = "default_custom")]
    custom: bool,
}

fn default_custom() -> bool {
    true
}

/// PATCH /admin/api/users/:id/limit - Override an account's generation
/// budget.
async fn set_limit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<SetLimitRequest>,
) -> Response {
    if body.agent_limit < 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Limit must be non-negative" })),
        )
            .into_response();
    }
    match state
        .store
        .set_agent_limit(id, body.agent_limit, body.custom)
        .await
    {
        Ok(record) => Json(record).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// GET /admin/api/stats - Dashboard counters.
async fn stats(State(state): State<Arc<AppState>>) -> Response {
    match state.store.stats().await {
        Ok(stats) => Json::<StoreStats>(stats).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// Build the admin router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/:id/role", patch(set_role))
        .route("/api/users/:id/limit", patch(set_limit))
        .route("/api/approvals", get(list_pending))
        .route("/api/approvals/approve-all", post(approve_all))
        .route("/api/approvals/:id/approve", post(approve_user))
        .route("/api/approvals/:id/reject", post(reject_user))
        .route("/api/stats", get(stats))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_role_request_accepts_known_roles() {
        let req: SetRoleRequest = serde_json::from_str(r#"{"role":"admin"}"#).unwrap();
        assert_eq!(req.role, Role::Admin);
        assert!(serde_json::from_str::<SetRoleRequest>(r#"{"role":"root"}"#).is_err());
    }

    #[test]
    fn set_limit_request_defaults_to_custom() {
        let req: SetLimitRequest = serde_json::from_str(r#"{"agent_limit":1000}"#).unwrap();
        assert_eq!(req.agent_limit, 1000);
        assert!(req.custom);
    }
}
