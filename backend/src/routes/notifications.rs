//! Notification routes.
//!
//! List and read-state endpoints are guarded by [`require_user`]. The SSE
//! stream authenticates via a query parameter instead, since EventSource
//! cannot set request headers.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{delete, get, post},
    Extension, Json, Router,
};
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use uagen_common::{AuthUser, Notification};

use crate::gate::{self, Decision, RouteClass};
use crate::routes::require_user;
use crate::store::StoreError;
use crate::AppState;

const LIST_LIMIT: u32 = 50;

fn store_error_response(err: StoreError) -> Response {
    match err {
        StoreError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Notification not found" })),
        )
            .into_response(),
        other => {
            tracing::error!("notification store request failed: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Profile store unavailable" })),
            )
                .into_response()
        }
    }
}

/// Resolve the caller's profile row id from the reconciled view. The view
/// carries the identity uid; notification rows are keyed by the store's
/// own id.
async fn caller_id(state: &AppState, user: &AuthUser) -> Result<Uuid, Response> {
    match state.store.fetch_by_identity(&user.uid).await {
        Ok(Some(record)) => Ok(record.id),
        Ok(None) => Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "No profile for this account" })),
        )
            .into_response()),
        Err(e) => Err(store_error_response(e)),
    }
}

#[derive(Debug, Serialize)]
struct NotificationsResponse {
    notifications: Vec<Notification>,
    unread: usize,
}

/// GET /api/notifications - The caller's most recent notifications.
async fn list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Response {
    let user_id = match caller_id(&state, &user).await {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.store.list_notifications(user_id, LIST_LIMIT).await {
        Ok(notifications) => {
            let unread = notifications.iter().filter(|n| !n.is_read).count();
            Json(NotificationsResponse {
                notifications,
                unread,
            })
            .into_response()
        }
        Err(e) => store_error_response(e),
    }
}

/// POST /api/notifications/:id/read - Mark one notification as read.
async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Response {
    let user_id = match caller_id(&state, &user).await {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.store.mark_notification_read(id, user_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => store_error_response(e),
    }
}

/// POST /api/notifications/read-all - Mark all of the caller's
/// notifications as read.
async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Response {
    let user_id = match caller_id(&state, &user).await {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.store.mark_all_notifications_read(user_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => store_error_response(e),
    }
}

/// DELETE /api/notifications/:id - Delete one of the caller's
/// notifications.
async fn remove(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Response {
    let user_id = match caller_id(&state, &user).await {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.store.delete_notification(id, user_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => store_error_response(e),
    }
}

/// Query parameters for SSE authentication.
#[derive(Deserialize)]
struct SseAuthQuery {
    token: String,
}

/// GET /api/notifications/events - SSE stream of the caller's
/// notifications as they are published.
async fn events(
    State(state): State<Arc<AppState>>,
    Query(auth): Query<SseAuthQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, StatusCode> {
    let session = state
        .verifier
        .verify(&auth.token)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let user = state.reconciler.observe_session(&session).await;
    match gate::decide(Some(&user), false, RouteClass::UserArea) {
        Decision::Allow => {}
        Decision::RedirectToPendingApproval => return Err(StatusCode::FORBIDDEN),
        _ => return Err(StatusCode::UNAUTHORIZED),
    }

    let user_id = match state.store.fetch_by_identity(&session.uid).await {
        Ok(Some(record)) => record.id,
        _ => return Err(StatusCode::FORBIDDEN),
    };

    let rx = state.notifications.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(notification) if notification.user_id == user_id => {
            match serde_json::to_string(&notification) {
                Ok(data) => Some(Ok(Event::default().event("notification").data(data))),
                Err(_) => None,
            }
        }
        Ok(_) => None,
        // Skip lagged errors
        Err(_) => None,
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

/// Build the notifications router.
pub fn router(state: Arc<AppState>) -> Router {
    // SSE endpoint with query-based auth (separate from middleware-protected routes)
    let sse_routes = Router::new()
        .route("/events", get(events))
        .with_state(state.clone());

    let guarded = Router::new()
        .route("/", get(list))
        .route("/read-all", post(mark_all_read))
        .route("/:id/read", post(mark_read))
        .route("/:id", delete(remove))
        .layer(middleware::from_fn_with_state(state.clone(), require_user))
        .with_state(state);

    sse_routes.merge(guarded)
}
