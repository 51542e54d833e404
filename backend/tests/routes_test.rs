//! Route guard smoke tests.
//!
//! Exercise the routers with `tower::ServiceExt::oneshot` against an
//! in-memory store. No identity provider is reachable, so every guarded
//! route must refuse anonymous and garbage-token requests.

use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use tower::ServiceExt;

use uagen_backend::config::{
    Config, CorsConfig, IdentityConfig, LoggingConfig, StoreConfig, TelegramConfig, UpdateConfig,
};
use uagen_backend::identity::{IdentityClient, TokenVerifier};
use uagen_backend::notify::NotificationHub;
use uagen_backend::reconciler::SessionReconciler;
use uagen_backend::telegram::TelegramNotifier;
use uagen_backend::test_util::MemoryProfileStore;
use uagen_backend::updater::UpdateChecker;
use uagen_backend::{routes, AppState};

fn create_test_state() -> Arc<AppState> {
    let config = Config {
        host: "0.0.0.0".to_string(),
        port: 8080,
        identity: IdentityConfig {
            base_url: "http://localhost:1".to_string(),
            api_key: "test-key".to_string(),
            issuer: "https://example.com".to_string(),
            audience: "test-project".to_string(),
            jwks_url: "http://localhost:1/jwks".to_string(),
        },
        store: StoreConfig {
            base_url: "http://localhost:1".to_string(),
            service_key: "service-key".to_string(),
        },
        telegram: TelegramConfig {
            bot_token: None,
            chat_id: None,
        },
        update: UpdateConfig {
            version_url: None,
            interval_secs: 30,
        },
        logging: LoggingConfig {
            level: "info".to_string(),
        },
        cors: CorsConfig {
            origins: "*".to_string(),
        },
    };

    let verifier = TokenVerifier::new(
        &config.identity.jwks_url,
        &config.identity.issuer,
        &config.identity.audience,
    );
    let identity = IdentityClient::new(&config.identity.base_url, &config.identity.api_key);
    let store = Arc::new(MemoryProfileStore::new());
    let reconciler = SessionReconciler::new(store.clone());
    let notifications = Arc::new(NotificationHub::new(store.clone()));
    let telegram = TelegramNotifier::new(&config.telegram);
    let update_checker = Arc::new(UpdateChecker::new(&config.update));

    Arc::new(AppState {
        config,
        verifier,
        identity,
        store,
        reconciler,
        notifications,
        telegram,
        update_checker,
    })
}

async fn send_request(
    app: &axum::Router,
    method: http::Method,
    uri: &str,
    body: Option<Bytes>,
) -> StatusCode {
    let mut req_builder = http::Request::builder().method(method).uri(uri);
    if body.is_some() {
        req_builder = req_builder.header("Content-Type", "application/json");
    }
    let req = req_builder
        .body(match body {
            Some(b) => axum::body::Body::from(b),
            None => axum::body::Body::empty(),
        })
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    response.status()
}

#[tokio::test]
async fn health_is_public() {
    let app = routes::health::router(create_test_state());
    let status = send_request(&app, http::Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn metrics_is_public() {
    let app = routes::health::router(create_test_state());
    let status = send_request(&app, http::Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn version_falls_back_to_package_version() {
    let app = routes::health::router(create_test_state());
    let status = send_request(&app, http::Method::GET, "/api/version", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_users_requires_auth() {
    let app = routes::admin::router(create_test_state());
    let status = send_request(&app, http::Method::GET, "/api/users", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_approvals_requires_auth() {
    let app = routes::admin::router(create_test_state());
    let status = send_request(&app, http::Method::GET, "/api/approvals", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_approve_requires_auth() {
    let app = routes::admin::router(create_test_state());
    let status = send_request(
        &app,
        http::Method::POST,
        "/api/approvals/00000000-0000-0000-0000-000000000000/approve",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_stats_requires_auth() {
    let app = routes::admin::router(create_test_state());
    let status = send_request(&app, http::Method::GET, "/api/stats", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_rejects_garbage_bearer_token() {
    let app = routes::admin::router(create_test_state());
    let req = http::Request::builder()
        .method(http::Method::GET)
        .uri("/api/users")
        .header("Authorization", "Bearer not-a-jwt")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn notifications_require_auth() {
    let app = routes::notifications::router(create_test_state());
    let status = send_request(&app, http::Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn notification_events_require_token() {
    let app = routes::notifications::router(create_test_state());
    let status =
        send_request(&app, http::Method::GET, "/events?token=not-a-jwt", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_requires_auth() {
    let app = routes::auth::router(create_test_state());
    let status = send_request(&app, http::Method::GET, "/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sign_out_is_fire_and_forget() {
    let app = routes::auth::router(create_test_state());
    let status = send_request(&app, http::Method::POST, "/sign-out", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn pricing_order_reports_missing_configuration() {
    let app = routes::pricing::router(create_test_state());
    let body = Bytes::from(r#"{"plan_name":"Pro","price":"$29","details":"email: a@x.com"}"#);
    let status = send_request(&app, http::Method::POST, "/order", Some(body)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
