use std::sync::Arc;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use uagen_backend::identity::{IdentityClient, TokenVerifier};
use uagen_backend::notify::NotificationHub;
use uagen_backend::reconciler::SessionReconciler;
use uagen_backend::store::RestProfileStore;
use uagen_backend::telegram::TelegramNotifier;
use uagen_backend::updater::UpdateChecker;
use uagen_backend::{logging, routes, AppState, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| config.logging.level.clone().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting UAGen Pro backend");

    // Initialize components
    let verifier = TokenVerifier::new(
        &config.identity.jwks_url,
        &config.identity.issuer,
        &config.identity.audience,
    );
    let identity = IdentityClient::new(&config.identity.base_url, &config.identity.api_key);
    let store = Arc::new(RestProfileStore::new(
        &config.store.base_url,
        &config.store.service_key,
    )?);
    let reconciler = SessionReconciler::new(store.clone());
    let notifications = Arc::new(NotificationHub::new(store.clone()));
    let telegram = TelegramNotifier::new(&config.telegram);
    if !telegram.is_configured() {
        tracing::warn!("Telegram forwarding disabled, pricing orders will be rejected");
    }

    let update_checker = Arc::new(UpdateChecker::new(&config.update));
    update_checker.start();

    let state = Arc::new(AppState {
        config: config.clone(),
        verifier,
        identity,
        store,
        reconciler,
        notifications,
        telegram,
        update_checker,
    });

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        .merge(routes::health::router(state.clone()))
        .nest("/api/auth", routes::auth::router(state.clone()))
        .nest("/api/notifications", routes::notifications::router(state.clone()))
        .nest("/api/pricing", routes::pricing::router(state.clone()))
        .nest("/admin", routes::admin::router(state.clone()))
        .layer(middleware::from_fn(logging::request_logger))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
