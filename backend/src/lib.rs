pub mod config;
pub mod gate;
pub mod identity;
pub mod logging;
pub mod models;
pub mod notify;
pub mod reconciler;
pub mod routes;
pub mod store;
pub mod telegram;
pub mod updater;

pub mod test_util;

pub use config::{Config, ConfigError};
pub use gate::{decide, Decision, RouteClass};
pub use identity::{IdentityClient, IdentityError, TokenVerifier};
pub use models::profile::{ProfilePatch, ProfileRecord, DEFAULT_AGENT_LIMIT};
pub use notify::NotificationHub;
pub use reconciler::SessionReconciler;
pub use store::{NewNotification, ProfileStore, RestProfileStore, StoreError, StoreStats};
pub use telegram::{TelegramError, TelegramNotifier};
pub use updater::{UpdateChecker, VersionInfo};

use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub verifier: TokenVerifier,
    pub identity: IdentityClient,
    pub store: Arc<dyn ProfileStore>,
    pub reconciler: SessionReconciler,
    pub notifications: Arc<NotificationHub>,
    pub telegram: TelegramNotifier,
    pub update_checker: Arc<UpdateChecker>,
}
