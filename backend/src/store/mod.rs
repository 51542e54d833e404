//! Profile store access.
//!
//! The profile store is a hosted relational database reached over its REST
//! surface. Everything goes through the [`ProfileStore`] trait so the
//! reconciler and the admin routes can be exercised against an in-memory
//! store in tests.

mod rest;

pub use rest::RestProfileStore;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use uagen_common::{Notification, NotificationKind, Role};

use crate::models::profile::{ProfilePatch, ProfileRecord};

/// Budget for a single store round trip. Slower than this is treated as a
/// store failure so reconciliation can degrade instead of hanging.
pub const STORE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Row not found")]
    NotFound,
    #[error("Unique constraint violation")]
    Conflict,
    #[error("Profile store timed out")]
    Timeout,
    #[error("Profile store error: {0}")]
    Backend(String),
}

/// Aggregate counters for the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_users: u64,
    pub pending_approvals: u64,
    pub approved_users: u64,
    pub active_today: u64,
}

/// Insert shape for a notification row.
#[derive(Debug, Clone, Serialize)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub action_url: Option<String>,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch the profile row for an identity uid, if one exists.
    async fn fetch_by_identity(
        &self,
        identity_uid: &str,
    ) -> Result<Option<ProfileRecord>, StoreError>;

    /// Atomically create the profile row for a first-time identity.
    ///
    /// The very first row store-wide is claimed as the approved admin;
    /// every later row starts unapproved with the `user` role. Returns
    /// [`StoreError::Conflict`] when a row for this identity already
    /// exists, so a duplicate concurrent create can be retried as an
    /// update by the caller.
    async fn create_for_session(&self, patch: &ProfilePatch) -> Result<ProfileRecord, StoreError>;

    /// Overwrite the mirrored identity fields and `last_login`, leaving
    /// approval, role, limits and subscription untouched. Returns the
    /// updated row.
    async fn refresh_mirrored(&self, patch: &ProfilePatch) -> Result<ProfileRecord, StoreError>;

    /// Number of profile rows store-wide.
    async fn count(&self) -> Result<u64, StoreError>;

    async fn fetch_by_id(&self, id: Uuid) -> Result<Option<ProfileRecord>, StoreError>;
    async fn list_users(&self) -> Result<Vec<ProfileRecord>, StoreError>;
    async fn list_pending(&self) -> Result<Vec<ProfileRecord>, StoreError>;
    async fn set_approval(&self, id: Uuid, approved: bool) -> Result<ProfileRecord, StoreError>;
    async fn set_role(&self, id: Uuid, role: Role) -> Result<ProfileRecord, StoreError>;
    async fn set_agent_limit(
        &self,
        id: Uuid,
        limit: i64,
        custom: bool,
    ) -> Result<ProfileRecord, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
    async fn stats(&self) -> Result<StoreStats, StoreError>;

    async fn insert_notification(
        &self,
        new: &NewNotification,
    ) -> Result<Notification, StoreError>;
    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> Result<Vec<Notification>, StoreError>;
    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> Result<(), StoreError>;
    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<(), StoreError>;
    async fn delete_notification(&self, id: Uuid, user_id: Uuid) -> Result<(), StoreError>;
}
