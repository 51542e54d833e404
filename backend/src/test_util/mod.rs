//! Test doubles shared by unit and integration tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use uagen_common::{IdentitySession, Notification, Role, SubscriptionPlan};

use crate::models::profile::{ProfilePatch, ProfileRecord, DEFAULT_AGENT_LIMIT};
use crate::store::{NewNotification, ProfileStore, StoreError, StoreStats};

pub fn session(uid: &str, email: &str) -> IdentitySession {
    IdentitySession {
        uid: uid.to_string(),
        email: Some(email.to_string()),
        email_verified: true,
        display_name: None,
    }
}

#[derive(Default)]
struct MemoryState {
    rows: Vec<ProfileRecord>,
    notifications: Vec<Notification>,
    failing: bool,
    delay: Option<Duration>,
    hidden_uids: HashSet<String>,
}

/// In-memory [`ProfileStore`] with the same bootstrap and conflict
/// semantics as the hosted store, plus failure and latency injection.
#[derive(Default)]
pub struct MemoryProfileStore {
    state: Mutex<MemoryState>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with a backend error.
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    /// Delay every operation by the given duration.
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    /// Make `fetch_by_identity` report no row for this uid even though one
    /// exists. Simulates losing a create race: the caller sees no row,
    /// inserts, and hits the unique constraint.
    pub fn hide_from_fetch(&self, identity_uid: &str) {
        self.state
            .lock()
            .unwrap()
            .hidden_uids
            .insert(identity_uid.to_string());
    }

    async fn gate(&self) -> Result<(), StoreError> {
        let (failing, delay) = {
            let state = self.state.lock().unwrap();
            (state.failing, state.delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(StoreError::Backend("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn fetch_by_identity(
        &self,
        identity_uid: &str,
    ) -> Result<Option<ProfileRecord>, StoreError> {
        self.gate().await?;
        let state = self.state.lock().unwrap();
        if state.hidden_uids.contains(identity_uid) {
            return Ok(None);
        }
        Ok(state
            .rows
            .iter()
            .find(|r| r.identity_uid == identity_uid)
            .cloned())
    }

    async fn create_for_session(&self, patch: &ProfilePatch) -> Result<ProfileRecord, StoreError> {
        self.gate().await?;
        let mut state = self.state.lock().unwrap();
        if state
            .rows
            .iter()
            .any(|r| r.identity_uid == patch.identity_uid)
        {
            return Err(StoreError::Conflict);
        }
        // First row store-wide becomes the approved admin.
        let first = state.rows.is_empty();
        let record = ProfileRecord {
            id: Uuid::new_v4(),
            identity_uid: patch.identity_uid.clone(),
            email: patch.email.clone(),
            display_name: patch.display_name.clone(),
            email_verified: patch.email_verified,
            is_approved: first,
            role: if first { Role::Admin } else { Role::User },
            agent_limit: DEFAULT_AGENT_LIMIT,
            custom_limit: false,
            subscription: SubscriptionPlan::Free,
            subscription_ends_at: None,
            last_login: Some(patch.last_login),
            created_at: Utc::now(),
        };
        state.rows.push(record.clone());
        Ok(record)
    }

    async fn refresh_mirrored(&self, patch: &ProfilePatch) -> Result<ProfileRecord, StoreError> {
        self.gate().await?;
        let mut state = self.state.lock().unwrap();
        let row = state
            .rows
            .iter_mut()
            .find(|r| r.identity_uid == patch.identity_uid)
            .ok_or(StoreError::NotFound)?;
        row.email = patch.email.clone();
        row.display_name = patch.display_name.clone();
        row.email_verified = patch.email_verified;
        row.last_login = Some(patch.last_login);
        Ok(row.clone())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.gate().await?;
        Ok(self.state.lock().unwrap().rows.len() as u64)
    }

    async fn fetch_by_id(&self, id: Uuid) -> Result<Option<ProfileRecord>, StoreError> {
        self.gate().await?;
        let state = self.state.lock().unwrap();
        Ok(state.rows.iter().find(|r| r.id == id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<ProfileRecord>, StoreError> {
        self.gate().await?;
        let mut rows = self.state.lock().unwrap().rows.clone();
        rows.sort_by_key(|r| r.created_at);
        Ok(rows)
    }

    async fn list_pending(&self) -> Result<Vec<ProfileRecord>, StoreError> {
        self.gate().await?;
        let mut rows: Vec<_> = self
            .state
            .lock()
            .unwrap()
            .rows
            .iter()
            .filter(|r| !r.is_approved)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.created_at);
        Ok(rows)
    }

    async fn set_approval(&self, id: Uuid, approved: bool) -> Result<ProfileRecord, StoreError> {
        self.gate().await?;
        let mut state = self.state.lock().unwrap();
        let row = state
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound)?;
        row.is_approved = approved;
        Ok(row.clone())
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<ProfileRecord, StoreError> {
        self.gate().await?;
        let mut state = self.state.lock().unwrap();
        let row = state
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound)?;
        row.role = role;
        Ok(row.clone())
    }

    async fn set_agent_limit(
        &self,
        id: Uuid,
        limit: i64,
        custom: bool,
    ) -> Result<ProfileRecord, StoreError> {
        self.gate().await?;
        let mut state = self.state.lock().unwrap();
        let row = state
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound)?;
        row.agent_limit = limit;
        row.custom_limit = custom;
        Ok(row.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.gate().await?;
        let mut state = self.state.lock().unwrap();
        let before = state.rows.len();
        state.rows.retain(|r| r.id != id);
        if state.rows.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        self.gate().await?;
        let state = self.state.lock().unwrap();
        let today = Utc::now().date_naive();
        Ok(StoreStats {
            total_users: state.rows.len() as u64,
            pending_approvals: state.rows.iter().filter(|r| !r.is_approved).count() as u64,
            approved_users: state.rows.iter().filter(|r| r.is_approved).count() as u64,
            active_today: state
                .rows
                .iter()
                .filter(|r| r.last_login.is_some_and(|t| t.date_naive() == today))
                .count() as u64,
        })
    }

    async fn insert_notification(
        &self,
        new: &NewNotification,
    ) -> Result<Notification, StoreError> {
        self.gate().await?;
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            title: new.title.clone(),
            message: new.message.clone(),
            kind: new.kind,
            is_read: false,
            created_at: Utc::now(),
            action_url: new.action_url.clone(),
        };
        self.state
            .lock()
            .unwrap()
            .notifications
            .push(notification.clone());
        Ok(notification)
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> Result<Vec<Notification>, StoreError> {
        self.gate().await?;
        let state = self.state.lock().unwrap();
        let mut rows: Vec<_> = state
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        self.gate().await?;
        let mut state = self.state.lock().unwrap();
        let row = state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
            .ok_or(StoreError::NotFound)?;
        row.is_read = true;
        Ok(())
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<(), StoreError> {
        self.gate().await?;
        let mut state = self.state.lock().unwrap();
        for n in state.notifications.iter_mut() {
            if n.user_id == user_id {
                n.is_read = true;
            }
        }
        Ok(())
    }

    async fn delete_notification(&self, id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        self.gate().await?;
        let mut state = self.state.lock().unwrap();
        let before = state.notifications.len();
        state
            .notifications
            .retain(|n| !(n.id == id && n.user_id == user_id));
        if state.notifications.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
