//! Session reconciliation.
//!
//! On every identity-session observation the reconciler brings the profile
//! store row for that identity in line with the session (mirrored fields,
//! `last_login`, lazy creation) and derives the unified [`AuthUser`] view,
//! publishing it to observers. Store failures never escape this module:
//! the view degrades to an unapproved session-only user instead.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use uagen_common::{AuthUser, IdentitySession};

use crate::models::profile::{ProfilePatch, ProfileRecord};
use crate::store::{ProfileStore, StoreError, STORE_TIMEOUT};

pub struct SessionReconciler {
    store: Arc<dyn ProfileStore>,
    timeout: Duration,
    current: watch::Sender<Option<AuthUser>>,
}

impl SessionReconciler {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        let (tx, _) = watch::channel(None);
        SessionReconciler {
            store,
            timeout: STORE_TIMEOUT,
            current: tx,
        }
    }

    /// Override the per-call store timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Watch the latest published view. Receivers see every replacement,
    /// including the `None` published on logout.
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.current.subscribe()
    }

    /// Latest published view.
    pub fn current(&self) -> Option<AuthUser> {
        self.current.borrow().clone()
    }

    /// Session-change entry point. `None` is a logout: the published view
    /// is cleared and the store is left untouched.
    pub async fn observe(&self, session: Option<&IdentitySession>) -> Option<AuthUser> {
        match session {
            Some(session) => Some(self.observe_session(session).await),
            None => {
                self.current.send_replace(None);
                None
            }
        }
    }

    /// Observe a live session: sync the store row and publish the merged
    /// view. Always yields a usable AuthUser.
    pub async fn observe_session(&self, session: &IdentitySession) -> AuthUser {
        let user = match self.sync_record(session).await {
            Ok(record) => record.merge(session),
            Err(err) => {
                tracing::warn!(
                    uid = %session.uid,
                    error = %err,
                    "profile sync failed, degrading to unapproved session view"
                );
                AuthUser::degraded(session)
            }
        };
        self.current.send_replace(Some(user.clone()));
        user
    }

    async fn sync_record(&self, session: &IdentitySession) -> Result<ProfileRecord, StoreError> {
        let patch = ProfilePatch::from_session(session, Utc::now());

        let existing = self
            .bounded(self.store.fetch_by_identity(&session.uid))
            .await?;
        if existing.is_some() {
            return self.bounded(self.store.refresh_mirrored(&patch)).await;
        }

        match self.bounded(self.store.create_for_session(&patch)).await {
            Ok(record) => Ok(record),
            // Another observation of the same new identity won the insert.
            // The row exists now, so retry as an update.
            Err(StoreError::Conflict) => self.bounded(self.store.refresh_mirrored(&patch)).await,
            Err(err) => Err(err),
        }
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout)?
    }
}
