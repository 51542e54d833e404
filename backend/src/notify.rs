//! Notification persistence and realtime fan-out.
//!
//! Rows live in the profile store; live subscribers (the SSE endpoint)
//! get a copy over a broadcast channel the moment a row is inserted.

use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use uagen_common::{Notification, NotificationKind};

use crate::store::{NewNotification, ProfileStore, StoreError};

const EVENT_BUFFER: usize = 256;

pub struct NotificationHub {
    store: Arc<dyn ProfileStore>,
    events: broadcast::Sender<Notification>,
}

impl NotificationHub {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        NotificationHub { store, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.events.subscribe()
    }

    /// Persist a notification row and publish it to live subscribers.
    pub async fn publish(&self, new: NewNotification) -> Result<Notification, StoreError> {
        let notification = self.store.insert_notification(&new).await?;
        // A send error only means nobody is listening right now.
        let _ = self.events.send(notification.clone());
        tracing::debug!(
            user_id = %notification.user_id,
            title = %notification.title,
            "published notification"
        );
        Ok(notification)
    }

    /// The notice sent to a user whose account was just approved.
    pub fn approval_notice(user_id: Uuid) -> NewNotification {
        NewNotification {
            user_id,
            title: "Account Approved".to_string(),
            message: "Your account has been approved! You now have full access to UAGen Pro."
                .to_string(),
            kind: NotificationKind::Success,
            action_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::MemoryProfileStore;

    #[tokio::test]
    async fn publish_persists_and_fans_out() {
        let store = Arc::new(MemoryProfileStore::new());
        let hub = NotificationHub::new(store.clone());
        let mut rx = hub.subscribe();

        let user_id = Uuid::new_v4();
        let stored = hub
            .publish(NotificationHub::approval_notice(user_id))
            .await
            .unwrap();

        let live = rx.recv().await.unwrap();
        assert_eq!(live, stored);
        assert_eq!(live.user_id, user_id);
        assert_eq!(live.kind, NotificationKind::Success);

        let listed = store.list_notifications(user_id, 10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].is_read);
    }

    #[tokio::test]
    async fn publish_without_subscribers_still_persists() {
        let store = Arc::new(MemoryProfileStore::new());
        let hub = NotificationHub::new(store.clone());

        let user_id = Uuid::new_v4();
        hub.publish(NotificationHub::approval_notice(user_id))
            .await
            .unwrap();
        assert_eq!(store.list_notifications(user_id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn store_failure_surfaces_to_caller() {
        let store = Arc::new(MemoryProfileStore::new());
        store.set_failing(true);
        let hub = NotificationHub::new(store);

        let result = hub
            .publish(NotificationHub::approval_notice(Uuid::new_v4()))
            .await;
        assert!(matches!(result, Err(StoreError::Backend(_))));
    }
}
