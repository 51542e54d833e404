//! User notification rows, persisted by the profile store and fanned out
//! in realtime by the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    /// Internal profile id of the recipient (not the identity uid).
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub kind: NotificationKind,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_lowercase() {
        let json = serde_json::to_string(&NotificationKind::Success).unwrap();
        assert_eq!(json, r#""success""#);
        let kind: NotificationKind = serde_json::from_str(&json).unwrap();
        assert_eq!(kind, NotificationKind::Success);
    }

    #[test]
    fn action_url_omitted_when_absent() {
        let n = Notification {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Account Approved".to_string(),
            message: "Your account has been approved!".to_string(),
            kind: NotificationKind::Success,
            is_read: false,
            created_at: Utc::now(),
            action_url: None,
        };
        let json = serde_json::to_string(&n).unwrap();
        assert!(!json.contains("action_url"));
    }
}
