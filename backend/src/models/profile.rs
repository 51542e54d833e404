use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use uagen_common::{AuthUser, IdentitySession, Role, SubscriptionPlan};

/// Monthly user-agent generation budget assigned to new accounts.
pub const DEFAULT_AGENT_LIMIT: i64 = 500;

/// One row of authorization state per identity, owned by the profile store.
///
/// The identity provider is the source of truth for the mirrored fields
/// (email, display name, email-verified); the store owns everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: Uuid,
    /// Identity provider uid. Unique per row.
    pub identity_uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub email_verified: bool,
    pub is_approved: bool,
    pub role: Role,
    pub agent_limit: i64,
    pub custom_limit: bool,
    pub subscription: SubscriptionPlan,
    pub subscription_ends_at: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ProfileRecord {
    /// Merge this record with the observed session into the derived
    /// [`AuthUser`] view. Session fields win for identity data, the record
    /// wins for authorization data.
    pub fn merge(&self, session: &IdentitySession) -> AuthUser {
        AuthUser {
            uid: session.uid.clone(),
            email: session.email.clone(),
            email_verified: session.email_verified,
            display_name: session.display_name.clone(),
            approved: self.is_approved,
            role: self.role,
            agent_limit: Some(self.agent_limit),
            custom_limit: self.custom_limit,
            subscription: self.subscription,
            subscription_ends_at: self.subscription_ends_at,
        }
    }
}

/// Fields written back to the store on every session observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfilePatch {
    pub identity_uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub email_verified: bool,
    pub last_login: DateTime<Utc>,
}

impl ProfilePatch {
    pub fn from_session(session: &IdentitySession, now: DateTime<Utc>) -> Self {
        ProfilePatch {
            identity_uid: session.uid.clone(),
            email: session.email.clone(),
            display_name: session.display_name.clone(),
            email_verified: session.email_verified,
            last_login: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ProfileRecord {
        ProfileRecord {
            id: Uuid::new_v4(),
            identity_uid: "u1".to_string(),
            email: Some("stale@x.com".to_string()),
            display_name: None,
            email_verified: false,
            is_approved: true,
            role: Role::Admin,
            agent_limit: 1000,
            custom_limit: true,
            subscription: SubscriptionPlan::Pro,
            subscription_ends_at: None,
            last_login: None,
            created_at: Utc::now(),
        }
    }

    fn session() -> IdentitySession {
        IdentitySession {
            uid: "u1".to_string(),
            email: Some("fresh@x.com".to_string()),
            email_verified: true,
            display_name: Some("Fresh Name".to_string()),
        }
    }

    #[test]
    fn merge_takes_identity_fields_from_session() {
        let user = record().merge(&session());
        assert_eq!(user.email.as_deref(), Some("fresh@x.com"));
        assert_eq!(user.display_name.as_deref(), Some("Fresh Name"));
        assert!(user.email_verified);
    }

    #[test]
    fn merge_takes_authorization_fields_from_record() {
        let user = record().merge(&session());
        assert!(user.approved);
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.agent_limit, Some(1000));
        assert!(user.custom_limit);
        assert_eq!(user.subscription, SubscriptionPlan::Pro);
    }

    #[test]
    fn patch_captures_mirrored_fields_and_login_time() {
        let now = Utc::now();
        let patch = ProfilePatch::from_session(&session(), now);
        assert_eq!(patch.identity_uid, "u1");
        assert_eq!(patch.email.as_deref(), Some("fresh@x.com"));
        assert!(patch.email_verified);
        assert_eq!(patch.last_login, now);
    }
}
