//! Authorization view types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::IdentitySession;

/// Role stored on a profile record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Subscription plan attached to a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    #[default]
    Free,
    Basic,
    Pro,
}

/// Derived, in-memory authorization view.
///
/// Identity session fields merged with the profile record's authorization
/// fields. Recomputed as a whole on every session observation; never
/// persisted and never partially updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Identity provider uid (`IdentitySession::uid`).
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub display_name: Option<String>,
    /// Whether an admin has approved this account.
    pub approved: bool,
    pub role: Role,
    /// Per-month user-agent generation budget, if a profile row was found.
    pub agent_limit: Option<i64>,
    pub custom_limit: bool,
    pub subscription: SubscriptionPlan,
    pub subscription_ends_at: Option<DateTime<Utc>>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Session-only fallback used when the profile store cannot be reached.
    ///
    /// A sync failure only ever degrades access toward "unapproved regular
    /// user"; it never elevates.
    pub fn degraded(session: &IdentitySession) -> Self {
        AuthUser {
            uid: session.uid.clone(),
            email: session.email.clone(),
            email_verified: session.email_verified,
            display_name: session.display_name.clone(),
            approved: false,
            role: Role::User,
            agent_limit: None,
            custom_limit: false,
            subscription: SubscriptionPlan::Free,
            subscription_ends_at: None,
        }
    }
}
