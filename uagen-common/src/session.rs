//! Identity provider session types.

use serde::{Deserialize, Serialize};

/// Snapshot of a session issued by the hosted identity provider.
///
/// The provider is the source of truth for these fields only. Everything
/// authorization-related (approval, role, limits) lives in the profile
/// store and is merged in by the session reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySession {
    /// Stable identifier assigned by the identity provider.
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub display_name: Option<String>,
}
