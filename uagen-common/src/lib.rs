//! UAGen Pro Common Types
//!
//! Shared types used by the backend service and its API clients.

pub mod account;
pub mod notification;
pub mod session;

pub use account::{AuthUser, Role, SubscriptionPlan};
pub use notification::{Notification, NotificationKind};
pub use session::IdentitySession;
