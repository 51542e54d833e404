//! Identity provider integration.
//!
//! The hosted identity provider issues sessions and owns credentials; this
//! module only consumes its REST surface: the account operations
//! (sign-in/up, password reset, verification email) and the ID-token
//! verification that turns a Bearer token into an
//! [`IdentitySession`](uagen_common::IdentitySession).

mod client;
mod token;

pub use client::{IdentityClient, SignInResponse};
pub use token::{bearer_token, TokenVerifier};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Missing Authorization header")]
    MissingHeader,
    #[error("Invalid Authorization header format")]
    InvalidFormat,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Key set fetch error: {0}")]
    KeySetFetch(String),
    #[error("Key not found for kid: {0}")]
    KeyNotFound(String),
    /// The provider rejected a user-initiated operation (bad password,
    /// unknown email, ...). The message is surfaced to the caller as-is.
    #[error("{0}")]
    Rejected(String),
    #[error("Identity provider error: {0}")]
    Provider(String),
}
