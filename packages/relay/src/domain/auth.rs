//! Authorization collaborator interface (session gate + thread access).

use async_trait::async_trait;
use thiserror::Error;

use super::value_object::{ThreadId, UserId};

/// Identity claim presented when a connection is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthClaim {
    /// The identity the client claims to be.
    pub user_id: String,
    /// Opaque credential (session token, JWT, ...) checked by the collaborator.
    pub token: String,
}

/// Errors surfaced by the authorization collaborator.
///
/// A collaborator failure during admission is treated as a rejection of that
/// connection attempt, never as fatal to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("identity claim rejected")]
    InvalidClaim,

    #[error("authorization backend unavailable")]
    Unavailable,
}

/// Authentication and thread-access checks consumed by the relay.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Validate an identity claim. Runs before any other per-connection
    /// operation is honored.
    async fn authenticate(&self, claim: AuthClaim) -> Result<UserId, AuthError>;

    /// May `user_id` read and post in `thread_id`?
    async fn can_access_thread(
        &self,
        user_id: &UserId,
        thread_id: &ThreadId,
    ) -> Result<bool, AuthError>;
}
