//! Permissive AuthProvider for standalone operation.

use async_trait::async_trait;

use crate::domain::{AuthClaim, AuthError, AuthProvider, ThreadId, UserId};

/// Admits any well-formed identity claim and allows every thread.
///
/// Only suitable for local development and demos; a real deployment wires
/// the CMS's own authorization here.
pub struct OpenAuthProvider;

#[async_trait]
impl AuthProvider for OpenAuthProvider {
    async fn authenticate(&self, claim: AuthClaim) -> Result<UserId, AuthError> {
        UserId::new(claim.user_id).map_err(|_| AuthError::InvalidClaim)
    }

    async fn can_access_thread(
        &self,
        _user_id: &UserId,
        _thread_id: &ThreadId,
    ) -> Result<bool, AuthError> {
        Ok(true)
    }
}
