//! Connection registry: live connections and their owning identities.

use std::collections::{HashMap, HashSet};

use tokio::sync::Mutex;

use crate::domain::{ConnectionId, UserId};

/// Result of registering a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registered {
    pub connection_id: ConnectionId,
    /// True if this is the user's first live connection (presence may need to
    /// transition to online).
    pub first_for_user: bool,
}

/// Result of unregistering a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unregistered {
    pub user_id: UserId,
    /// Live connections the user still holds after this removal.
    pub remaining: usize,
}

#[derive(Default)]
struct RegistryState {
    owners: HashMap<ConnectionId, UserId>,
    by_user: HashMap<UserId, HashSet<ConnectionId>>,
}

/// Tracks live connections, the identity owning each, and the reverse lookup
/// from identity to connections. A user may hold several connections at once.
///
/// Registration either succeeds or the connection was already rejected at the
/// auth gate; there are no retries.
pub struct ConnectionRegistry {
    inner: Mutex<RegistryState>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryState::default()),
        }
    }

    /// Allocate a new connection entry for `user_id`.
    pub async fn register(&self, user_id: UserId) -> Registered {
        let connection_id = ConnectionId::generate();
        let mut state = self.inner.lock().await;
        state.owners.insert(connection_id, user_id.clone());
        let connections = state.by_user.entry(user_id.clone()).or_default();
        connections.insert(connection_id);
        let first_for_user = connections.len() == 1;
        tracing::debug!(
            "Registered connection '{}' for user '{}' (live: {})",
            connection_id,
            user_id,
            connections.len()
        );
        Registered {
            connection_id,
            first_for_user,
        }
    }

    /// Remove a connection entry. Returns `None` if the connection was not
    /// registered (already removed).
    pub async fn unregister(&self, connection_id: &ConnectionId) -> Option<Unregistered> {
        let mut state = self.inner.lock().await;
        let user_id = state.owners.remove(connection_id)?;
        let remaining = match state.by_user.get_mut(&user_id) {
            Some(connections) => {
                connections.remove(connection_id);
                let remaining = connections.len();
                if remaining == 0 {
                    state.by_user.remove(&user_id);
                }
                remaining
            }
            None => 0,
        };
        tracing::debug!(
            "Unregistered connection '{}' for user '{}' (live: {})",
            connection_id,
            user_id,
            remaining
        );
        Some(Unregistered { user_id, remaining })
    }

    /// All live connections for `user_id`, e.g. for targeted delivery.
    pub async fn connections_for(&self, user_id: &UserId) -> Vec<ConnectionId> {
        let state = self.inner.lock().await;
        state
            .by_user
            .get(user_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The identity owning `connection_id`, if it is live.
    pub async fn owner_of(&self, connection_id: &ConnectionId) -> Option<UserId> {
        let state = self.inner.lock().await;
        state.owners.get(connection_id).cloned()
    }

    /// Number of live connections for `user_id`.
    pub async fn connection_count(&self, user_id: &UserId) -> usize {
        let state = self.inner.lock().await;
        state.by_user.get(user_id).map(|s| s.len()).unwrap_or(0)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
