//! Room manager: per-thread membership and scoped broadcast.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{
    AuthProvider, ConnectionId, MessagePusher, RelayError, ThreadId, UserId,
};

use super::registry::ConnectionRegistry;

#[derive(Default)]
struct RoomState {
    members: HashMap<ThreadId, HashSet<ConnectionId>>,
    joined: HashMap<ConnectionId, HashSet<ThreadId>>,
}

/// Per-thread membership set, used to scope broadcasts.
///
/// Invariant: a connection appears in a room only if it successfully joined
/// (authorization included) and has not left or disconnected. The
/// authorization check runs inside [`join`](RoomManager::join) so membership
/// can never be mutated without it.
pub struct RoomManager {
    registry: Arc<ConnectionRegistry>,
    auth: Arc<dyn AuthProvider>,
    pusher: Arc<dyn MessagePusher>,
    inner: Mutex<RoomState>,
}

impl RoomManager {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        auth: Arc<dyn AuthProvider>,
        pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            registry,
            auth,
            pusher,
            inner: Mutex::new(RoomState::default()),
        }
    }

    /// Join a connection to a thread's room. Idempotent: joining an
    /// already-joined room is a no-op success.
    ///
    /// The identity owning the connection must be authorized for the thread;
    /// a collaborator failure during the check counts as denial, and denial
    /// never mutates membership.
    pub async fn join(
        &self,
        connection_id: ConnectionId,
        thread_id: ThreadId,
    ) -> Result<(), RelayError> {
        let owner = self
            .registry
            .owner_of(&connection_id)
            .await
            .ok_or(RelayError::NotConnected)?;

        // Authorization runs before the membership lock is taken; never hold
        // a lock across a collaborator await.
        let allowed = self
            .auth
            .can_access_thread(&owner, &thread_id)
            .await
            .unwrap_or(false);
        if !allowed {
            return Err(RelayError::AccessDenied {
                thread_id: thread_id.into_string(),
            });
        }

        let mut state = self.inner.lock().await;
        state
            .members
            .entry(thread_id.clone())
            .or_default()
            .insert(connection_id);
        state
            .joined
            .entry(connection_id)
            .or_default()
            .insert(thread_id.clone());
        tracing::debug!(
            "Connection '{}' (user '{}') joined thread '{}'",
            connection_id,
            owner,
            thread_id
        );
        Ok(())
    }

    /// Remove a connection from a thread's room. Idempotent: removing a
    /// non-member is a no-op success.
    pub async fn leave(&self, connection_id: ConnectionId, thread_id: &ThreadId) {
        let mut state = self.inner.lock().await;
        if let Some(members) = state.members.get_mut(thread_id) {
            members.remove(&connection_id);
            if members.is_empty() {
                state.members.remove(thread_id);
            }
        }
        if let Some(threads) = state.joined.get_mut(&connection_id) {
            threads.remove(thread_id);
            if threads.is_empty() {
                state.joined.remove(&connection_id);
            }
        }
        tracing::debug!("Connection '{}' left thread '{}'", connection_id, thread_id);
    }

    /// Drop a connection from every room it had joined (used on disconnect).
    /// Returns the threads it was a member of.
    pub async fn drop_connection(&self, connection_id: &ConnectionId) -> Vec<ThreadId> {
        let mut state = self.inner.lock().await;
        let threads: Vec<ThreadId> = state
            .joined
            .remove(connection_id)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default();
        for thread_id in &threads {
            if let Some(members) = state.members.get_mut(thread_id) {
                members.remove(connection_id);
                if members.is_empty() {
                    state.members.remove(thread_id);
                }
            }
        }
        threads
    }

    /// Is the connection currently a member of the thread's room?
    pub async fn is_member(&self, connection_id: &ConnectionId, thread_id: &ThreadId) -> bool {
        let state = self.inner.lock().await;
        state
            .members
            .get(thread_id)
            .is_some_and(|members| members.contains(connection_id))
    }

    /// Current membership snapshot of a room.
    pub async fn members(&self, thread_id: &ThreadId) -> Vec<ConnectionId> {
        let state = self.inner.lock().await;
        state
            .members
            .get(thread_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Threads a connection has joined.
    pub async fn threads_of(&self, connection_id: &ConnectionId) -> Vec<ThreadId> {
        let state = self.inner.lock().await;
        state
            .joined
            .get(connection_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Deliver `content` to every current member of the room except the
    /// optional excluded connection.
    ///
    /// The membership snapshot is taken at call time; a member that
    /// disconnects mid-broadcast simply does not receive this delivery. No
    /// buffering, no error surfaced to the caller.
    pub async fn broadcast(
        &self,
        thread_id: &ThreadId,
        content: &str,
        exclude: Option<&ConnectionId>,
    ) {
        let targets: Vec<ConnectionId> = {
            let state = self.inner.lock().await;
            state
                .members
                .get(thread_id)
                .map(|members| {
                    members
                        .iter()
                        .filter(|id| exclude != Some(*id))
                        .copied()
                        .collect()
                })
                .unwrap_or_default()
        };
        if targets.is_empty() {
            return;
        }
        self.pusher.broadcast(targets, content).await;
    }

    /// Connections that should see presence changes for `user_id`: the user's
    /// own connections plus every member of every room one of those
    /// connections occupies. This bounds presence fan-out to room co-members
    /// instead of every connection on the server.
    pub async fn presence_audience(&self, user_id: &UserId) -> Vec<ConnectionId> {
        let own = self.registry.connections_for(user_id).await;
        let state = self.inner.lock().await;
        let mut audience: HashSet<ConnectionId> = own.iter().copied().collect();
        for connection_id in &own {
            if let Some(threads) = state.joined.get(connection_id) {
                for thread_id in threads {
                    if let Some(members) = state.members.get(thread_id) {
                        audience.extend(members.iter().copied());
                    }
                }
            }
        }
        audience.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{AuthError, MockAuthProvider};
    use crate::relay::test_support::ChannelPusher;

    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    fn thread(id: &str) -> ThreadId {
        ThreadId::new(id.to_string()).unwrap()
    }

    fn allow_all_auth() -> Arc<MockAuthProvider> {
        let mut auth = MockAuthProvider::new();
        auth.expect_can_access_thread().returning(|_, _| Ok(true));
        Arc::new(auth)
    }

    async fn fixture(
        auth: Arc<MockAuthProvider>,
    ) -> (Arc<ConnectionRegistry>, Arc<ChannelPusher>, RoomManager) {
        let registry = Arc::new(ConnectionRegistry::new());
        let pusher = Arc::new(ChannelPusher::new());
        let rooms = RoomManager::new(registry.clone(), auth, pusher.clone());
        (registry, pusher, rooms)
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        // given:
        let (registry, _pusher, rooms) = fixture(allow_all_auth()).await;
        let conn = registry.register(user("alice")).await.connection_id;

        // when: joining the same thread twice
        rooms.join(conn, thread("42")).await.unwrap();
        rooms.join(conn, thread("42")).await.unwrap();

        // then: membership is identical to joining once
        assert_eq!(rooms.members(&thread("42")).await, vec![conn]);
    }

    #[tokio::test]
    async fn test_join_denied_does_not_mutate_membership() {
        // given: auth denies every thread
        let mut auth = MockAuthProvider::new();
        auth.expect_can_access_thread().returning(|_, _| Ok(false));
        let (registry, _pusher, rooms) = fixture(Arc::new(auth)).await;
        let conn = registry.register(user("alice")).await.connection_id;

        // when:
        let result = rooms.join(conn, thread("42")).await;

        // then:
        assert!(matches!(result, Err(RelayError::AccessDenied { .. })));
        assert!(rooms.members(&thread("42")).await.is_empty());
        assert!(!rooms.is_member(&conn, &thread("42")).await);
    }

    #[tokio::test]
    async fn test_join_treats_auth_collaborator_failure_as_denial() {
        // given: the authorization backend is down
        let mut auth = MockAuthProvider::new();
        auth.expect_can_access_thread()
            .returning(|_, _| Err(AuthError::Unavailable));
        let (registry, _pusher, rooms) = fixture(Arc::new(auth)).await;
        let conn = registry.register(user("alice")).await.connection_id;

        // when:
        let result = rooms.join(conn, thread("42")).await;

        // then: denial, not a crash
        assert!(matches!(result, Err(RelayError::AccessDenied { .. })));
    }

    #[tokio::test]
    async fn test_join_with_unregistered_connection_is_rejected() {
        // given:
        let (_registry, _pusher, rooms) = fixture(allow_all_auth()).await;
        let ghost = ConnectionId::generate();

        // when:
        let result = rooms.join(ghost, thread("42")).await;

        // then:
        assert!(matches!(result, Err(RelayError::NotConnected)));
    }

    #[tokio::test]
    async fn test_leave_is_idempotent() {
        // given:
        let (registry, _pusher, rooms) = fixture(allow_all_auth()).await;
        let conn = registry.register(user("alice")).await.connection_id;
        rooms.join(conn, thread("42")).await.unwrap();

        // when: leaving twice (second removal targets a non-member)
        rooms.leave(conn, &thread("42")).await;
        rooms.leave(conn, &thread("42")).await;

        // then:
        assert!(rooms.members(&thread("42")).await.is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_excludes_the_sender_only() {
        // given: alice and bob joined thread 42
        let (registry, pusher, rooms) = fixture(allow_all_auth()).await;
        let alice = registry.register(user("alice")).await.connection_id;
        let bob = registry.register(user("bob")).await.connection_id;
        let mut alice_rx = pusher.attach(alice).await;
        let mut bob_rx = pusher.attach(bob).await;
        rooms.join(alice, thread("42")).await.unwrap();
        rooms.join(bob, thread("42")).await.unwrap();

        // when:
        rooms.broadcast(&thread("42"), "hello", Some(&alice)).await;

        // then: bob receives it, alice never does
        assert_eq!(bob_rx.recv().await, Some("hello".to_string()));
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_without_exclusion_reaches_all_members() {
        // given:
        let (registry, pusher, rooms) = fixture(allow_all_auth()).await;
        let alice = registry.register(user("alice")).await.connection_id;
        let bob = registry.register(user("bob")).await.connection_id;
        let mut alice_rx = pusher.attach(alice).await;
        let mut bob_rx = pusher.attach(bob).await;
        rooms.join(alice, thread("42")).await.unwrap();
        rooms.join(bob, thread("42")).await.unwrap();

        // when:
        rooms.broadcast(&thread("42"), "ping", None).await;

        // then:
        assert_eq!(alice_rx.recv().await, Some("ping".to_string()));
        assert_eq!(bob_rx.recv().await, Some("ping".to_string()));
    }

    #[tokio::test]
    async fn test_broadcast_never_reaches_non_members() {
        // given: bob is in a different thread
        let (registry, pusher, rooms) = fixture(allow_all_auth()).await;
        let alice = registry.register(user("alice")).await.connection_id;
        let bob = registry.register(user("bob")).await.connection_id;
        let _alice_rx = pusher.attach(alice).await;
        let mut bob_rx = pusher.attach(bob).await;
        rooms.join(alice, thread("42")).await.unwrap();
        rooms.join(bob, thread("7")).await.unwrap();

        // when:
        rooms.broadcast(&thread("42"), "secret", None).await;

        // then:
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_drop_connection_removes_from_every_room() {
        // given: alice joined two threads
        let (registry, _pusher, rooms) = fixture(allow_all_auth()).await;
        let conn = registry.register(user("alice")).await.connection_id;
        rooms.join(conn, thread("42")).await.unwrap();
        rooms.join(conn, thread("7")).await.unwrap();

        // when:
        let mut dropped = rooms.drop_connection(&conn).await;
        dropped.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        // then:
        assert_eq!(dropped, vec![thread("42"), thread("7")]);
        assert!(rooms.members(&thread("42")).await.is_empty());
        assert!(rooms.members(&thread("7")).await.is_empty());
        assert!(rooms.threads_of(&conn).await.is_empty());
    }

    #[tokio::test]
    async fn test_presence_audience_is_scoped_to_room_co_members() {
        // given: alice and bob share thread 42; carol sits alone in thread 7
        let (registry, _pusher, rooms) = fixture(allow_all_auth()).await;
        let alice = registry.register(user("alice")).await.connection_id;
        let bob = registry.register(user("bob")).await.connection_id;
        let carol = registry.register(user("carol")).await.connection_id;
        rooms.join(alice, thread("42")).await.unwrap();
        rooms.join(bob, thread("42")).await.unwrap();
        rooms.join(carol, thread("7")).await.unwrap();

        // when:
        let audience = rooms.presence_audience(&user("alice")).await;

        // then: alice's own connection and bob, never carol
        assert!(audience.contains(&alice));
        assert!(audience.contains(&bob));
        assert!(!audience.contains(&carol));
    }
}
