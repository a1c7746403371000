//! WebSocket-backed MessagePusher.
//!
//! WebSocket connections are accepted in the UI layer, which creates one
//! unbounded sender per connection and registers it here. This implementation
//! only manages the senders and pushes serialized events through them; it
//! never touches the sockets themselves.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, PusherChannel};

/// Delivery over per-connection mpsc channels pumped into WebSocket sinks.
pub struct WebSocketMessagePusher {
    // connection id -> outbound channel
    clients: Mutex<HashMap<ConnectionId, PusherChannel>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for WebSocketMessagePusher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register(&self, connection_id: ConnectionId, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        clients.insert(connection_id, sender);
        tracing::debug!("Connection '{}' registered to MessagePusher", connection_id);
    }

    async fn unregister(&self, connection_id: &ConnectionId) {
        let mut clients = self.clients.lock().await;
        clients.remove(connection_id);
        tracing::debug!(
            "Connection '{}' unregistered from MessagePusher",
            connection_id
        );
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;
        if let Some(sender) = clients.get(connection_id) {
            sender
                .send(content.to_string())
                .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
            tracing::debug!("Pushed event to connection '{}'", connection_id);
            Ok(())
        } else {
            Err(MessagePushError::ConnectionNotFound(
                connection_id.to_string(),
            ))
        }
    }

    async fn broadcast(&self, targets: Vec<ConnectionId>, content: &str) {
        let clients = self.clients.lock().await;
        for target in targets {
            match clients.get(&target) {
                // A target that disconnected mid-broadcast is skipped; no
                // buffering, no error surfaced to the caller.
                Some(sender) => {
                    if let Err(e) = sender.send(content.to_string()) {
                        tracing::warn!("Failed to push event to connection '{}': {}", target, e);
                    }
                }
                None => {
                    tracing::debug!("Connection '{}' gone during broadcast, skipping", target);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test]
    async fn test_push_to_success() {
        // given:
        let pusher = WebSocketMessagePusher::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection_id = ConnectionId::generate();
        pusher.register(connection_id, tx).await;

        // when:
        let result = pusher.push_to(&connection_id, "Hello").await;

        // then:
        assert!(result.is_ok());
        assert_eq!(rx.recv().await, Some("Hello".to_string()));
    }

    #[tokio::test]
    async fn test_push_to_unknown_connection_fails() {
        // given:
        let pusher = WebSocketMessagePusher::new();
        let connection_id = ConnectionId::generate();

        // when:
        let result = pusher.push_to(&connection_id, "Hello").await;

        // then:
        assert!(matches!(
            result,
            Err(MessagePushError::ConnectionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_push_to_unregistered_connection_fails() {
        // given: a connection that registered and then went away
        let pusher = WebSocketMessagePusher::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let connection_id = ConnectionId::generate();
        pusher.register(connection_id, tx).await;
        pusher.unregister(&connection_id).await;

        // when:
        let result = pusher.push_to(&connection_id, "Hello").await;

        // then:
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_targets() {
        // given:
        let pusher = WebSocketMessagePusher::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let c1 = ConnectionId::generate();
        let c2 = ConnectionId::generate();
        pusher.register(c1, tx1).await;
        pusher.register(c2, tx2).await;

        // when:
        pusher.broadcast(vec![c1, c2], "Broadcast message").await;

        // then:
        assert_eq!(rx1.recv().await, Some("Broadcast message".to_string()));
        assert_eq!(rx2.recv().await, Some("Broadcast message".to_string()));
    }

    #[tokio::test]
    async fn test_broadcast_tolerates_missing_targets() {
        // given: one live target, one gone
        let pusher = WebSocketMessagePusher::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let live = ConnectionId::generate();
        let gone = ConnectionId::generate();
        pusher.register(live, tx).await;

        // when:
        pusher.broadcast(vec![live, gone], "Broadcast message").await;

        // then: the live target still receives it
        assert_eq!(rx.recv().await, Some("Broadcast message".to_string()));
    }

    #[tokio::test]
    async fn test_broadcast_with_empty_targets_is_a_no_op() {
        // given:
        let pusher = WebSocketMessagePusher::new();

        // when / then: nothing to assert beyond not panicking
        pusher.broadcast(Vec::new(), "Message").await;
    }
}
