//! Shared fakes for component tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, PusherChannel};

/// Pusher fake that records every push per connection via mpsc channels.
pub(crate) struct ChannelPusher {
    channels: Mutex<HashMap<ConnectionId, PusherChannel>>,
}

impl ChannelPusher {
    pub(crate) fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Attach a receiver to observe everything pushed to `connection_id`.
    pub(crate) async fn attach(
        &self,
        connection_id: ConnectionId,
    ) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.channels.lock().await.insert(connection_id, tx);
        rx
    }
}

#[async_trait]
impl MessagePusher for ChannelPusher {
    async fn register(&self, connection_id: ConnectionId, sender: PusherChannel) {
        self.channels.lock().await.insert(connection_id, sender);
    }

    async fn unregister(&self, connection_id: &ConnectionId) {
        self.channels.lock().await.remove(connection_id);
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let channels = self.channels.lock().await;
        let sender = channels
            .get(connection_id)
            .ok_or_else(|| MessagePushError::ConnectionNotFound(connection_id.to_string()))?;
        sender
            .send(content.to_string())
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))
    }

    async fn broadcast(&self, targets: Vec<ConnectionId>, content: &str) {
        let channels = self.channels.lock().await;
        for target in targets {
            if let Some(sender) = channels.get(&target) {
                let _ = sender.send(content.to_string());
            }
        }
    }
}
