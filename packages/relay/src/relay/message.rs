//! Message relay: the per-message state machine.
//!
//! Lifecycle: Received -> Validating -> Persisting -> Confirmed, or a
//! terminal failure at validation (`AccessDenied` / `InvalidContent`) or at
//! persistence (`PersistFailed`). A message is broadcast to a room if and
//! only if persistence succeeded; there is never a broadcast without a
//! persisted record, and a persisted record is always at least attempted to
//! be broadcast, even if the sender disconnected meanwhile.

use std::sync::Arc;

use crate::domain::{
    Attachment, ConnectionId, MessageContent, MessageDraft, MessageId, MessagePusher, MessageStore,
    RelayError, StoredMessage, TempMessageId, ThreadId,
};
use crate::infrastructure::dto::websocket::ServerEvent;

use super::registry::ConnectionRegistry;
use super::rooms::RoomManager;
use super::typing::TypingCoordinator;

/// Orchestrates message sends, read receipts, and externally-sourced events.
///
/// Never mutates the other components' internals; only their public
/// contracts are used.
pub struct MessageRelay {
    registry: Arc<ConnectionRegistry>,
    rooms: Arc<RoomManager>,
    typing: Arc<TypingCoordinator>,
    store: Arc<dyn MessageStore>,
    pusher: Arc<dyn MessagePusher>,
}

impl MessageRelay {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        rooms: Arc<RoomManager>,
        typing: Arc<TypingCoordinator>,
        store: Arc<dyn MessageStore>,
        pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            registry,
            rooms,
            typing,
            store,
            pusher,
        }
    }

    /// Handle an inbound send from a client connection.
    ///
    /// Validates membership and content, persists through the storage
    /// collaborator, delivers the temp-to-real id mapping to the originating
    /// connection only, clears the sender's typing state, and broadcasts the
    /// confirmed message to the room (excluding the originating connection;
    /// the sender's other connections do receive it, since they did not get
    /// the optimistic local update).
    pub async fn send(
        &self,
        connection_id: ConnectionId,
        thread_id: ThreadId,
        temp_id: Option<String>,
        content: String,
        content_type: String,
        attachments: Vec<Attachment>,
    ) -> Result<StoredMessage, RelayError> {
        let sender = self
            .registry
            .owner_of(&connection_id)
            .await
            .ok_or(RelayError::NotConnected)?;

        // Validating
        if !self.rooms.is_member(&connection_id, &thread_id).await {
            return Err(RelayError::AccessDenied {
                thread_id: thread_id.into_string(),
            });
        }
        let content = MessageContent::new(content)?;
        // An empty temp id means the client did not ask for reconciliation.
        let temp_id = temp_id.and_then(|t| TempMessageId::new(t).ok());

        // Persisting. Storage failure is terminal: reported to the sender
        // only, nothing is broadcast, and the relay does not retry.
        let draft = MessageDraft {
            thread_id: thread_id.clone(),
            sender: sender.clone(),
            content,
            content_type,
            attachments,
        };
        let stored = self.store.create_message(draft).await.map_err(|e| {
            tracing::warn!(
                "Persist failed for send from '{}' in thread '{}': {}",
                sender,
                thread_id,
                e
            );
            RelayError::PersistFailed {
                temp_id: temp_id.as_ref().map(|t| t.as_str().to_string()),
            }
        })?;

        // Confirmed: reconcile the optimistic id with the originating
        // connection only. The message already exists in storage, so a
        // delivery failure here (sender vanished) must not fail the send.
        if let Some(temp_id) = &temp_id {
            let mapping = ServerEvent::MessageIdMapping {
                thread_id: stored.thread_id.as_str().to_string(),
                temp_id: temp_id.as_str().to_string(),
                real_id: stored.id.value(),
            };
            if let Err(e) = self
                .pusher
                .push_to(&connection_id, &mapping.to_json())
                .await
            {
                tracing::warn!(
                    "Failed to deliver id mapping for '{}' to '{}': {}",
                    temp_id,
                    connection_id,
                    e
                );
            }
        }

        // Sending a message implies the sender stopped typing.
        self.typing
            .set_typing(&thread_id, &sender, false, Some(&connection_id))
            .await;

        let event = ServerEvent::message(&stored);
        self.rooms
            .broadcast(&thread_id, &event.to_json(), Some(&connection_id))
            .await;
        tracing::info!(
            "Message {} from '{}' broadcast to thread '{}'",
            stored.id,
            sender,
            thread_id
        );
        Ok(stored)
    }

    /// Persist read timestamps for the given messages, then broadcast one
    /// read receipt per message id to the room.
    ///
    /// The marking connection is not excluded: all members, including peers
    /// other than the original sender, may legitimately want to know a peer
    /// read a message.
    pub async fn mark_read(
        &self,
        connection_id: ConnectionId,
        thread_id: ThreadId,
        message_ids: Vec<MessageId>,
    ) -> Result<usize, RelayError> {
        let reader = self
            .registry
            .owner_of(&connection_id)
            .await
            .ok_or(RelayError::NotConnected)?;
        if !self.rooms.is_member(&connection_id, &thread_id).await {
            return Err(RelayError::AccessDenied {
                thread_id: thread_id.into_string(),
            });
        }
        if message_ids.is_empty() {
            return Ok(0);
        }

        self.store
            .mark_read(&thread_id, &reader, &message_ids)
            .await
            .map_err(|e| {
                tracing::warn!(
                    "Persist failed for read receipts from '{}' in thread '{}': {}",
                    reader,
                    thread_id,
                    e
                );
                RelayError::PersistFailed { temp_id: None }
            })?;

        for message_id in &message_ids {
            let event = ServerEvent::ReadReceipt {
                thread_id: thread_id.as_str().to_string(),
                user_id: reader.as_str().to_string(),
                message_id: message_id.value(),
            };
            self.rooms.broadcast(&thread_id, &event.to_json(), None).await;
        }
        Ok(message_ids.len())
    }

    /// Broadcast a message created outside the relay's own request path
    /// (e.g. by the CMS REST layer). The event enters the state machine
    /// directly at Confirmed: no validation, no persistence, no id mapping.
    pub async fn inject_message(&self, stored: &StoredMessage) {
        let event = ServerEvent::message(stored);
        self.rooms
            .broadcast(&stored.thread_id, &event.to_json(), None)
            .await;
        tracing::info!(
            "Injected message {} broadcast to thread '{}'",
            stored.id,
            stored.thread_id
        );
    }

    /// Broadcast an arbitrary externally-sourced event to a room. The
    /// broadcast contract is uniform regardless of trigger origin.
    pub async fn inject_event(&self, thread_id: &ThreadId, event: &ServerEvent) {
        self.rooms.broadcast(thread_id, &event.to_json(), None).await;
    }
}
