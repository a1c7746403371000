//! Message delivery abstraction.
//!
//! The relay's components decide *who* receives an event; the pusher decides
//! *how* it reaches them. The WebSocket implementation lives in the
//! infrastructure layer; tests substitute an mpsc-backed fake.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::value_object::ConnectionId;

/// Outbound channel for one connection. The UI layer owns the receiving end
/// and pumps it into the WebSocket sink.
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// Errors surfaced by the pusher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("connection '{0}' not found")]
    ConnectionNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),
}

/// Delivery of serialized events to live connections.
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// Register a connection's outbound channel.
    async fn register(&self, connection_id: ConnectionId, sender: PusherChannel);

    /// Remove a connection's outbound channel.
    async fn unregister(&self, connection_id: &ConnectionId);

    /// Push one serialized event to one connection.
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// Push one serialized event to many connections.
    ///
    /// Partial failure is tolerated: a target that disconnected mid-broadcast
    /// is skipped, never surfaced to the caller.
    async fn broadcast(&self, targets: Vec<ConnectionId>, content: &str);
}
