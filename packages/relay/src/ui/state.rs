//! Shared application state.

use std::sync::Arc;

use crate::domain::{AuthProvider, MessagePusher};
use crate::relay::{ConnectionRegistry, MessageRelay, PresenceTracker, RoomManager, TypingCoordinator};

/// Shared application state handed to every handler.
///
/// All components are explicit constructed instances whose lifecycle is tied
/// to the relay server's own start/stop; there is no ambient global state.
pub struct AppState {
    /// Session/auth gate collaborator
    pub auth: Arc<dyn AuthProvider>,
    /// Live connections and their owning identities
    pub registry: Arc<ConnectionRegistry>,
    /// Per-thread room membership
    pub rooms: Arc<RoomManager>,
    /// Per-identity presence state machine
    pub presence: Arc<PresenceTracker>,
    /// Per-thread typing state with auto-expiry
    pub typing: Arc<TypingCoordinator>,
    /// Message orchestrator
    pub relay: Arc<MessageRelay>,
    /// Outbound delivery
    pub pusher: Arc<dyn MessagePusher>,
}
