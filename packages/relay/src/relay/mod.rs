//! Core relay components.
//!
//! Each component owns its state behind its own `tokio::sync::Mutex` and is
//! mutated only through its own public API. [`MessageRelay`] orchestrates by
//! calling those APIs, never by reaching into their internals; that isolation
//! is what keeps the concurrency model tractable. No lock is ever held across
//! a collaborator await or a channel send loop.

mod message;
mod presence;
mod registry;
mod rooms;
#[cfg(test)]
mod test_support;
mod typing;

pub use message::MessageRelay;
pub use presence::{PresenceChange, PresenceTracker};
pub use registry::{ConnectionRegistry, Registered, Unregistered};
pub use rooms::RoomManager;
pub use typing::{TypingCoordinator, DEFAULT_TYPING_TIMEOUT};
