//! Real-time chat relay for Irori.
//!
//! This library accepts many concurrent long-lived WebSocket connections,
//! maintains per-thread room membership, broadcasts messages, typing
//! indicators, presence changes, and read receipts to room members, and
//! reconciles client-generated optimistic message ids with server-assigned
//! ids. Durable storage and identity checks are consumed through the
//! collaborator traits in [`domain`].

// layers
pub mod domain;
pub mod infrastructure;
pub mod relay;
pub mod ui;
