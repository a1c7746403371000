//! MessagePusher implementations.
//!
//! The trait is defined in the domain layer; this module provides the
//! WebSocket-backed implementation used in production.

mod websocket;

pub use websocket::WebSocketMessagePusher;
