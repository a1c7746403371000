//! Data Transfer Objects for the relay.
//!
//! DTOs are organized by protocol:
//! - `websocket`: WebSocket event DTOs (the client/server wire protocol)
//! - `conversion`: wire payload -> validated domain value conversions

pub mod conversion;
pub mod websocket;
