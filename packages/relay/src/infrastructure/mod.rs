//! Infrastructure layer: concrete implementations of the domain's
//! collaborator and delivery interfaces, plus the wire DTOs.

pub mod auth;
pub mod dto;
pub mod message_pusher;
pub mod storage;
