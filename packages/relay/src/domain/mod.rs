//! Domain layer: value objects, entities, errors, and the collaborator
//! interfaces the relay consumes.
//!
//! The relay never owns durable data or identity. It talks to storage and
//! authorization through the traits defined here; concrete implementations
//! live in the infrastructure layer (dependency inversion, same as the
//! repository pattern used elsewhere in the workspace).

mod auth;
mod entity;
mod error;
mod pusher;
mod storage;
mod value_object;

pub use auth::{AuthClaim, AuthError, AuthProvider};
pub use entity::{
    Attachment, MessageDraft, PresenceRecord, PresenceStatus, StoredMessage,
};
pub use error::RelayError;
pub use pusher::{MessagePushError, MessagePusher, PusherChannel};
pub use storage::{MessageStore, StorageError};
pub use value_object::{
    ConnectionId, MessageContent, MessageId, TempMessageId, ThreadId, Timestamp, UserId,
    MAX_CONTENT_LEN, MAX_ID_LEN,
};

#[cfg(test)]
pub use auth::MockAuthProvider;
#[cfg(test)]
pub use storage::MockMessageStore;
