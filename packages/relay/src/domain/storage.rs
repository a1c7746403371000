//! Storage collaborator interface.
//!
//! The relay delegates all durability to an external storage system. This
//! trait is the seam: the domain defines what it needs, the infrastructure
//! layer (or the host CMS) provides the implementation.

use async_trait::async_trait;
use thiserror::Error;

use super::entity::{MessageDraft, StoredMessage};
use super::value_object::{MessageId, ThreadId, UserId};

/// Errors surfaced by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The storage backend rejected or failed the operation.
    #[error("storage operation failed: {0}")]
    OperationFailed(String),

    /// The storage backend is unreachable. The relay degrades to rejecting
    /// sends rather than attempting partial operation.
    #[error("storage backend unavailable")]
    Unavailable,
}

/// Message store trait consumed by the relay.
///
/// Retry policy, if any, belongs to the implementation; the relay reports a
/// failed persist to the sender exactly once and moves on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a message draft and return it with its assigned id.
    async fn create_message(&self, draft: MessageDraft) -> Result<StoredMessage, StorageError>;

    /// Persist read timestamps for the given messages.
    async fn mark_read(
        &self,
        thread_id: &ThreadId,
        reader: &UserId,
        message_ids: &[MessageId],
    ) -> Result<(), StorageError>;
}
