//! Domain entities: message drafts, stored messages, presence records.

use serde::{Deserialize, Serialize};

use super::value_object::{MessageContent, MessageId, ThreadId, Timestamp, UserId};

/// Attachment metadata relayed verbatim.
///
/// Upload handling lives in the CMS; by the time a send reaches the relay,
/// attachments are already-uploaded media references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub url: String,
}

/// A message as submitted by a client, before storage has assigned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub thread_id: ThreadId,
    pub sender: UserId,
    pub content: MessageContent,
    pub content_type: String,
    pub attachments: Vec<Attachment>,
}

/// A message confirmed by storage, carrying its persistent id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: MessageId,
    pub thread_id: ThreadId,
    pub sender: UserId,
    pub content: MessageContent,
    pub content_type: String,
    pub attachments: Vec<Attachment>,
    pub created_at: Timestamp,
}

/// Coarse availability state, distinct from raw connection liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Away,
    Offline,
}

/// One identity's presence: status plus when we last heard from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceRecord {
    pub user_id: UserId,
    pub status: PresenceStatus,
    pub last_seen: Timestamp,
}
