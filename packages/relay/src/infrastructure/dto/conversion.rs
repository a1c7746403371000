//! Conversion logic between wire payloads and validated domain values.

use crate::domain::{MessageId, RelayError, ThreadId, UserId};

/// Convert a raw thread id from the wire into a validated [`ThreadId`].
pub fn thread_id(raw: String) -> Result<ThreadId, RelayError> {
    ThreadId::new(raw)
}

/// Convert raw user ids from a `presence:request` into validated [`UserId`]s.
/// Invalid entries are dropped rather than failing the whole request.
pub fn user_ids(raw: Vec<String>) -> Vec<UserId> {
    raw.into_iter()
        .filter_map(|id| UserId::new(id).ok())
        .collect()
}

/// Convert raw message ids from a `message_read` into [`MessageId`]s.
pub fn message_ids(raw: Vec<u64>) -> Vec<MessageId> {
    raw.into_iter().map(MessageId::new).collect()
}
