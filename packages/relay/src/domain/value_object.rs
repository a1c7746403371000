//! Validated value objects for the relay domain.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::RelayError;

/// Maximum length of user and thread identifiers (characters)
pub const MAX_ID_LEN: usize = 128;

/// Maximum length of a message body (characters)
pub const MAX_CONTENT_LEN: usize = 4000;

/// Opaque handle for one live WebSocket connection.
///
/// A user may hold several connections at once (multiple tabs/devices), so
/// connections are keyed by their own id, never by user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Allocate a fresh connection id
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// External user identity. The relay never creates or deletes users; it only
/// associates connections with an identity supplied at admission time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a new UserId, validating that it is non-empty and within length
    pub fn new(value: String) -> Result<Self, RelayError> {
        if value.is_empty() || value.chars().count() > MAX_ID_LEN {
            return Err(RelayError::Unauthenticated);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Conversation thread identity, owned by the CMS side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    /// Create a new ThreadId, validating that it is non-empty and within length
    pub fn new(value: String) -> Result<Self, RelayError> {
        if value.is_empty() || value.chars().count() > MAX_ID_LEN {
            return Err(RelayError::InvalidContent {
                reason: "thread id must be non-empty".to_string(),
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-assigned persistent message identifier (storage-issued).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(u64);

impl MessageId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Client-generated optimistic message identifier.
///
/// Never validated beyond non-emptiness; the relay only echoes it back in the
/// id-mapping confirmation so the client can reconcile its optimistic entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TempMessageId(String);

impl TempMessageId {
    pub fn new(value: String) -> Result<Self, RelayError> {
        if value.is_empty() {
            return Err(RelayError::InvalidContent {
                reason: "temp id must be non-empty".to_string(),
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TempMessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message body, validated at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageContent(String);

impl MessageContent {
    /// Create new content, validating that it is non-empty (after trimming)
    /// and within [`MAX_CONTENT_LEN`]
    pub fn new(value: String) -> Result<Self, RelayError> {
        if value.trim().is_empty() {
            return Err(RelayError::InvalidContent {
                reason: "content must be non-empty".to_string(),
            });
        }
        if value.chars().count() > MAX_CONTENT_LEN {
            return Err(RelayError::InvalidContent {
                reason: format!("content exceeds {MAX_CONTENT_LEN} characters"),
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Unix timestamp in UTC milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}
