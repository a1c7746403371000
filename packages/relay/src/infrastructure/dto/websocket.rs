//! WebSocket wire protocol: inbound client events and outbound server events.
//!
//! Both directions are internally tagged JSON (`{"type": "...", ...}`).
//! Inbound payloads carry raw strings; validation happens in `conversion`
//! when they are turned into domain values.

use serde::{Deserialize, Serialize};

use crate::domain::{
    Attachment, PresenceRecord, PresenceStatus, RelayError, StoredMessage, ThreadId, UserId,
};

fn default_content_type() -> String {
    "text/plain".to_string()
}

/// Events a client may send over the WebSocket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "join_thread")]
    JoinThread { thread_id: String },

    #[serde(rename = "leave_thread")]
    LeaveThread { thread_id: String },

    #[serde(rename = "message_send")]
    MessageSend {
        thread_id: String,
        #[serde(default)]
        temp_id: Option<String>,
        content: String,
        #[serde(default = "default_content_type")]
        content_type: String,
        #[serde(default)]
        attachments: Vec<Attachment>,
    },

    #[serde(rename = "typing")]
    Typing { thread_id: String, is_typing: bool },

    #[serde(rename = "message_read")]
    MessageRead {
        thread_id: String,
        message_ids: Vec<u64>,
    },

    #[serde(rename = "presence:update")]
    PresenceUpdate { status: PresenceStatus },

    #[serde(rename = "presence:request")]
    PresenceRequest { user_ids: Vec<String> },
}

impl ClientEvent {
    /// Tag used when reporting an error caused by this event.
    pub fn tag(&self) -> &'static str {
        match self {
            ClientEvent::JoinThread { .. } => "join_thread",
            ClientEvent::LeaveThread { .. } => "leave_thread",
            ClientEvent::MessageSend { .. } => "message_send",
            ClientEvent::Typing { .. } => "typing",
            ClientEvent::MessageRead { .. } => "message_read",
            ClientEvent::PresenceUpdate { .. } => "presence:update",
            ClientEvent::PresenceRequest { .. } => "presence:request",
        }
    }
}

/// Presence payload on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceDto {
    pub user_id: String,
    pub status: PresenceStatus,
    pub last_seen: i64,
}

impl From<PresenceRecord> for PresenceDto {
    fn from(record: PresenceRecord) -> Self {
        Self {
            user_id: record.user_id.into_string(),
            status: record.status,
            last_seen: record.last_seen.value(),
        }
    }
}

/// Events the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Confirmed message, broadcast to room members.
    #[serde(rename = "message")]
    Message {
        id: u64,
        thread_id: String,
        sender: String,
        content: String,
        content_type: String,
        attachments: Vec<Attachment>,
        created_at: i64,
    },

    /// Temp-to-real id reconciliation, delivered only to the originating
    /// connection.
    #[serde(rename = "message_id_mapping")]
    MessageIdMapping {
        thread_id: String,
        temp_id: String,
        real_id: u64,
    },

    #[serde(rename = "typing")]
    Typing {
        thread_id: String,
        user_id: String,
        is_typing: bool,
    },

    #[serde(rename = "read_receipt")]
    ReadReceipt {
        thread_id: String,
        user_id: String,
        message_id: u64,
    },

    #[serde(rename = "presence:status")]
    PresenceStatusChanged {
        #[serde(flatten)]
        presence: PresenceDto,
    },

    #[serde(rename = "presence:bulk")]
    PresenceBulk { presences: Vec<PresenceDto> },

    #[serde(rename = "thread_joined")]
    ThreadJoined { thread_id: String },

    #[serde(rename = "thread_left")]
    ThreadLeft { thread_id: String },

    /// Direct error report, tagged with the inbound event that caused it.
    #[serde(rename = "error")]
    Error {
        event: String,
        error: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        temp_id: Option<String>,
    },
}

impl ServerEvent {
    pub fn message(stored: &StoredMessage) -> Self {
        ServerEvent::Message {
            id: stored.id.value(),
            thread_id: stored.thread_id.as_str().to_string(),
            sender: stored.sender.as_str().to_string(),
            content: stored.content.as_str().to_string(),
            content_type: stored.content_type.clone(),
            attachments: stored.attachments.clone(),
            created_at: stored.created_at.value(),
        }
    }

    pub fn typing(thread_id: &ThreadId, user_id: &UserId, is_typing: bool) -> Self {
        ServerEvent::Typing {
            thread_id: thread_id.as_str().to_string(),
            user_id: user_id.as_str().to_string(),
            is_typing,
        }
    }

    pub fn presence(record: PresenceRecord) -> Self {
        ServerEvent::PresenceStatusChanged {
            presence: record.into(),
        }
    }

    pub fn error(event_tag: &str, err: &RelayError) -> Self {
        let temp_id = match err {
            RelayError::PersistFailed { temp_id } => temp_id.clone(),
            _ => None,
        };
        ServerEvent::Error {
            event: event_tag.to_string(),
            error: err.event_tag().to_string(),
            message: err.to_string(),
            temp_id,
        }
    }

    /// Serialize for the wire. Serialization of these variants cannot fail in
    /// practice; if it ever does, a generic error event is emitted instead of
    /// panicking the connection task.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!("Failed to serialize server event: {}", e);
            r#"{"type":"error","event":"internal","error":"internal","message":"serialization failure"}"#
                .to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_join_thread_deserializes() {
        // given:
        let json = r#"{"type":"join_thread","thread_id":"42"}"#;

        // when:
        let event: ClientEvent = serde_json::from_str(json).unwrap();

        // then:
        assert_eq!(
            event,
            ClientEvent::JoinThread {
                thread_id: "42".to_string()
            }
        );
    }

    #[test]
    fn test_client_event_message_send_applies_defaults() {
        // given: no temp_id, content_type, or attachments
        let json = r#"{"type":"message_send","thread_id":"42","content":"hi"}"#;

        // when:
        let event: ClientEvent = serde_json::from_str(json).unwrap();

        // then:
        match event {
            ClientEvent::MessageSend {
                temp_id,
                content_type,
                attachments,
                ..
            } => {
                assert_eq!(temp_id, None);
                assert_eq!(content_type, "text/plain");
                assert!(attachments.is_empty());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_client_event_presence_update_uses_colon_tag() {
        // given:
        let json = r#"{"type":"presence:update","status":"away"}"#;

        // when:
        let event: ClientEvent = serde_json::from_str(json).unwrap();

        // then:
        assert_eq!(
            event,
            ClientEvent::PresenceUpdate {
                status: PresenceStatus::Away
            }
        );
    }

    #[test]
    fn test_client_event_unknown_type_is_rejected() {
        // given:
        let json = r#"{"type":"self_destruct"}"#;

        // when:
        let result = serde_json::from_str::<ClientEvent>(json);

        // then:
        assert!(result.is_err());
    }

    #[test]
    fn test_server_event_typing_serializes_with_tag() {
        // given:
        let event = ServerEvent::Typing {
            thread_id: "42".to_string(),
            user_id: "alice".to_string(),
            is_typing: true,
        };

        // when:
        let json = event.to_json();

        // then:
        assert!(json.contains(r#""type":"typing""#));
        assert!(json.contains(r#""is_typing":true"#));
    }

    #[test]
    fn test_server_event_presence_status_flattens_record() {
        // given:
        let event = ServerEvent::PresenceStatusChanged {
            presence: PresenceDto {
                user_id: "alice".to_string(),
                status: PresenceStatus::Online,
                last_seen: 1000,
            },
        };

        // when:
        let json = event.to_json();

        // then:
        assert!(json.contains(r#""type":"presence:status""#));
        assert!(json.contains(r#""user_id":"alice""#));
        assert!(json.contains(r#""status":"online""#));
    }

    #[test]
    fn test_server_event_error_includes_temp_id_for_persist_failures() {
        // given:
        let err = RelayError::PersistFailed {
            temp_id: Some("t1".to_string()),
        };

        // when:
        let json = ServerEvent::error("message_send", &err).to_json();

        // then:
        assert!(json.contains(r#""event":"message_send""#));
        assert!(json.contains(r#""error":"persist_failed""#));
        assert!(json.contains(r#""temp_id":"t1""#));
    }

    #[test]
    fn test_server_event_error_omits_absent_temp_id() {
        // given:
        let err = RelayError::NotConnected;

        // when:
        let json = ServerEvent::error("typing", &err).to_json();

        // then:
        assert!(!json.contains("temp_id"));
    }
}
