//! Error taxonomy for the relay.
//!
//! Every variant here is recovered locally and turned into a direct `error`
//! event to the originating connection; none of them abort the process.

use thiserror::Error;

/// Relay-level errors reported back to clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// No or invalid identity claim at connection time. Fatal to that
    /// connection attempt only.
    #[error("no valid identity was presented")]
    Unauthenticated,

    /// The identity is not permitted to access the thread. The connection
    /// stays open.
    #[error("access to thread '{thread_id}' denied")]
    AccessDenied { thread_id: String },

    /// Message validation failure (empty content, over-long content, ...).
    #[error("invalid content: {reason}")]
    InvalidContent { reason: String },

    /// The storage collaborator failed to persist. Carries the client's temp
    /// id (if any) so it can mark its optimistic entry failed or retry.
    #[error("failed to persist message")]
    PersistFailed { temp_id: Option<String> },

    /// Action required a live connection that is not currently open.
    #[error("connection is not registered")]
    NotConnected,
}

impl RelayError {
    /// Stable tag used in the wire-level `error` event.
    pub fn event_tag(&self) -> &'static str {
        match self {
            RelayError::Unauthenticated => "unauthenticated",
            RelayError::AccessDenied { .. } => "access_denied",
            RelayError::InvalidContent { .. } => "invalid_content",
            RelayError::PersistFailed { .. } => "persist_failed",
            RelayError::NotConnected => "not_connected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tags_are_stable() {
        // given / when / then:
        assert_eq!(RelayError::Unauthenticated.event_tag(), "unauthenticated");
        assert_eq!(
            RelayError::AccessDenied {
                thread_id: "42".to_string()
            }
            .event_tag(),
            "access_denied"
        );
        assert_eq!(
            RelayError::PersistFailed { temp_id: None }.event_tag(),
            "persist_failed"
        );
    }

    #[test]
    fn test_display_includes_thread_id() {
        // given:
        let err = RelayError::AccessDenied {
            thread_id: "42".to_string(),
        };

        // when:
        let rendered = err.to_string();

        // then:
        assert!(rendered.contains("42"));
    }
}
