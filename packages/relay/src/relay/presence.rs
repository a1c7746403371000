//! Presence tracker: per-identity online/away/offline state machine.
//!
//! Offline is solely connection-count-driven; away is purely client-asserted.
//! The tracker never infers activity from elapsed time, because the server
//! only knows socket liveness, not UI activity. Heartbeats refresh
//! `last_seen` and re-assert online.

use std::collections::HashMap;
use std::sync::Arc;

use irori_shared::time::{timestamp_to_rfc3339, Clock};
use tokio::sync::Mutex;

use crate::domain::{PresenceRecord, PresenceStatus, Timestamp, UserId};

/// A state transition the caller should fan out to room co-members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceChange {
    pub record: PresenceRecord,
    pub previous: PresenceStatus,
}

#[derive(Debug, Clone)]
struct PresenceEntry {
    status: PresenceStatus,
    last_seen: i64,
}

/// Tracks presence per identity.
///
/// Invariant: a user is `Offline` iff their live connection count is zero
/// (modulo an explicit offline signal sent just before disconnect).
pub struct PresenceTracker {
    clock: Arc<dyn Clock>,
    inner: Mutex<HashMap<UserId, PresenceEntry>>,
}

impl PresenceTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// A connection for `user_id` was registered. Returns a change if this
    /// took the user from offline to online.
    pub async fn connection_opened(&self, user_id: &UserId) -> Option<PresenceChange> {
        let now = self.clock.now_millis();
        let mut state = self.inner.lock().await;
        let entry = state.entry(user_id.clone()).or_insert(PresenceEntry {
            status: PresenceStatus::Offline,
            last_seen: now,
        });
        let previous = entry.status;
        entry.last_seen = now;
        if previous == PresenceStatus::Offline {
            entry.status = PresenceStatus::Online;
            tracing::debug!("User '{}' is now online", user_id);
            return Some(PresenceChange {
                record: PresenceRecord {
                    user_id: user_id.clone(),
                    status: PresenceStatus::Online,
                    last_seen: Timestamp::new(now),
                },
                previous,
            });
        }
        None
    }

    /// A connection for `user_id` was unregistered, leaving `remaining` live
    /// connections. Returns a change if the user dropped to offline.
    pub async fn connection_closed(
        &self,
        user_id: &UserId,
        remaining: usize,
    ) -> Option<PresenceChange> {
        if remaining > 0 {
            return None;
        }
        let now = self.clock.now_millis();
        let mut state = self.inner.lock().await;
        let entry = state.get_mut(user_id)?;
        let previous = entry.status;
        if previous == PresenceStatus::Offline {
            return None;
        }
        entry.status = PresenceStatus::Offline;
        entry.last_seen = now;
        tracing::debug!(
            "User '{}' is now offline (last seen {})",
            user_id,
            timestamp_to_rfc3339(now)
        );
        Some(PresenceChange {
            record: PresenceRecord {
                user_id: user_id.clone(),
                status: PresenceStatus::Offline,
                last_seen: Timestamp::new(now),
            },
            previous,
        })
    }

    /// Apply a client-reported status signal (heartbeat, away, activity
    /// restored, or explicit offline before disconnect).
    ///
    /// Last-writer-by-timestamp: a signal stamped earlier than the record's
    /// `last_seen` never regresses the state. Heartbeats that do not change
    /// the status still refresh `last_seen` and return `None`.
    pub async fn apply_update(
        &self,
        user_id: &UserId,
        status: PresenceStatus,
    ) -> Option<PresenceChange> {
        let now = self.clock.now_millis();
        let mut state = self.inner.lock().await;
        let entry = state.entry(user_id.clone()).or_insert(PresenceEntry {
            status: PresenceStatus::Offline,
            last_seen: now,
        });
        if now < entry.last_seen {
            tracing::debug!(
                "Ignoring stale presence signal for '{}' ({} < {})",
                user_id,
                now,
                entry.last_seen
            );
            return None;
        }
        let previous = entry.status;
        entry.last_seen = now;
        if previous == status {
            return None;
        }
        entry.status = status;
        tracing::debug!("User '{}' presence: {:?} -> {:?}", user_id, previous, status);
        Some(PresenceChange {
            record: PresenceRecord {
                user_id: user_id.clone(),
                status,
                last_seen: Timestamp::new(now),
            },
            previous,
        })
    }

    /// Presence of one identity. Unknown identities read as offline.
    pub async fn get(&self, user_id: &UserId) -> PresenceRecord {
        let state = self.inner.lock().await;
        match state.get(user_id) {
            Some(entry) => PresenceRecord {
                user_id: user_id.clone(),
                status: entry.status,
                last_seen: Timestamp::new(entry.last_seen),
            },
            None => PresenceRecord {
                user_id: user_id.clone(),
                status: PresenceStatus::Offline,
                last_seen: Timestamp::new(0),
            },
        }
    }

    /// Presence of many identities at once.
    pub async fn get_bulk(&self, user_ids: &[UserId]) -> Vec<PresenceRecord> {
        let state = self.inner.lock().await;
        user_ids
            .iter()
            .map(|user_id| match state.get(user_id) {
                Some(entry) => PresenceRecord {
                    user_id: user_id.clone(),
                    status: entry.status,
                    last_seen: Timestamp::new(entry.last_seen),
                },
                None => PresenceRecord {
                    user_id: user_id.clone(),
                    status: PresenceStatus::Offline,
                    last_seen: Timestamp::new(0),
                },
            })
            .collect()
    }
}
