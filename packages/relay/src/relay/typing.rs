//! Typing coordinator: per-thread set of currently-typing identities with
//! auto-expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use irori_shared::time::Clock;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::domain::{ConnectionId, ThreadId, UserId};
use crate::infrastructure::dto::websocket::ServerEvent;

use super::rooms::RoomManager;

/// How long a typing entry lives without a refresh.
pub const DEFAULT_TYPING_TIMEOUT: Duration = Duration::from_secs(10);

/// How often the background sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Tracks who is typing in which thread.
///
/// Entries expire `timeout` after their last refresh. The background sweep
/// broadcasts the implicit stop; reads additionally filter expired entries
/// lazily, so no identity is ever reported as typing longer than
/// timeout + sweep interval after its last refresh.
pub struct TypingCoordinator {
    rooms: Arc<RoomManager>,
    clock: Arc<dyn Clock>,
    timeout_millis: i64,
    // thread id -> (user id -> expiry timestamp, millis)
    inner: Mutex<HashMap<ThreadId, HashMap<UserId, i64>>>,
}

impl TypingCoordinator {
    pub fn new(rooms: Arc<RoomManager>, clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        Self {
            rooms,
            clock,
            timeout_millis: timeout.as_millis() as i64,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Record a typing start/stop for `user_id` in `thread_id` and broadcast
    /// the state to the room, excluding the originating connection.
    ///
    /// A start while already typing just refreshes the expiry; the duplicate
    /// broadcast is acceptable (idempotent at the client). An explicit stop
    /// removes the entry immediately.
    pub async fn set_typing(
        &self,
        thread_id: &ThreadId,
        user_id: &UserId,
        is_typing: bool,
        exclude: Option<&ConnectionId>,
    ) {
        {
            let mut state = self.inner.lock().await;
            if is_typing {
                let expires_at = self.clock.now_millis() + self.timeout_millis;
                state
                    .entry(thread_id.clone())
                    .or_default()
                    .insert(user_id.clone(), expires_at);
            } else if let Some(entries) = state.get_mut(thread_id) {
                entries.remove(user_id);
                if entries.is_empty() {
                    state.remove(thread_id);
                }
            }
        }

        let event = ServerEvent::typing(thread_id, user_id, is_typing);
        self.rooms
            .broadcast(thread_id, &event.to_json(), exclude)
            .await;
    }

    /// Identities currently typing in `thread_id`. Expired entries are pruned
    /// on read, so the result is fresh even between sweeps.
    pub async fn typing_users(&self, thread_id: &ThreadId) -> Vec<UserId> {
        let now = self.clock.now_millis();
        let mut state = self.inner.lock().await;
        match state.get_mut(thread_id) {
            Some(entries) => {
                entries.retain(|_, expires_at| *expires_at > now);
                let users = entries.keys().cloned().collect();
                if entries.is_empty() {
                    state.remove(thread_id);
                }
                users
            }
            None => Vec::new(),
        }
    }

    /// Remove every expired entry and broadcast the implicit stop for each.
    /// Returns how many entries expired.
    pub async fn sweep_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let expired: Vec<(ThreadId, UserId)> = {
            let mut state = self.inner.lock().await;
            let mut expired = Vec::new();
            state.retain(|thread_id, entries| {
                entries.retain(|user_id, expires_at| {
                    if *expires_at <= now {
                        expired.push((thread_id.clone(), user_id.clone()));
                        false
                    } else {
                        true
                    }
                });
                !entries.is_empty()
            });
            expired
        };

        for (thread_id, user_id) in &expired {
            tracing::debug!(
                "Typing entry for '{}' in thread '{}' expired",
                user_id,
                thread_id
            );
            let event = ServerEvent::typing(thread_id, user_id, false);
            self.rooms.broadcast(thread_id, &event.to_json(), None).await;
        }
        expired.len()
    }

    /// Spawn the background sweep task. It runs until the returned handle is
    /// aborted or the runtime shuts down.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                coordinator.sweep_expired().await;
            }
        })
    }
}
