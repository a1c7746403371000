//! In-memory MessageStore.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use irori_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{
    MessageDraft, MessageId, MessageStore, StorageError, StoredMessage, ThreadId, Timestamp,
    UserId,
};

#[derive(Default)]
struct StoreState {
    next_id: u64,
    // thread id -> message log, in creation order
    messages: HashMap<ThreadId, Vec<StoredMessage>>,
    // (thread id, message id) -> reader -> read-at
    receipts: HashMap<(ThreadId, MessageId), HashMap<UserId, Timestamp>>,
}

/// In-memory implementation of [`MessageStore`] with monotonically increasing
/// message ids. Holds everything for the process lifetime; no durability.
pub struct InMemoryMessageStore {
    clock: Arc<dyn Clock>,
    inner: Mutex<StoreState>,
}

impl InMemoryMessageStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Mutex::new(StoreState::default()),
        }
    }

    /// Messages stored for a thread, in creation order.
    pub async fn messages_in(&self, thread_id: &ThreadId) -> Vec<StoredMessage> {
        let state = self.inner.lock().await;
        state.messages.get(thread_id).cloned().unwrap_or_default()
    }

    /// Readers that marked a message read.
    pub async fn readers_of(&self, thread_id: &ThreadId, message_id: MessageId) -> Vec<UserId> {
        let state = self.inner.lock().await;
        state
            .receipts
            .get(&(thread_id.clone(), message_id))
            .map(|readers| readers.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn create_message(&self, draft: MessageDraft) -> Result<StoredMessage, StorageError> {
        let now = self.clock.now_millis();
        let mut state = self.inner.lock().await;
        state.next_id += 1;
        let stored = StoredMessage {
            id: MessageId::new(state.next_id),
            thread_id: draft.thread_id.clone(),
            sender: draft.sender,
            content: draft.content,
            content_type: draft.content_type,
            attachments: draft.attachments,
            created_at: Timestamp::new(now),
        };
        state
            .messages
            .entry(draft.thread_id)
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn mark_read(
        &self,
        thread_id: &ThreadId,
        reader: &UserId,
        message_ids: &[MessageId],
    ) -> Result<(), StorageError> {
        let now = Timestamp::new(self.clock.now_millis());
        let mut state = self.inner.lock().await;
        for message_id in message_ids {
            state
                .receipts
                .entry((thread_id.clone(), *message_id))
                .or_default()
                .insert(reader.clone(), now);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use irori_shared::time::ManualClock;

    use crate::domain::MessageContent;

    use super::*;

    fn draft(thread: &str, sender: &str, content: &str) -> MessageDraft {
        MessageDraft {
            thread_id: ThreadId::new(thread.to_string()).unwrap(),
            sender: UserId::new(sender.to_string()).unwrap(),
            content: MessageContent::new(content.to_string()).unwrap(),
            content_type: "text/plain".to_string(),
            attachments: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_create_message_assigns_increasing_ids() {
        // given:
        let store = InMemoryMessageStore::new(Arc::new(ManualClock::new(1_000)));

        // when:
        let first = store.create_message(draft("42", "alice", "one")).await.unwrap();
        let second = store.create_message(draft("42", "alice", "two")).await.unwrap();

        // then:
        assert!(second.id > first.id);
        let thread = ThreadId::new("42".to_string()).unwrap();
        let log = store.messages_in(&thread).await;
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].content.as_str(), "one");
        assert_eq!(log[1].content.as_str(), "two");
    }

    #[tokio::test]
    async fn test_create_message_stamps_clock_time() {
        // given:
        let clock = Arc::new(ManualClock::new(5_000));
        let store = InMemoryMessageStore::new(clock.clone());

        // when:
        clock.advance(250);
        let stored = store.create_message(draft("42", "alice", "hi")).await.unwrap();

        // then:
        assert_eq!(stored.created_at, Timestamp::new(5_250));
    }

    #[tokio::test]
    async fn test_mark_read_records_readers() {
        // given:
        let store = InMemoryMessageStore::new(Arc::new(ManualClock::new(1_000)));
        let stored = store.create_message(draft("42", "alice", "hi")).await.unwrap();
        let thread = ThreadId::new("42".to_string()).unwrap();
        let bob = UserId::new("bob".to_string()).unwrap();

        // when:
        store.mark_read(&thread, &bob, &[stored.id]).await.unwrap();

        // then:
        assert_eq!(store.readers_of(&thread, stored.id).await, vec![bob]);
    }

    #[tokio::test]
    async fn test_threads_are_isolated() {
        // given:
        let store = InMemoryMessageStore::new(Arc::new(ManualClock::new(1_000)));
        store.create_message(draft("42", "alice", "hi")).await.unwrap();

        // when:
        let other = ThreadId::new("7".to_string()).unwrap();

        // then:
        assert!(store.messages_in(&other).await.is_empty());
    }
}
