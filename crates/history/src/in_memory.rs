//! In-memory history store.
//!
//! Conversations vanish with the process. Used in tests and anywhere
//! durability is not wanted.

use async_trait::async_trait;
use papertalk_core::error::HistoryError;
use papertalk_core::message::Conversation;
use papertalk_core::HistoryStore;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A HashMap-backed history store.
#[derive(Default)]
pub struct InMemoryHistory {
    threads: RwLock<HashMap<String, Conversation>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load(&self, thread_id: &str) -> Result<Option<Conversation>, HistoryError> {
        Ok(self.threads.read().await.get(thread_id).cloned())
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), HistoryError> {
        self.threads
            .write()
            .await
            .insert(conversation.thread_id.as_str().to_string(), conversation.clone());
        Ok(())
    }

    async fn list_threads(&self) -> Result<Vec<String>, HistoryError> {
        Ok(self.threads.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use papertalk_core::message::{Message, ThreadId};

    #[tokio::test]
    async fn save_load_list() {
        let store = InMemoryHistory::new();
        let mut conv = Conversation::new(ThreadId::from("t1"));
        conv.push(Message::user("hi"));

        store.save(&conv).await.unwrap();
        let loaded = store.load("t1").await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(store.list_threads().await.unwrap(), vec!["t1"]);
    }

    #[tokio::test]
    async fn unknown_thread_is_none() {
        let store = InMemoryHistory::new();
        assert!(store.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn overwrite_replaces() {
        let store = InMemoryHistory::new();
        let mut conv = Conversation::new(ThreadId::from("t1"));
        conv.push(Message::user("first"));
        store.save(&conv).await.unwrap();

        conv.push(Message::assistant("second"));
        store.save(&conv).await.unwrap();

        let loaded = store.load("t1").await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 2);
    }
}
