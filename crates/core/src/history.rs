//! HistoryStore trait — the durable conversation checkpoint store.
//!
//! Conversations are checkpointed whole, keyed by thread id, after every
//! successful turn. On process restart `list_threads` reconstructs the set
//! of known thread ids from the store.

use crate::error::HistoryError;
use crate::message::Conversation;
use async_trait::async_trait;

/// Durable per-thread conversation storage.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// A human-readable name for this store (e.g., "sqlite").
    fn name(&self) -> &str;

    /// Load the checkpointed conversation for a thread, if any.
    async fn load(&self, thread_id: &str) -> Result<Option<Conversation>, HistoryError>;

    /// Checkpoint a thread's conversation. Last write wins.
    async fn save(&self, conversation: &Conversation) -> Result<(), HistoryError>;

    /// All thread ids known to the store.
    async fn list_threads(&self) -> Result<Vec<String>, HistoryError>;
}
