//! The assistant facade.
//!
//! Owns the dispatch loop, the retrieval registry, and the history store,
//! and exposes the operations an embedding application calls: send a
//! message, upload a document, inspect threads.

use crate::dispatch::DispatchLoop;
use papertalk_core::error::{Error, HistoryError};
use papertalk_core::message::{Conversation, Message, ThreadId};
use papertalk_core::HistoryStore;
use papertalk_retrieval::{IngestSummary, ThreadRetrievalRegistry};
use std::sync::Arc;
use tracing::info;

pub struct Assistant {
    dispatch: DispatchLoop,
    retrieval: Arc<ThreadRetrievalRegistry>,
    history: Arc<dyn HistoryStore>,
}

impl Assistant {
    pub fn new(
        dispatch: DispatchLoop,
        retrieval: Arc<ThreadRetrievalRegistry>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            dispatch,
            retrieval,
            history,
        }
    }

    /// Run one user turn on a thread and return the assistant's reply.
    ///
    /// The conversation is loaded from history (or created on first
    /// contact) and checkpointed only after the turn succeeds, so a failed
    /// turn leaves the stored history untouched.
    pub async fn send_message(&self, thread_id: &str, text: &str) -> Result<String, Error> {
        let mut conversation = match self.history.load(thread_id).await? {
            Some(existing) => existing,
            None => {
                info!(thread_id, "Starting new thread");
                Conversation::new(ThreadId::from(thread_id))
            }
        };

        conversation.push(Message::user(text));
        let reply = self.dispatch.run_turn(&mut conversation).await?;
        self.history.save(&conversation).await?;
        Ok(reply)
    }

    /// Index a PDF for a thread, replacing any prior document.
    pub async fn ingest_document(
        &self,
        thread_id: &str,
        raw_document_bytes: &[u8],
        display_name: Option<&str>,
    ) -> Result<IngestSummary, Error> {
        let summary = self
            .retrieval
            .ingest(thread_id, raw_document_bytes, display_name)
            .await?;
        Ok(summary)
    }

    /// Thread ids known to the history store.
    pub async fn list_threads(&self) -> Result<Vec<String>, HistoryError> {
        self.history.list_threads().await
    }

    /// Whether the thread currently has an indexed document.
    pub async fn thread_has_document(&self, thread_id: &str) -> bool {
        self.retrieval.has_document(thread_id).await
    }

    /// Metadata about the thread's indexed document, if any.
    pub async fn thread_metadata(&self, thread_id: &str) -> Option<IngestSummary> {
        self.retrieval.metadata(thread_id).await
    }

    /// Drop the thread's indexed document. Safe to call repeatedly.
    pub async fn clear_thread_document(&self, thread_id: &str) {
        self.retrieval.clear(thread_id).await;
    }
}
