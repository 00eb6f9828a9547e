//! Thread-scoped retrieval registry.
//!
//! Maps thread ids to a [`DocumentIndex`] plus ingestion metadata. At most
//! one document per thread: re-ingestion atomically replaces the prior
//! index, `clear` removes it, and querying a thread without a document is a
//! soft "no document" outcome the model is expected to relay to the user.

use crate::extract;
use crate::index::{DocumentChunk, DocumentIndex, SourceLocator};
use crate::splitter::{self, SplitConfig};
use papertalk_core::Embedder;
use papertalk_core::error::RetrievalError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Summary of the last successful ingest for a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Original upload filename, or a placeholder
    pub display_name: String,

    /// Number of source pages loaded from the document
    pub document_count: usize,

    /// Number of chunks in the index
    pub chunk_count: usize,
}

/// Chunks retrieved for a query against a thread's document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalHits {
    /// Chunk texts, best match first
    pub context: Vec<String>,

    /// One locator per context entry
    pub locators: Vec<SourceLocator>,

    /// The document the chunks came from
    pub source_file: String,
}

/// Outcome of a retrieval query.
///
/// `NoDocument` is a normal, expected result — the caller (and ultimately
/// the model) must be able to tell it apart from an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RetrievalOutcome {
    NoDocument,
    Hits(RetrievalHits),
}

struct ThreadDocument {
    index: Arc<DocumentIndex>,
    summary: IngestSummary,
}

/// Owns the thread-id → document-index mapping.
///
/// Reads and writes to the same thread's entry are mutually exclusive;
/// distinct threads do not contend beyond the map lock itself. Embedding
/// happens outside the lock, so a query racing a re-ingest sees either the
/// old index or the new one, never a mixture.
pub struct ThreadRetrievalRegistry {
    embedder: Arc<dyn Embedder>,
    split: SplitConfig,
    default_top_k: usize,
    entries: RwLock<HashMap<String, ThreadDocument>>,
}

impl ThreadRetrievalRegistry {
    pub fn new(embedder: Arc<dyn Embedder>, split: SplitConfig, default_top_k: usize) -> Self {
        Self {
            embedder,
            split,
            default_top_k: default_top_k.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Ingest a PDF for a thread, replacing any prior document.
    ///
    /// Splits the document into overlapping chunks, embeds each chunk, and
    /// builds a fresh index. Fails with `EmptyInput` when the upload is
    /// empty or yields no extractable text.
    pub async fn ingest(
        &self,
        thread_id: &str,
        raw_document_bytes: &[u8],
        display_name: Option<&str>,
    ) -> Result<IngestSummary, RetrievalError> {
        let pages = extract::pdf_pages(raw_document_bytes)?;

        let mut chunks: Vec<DocumentChunk> = Vec::new();
        for (page_idx, page_text) in pages.iter().enumerate() {
            for (text, offset) in splitter::split_text(page_text, &self.split) {
                chunks.push(DocumentChunk {
                    text,
                    locator: SourceLocator {
                        page: page_idx as u32 + 1,
                        offset,
                    },
                });
            }
        }

        if chunks.is_empty() {
            return Err(RetrievalError::EmptyInput(
                "document yielded no chunks".into(),
            ));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self
            .embedder
            .embed(&texts)
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;
        if embeddings.len() != chunks.len() {
            return Err(RetrievalError::Embedding(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let summary = IngestSummary {
            display_name: display_name.unwrap_or("uploaded.pdf").to_string(),
            document_count: pages.len(),
            chunk_count: chunks.len(),
        };

        let index = DocumentIndex::build(chunks.into_iter().zip(embeddings).collect())?;

        info!(
            thread_id,
            document = %summary.display_name,
            pages = summary.document_count,
            chunks = summary.chunk_count,
            "Ingested document for thread"
        );

        self.entries.write().await.insert(
            thread_id.to_string(),
            ThreadDocument {
                index: Arc::new(index),
                summary: summary.clone(),
            },
        );

        Ok(summary)
    }

    /// True iff an index is currently registered for the thread.
    pub async fn has_document(&self, thread_id: &str) -> bool {
        self.entries.read().await.contains_key(thread_id)
    }

    /// Last-ingest summary for the thread, if any.
    pub async fn metadata(&self, thread_id: &str) -> Option<IngestSummary> {
        self.entries
            .read()
            .await
            .get(thread_id)
            .map(|e| e.summary.clone())
    }

    /// Remove the thread's index and metadata. Idempotent.
    pub async fn clear(&self, thread_id: &str) {
        if self.entries.write().await.remove(thread_id).is_some() {
            debug!(thread_id, "Cleared thread document");
        }
    }

    /// Thread ids that currently have a document.
    pub async fn threads_with_documents(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }

    /// Retrieve the top-k chunks for a query against the thread's document.
    ///
    /// A thread without a document yields `RetrievalOutcome::NoDocument`
    /// rather than an error.
    pub async fn query(
        &self,
        thread_id: &str,
        query_text: &str,
        k: Option<usize>,
    ) -> Result<RetrievalOutcome, RetrievalError> {
        let k = k.unwrap_or(self.default_top_k);
        if k == 0 {
            return Err(RetrievalError::InvalidArgument("k must be positive".into()));
        }

        // Snapshot the index so embedding doesn't hold the map lock.
        let Some((index, source_file)) = self
            .entries
            .read()
            .await
            .get(thread_id)
            .map(|e| (Arc::clone(&e.index), e.summary.display_name.clone()))
        else {
            return Ok(RetrievalOutcome::NoDocument);
        };

        let query_embedding = self
            .embedder
            .embed_query(query_text)
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        let ranked = index.query(&query_embedding, k)?;

        Ok(RetrievalOutcome::Hits(RetrievalHits {
            context: ranked.iter().map(|(c, _)| c.text.clone()).collect(),
            locators: ranked.iter().map(|(c, _)| c.locator.clone()).collect(),
            source_file,
        }))
    }
}
