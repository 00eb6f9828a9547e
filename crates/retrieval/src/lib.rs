//! Per-thread document retrieval for papertalk.
//!
//! A user uploads a PDF into a conversation thread; questions in that thread
//! are then grounded in the document's contents. The pipeline is:
//!
//! 1. **Extract** — per-page text extraction from the PDF bytes
//! 2. **Split** — overlapping, boundary-aware character chunks
//! 3. **Embed** — one vector per chunk via the injected [`Embedder`]
//! 4. **Index** — immutable [`DocumentIndex`] answering top-k cosine queries
//!
//! [`ThreadRetrievalRegistry`] owns the thread-id → index mapping and
//! guarantees isolation: a document ingested into one thread is never
//! retrievable from another.
//!
//! [`Embedder`]: papertalk_core::Embedder

pub mod extract;
pub mod index;
pub mod registry;
pub mod splitter;

pub use index::{DocumentChunk, DocumentIndex, SourceLocator};
pub use registry::{IngestSummary, RetrievalHits, RetrievalOutcome, ThreadRetrievalRegistry};
pub use splitter::SplitConfig;
