//! Model provider implementations for papertalk.
//!
//! The dispatch loop and the retrieval pipeline both talk to hosted models
//! through the `Provider` trait from `papertalk-core`. This crate supplies
//! the OpenAI-compatible HTTP implementation (chat completions with tool
//! calling, plus the embeddings endpoint) and an adapter that exposes any
//! provider's embeddings as an `Embedder`.

pub mod embedder;
pub mod openai_compat;

pub use embedder::ProviderEmbedder;
pub use openai_compat::OpenAiCompatProvider;
