//! # papertalk core
//!
//! Domain types, traits, and error definitions for the papertalk
//! conversational agent. This crate has **zero framework dependencies** —
//! it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod embedding;
pub mod error;
pub mod history;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use embedding::Embedder;
pub use error::{
    AgentError, EmbeddingError, Error, HistoryError, ProviderError, Result, RetrievalError,
    ToolError,
};
pub use history::HistoryStore;
pub use message::{Conversation, Message, MessageToolCall, Role, ThreadId};
pub use provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse,
    ToolDefinition, Usage,
};
pub use tool::{Tool, ToolCallRequest, ToolId, ToolRegistry, ToolResult};
