//! Error types for the papertalk domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all papertalk operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures while executing a tool on the model's behalf.
///
/// These never escape the dispatch loop as a crash: every variant is
/// rendered into a tool-result message the model can read and recover from.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    Unknown(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Document produced no chunks")]
    EmptyDocument,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Embedding request failed: {0}")]
    RequestFailed(String),

    #[error("Embedding count mismatch: expected {expected}, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupt conversation record for thread {thread_id}: {reason}")]
    Corrupt { thread_id: String, reason: String },
}

/// Errors that terminate a conversation turn and surface to the caller.
///
/// Tool-level failures are *not* represented here — those are folded back
/// into the conversation as structured results the model can react to.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Model invocation failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Maximum tool iterations exceeded ({limit})")]
    MaxIterationsExceeded { limit: u32 },

    #[error("History error: {0}")]
    History(#[from] HistoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = Error::Tool(ToolError::Unknown("teleport".into()));
        assert!(err.to_string().contains("teleport"));
    }

    #[test]
    fn max_iterations_carries_limit() {
        let err = AgentError::MaxIterationsExceeded { limit: 10 };
        assert!(err.to_string().contains("10"));
    }
}
