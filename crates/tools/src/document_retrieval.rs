//! Per-thread document retrieval tool.
//!
//! The model must pass the thread id it was given in its system directive,
//! so the lookup can only ever hit the document uploaded in that thread.
//! A thread with no document yields a structured error payload telling the
//! model to ask the user for an upload.

use async_trait::async_trait;
use papertalk_core::error::ToolError;
use papertalk_core::tool::{Tool, ToolResult};
use papertalk_retrieval::{RetrievalOutcome, ThreadRetrievalRegistry};
use std::sync::Arc;
use tracing::debug;

pub struct DocumentRetrievalTool {
    retrieval: Arc<ThreadRetrievalRegistry>,
}

impl DocumentRetrievalTool {
    pub fn new(retrieval: Arc<ThreadRetrievalRegistry>) -> Self {
        Self { retrieval }
    }
}

#[async_trait]
impl Tool for DocumentRetrievalTool {
    fn name(&self) -> &str {
        "document_retrieval"
    }

    fn description(&self) -> &str {
        "Search the PDF document uploaded in this conversation. Always pass the thread_id from your instructions."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to look for in the uploaded document"
                },
                "thread_id": {
                    "type": "string",
                    "description": "The id of the current conversation thread"
                }
            },
            "required": ["query", "thread_id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let thread_id = arguments["thread_id"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'thread_id' argument".into()))?;

        debug!(thread_id, query, "Document retrieval");

        match self.retrieval.query(thread_id, query, None).await {
            Ok(RetrievalOutcome::NoDocument) => Ok(ToolResult::error(
                "No document has been uploaded in this conversation. Ask the user to upload a PDF first.",
            )),
            Ok(RetrievalOutcome::Hits(hits)) => {
                let chunks: Vec<serde_json::Value> = hits
                    .context
                    .iter()
                    .zip(hits.locators.iter())
                    .map(|(text, locator)| {
                        serde_json::json!({
                            "text": text,
                            "page": locator.page,
                        })
                    })
                    .collect();
                let data = serde_json::json!({
                    "query": query,
                    "source_file": hits.source_file,
                    "chunks": chunks,
                });
                let output = hits.context.join("\n\n---\n\n");
                Ok(ToolResult::ok(output, Some(data)))
            }
            Err(e) => Ok(ToolResult::error(format!("Document lookup failed: {e}"))),
        }
    }
}
