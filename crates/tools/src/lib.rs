//! Built-in tool implementations for papertalk.
//!
//! Six capabilities the model can invoke mid-conversation: web search,
//! encyclopedia lookup, arithmetic, stock quotes, natural-language SQL over
//! the demo company database, and per-thread document retrieval.
//!
//! Every collaborator a tool needs (HTTP client, model provider, database
//! pool, retrieval registry) is injected through [`registry`] — tools hold
//! no global state.

pub mod calculator;
pub mod document_retrieval;
pub mod sql_query;
pub mod stock_price;
pub mod web_search;
pub mod wikipedia;

pub use sql_query::seed_demo_database;

use papertalk_core::error::ToolError;
use papertalk_core::tool::{ToolId, ToolRegistry};
use papertalk_core::Provider;
use papertalk_retrieval::ThreadRetrievalRegistry;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

/// Build the full tool registry from explicit dependencies.
///
/// - `provider` and `chat_model` drive the NL-to-SQL round-trips.
/// - `company_db` is the pool the generated SQL runs against.
/// - `retrieval` answers document queries per thread.
pub fn registry(
    provider: Arc<dyn Provider>,
    chat_model: &str,
    company_db: SqlitePool,
    retrieval: Arc<ThreadRetrievalRegistry>,
) -> Result<ToolRegistry, ToolError> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| ToolError::ExecutionFailed {
            tool_name: "registry".into(),
            reason: format!("HTTP client: {e}"),
        })?;

    let mut registry = ToolRegistry::new();
    registry.register(
        ToolId::WebSearch,
        Box::new(web_search::WebSearchTool::new(http.clone())),
    )?;
    registry.register(
        ToolId::Wikipedia,
        Box::new(wikipedia::WikipediaTool::new(http.clone())),
    )?;
    registry.register(ToolId::Calculator, Box::new(calculator::CalculatorTool))?;
    registry.register(
        ToolId::StockPrice,
        Box::new(stock_price::StockPriceTool::new(http)),
    )?;
    registry.register(
        ToolId::SqlQuery,
        Box::new(sql_query::SqlQueryTool::new(
            provider,
            chat_model.to_string(),
            company_db,
        )),
    )?;
    registry.register(
        ToolId::DocumentRetrieval,
        Box::new(document_retrieval::DocumentRetrievalTool::new(retrieval)),
    )?;

    Ok(registry)
}
