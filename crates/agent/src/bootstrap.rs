//! Startup wiring: build a fully assembled [`Assistant`] from an [`AppConfig`].
//!
//! This is the composition root. Every component takes its collaborators
//! through its constructor; the configuration values end up here and
//! nowhere else.

use crate::assistant::Assistant;
use crate::dispatch::DispatchLoop;
use papertalk_config::AppConfig;
use papertalk_core::error::Error;
use papertalk_core::{Embedder, HistoryStore, Provider};
use papertalk_history::SqliteHistory;
use papertalk_providers::{OpenAiCompatProvider, ProviderEmbedder};
use papertalk_retrieval::{SplitConfig, ThreadRetrievalRegistry};
use papertalk_tools::seed_demo_database;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Assemble the assistant from a validated configuration.
///
/// Opens (or creates) the history and demo company databases, seeds the
/// demo data, and threads every limit and model name from the config into
/// the components that use it.
pub async fn build_assistant(config: &AppConfig) -> Result<Assistant, Error> {
    let provider: Arc<dyn Provider> = Arc::new(OpenAiCompatProvider::new(
        "openai",
        &config.base_url,
        config.api_key.clone().unwrap_or_default(),
    )?);

    let embedder: Arc<dyn Embedder> = Arc::new(ProviderEmbedder::new(
        Arc::clone(&provider),
        &config.embedding_model,
    ));
    let retrieval = Arc::new(ThreadRetrievalRegistry::new(
        embedder,
        SplitConfig {
            chunk_size: config.retrieval.chunk_size,
            chunk_overlap: config.retrieval.chunk_overlap,
        },
        config.retrieval.top_k,
    ));

    let history: Arc<dyn HistoryStore> =
        Arc::new(SqliteHistory::new(&sqlite_url(&config.history_db)).await?);

    let company_db = open_company_db(&config.company_db).await?;
    seed_demo_database(&company_db).await?;

    let tools = Arc::new(papertalk_tools::registry(
        Arc::clone(&provider),
        &config.chat_model,
        company_db,
        Arc::clone(&retrieval),
    )?);

    let dispatch = DispatchLoop::new(provider, &config.chat_model, tools)
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens)
        .with_max_iterations(config.runtime.max_iterations)
        .with_model_timeout(Duration::from_secs(config.runtime.model_timeout_secs))
        .with_tool_timeout(Duration::from_secs(config.runtime.tool_timeout_secs));

    info!(
        chat_model = %config.chat_model,
        embedding_model = %config.embedding_model,
        "Assistant assembled"
    );
    Ok(Assistant::new(dispatch, retrieval, history))
}

async fn open_company_db(path: &str) -> Result<SqlitePool, Error> {
    let options = SqliteConnectOptions::from_str(&sqlite_url(path))
        .map_err(|e| Error::Config {
            message: format!("company database path: {e}"),
        })?
        .create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .map_err(|e| Error::Config {
            message: format!("company database: {e}"),
        })
}

/// Accept both bare file paths and full `sqlite:` URLs in the config.
fn sqlite_url(path: &str) -> String {
    if path.starts_with("sqlite:") {
        path.to_string()
    } else {
        format!("sqlite://{path}")
    }
}
