//! SQLite conversation checkpoint store.
//!
//! One `threads` row per conversation: the full message sequence is
//! serialized as JSON and rewritten after every successful turn
//! (last write wins). Restarting the process loses nothing — the set of
//! known threads is rebuilt from the table.

use async_trait::async_trait;
use papertalk_core::error::HistoryError;
use papertalk_core::message::Conversation;
use papertalk_core::HistoryStore;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A durable SQLite-backed history store.
pub struct SqliteHistory {
    pool: SqlitePool,
}

impl SqliteHistory {
    /// Open (or create) the history database at the given path.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database.
    pub async fn new(path: &str) -> Result<Self, HistoryError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| HistoryError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| HistoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite history store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, HistoryError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), HistoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS threads (
                thread_id    TEXT PRIMARY KEY,
                conversation TEXT NOT NULL,
                updated_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::Storage(format!("threads table: {e}")))?;

        debug!("History migrations complete");
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for SqliteHistory {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn load(&self, thread_id: &str) -> Result<Option<Conversation>, HistoryError> {
        let row = sqlx::query("SELECT conversation FROM threads WHERE thread_id = ?1")
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| HistoryError::Storage(format!("SELECT failed: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let json: String = row
            .try_get("conversation")
            .map_err(|e| HistoryError::Storage(format!("conversation column: {e}")))?;

        let conversation =
            serde_json::from_str(&json).map_err(|e| HistoryError::Corrupt {
                thread_id: thread_id.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Some(conversation))
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), HistoryError> {
        let json = serde_json::to_string(conversation)
            .map_err(|e| HistoryError::Storage(format!("Conversation serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO threads (thread_id, conversation, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(thread_id) DO UPDATE SET
                conversation = excluded.conversation,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(conversation.thread_id.as_str())
        .bind(&json)
        .bind(conversation.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::Storage(format!("UPSERT failed: {e}")))?;

        debug!(thread_id = %conversation.thread_id, "Checkpointed conversation");
        Ok(())
    }

    async fn list_threads(&self) -> Result<Vec<String>, HistoryError> {
        let rows = sqlx::query("SELECT thread_id FROM threads ORDER BY updated_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| HistoryError::Storage(format!("LIST failed: {e}")))?;

        rows.iter()
            .map(|row| {
                row.try_get("thread_id")
                    .map_err(|e| HistoryError::Storage(format!("thread_id column: {e}")))
            })
            .collect()
    }
}
