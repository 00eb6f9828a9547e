//! Natural-language SQL over the demo company database.
//!
//! Two model round-trips per invocation: the first turns the user's
//! question into a SQLite SELECT against the published schema, the second
//! explains the rows that came back. The generated statement is executed
//! as-is against the injected pool — there is no sandboxing, so the pool
//! handed to this tool must only ever contain expendable demo data.

use async_trait::async_trait;
use papertalk_core::error::ToolError;
use papertalk_core::message::Message;
use papertalk_core::provider::ProviderRequest;
use papertalk_core::tool::{Tool, ToolResult};
use papertalk_core::Provider;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, SqlitePool};
use std::sync::Arc;
use tracing::{debug, warn};

/// The schema the model writes queries against.
const SCHEMA: &str = r#"
employees(id INTEGER PRIMARY KEY, name TEXT, department TEXT, salary REAL, hired_on TEXT)
users(id INTEGER PRIMARY KEY, name TEXT, email TEXT, city TEXT)
products(id INTEGER PRIMARY KEY, name TEXT, category TEXT, price REAL)
purchases(id INTEGER PRIMARY KEY, user_id INTEGER REFERENCES users(id), product_id INTEGER REFERENCES products(id), quantity INTEGER, purchased_on TEXT)
"#;

const GENERATION_DIRECTIVE: &str = "You are a SQLite expert. Given the schema below, write a single \
SQL query answering the user's question. Reply with only the SQL statement, no commentary.";

const EXPLANATION_DIRECTIVE: &str = "You are a data analyst. Given a question, the SQL query used, \
and the raw result rows, explain the answer in one or two plain sentences.";

pub struct SqlQueryTool {
    provider: Arc<dyn Provider>,
    model: String,
    pool: SqlitePool,
}

impl SqlQueryTool {
    pub fn new(provider: Arc<dyn Provider>, model: String, pool: SqlitePool) -> Self {
        Self {
            provider,
            model,
            pool,
        }
    }

    async fn ask(&self, directive: &str, prompt: String) -> Result<String, String> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::system(directive), Message::user(prompt)],
            temperature: 0.0,
            max_tokens: None,
            tools: Vec::new(),
        };
        self.provider
            .complete(request)
            .await
            .map(|resp| resp.message.content)
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl Tool for SqlQueryTool {
    fn name(&self) -> &str {
        "sql_query"
    }

    fn description(&self) -> &str {
        "Answer questions about the company database (employees, users, products, purchases) by generating and running a SQL query."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "The question to answer from the database, in plain language"
                }
            },
            "required": ["question"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let question = arguments["question"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'question' argument".into()))?;

        let raw_sql = match self
            .ask(
                GENERATION_DIRECTIVE,
                format!("Schema:\n{SCHEMA}\nQuestion: {question}"),
            )
            .await
        {
            Ok(text) => text,
            Err(e) => return Ok(ToolResult::error(format!("SQL generation failed: {e}"))),
        };
        let sql = clean_sql(&raw_sql);
        debug!(%sql, "Generated SQL");

        let rows = match sqlx::query(&sql).fetch_all(&self.pool).await {
            Ok(rows) => rows,
            Err(e) => {
                return Ok(ToolResult::error(format!(
                    "Query execution failed for '{sql}': {e}"
                )));
            }
        };
        let results = render_rows(&rows);

        // Explanation is best-effort; rows still go back if it fails.
        let explanation = match self
            .ask(
                EXPLANATION_DIRECTIVE,
                format!(
                    "Question: {question}\nSQL: {sql}\nResults: {}",
                    serde_json::Value::Array(results.clone())
                ),
            )
            .await
        {
            Ok(text) => serde_json::Value::String(text),
            Err(e) => {
                warn!(error = %e, "Result explanation failed");
                serde_json::Value::Null
            }
        };

        let data = serde_json::json!({
            "query": sql,
            "results": results,
            "explanation": explanation,
        });
        let output = serde_json::to_string_pretty(&data).unwrap_or_default();
        Ok(ToolResult::ok(output, Some(data)))
    }
}

/// Strip markdown code fences the model tends to wrap SQL in.
fn clean_sql(raw: &str) -> String {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```sql")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.strip_suffix("```").unwrap_or(rest))
        .unwrap_or(trimmed);
    unfenced.trim().trim_end_matches(';').to_string()
}

/// Render rows as JSON objects, probing each column as integer, float,
/// then text.
fn render_rows(rows: &[SqliteRow]) -> Vec<serde_json::Value> {
    rows.iter()
        .map(|row| {
            let mut object = serde_json::Map::new();
            for column in row.columns() {
                let name = column.name();
                let value = if let Ok(v) = row.try_get::<i64, _>(name) {
                    serde_json::json!(v)
                } else if let Ok(v) = row.try_get::<f64, _>(name) {
                    serde_json::json!(v)
                } else if let Ok(v) = row.try_get::<String, _>(name) {
                    serde_json::json!(v)
                } else {
                    serde_json::Value::Null
                };
                object.insert(name.to_string(), value);
            }
            serde_json::Value::Object(object)
        })
        .collect()
}

/// Create the demo company tables and sample rows.
///
/// Idempotent: re-running against an already-seeded pool changes nothing.
pub async fn seed_demo_database(pool: &SqlitePool) -> Result<(), ToolError> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS employees (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            department TEXT NOT NULL,
            salary REAL NOT NULL,
            hired_on TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            city TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            price REAL NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS purchases (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id),
            product_id INTEGER NOT NULL REFERENCES products(id),
            quantity INTEGER NOT NULL,
            purchased_on TEXT NOT NULL
        )",
        "INSERT OR IGNORE INTO employees (id, name, department, salary, hired_on) VALUES
            (1, 'Priya Sharma', 'Engineering', 95000, '2021-03-15'),
            (2, 'Daniel Cho', 'Engineering', 88000, '2022-07-01'),
            (3, 'Maria Santos', 'Sales', 72000, '2020-11-20'),
            (4, 'Tom Becker', 'Support', 58000, '2023-01-09')",
        "INSERT OR IGNORE INTO users (id, name, email, city) VALUES
            (1, 'Alice Nguyen', 'alice@example.com', 'Austin'),
            (2, 'Bob Keller', 'bob@example.com', 'Denver'),
            (3, 'Chen Wei', 'chen@example.com', 'Seattle')",
        "INSERT OR IGNORE INTO products (id, name, category, price) VALUES
            (1, 'Laptop Stand', 'Accessories', 49.99),
            (2, 'Mechanical Keyboard', 'Accessories', 129.00),
            (3, 'Monitor 27in', 'Displays', 310.50)",
        "INSERT OR IGNORE INTO purchases (id, user_id, product_id, quantity, purchased_on) VALUES
            (1, 1, 2, 1, '2024-05-02'),
            (2, 1, 3, 2, '2024-06-18'),
            (3, 2, 1, 1, '2024-07-30'),
            (4, 3, 3, 1, '2024-08-11')",
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "sql_query".into(),
                reason: format!("seeding failed: {e}"),
            })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use papertalk_core::error::ProviderError;
    use papertalk_core::provider::{ProviderResponse, Usage};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Returns queued replies in order; errors once the queue is empty.
    struct ScriptedProvider {
        replies: Mutex<VecDeque<String>>,
    }

    impl ScriptedProvider {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
            })
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ProviderError::Network("script exhausted".into()))?;
            Ok(ProviderResponse {
                message: Message::assistant(reply),
                usage: Some(Usage {
                    prompt_tokens: 0,
                    completion_tokens: 0,
                    total_tokens: 0,
                }),
                model: "scripted".into(),
            })
        }
    }

    async fn seeded_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        seed_demo_database(&pool).await.unwrap();
        pool
    }

    #[test]
    fn clean_sql_strips_fences() {
        assert_eq!(
            clean_sql("```sql\nSELECT * FROM users;\n```"),
            "SELECT * FROM users"
        );
        assert_eq!(clean_sql("```\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(clean_sql("  SELECT 2;  "), "SELECT 2");
        assert_eq!(clean_sql("SELECT 3"), "SELECT 3");
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let pool = seeded_pool().await;
        seed_demo_database(&pool).await.unwrap();

        let row = sqlx::query("SELECT COUNT(*) AS n FROM employees")
            .fetch_one(&pool)
            .await
            .unwrap();
        let n: i64 = row.try_get("n").unwrap();
        assert_eq!(n, 4);
    }

    #[tokio::test]
    async fn answers_question_with_two_round_trips() {
        let pool = seeded_pool().await;
        let provider = ScriptedProvider::new(&[
            "```sql\nSELECT COUNT(*) AS employee_count FROM employees;\n```",
            "There are 4 employees.",
        ]);
        let tool = SqlQueryTool::new(provider, "scripted".into(), pool);

        let result = tool
            .execute(serde_json::json!({"question": "How many employees are there?"}))
            .await
            .unwrap();

        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data["results"][0]["employee_count"], 4);
        assert_eq!(data["explanation"], "There are 4 employees.");
        assert!(data["query"].as_str().unwrap().starts_with("SELECT"));
    }

    #[tokio::test]
    async fn broken_generated_sql_is_soft_failure() {
        let pool = seeded_pool().await;
        let provider = ScriptedProvider::new(&["SELECT nothing FROM nowhere"]);
        let tool = SqlQueryTool::new(provider, "scripted".into(), pool);

        let result = tool
            .execute(serde_json::json!({"question": "anything"}))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.output.contains("Query execution failed"));
    }

    #[tokio::test]
    async fn failed_explanation_still_returns_rows() {
        let pool = seeded_pool().await;
        // Only one scripted reply: the explanation round-trip errors.
        let provider = ScriptedProvider::new(&["SELECT name FROM users ORDER BY id"]);
        let tool = SqlQueryTool::new(provider, "scripted".into(), pool);

        let result = tool
            .execute(serde_json::json!({"question": "Who are the users?"}))
            .await
            .unwrap();

        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data["results"][0]["name"], "Alice Nguyen");
        assert!(data["explanation"].is_null());
    }

    #[tokio::test]
    async fn missing_question_is_invalid_arguments() {
        let pool = seeded_pool().await;
        let tool = SqlQueryTool::new(ScriptedProvider::new(&[]), "scripted".into(), pool);
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn schema_names_all_tables() {
        for table in ["employees", "users", "products", "purchases"] {
            assert!(SCHEMA.contains(table));
        }
    }
}
