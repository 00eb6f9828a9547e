//! Encyclopedia lookup via the MediaWiki search API.
//!
//! Uses `action=query&list=search` against the language-specific Wikipedia
//! endpoint. Snippets come back with HTML highlighting which is stripped
//! before handing them to the model.

use async_trait::async_trait;
use papertalk_core::error::ToolError;
use papertalk_core::tool::{Tool, ToolResult};
use serde::Deserialize;
use tracing::warn;

pub struct WikipediaTool {
    client: reqwest::Client,
}

impl WikipediaTool {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "Look up encyclopedia articles on Wikipedia. Returns matching article titles and summary snippets."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The topic to look up"
                },
                "lang": {
                    "type": "string",
                    "description": "Two-letter Wikipedia language code (default 'en')",
                    "default": "en"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let lang = arguments["lang"].as_str().unwrap_or("en");

        if !lang.chars().all(|c| c.is_ascii_lowercase()) || lang.is_empty() || lang.len() > 8 {
            return Err(ToolError::InvalidArguments(format!(
                "Invalid language code '{lang}'"
            )));
        }

        let url = format!("https://{lang}.wikipedia.org/w/api.php");
        let response = match self
            .client
            .get(&url)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", "5"),
                ("format", "json"),
            ])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(query, lang, error = %e, "Wikipedia request failed");
                return Ok(ToolResult::error(format!("Wikipedia request failed: {e}")));
            }
        };

        if !response.status().is_success() {
            return Ok(ToolResult::error(format!(
                "Wikipedia returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let body: SearchResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                return Ok(ToolResult::error(format!(
                    "Wikipedia response could not be decoded: {e}"
                )));
            }
        };

        if body.query.search.is_empty() {
            return Ok(ToolResult::error(format!(
                "No Wikipedia articles found for '{query}'"
            )));
        }

        let articles: Vec<serde_json::Value> = body
            .query
            .search
            .iter()
            .map(|hit| {
                serde_json::json!({
                    "title": hit.title,
                    "snippet": strip_markup(&hit.snippet),
                    "url": format!("https://{lang}.wikipedia.org/wiki/{}", hit.title.replace(' ', "_")),
                })
            })
            .collect();

        let data = serde_json::json!({ "query": query, "articles": articles });
        let output = serde_json::to_string_pretty(&articles).unwrap_or_default();
        Ok(ToolResult::ok(output, Some(data)))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: SearchBody,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
    #[serde(default)]
    snippet: String,
}

/// Drop `<span class="searchmatch">`-style markup from a snippet.
fn strip_markup(snippet: &str) -> String {
    let mut out = String::with_capacity(snippet.len());
    let mut in_tag = false;
    for c in snippet.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&quot;", "\"").replace("&amp;", "&")
}
