//! Web search tool backed by the DuckDuckGo Instant Answer API.
//!
//! The endpoint returns an abstract (when DuckDuckGo recognizes the topic)
//! plus related topics; both are folded into a result list for the model.
//! Network and decode failures become soft error results.

use async_trait::async_trait;
use papertalk_core::error::ToolError;
use papertalk_core::tool::{Tool, ToolResult};
use serde::Deserialize;
use tracing::warn;

const ENDPOINT: &str = "https://api.duckduckgo.com/";

pub struct WebSearchTool {
    client: reqwest::Client,
}

impl WebSearchTool {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information. Returns a list of results with titles, URLs, and snippets."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results to return (default 5)",
                    "default": 5
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;
        let max_results = arguments["max_results"].as_u64().unwrap_or(5).clamp(1, 10) as usize;

        let response = match self
            .client
            .get(ENDPOINT)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(query, error = %e, "Web search request failed");
                return Ok(ToolResult::error(format!("Search request failed: {e}")));
            }
        };

        if !response.status().is_success() {
            return Ok(ToolResult::error(format!(
                "Search service returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let answer: InstantAnswer = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                return Ok(ToolResult::error(format!(
                    "Search response could not be decoded: {e}"
                )));
            }
        };

        let results = collect_results(&answer, max_results);
        if results.is_empty() {
            return Ok(ToolResult::error(format!("No results found for '{query}'")));
        }

        let data = serde_json::json!({ "query": query, "results": results });
        let output = serde_json::to_string_pretty(&results).unwrap_or_default();
        Ok(ToolResult::ok(output, Some(data)))
    }
}

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

/// Related topics are either leaf results or named groups of them.
#[derive(Debug, Deserialize)]
struct RelatedTopic {
    #[serde(rename = "Text", default)]
    text: String,
    #[serde(rename = "FirstURL", default)]
    first_url: String,
    #[serde(rename = "Topics", default)]
    topics: Vec<RelatedTopic>,
}

#[derive(Debug, serde::Serialize)]
struct SearchResult {
    title: String,
    url: String,
    snippet: String,
}

fn collect_results(answer: &InstantAnswer, max_results: usize) -> Vec<SearchResult> {
    let mut results = Vec::new();

    if !answer.abstract_text.is_empty() {
        results.push(SearchResult {
            title: answer.heading.clone(),
            url: answer.abstract_url.clone(),
            snippet: answer.abstract_text.clone(),
        });
    }

    flatten_topics(&answer.related_topics, &mut results, max_results);
    results.truncate(max_results);
    results
}

fn flatten_topics(topics: &[RelatedTopic], out: &mut Vec<SearchResult>, max_results: usize) {
    for topic in topics {
        if out.len() >= max_results {
            return;
        }
        if !topic.text.is_empty() {
            // The text is "Title - snippet" when DuckDuckGo knows a title.
            let (title, snippet) = match topic.text.split_once(" - ") {
                Some((t, s)) => (t.to_string(), s.to_string()),
                None => (topic.text.clone(), topic.text.clone()),
            };
            out.push(SearchResult {
                title,
                url: topic.first_url.clone(),
                snippet,
            });
        }
        flatten_topics(&topic.topics, out, max_results);
    }
}
