//! Tool trait and the closed tool registry.
//!
//! Tools are the capabilities the model can invoke mid-conversation:
//! web search, encyclopedia lookup, arithmetic, stock quotes, NL-to-SQL,
//! and per-thread document retrieval.
//!
//! The set of tool identifiers is closed: [`ToolId`] enumerates every
//! capability, and [`ToolRegistry::register`] checks the handler's declared
//! name against its identifier at registration time. The model's loosely
//! typed tool-call payload is validated into a [`ToolCallRequest`] at the
//! dispatch boundary; unknown names and malformed argument shapes become
//! structured errors, never panics.

use crate::error::ToolError;
use crate::message::MessageToolCall;
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The closed set of tool identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    WebSearch,
    Wikipedia,
    Calculator,
    StockPrice,
    SqlQuery,
    DocumentRetrieval,
}

impl ToolId {
    /// Every registrable tool, in registry display order.
    pub const ALL: [ToolId; 6] = [
        ToolId::WebSearch,
        ToolId::Wikipedia,
        ToolId::Calculator,
        ToolId::StockPrice,
        ToolId::SqlQuery,
        ToolId::DocumentRetrieval,
    ];

    /// The wire name the model uses to request this tool.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolId::WebSearch => "web_search",
            ToolId::Wikipedia => "wikipedia",
            ToolId::Calculator => "calculator",
            ToolId::StockPrice => "stock_price",
            ToolId::SqlQuery => "sql_query",
            ToolId::DocumentRetrieval => "document_retrieval",
        }
    }

    /// Parse a wire name into a tool identifier.
    pub fn parse(name: &str) -> Option<ToolId> {
        Self::ALL.iter().copied().find(|id| id.as_str() == name)
    }
}

impl std::fmt::Display for ToolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated request to execute a tool.
///
/// Produced from the model's raw tool-call payload by [`ToolCallRequest::from_wire`].
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    /// Unique call ID (matches the model's tool_call id)
    pub id: String,

    /// Which tool to execute
    pub tool: ToolId,

    /// Arguments as a JSON object
    pub arguments: serde_json::Value,
}

impl ToolCallRequest {
    /// Validate a wire-format tool call into a typed request.
    ///
    /// Fails with [`ToolError::Unknown`] for names outside the closed set
    /// and [`ToolError::InvalidArguments`] for payloads that are not a JSON
    /// object. An empty argument string is treated as `{}`.
    pub fn from_wire(call: &MessageToolCall) -> Result<Self, ToolError> {
        let tool = ToolId::parse(&call.name).ok_or_else(|| ToolError::Unknown(call.name.clone()))?;

        let arguments: serde_json::Value = if call.arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(&call.arguments)
                .map_err(|e| ToolError::InvalidArguments(format!("malformed JSON: {e}")))?
        };

        if !arguments.is_object() {
            return Err(ToolError::InvalidArguments(format!(
                "expected a JSON object, got: {arguments}"
            )));
        }

        Ok(Self {
            id: call.id.clone(),
            tool,
            arguments,
        })
    }
}

/// The result of a tool execution.
///
/// `success: false` carries a structured error payload the model can read
/// and react to (retry differently, apologize, ask the user to retry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,

    /// The output content, rendered for the model
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            success: true,
            output: output.into(),
            data,
        }
    }

    /// A structured failure the model can recover from.
    pub fn error(description: impl Into<String>) -> Self {
        let description = description.into();
        let payload = serde_json::json!({ "error": description });
        Self {
            success: false,
            output: payload.to_string(),
            data: Some(payload),
        }
    }
}

/// The core Tool trait.
///
/// Each built-in capability implements this trait. Implementations must
/// capture internal failures (network, parse, missing data) into a
/// `ToolResult::error` rather than returning `Err`; `Err` is reserved for
/// argument-shape violations. Execution must be safe to repeat with
/// identical arguments.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The wire name of this tool; must match its [`ToolId`] at registration.
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// The closed registry of available tools.
///
/// The dispatch loop uses this to publish tool definitions to the model and
/// to execute validated tool-call requests.
pub struct ToolRegistry {
    tools: HashMap<ToolId, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a handler for a tool identifier.
    ///
    /// Fails if the handler's declared wire name does not match the
    /// identifier — mismatches are a wiring bug caught at startup, not at
    /// call time.
    pub fn register(&mut self, id: ToolId, tool: Box<dyn Tool>) -> Result<(), ToolError> {
        if tool.name() != id.as_str() {
            return Err(ToolError::InvalidArguments(format!(
                "handler '{}' registered under id '{}'",
                tool.name(),
                id
            )));
        }
        self.tools.insert(id, tool);
        Ok(())
    }

    /// Get a tool by identifier.
    pub fn get(&self, id: ToolId) -> Option<&dyn Tool> {
        self.tools.get(&id).map(|t| t.as_ref())
    }

    /// All tool definitions in stable identifier order (for the model).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        ToolId::ALL
            .iter()
            .filter_map(|id| self.tools.get(id))
            .map(|t| t.to_definition())
            .collect()
    }

    /// Execute a validated tool call.
    pub async fn execute(&self, call: &ToolCallRequest) -> Result<ToolResult, ToolError> {
        let tool = self
            .tools
            .get(&call.tool)
            .ok_or_else(|| ToolError::Unknown(call.tool.to_string()))?;
        tool.execute(call.arguments.clone()).await
    }

    /// Identifiers with a registered handler.
    pub fn registered(&self) -> Vec<ToolId> {
        ToolId::ALL
            .iter()
            .copied()
            .filter(|id| self.tools.contains_key(id))
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
