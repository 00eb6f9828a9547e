//! The per-turn dispatch loop.

use futures::future::join_all;
use papertalk_core::error::{AgentError, ProviderError, ToolError};
use papertalk_core::message::{Conversation, Message, MessageToolCall, Role};
use papertalk_core::provider::ProviderRequest;
use papertalk_core::tool::{ToolCallRequest, ToolRegistry};
use papertalk_core::Provider;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Runs one conversation turn: model call, tool execution, repeat.
///
/// All requested tool calls in a round execute concurrently; their results
/// are appended in the order the model requested them. Tool failures are
/// folded back into the conversation as structured results. Only a model
/// failure or exhausting `max_iterations` ends the turn with an error, and
/// a failed model call appends nothing for that attempt.
pub struct DispatchLoop {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    tools: Arc<ToolRegistry>,
    max_iterations: u32,
    model_timeout: Duration,
    tool_timeout: Duration,
}

impl DispatchLoop {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            tools,
            max_iterations: 10,
            model_timeout: Duration::from_secs(120),
            tool_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    /// The system directive for a turn, parameterized by the thread id so
    /// the model can hand it to `document_retrieval`.
    fn system_directive(&self, thread_id: &str) -> String {
        format!(
            "You are a helpful assistant with access to tools: web search, Wikipedia, \
             a calculator, stock quotes, a company database, and retrieval over the PDF \
             document uploaded in this conversation.\n\
             The current conversation thread id is '{thread_id}'. When calling the \
             document_retrieval tool, always pass this exact thread_id. If that tool \
             reports that no document is available, tell the user to upload a PDF.\n\
             Use tools whenever they would give a more accurate answer than memory."
        )
    }

    /// Run one user turn to completion.
    ///
    /// Returns the model's final text answer. The system directive is
    /// written into slot 0 of the conversation and refreshed every turn;
    /// a failed turn puts the slot back the way it found it, so the only
    /// messages an error can leave behind are completed tool rounds.
    pub async fn run_turn(&self, conversation: &mut Conversation) -> Result<String, AgentError> {
        let thread_id = conversation.thread_id.as_str().to_string();
        info!(
            thread_id,
            messages = conversation.messages.len(),
            "Dispatching turn"
        );

        let directive = Message::system(self.system_directive(&thread_id));
        let displaced = match conversation.messages.first() {
            Some(first) if first.role == Role::System => {
                Some(std::mem::replace(&mut conversation.messages[0], directive))
            }
            _ => {
                conversation.messages.insert(0, directive);
                None
            }
        };

        let result = self.drive(&thread_id, conversation).await;
        if result.is_err() {
            match displaced {
                Some(prior) => conversation.messages[0] = prior,
                None => {
                    conversation.messages.remove(0);
                }
            }
        }
        result
    }

    async fn drive(
        &self,
        thread_id: &str,
        conversation: &mut Conversation,
    ) -> Result<String, AgentError> {
        let tool_definitions = self.tools.definitions();

        for iteration in 1..=self.max_iterations {
            debug!(thread_id, iteration, "Dispatch iteration");

            let request = ProviderRequest {
                model: self.model.clone(),
                messages: conversation.messages.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tool_definitions.clone(),
            };

            let response = match timeout(self.model_timeout, self.provider.complete(request)).await
            {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return Err(AgentError::Provider(e)),
                Err(_) => {
                    return Err(AgentError::Provider(ProviderError::Timeout(format!(
                        "model call exceeded {}s",
                        self.model_timeout.as_secs()
                    ))));
                }
            };

            if response.message.tool_calls.is_empty() {
                let answer = response.message.content.clone();
                conversation.push(response.message);
                info!(thread_id, iteration, "Turn complete");
                return Ok(answer);
            }

            let calls = response.message.tool_calls.clone();
            conversation.push(response.message);

            debug!(thread_id, count = calls.len(), "Executing tool calls");
            let outputs = join_all(calls.iter().map(|call| self.execute_call(call))).await;
            for (call, output) in calls.iter().zip(outputs) {
                conversation.push(Message::tool_result(&call.id, output));
            }
        }

        warn!(thread_id, limit = self.max_iterations, "Turn exceeded iteration limit");
        Err(AgentError::MaxIterationsExceeded {
            limit: self.max_iterations,
        })
    }

    /// Execute one wire tool call, always producing text for the model.
    ///
    /// Validation failures, execution failures, and timeouts all come back
    /// as structured error payloads rather than escaping the loop.
    async fn execute_call(&self, call: &MessageToolCall) -> String {
        use papertalk_core::tool::ToolResult;

        let request = match ToolCallRequest::from_wire(call) {
            Ok(request) => request,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Rejected tool call");
                return ToolResult::error(e.to_string()).output;
            }
        };

        match timeout(self.tool_timeout, self.tools.execute(&request)).await {
            Ok(Ok(result)) => {
                debug!(tool = %call.name, success = result.success, "Tool executed");
                result.output
            }
            Ok(Err(e)) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                ToolResult::error(e.to_string()).output
            }
            Err(_) => {
                let e = ToolError::Timeout {
                    tool_name: call.name.clone(),
                    timeout_secs: self.tool_timeout.as_secs(),
                };
                warn!(tool = %call.name, "Tool timed out");
                ToolResult::error(e.to_string()).output
            }
        }
    }
}
