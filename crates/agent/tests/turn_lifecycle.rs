//! End-to-end turn tests: dispatch loop plus the assistant facade,
//! driven by a scripted provider.

use std::sync::{Arc, Mutex};

use papertalk_agent::{Assistant, DispatchLoop};
use papertalk_core::error::{AgentError, EmbeddingError, Error, ProviderError};
use papertalk_core::message::{Message, MessageToolCall, Role};
use papertalk_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use papertalk_core::tool::{ToolId, ToolRegistry};
use papertalk_core::{Embedder, HistoryStore};
use papertalk_history::InMemoryHistory;
use papertalk_retrieval::{SplitConfig, ThreadRetrievalRegistry};
use papertalk_tools::calculator::CalculatorTool;

// ── Scripted provider ────────────────────────────────────────────────────

/// Returns scripted responses in sequence; errors when the script runs out.
struct ScriptedProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    call_count: Mutex<usize>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut count = self.call_count.lock().unwrap();
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(ProviderError::Network("script exhausted".into()));
        }
        *count += 1;
        Ok(responses.remove(0))
    }
}

fn text_response(content: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(content),
        usage: Some(Usage {
            prompt_tokens: 20,
            completion_tokens: 10,
            total_tokens: 30,
        }),
        model: "scripted".into(),
    }
}

fn tool_response(calls: Vec<MessageToolCall>) -> ProviderResponse {
    let mut message = Message::assistant("");
    message.tool_calls = calls;
    ProviderResponse {
        message,
        usage: None,
        model: "scripted".into(),
    }
}

fn call(id: &str, name: &str, arguments: &str) -> MessageToolCall {
    MessageToolCall {
        id: id.into(),
        name: name.into(),
        arguments: arguments.into(),
    }
}

fn calculator_registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry
        .register(ToolId::Calculator, Box::new(CalculatorTool))
        .unwrap();
    Arc::new(registry)
}

struct FlatEmbedder;

#[async_trait::async_trait]
impl Embedder for FlatEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

fn assistant(provider: Arc<ScriptedProvider>, history: Arc<dyn HistoryStore>) -> Assistant {
    let dispatch = DispatchLoop::new(provider, "scripted", calculator_registry());
    let retrieval = Arc::new(ThreadRetrievalRegistry::new(
        Arc::new(FlatEmbedder),
        SplitConfig::default(),
        4,
    ));
    Assistant::new(dispatch, retrieval, history)
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn tool_round_converges_with_one_extra_model_call() {
    let provider = ScriptedProvider::new(vec![
        tool_response(vec![call("c1", "calculator", r#"{"expression": "6 * 7"}"#)]),
        text_response("The answer is 42."),
    ]);
    let history: Arc<dyn HistoryStore> = Arc::new(InMemoryHistory::new());
    let assistant = assistant(provider.clone(), history.clone());

    let reply = assistant.send_message("t1", "What is 6 times 7?").await.unwrap();
    assert_eq!(reply, "The answer is 42.");
    // one tool round means exactly two model calls
    assert_eq!(provider.calls(), 2);

    let stored = history.load("t1").await.unwrap().unwrap();
    let tool_msg = stored
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .expect("tool result message");
    assert_eq!(tool_msg.content, "42");
    assert_eq!(tool_msg.tool_call_id.as_deref(), Some("c1"));
}

#[tokio::test]
async fn concurrent_tool_results_keep_request_order() {
    let provider = ScriptedProvider::new(vec![
        tool_response(vec![
            call("first", "calculator", r#"{"expression": "1 + 1"}"#),
            call("second", "calculator", r#"{"expression": "10 - 3"}"#),
        ]),
        text_response("done"),
    ]);
    let history: Arc<dyn HistoryStore> = Arc::new(InMemoryHistory::new());
    let assistant = assistant(provider, history.clone());

    assistant.send_message("t1", "two sums please").await.unwrap();

    let stored = history.load("t1").await.unwrap().unwrap();
    let tool_messages: Vec<_> = stored
        .messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .collect();
    assert_eq!(tool_messages.len(), 2);
    assert_eq!(tool_messages[0].tool_call_id.as_deref(), Some("first"));
    assert_eq!(tool_messages[0].content, "2");
    assert_eq!(tool_messages[1].tool_call_id.as_deref(), Some("second"));
    assert_eq!(tool_messages[1].content, "7");
}

#[tokio::test]
async fn tool_failure_is_contained_and_the_model_recovers() {
    let provider = ScriptedProvider::new(vec![
        tool_response(vec![call("c1", "calculator", r#"{"expression": "1 / 0"}"#)]),
        text_response("That division is undefined."),
    ]);
    let history: Arc<dyn HistoryStore> = Arc::new(InMemoryHistory::new());
    let assistant = assistant(provider, history.clone());

    let reply = assistant.send_message("t1", "divide by zero").await.unwrap();
    assert_eq!(reply, "That division is undefined.");

    let stored = history.load("t1").await.unwrap().unwrap();
    let tool_msg = stored
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .unwrap();
    assert!(tool_msg.content.contains("error"));
}

#[tokio::test]
async fn unknown_tool_is_contained() {
    let provider = ScriptedProvider::new(vec![
        tool_response(vec![call("c1", "teleport", "{}")]),
        text_response("I don't have that capability."),
    ]);
    let history: Arc<dyn HistoryStore> = Arc::new(InMemoryHistory::new());
    let assistant = assistant(provider, history.clone());

    let reply = assistant.send_message("t1", "teleport me").await.unwrap();
    assert_eq!(reply, "I don't have that capability.");

    let stored = history.load("t1").await.unwrap().unwrap();
    let tool_msg = stored
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .unwrap();
    assert!(tool_msg.content.contains("Unknown tool"));
}

#[tokio::test]
async fn malformed_arguments_are_contained() {
    let provider = ScriptedProvider::new(vec![
        tool_response(vec![call("c1", "calculator", "{not json")]),
        text_response("Sorry, let me rephrase that."),
    ]);
    let history: Arc<dyn HistoryStore> = Arc::new(InMemoryHistory::new());
    let assistant = assistant(provider, history.clone());

    let reply = assistant.send_message("t1", "compute").await.unwrap();
    assert_eq!(reply, "Sorry, let me rephrase that.");
}

#[tokio::test]
async fn endless_tool_requests_hit_the_iteration_limit() {
    // Every response requests another tool call; the loop must give up.
    let responses: Vec<ProviderResponse> = (0..10)
        .map(|i| {
            tool_response(vec![call(
                &format!("c{i}"),
                "calculator",
                r#"{"expression": "1 + 1"}"#,
            )])
        })
        .collect();
    let provider = ScriptedProvider::new(responses);

    let dispatch = DispatchLoop::new(provider, "scripted", calculator_registry())
        .with_max_iterations(3);
    let retrieval = Arc::new(ThreadRetrievalRegistry::new(
        Arc::new(FlatEmbedder),
        SplitConfig::default(),
        4,
    ));
    let history: Arc<dyn HistoryStore> = Arc::new(InMemoryHistory::new());
    let assistant = Assistant::new(dispatch, retrieval, history);

    let err = assistant.send_message("t1", "loop forever").await.unwrap_err();
    match err {
        Error::Agent(AgentError::MaxIterationsExceeded { limit }) => assert_eq!(limit, 3),
        other => panic!("expected MaxIterationsExceeded, got {other}"),
    }
}

#[tokio::test]
async fn failed_turn_is_not_checkpointed() {
    // Empty script: the very first model call errors.
    let provider = ScriptedProvider::new(vec![]);
    let history: Arc<dyn HistoryStore> = Arc::new(InMemoryHistory::new());
    let assistant = assistant(provider, history.clone());

    let err = assistant.send_message("t1", "hello").await.unwrap_err();
    assert!(matches!(err, Error::Agent(AgentError::Provider(_))));
    assert!(history.load("t1").await.unwrap().is_none());
}

#[tokio::test]
async fn threads_accumulate_history_independently() {
    let provider = ScriptedProvider::new(vec![
        text_response("hi alpha"),
        text_response("hi beta"),
        text_response("alpha again"),
    ]);
    let history: Arc<dyn HistoryStore> = Arc::new(InMemoryHistory::new());
    let assistant = assistant(provider, history.clone());

    assistant.send_message("alpha", "one").await.unwrap();
    assistant.send_message("beta", "two").await.unwrap();
    assistant.send_message("alpha", "three").await.unwrap();

    let alpha = history.load("alpha").await.unwrap().unwrap();
    let beta = history.load("beta").await.unwrap().unwrap();
    // alpha: system + (user, assistant) x2
    assert_eq!(alpha.messages.len(), 5);
    assert_eq!(beta.messages.len(), 3);

    let mut threads = assistant.list_threads().await.unwrap();
    threads.sort();
    assert_eq!(threads, vec!["alpha", "beta"]);
}

#[tokio::test]
async fn system_directive_names_the_thread() {
    let provider = ScriptedProvider::new(vec![text_response("ok")]);
    let history: Arc<dyn HistoryStore> = Arc::new(InMemoryHistory::new());
    let assistant = assistant(provider, history.clone());

    assistant.send_message("thread-777", "hello").await.unwrap();

    let stored = history.load("thread-777").await.unwrap().unwrap();
    assert_eq!(stored.messages[0].role, Role::System);
    assert!(stored.messages[0].content.contains("thread-777"));
}

#[tokio::test]
async fn document_lifecycle_via_facade() {
    let provider = ScriptedProvider::new(vec![]);
    let history: Arc<dyn HistoryStore> = Arc::new(InMemoryHistory::new());
    let assistant = assistant(provider, history);

    assert!(!assistant.thread_has_document("t1").await);
    assert!(assistant.thread_metadata("t1").await.is_none());

    // Empty upload is rejected before anything is indexed.
    let err = assistant.ingest_document("t1", &[], None).await.unwrap_err();
    assert!(matches!(err, Error::Retrieval(_)));
    assert!(!assistant.thread_has_document("t1").await);

    // Clearing a thread that never had a document is a no-op.
    assistant.clear_thread_document("t1").await;
}
