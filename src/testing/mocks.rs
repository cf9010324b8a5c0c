//! Mock implementations for testing
//!
//! Provides mock LlmProvider and Capability implementations so agents, tasks
//! and pipelines can be exercised without network access.

use crate::capabilities::{Capability, CapabilityDescription, CapabilityError};
use crate::llm::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider, MessageRole,
    TokenUsage, ToolCall,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One scripted model turn
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Plain text answer
    Text(String),
    /// Ask for capability calls
    ToolCalls(Vec<ToolCall>),
    /// Answer with the content of the last message received
    Echo,
}

impl MockReply {
    pub fn text(content: impl Into<String>) -> Self {
        MockReply::Text(content.into())
    }

    /// A single capability call with the given arguments
    pub fn tool_call(name: impl Into<String>, arguments: Value) -> Self {
        MockReply::ToolCalls(vec![ToolCall::new("call_mock", name, arguments)])
    }
}

/// Mock LLM provider for testing
///
/// Replies are consumed in order and cycle when exhausted. Every request is
/// recorded for later inspection.
#[derive(Debug)]
pub struct MockLlmProvider {
    pub replies: Vec<MockReply>,
    pub current_reply: Arc<Mutex<usize>>,
    pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
    pub should_fail: bool,
}

impl MockLlmProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self::scripted(responses.into_iter().map(MockReply::Text).collect())
    }

    pub fn scripted(replies: Vec<MockReply>) -> Self {
        Self {
            replies,
            current_reply: Arc::new(Mutex::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            should_fail: false,
        }
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Self::scripted(vec![])
        }
    }

    pub fn single_response(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    /// Always answers with the last message it was sent
    pub fn echo() -> Self {
        Self::scripted(vec![MockReply::Echo])
    }

    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    fn response(content: Option<String>, tool_calls: Option<Vec<ToolCall>>) -> CompletionResponse {
        let finish_reason = if tool_calls.is_some() {
            FinishReason::ToolCalls
        } else {
            FinishReason::Stop
        };
        CompletionResponse {
            content,
            model: "mock-model".to_string(),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            finish_reason,
            tool_calls,
        }
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().await.push(request.clone());

        if self.should_fail {
            return Err(LlmError::RequestFailed("Mock LLM failure".to_string()));
        }

        let mut current = self.current_reply.lock().await;
        let reply = if self.replies.is_empty() {
            MockReply::text("Mock response")
        } else {
            self.replies[*current % self.replies.len()].clone()
        };
        *current += 1;

        Ok(match reply {
            MockReply::Text(content) => Self::response(Some(content), None),
            MockReply::ToolCalls(calls) => Self::response(None, Some(calls)),
            MockReply::Echo => {
                let last = request
                    .messages
                    .iter()
                    .rev()
                    .find(|m| m.role != MessageRole::System)
                    .map(|m| m.content.clone())
                    .unwrap_or_default();
                Self::response(Some(last), None)
            }
        })
    }
}

/// Mock capability with a fixed reply or a fixed failure
#[derive(Debug)]
pub struct MockCapability {
    name: String,
    operation: String,
    outcome: Result<String, String>,
    queries: std::sync::Mutex<Vec<String>>,
}

impl MockCapability {
    pub fn replying(name: &str, operation: &str, reply: &str) -> Self {
        Self {
            name: name.to_string(),
            operation: operation.to_string(),
            outcome: Ok(reply.to_string()),
            queries: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Every invocation fails with `message`
    pub fn failing(name: &str, operation: &str, message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            ..Self::replying(name, operation, "")
        }
    }

    /// Queries received so far
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .map(|queries| queries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Capability for MockCapability {
    fn describe(&self) -> CapabilityDescription {
        CapabilityDescription::with_query(&self.name, format!("Mock {} capability", self.operation))
    }

    fn operation(&self) -> &str {
        &self.operation
    }

    async fn invoke(&self, query: &str) -> Result<String, CapabilityError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        self.outcome
            .clone()
            .map_err(CapabilityError::ExecutionError)
    }
}
