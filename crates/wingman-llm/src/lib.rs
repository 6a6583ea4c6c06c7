//! Chat-model clients with native tool calling.
//!
//! The dispatch loop in `wingman-agent` needs exactly one thing from a
//! model: given a conversation and a set of tool schemas, return either
//! prose or a batch of tool calls. This crate provides:
//! 1. The wire-level types for that exchange (`ChatRequest`, `ModelReply`,
//!    `ToolCallV1`)
//! 2. Real API clients (OpenAI, Anthropic, local OpenAI-compatible)
//! 3. A scripted mock for deterministic tests
//!
//! Tool schemas are passed through as opaque JSON; this crate does not
//! know what the tools do.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod mock;
pub mod providers;

pub use mock::ScriptedModel;
pub use providers::{AnthropicClient, LlmConfig, LocalClient, OpenAiClient, Provider, UnifiedClient};

// ============================================================================
// Model Client Interface
// ============================================================================

/// Trait for chat-model providers that support tool calling.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Run one chat completion and return the model's move.
    async fn complete_chat(&self, request: &ChatRequest) -> Result<ModelReply, LlmError>;

    /// Human-readable model name for logs and reports.
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    /// Compiled tool schemas in OpenAI function-calling form. Passed
    /// through verbatim; translated per provider at the wire.
    pub tools: Vec<serde_json::Value>,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Tool calls the assistant issued in this turn, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallV1>>,
    /// For `Role::Tool` messages: which call this result answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant_tool_calls(calls: Vec<ToolCallV1>) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            tool_calls: Some(calls),
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallV1 {
    /// Provider-assigned call id; synthesized (`call_0`, `call_1`, ...)
    /// when the provider omits one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub args: serde_json::Value,
}

/// The model's move for one round.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// Plain prose: the conversational round is over.
    Text(String),
    /// One or more tool calls to execute, in order.
    ToolCalls(Vec<ToolCallV1>),
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("no model provider configured. Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or LOCAL_LLM_URL")]
    NoProviderConfigured,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors_set_roles() {
        assert_eq!(Message::system("s").role, Role::System);
        assert_eq!(Message::user("u").role, Role::User);
        assert_eq!(Message::assistant("a").role, Role::Assistant);
        let t = Message::tool_result("call_0", "ok");
        assert_eq!(t.role, Role::Tool);
        assert_eq!(t.tool_call_id.as_deref(), Some("call_0"));
    }

    #[test]
    fn tool_call_serializes_without_null_id() {
        let call = ToolCallV1 {
            id: None,
            name: "run_polar".to_string(),
            args: serde_json::json!({}),
        };
        let text = serde_json::to_string(&call).unwrap();
        assert!(!text.contains("\"id\""));
    }
}
