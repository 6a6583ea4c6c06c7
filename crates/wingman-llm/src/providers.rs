//! Model API Providers
//!
//! Concrete implementations for OpenAI, Anthropic, and local
//! OpenAI-compatible servers, all speaking native tool calling.

use super::*;
use reqwest::Client;
use std::time::Duration;

// ============================================================================
// Configuration
// ============================================================================

/// Model configuration loaded from environment or built explicitly
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Anthropic,
    Local,
}

impl LlmConfig {
    /// Load from environment variables. Providers are tried in order:
    /// OpenAI, Anthropic, local.
    pub fn from_env() -> Result<Self, LlmError> {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            return Ok(Self {
                provider: Provider::OpenAi,
                api_key: key,
                model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
                base_url: std::env::var("OPENAI_BASE_URL").ok(),
                timeout_secs: 60,
            });
        }

        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            return Ok(Self {
                provider: Provider::Anthropic,
                api_key: key,
                model: std::env::var("ANTHROPIC_MODEL")
                    .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
                base_url: None,
                timeout_secs: 60,
            });
        }

        if let Ok(url) = std::env::var("LOCAL_LLM_URL") {
            return Ok(Self {
                provider: Provider::Local,
                api_key: String::new(),
                model: std::env::var("LOCAL_LLM_MODEL").unwrap_or_else(|_| "default".to_string()),
                base_url: Some(url),
                timeout_secs: 120,
            });
        }

        Err(LlmError::NoProviderConfigured)
    }

    pub fn openai(api_key: &str, model: &str) -> Self {
        Self {
            provider: Provider::OpenAi,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: None,
            timeout_secs: 60,
        }
    }

    pub fn anthropic(api_key: &str, model: &str) -> Self {
        Self {
            provider: Provider::Anthropic,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: None,
            timeout_secs: 60,
        }
    }

    pub fn local(url: &str, model: &str) -> Self {
        Self {
            provider: Provider::Local,
            api_key: String::new(),
            model: model.to_string(),
            base_url: Some(url.to_string()),
            timeout_secs: 120,
        }
    }
}

fn build_http_client(timeout_secs: u64) -> Result<Client, LlmError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| LlmError::Network(e.to_string()))
}

// ============================================================================
// OpenAI wire format (shared by OpenAI and local servers)
// ============================================================================

fn openai_messages(messages: &[Message]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            };
            let mut msg = serde_json::json!({
                "role": role,
                "content": m.content,
            });
            if let Some(calls) = &m.tool_calls {
                let calls: Vec<serde_json::Value> = calls
                    .iter()
                    .enumerate()
                    .map(|(i, c)| {
                        serde_json::json!({
                            "id": c.id.clone().unwrap_or_else(|| format!("call_{i}")),
                            "type": "function",
                            "function": {
                                "name": c.name,
                                // OpenAI carries arguments as a JSON string.
                                "arguments": c.args.to_string(),
                            }
                        })
                    })
                    .collect();
                msg["tool_calls"] = serde_json::json!(calls);
            }
            if let Some(id) = &m.tool_call_id {
                msg["tool_call_id"] = serde_json::json!(id);
            }
            msg
        })
        .collect()
}

fn parse_openai_reply(data: &serde_json::Value) -> Result<ModelReply, LlmError> {
    let message = &data["choices"][0]["message"];
    if let Some(calls) = message["tool_calls"].as_array() {
        if !calls.is_empty() {
            let calls = calls
                .iter()
                .map(|c| {
                    let name = c["function"]["name"]
                        .as_str()
                        .ok_or_else(|| {
                            LlmError::InvalidResponse("tool call missing function name".to_string())
                        })?
                        .to_string();
                    let raw_args = c["function"]["arguments"].as_str().unwrap_or("{}");
                    let args: serde_json::Value = serde_json::from_str(raw_args)
                        .map_err(|e| {
                            LlmError::InvalidResponse(format!(
                                "tool call arguments are not valid JSON: {e}"
                            ))
                        })?;
                    Ok(ToolCallV1 {
                        id: c["id"].as_str().map(str::to_string),
                        name,
                        args,
                    })
                })
                .collect::<Result<Vec<_>, LlmError>>()?;
            return Ok(ModelReply::ToolCalls(calls));
        }
    }
    let content = message["content"].as_str().unwrap_or("").to_string();
    Ok(ModelReply::Text(content))
}

// ============================================================================
// OpenAI Provider
// ============================================================================

pub struct OpenAiClient {
    client: Client,
    config: LlmConfig,
}

impl OpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = build_http_client(config.timeout_secs)?;
        Ok(Self { client, config })
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ModelReply, LlmError> {
        let url = format!(
            "{}/chat/completions",
            self.config
                .base_url
                .as_deref()
                .unwrap_or("https://api.openai.com/v1")
        );

        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": openai_messages(&request.messages),
        });
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(request.tools);
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        tracing::debug!(
            model = %self.config.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "openai chat request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        if response.status() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(LlmError::RateLimited {
                retry_after_ms: retry_after * 1000,
            });
        }

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(error_text));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        parse_openai_reply(&data)
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn complete_chat(&self, request: &ChatRequest) -> Result<ModelReply, LlmError> {
        self.chat(request).await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// ============================================================================
// Anthropic Provider
// ============================================================================

pub struct AnthropicClient {
    client: Client,
    config: LlmConfig,
}

impl AnthropicClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = build_http_client(config.timeout_secs)?;
        Ok(Self { client, config })
    }

    /// Anthropic carries tool schemas as `{name, description, input_schema}`
    /// rather than the OpenAI `{type: "function", function: {...}}` wrapper.
    fn anthropic_tools(tools: &[serde_json::Value]) -> Vec<serde_json::Value> {
        tools
            .iter()
            .map(|t| {
                let f = &t["function"];
                serde_json::json!({
                    "name": f["name"],
                    "description": f["description"],
                    "input_schema": f["parameters"],
                })
            })
            .collect()
    }

    fn anthropic_messages(messages: &[Message]) -> (Option<String>, Vec<serde_json::Value>) {
        let system = messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.clone());

        let messages = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| match m.role {
                Role::Assistant if m.tool_calls.is_some() => {
                    let blocks: Vec<serde_json::Value> = m
                        .tool_calls
                        .as_deref()
                        .unwrap_or_default()
                        .iter()
                        .enumerate()
                        .map(|(i, c)| {
                            serde_json::json!({
                                "type": "tool_use",
                                "id": c.id.clone().unwrap_or_else(|| format!("call_{i}")),
                                "name": c.name,
                                "input": c.args,
                            })
                        })
                        .collect();
                    serde_json::json!({ "role": "assistant", "content": blocks })
                }
                Role::Tool => serde_json::json!({
                    "role": "user",
                    "content": [{
                        "type": "tool_result",
                        "tool_use_id": m.tool_call_id.clone().unwrap_or_default(),
                        "content": m.content,
                    }]
                }),
                Role::Assistant => {
                    serde_json::json!({ "role": "assistant", "content": m.content })
                }
                _ => serde_json::json!({ "role": "user", "content": m.content }),
            })
            .collect();

        (system, messages)
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ModelReply, LlmError> {
        let url = "https://api.anthropic.com/v1/messages";
        let (system, messages) = Self::anthropic_messages(&request.messages);

        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": request.max_tokens.unwrap_or(4096),
        });
        if let Some(sys) = system {
            body["system"] = serde_json::json!(sys);
        }
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::anthropic_tools(&request.tools));
        }
        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        tracing::debug!(
            model = %self.config.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "anthropic chat request"
        );

        let response = self
            .client
            .post(url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        if response.status() == 429 {
            return Err(LlmError::RateLimited {
                retry_after_ms: 60_000,
            });
        }

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(error_text));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let blocks = data["content"]
            .as_array()
            .ok_or_else(|| LlmError::InvalidResponse("missing content array".to_string()))?;

        let calls: Vec<ToolCallV1> = blocks
            .iter()
            .filter(|b| b["type"] == "tool_use")
            .map(|b| ToolCallV1 {
                id: b["id"].as_str().map(str::to_string),
                name: b["name"].as_str().unwrap_or_default().to_string(),
                args: b["input"].clone(),
            })
            .collect();
        if !calls.is_empty() {
            return Ok(ModelReply::ToolCalls(calls));
        }

        let text = blocks
            .iter()
            .filter_map(|b| b["text"].as_str())
            .collect::<Vec<_>>()
            .join("");
        Ok(ModelReply::Text(text))
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    async fn complete_chat(&self, request: &ChatRequest) -> Result<ModelReply, LlmError> {
        self.chat(request).await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// ============================================================================
// Local Provider (Ollama, vLLM, etc. in OpenAI-compatible mode)
// ============================================================================

pub struct LocalClient {
    client: Client,
    config: LlmConfig,
}

impl LocalClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = build_http_client(config.timeout_secs)?;
        Ok(Self { client, config })
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ModelReply, LlmError> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .ok_or_else(|| LlmError::Api("no base URL configured".to_string()))?;
        let url = format!("{}/v1/chat/completions", base_url);

        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": openai_messages(&request.messages),
        });
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(request.tools);
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("local API error: {}", error_text)));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        parse_openai_reply(&data)
    }
}

#[async_trait]
impl ModelClient for LocalClient {
    async fn complete_chat(&self, request: &ChatRequest) -> Result<ModelReply, LlmError> {
        self.chat(request).await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// ============================================================================
// Unified Client
// ============================================================================

/// Unified client that dispatches to the configured provider
pub enum UnifiedClient {
    OpenAi(OpenAiClient),
    Anthropic(AnthropicClient),
    Local(LocalClient),
}

impl UnifiedClient {
    pub fn from_config(config: LlmConfig) -> Result<Self, LlmError> {
        Ok(match config.provider {
            Provider::OpenAi => Self::OpenAi(OpenAiClient::new(config)?),
            Provider::Anthropic => Self::Anthropic(AnthropicClient::new(config)?),
            Provider::Local => Self::Local(LocalClient::new(config)?),
        })
    }

    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_config(LlmConfig::from_env()?)
    }
}

#[async_trait]
impl ModelClient for UnifiedClient {
    async fn complete_chat(&self, request: &ChatRequest) -> Result<ModelReply, LlmError> {
        match self {
            Self::OpenAi(c) => c.complete_chat(request).await,
            Self::Anthropic(c) => c.complete_chat(request).await,
            Self::Local(c) => c.complete_chat(request).await,
        }
    }

    fn model_name(&self) -> &str {
        match self {
            Self::OpenAi(c) => c.model_name(),
            Self::Anthropic(c) => c.model_name(),
            Self::Local(c) => c.model_name(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_creation() {
        let config = LlmConfig::openai("test-key", "gpt-4o");
        assert_eq!(config.provider, Provider::OpenAi);
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.model, "gpt-4o");
    }

    #[test]
    fn openai_tool_call_wire_roundtrip() {
        let data = serde_json::json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "set_geometry",
                            "arguments": "{\"surface\":\"wing\",\"value\":0.25}"
                        }
                    }]
                }
            }]
        });
        let reply = parse_openai_reply(&data).unwrap();
        match reply {
            ModelReply::ToolCalls(calls) => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].name, "set_geometry");
                assert_eq!(calls[0].args["value"], 0.25);
            }
            ModelReply::Text(_) => panic!("expected tool calls"),
        }
    }

    #[test]
    fn openai_text_reply() {
        let data = serde_json::json!({
            "choices": [{ "message": { "content": "The span is 2.0 m." } }]
        });
        match parse_openai_reply(&data).unwrap() {
            ModelReply::Text(text) => assert_eq!(text, "The span is 2.0 m."),
            ModelReply::ToolCalls(_) => panic!("expected text"),
        }
    }

    #[test]
    fn malformed_arguments_are_an_invalid_response() {
        let data = serde_json::json!({
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "id": "call_0",
                        "function": { "name": "run_polar", "arguments": "{not json" }
                    }]
                }
            }]
        });
        assert!(matches!(
            parse_openai_reply(&data),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn anthropic_tool_schema_translation() {
        let openai_form = serde_json::json!({
            "type": "function",
            "function": {
                "name": "run_polar",
                "description": "Run a polar sweep",
                "parameters": { "type": "object", "properties": {} }
            }
        });
        let tools = AnthropicClient::anthropic_tools(&[openai_form]);
        assert_eq!(tools[0]["name"], "run_polar");
        assert_eq!(tools[0]["input_schema"]["type"], "object");
        assert!(tools[0].get("function").is_none());
    }

    #[test]
    fn tool_results_fold_into_user_role_for_anthropic() {
        let messages = vec![
            Message::system("sys"),
            Message::user("set the chord"),
            Message::assistant_tool_calls(vec![ToolCallV1 {
                id: Some("call_0".to_string()),
                name: "set_geometry".to_string(),
                args: serde_json::json!({}),
            }]),
            Message::tool_result("call_0", "{\"ok\":true}"),
        ];
        let (system, wire) = AnthropicClient::anthropic_messages(&messages);
        assert_eq!(system.as_deref(), Some("sys"));
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[2]["role"], "user");
        assert_eq!(wire[2]["content"][0]["type"], "tool_result");
        assert_eq!(wire[2]["content"][0]["tool_use_id"], "call_0");
    }
}
