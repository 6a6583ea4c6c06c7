//! Scripted model for deterministic tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::{ChatRequest, LlmError, ModelClient, ModelReply};

/// A model that replays a fixed script of replies.
///
/// Each `complete_chat` call pops the next reply; running past the end of
/// the script is a test bug and surfaces as `LlmError::Api`. An optional
/// per-call delay lets timeout paths be exercised.
pub struct ScriptedModel {
    script: Mutex<VecDeque<ModelReply>>,
    delay: Option<Duration>,
    /// Requests observed, for assertions on what the loop sent.
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new(replies: impl IntoIterator<Item = ModelReply>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Delay each reply, to drive the model-timeout path in tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Snapshot of every request this model has seen.
    pub fn seen_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn complete_chat(&self, request: &ChatRequest) -> Result<ModelReply, LlmError> {
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(request.clone());
        }
        // Pop before delaying so a call cancelled by a caller's timeout
        // still consumes its scripted reply.
        let reply = self
            .script
            .lock()
            .map_err(|_| LlmError::Api("script mutex poisoned".to_string()))?
            .pop_front()
            .ok_or_else(|| LlmError::Api("scripted model exhausted".to_string()))?;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(reply)
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
