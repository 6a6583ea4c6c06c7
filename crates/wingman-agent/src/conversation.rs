//! Conversation state: the append-only turn log.
//!
//! The log is the single source of truth for what the model is shown.
//! Sequencing is enforced at append time: once an assistant turn requests
//! a batch of tool calls, only tool-result turns may follow until every
//! call in the batch has been answered. Violations are programmer errors
//! and leave the log untouched.

use serde::{Deserialize, Serialize};
use wingman_llm::ToolCallV1;

use crate::error::AgentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
    Tool,
}

/// Outcome of one tool execution, as both the model and the report sink
/// see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultV1 {
    /// Echoes the model-assigned call id so providers can match results
    /// to requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    pub tool: String,
    pub status: ToolStatus,
    /// Handler output on success, a structured reason on failure.
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnContent {
    Text { text: String },
    /// Assistant turn requesting one ordered batch of tool calls.
    ToolCalls { calls: Vec<ToolCallV1> },
    ToolResult { result: ToolResultV1 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Dense, strictly increasing position in the log.
    pub ordinal: u64,
    pub role: TurnRole,
    pub content: TurnContent,
}

/// The turn log for one session.
#[derive(Debug, Default)]
pub struct ConversationState {
    turns: Vec<Turn>,
    /// Tool results still owed for the open assistant tool-call batch.
    pending_tool_results: usize,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Tool results still owed before a user or assistant turn is legal.
    pub fn pending_tool_results(&self) -> usize {
        self.pending_tool_results
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Owned copy of the log. Callers never get a mutable view.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    /// Clear for a new session.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.pending_tool_results = 0;
    }

    pub fn append_user(&mut self, text: impl Into<String>) -> Result<u64, AgentError> {
        self.require_no_pending("user")?;
        Ok(self.push(TurnRole::User, TurnContent::Text { text: text.into() }))
    }

    pub fn append_assistant(&mut self, text: impl Into<String>) -> Result<u64, AgentError> {
        self.require_no_pending("assistant")?;
        Ok(self.push(
            TurnRole::Assistant,
            TurnContent::Text { text: text.into() },
        ))
    }

    /// Open a tool-call batch. Until `calls.len()` results have been
    /// appended, only `append_tool_result` is legal.
    pub fn append_tool_calls(&mut self, calls: Vec<ToolCallV1>) -> Result<u64, AgentError> {
        self.require_no_pending("assistant tool-call")?;
        if calls.is_empty() {
            return Err(AgentError::InvalidTurnSequence(
                "tool-call turn must carry at least one call".to_string(),
            ));
        }
        self.pending_tool_results = calls.len();
        Ok(self.push(TurnRole::Assistant, TurnContent::ToolCalls { calls }))
    }

    pub fn append_tool_result(&mut self, result: ToolResultV1) -> Result<u64, AgentError> {
        if self.pending_tool_results == 0 {
            return Err(AgentError::InvalidTurnSequence(
                "tool result without an open tool-call batch".to_string(),
            ));
        }
        self.pending_tool_results -= 1;
        Ok(self.push(TurnRole::Tool, TurnContent::ToolResult { result }))
    }

    fn require_no_pending(&self, attempted: &str) -> Result<(), AgentError> {
        if self.pending_tool_results > 0 {
            return Err(AgentError::InvalidTurnSequence(format!(
                "{attempted} turn while {n} tool result(s) are still owed",
                n = self.pending_tool_results
            )));
        }
        Ok(())
    }

    fn push(&mut self, role: TurnRole, content: TurnContent) -> u64 {
        let ordinal = self.turns.len() as u64;
        self.turns.push(Turn {
            ordinal,
            role,
            content,
        });
        ordinal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn call(name: &str) -> ToolCallV1 {
        ToolCallV1 {
            id: Some(format!("call_{name}")),
            name: name.to_string(),
            args: serde_json::json!({}),
        }
    }

    fn result(tool: &str) -> ToolResultV1 {
        ToolResultV1 {
            call_id: None,
            tool: tool.to_string(),
            status: ToolStatus::Success,
            payload: serde_json::json!({}),
        }
    }

    #[test]
    fn ordinals_are_dense_and_increasing() {
        let mut c = ConversationState::new();
        assert_eq!(c.append_user("hi").unwrap(), 0);
        assert_eq!(c.append_assistant("hello").unwrap(), 1);
        assert_eq!(c.append_user("chord?").unwrap(), 2);
        let snapshot = c.snapshot();
        for (i, t) in snapshot.iter().enumerate() {
            assert_eq!(t.ordinal, i as u64);
        }
    }

    #[test]
    fn tool_result_requires_open_batch() {
        let mut c = ConversationState::new();
        c.append_user("hi").unwrap();
        let err = c.append_tool_result(result("run_polar")).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn batch_blocks_text_until_all_results_land() {
        let mut c = ConversationState::new();
        c.append_user("sweep it").unwrap();
        c.append_tool_calls(vec![call("a"), call("b")])
            .unwrap();
        assert_eq!(c.pending_tool_results(), 2);

        assert!(c.append_assistant("done").is_err());
        assert!(c.append_user("another").is_err());
        assert_eq!(c.len(), 2);

        c.append_tool_result(result("a")).unwrap();
        assert!(c.append_assistant("done").is_err());
        c.append_tool_result(result("b")).unwrap();
        assert_eq!(c.pending_tool_results(), 0);
        c.append_assistant("done").unwrap();
        assert_eq!(c.len(), 5);
    }

    #[test]
    fn empty_batch_is_rejected() {
        let mut c = ConversationState::new();
        c.append_user("hi").unwrap();
        assert!(c.append_tool_calls(vec![]).is_err());
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn reset_clears_everything() {
        let mut c = ConversationState::new();
        c.append_user("hi").unwrap();
        c.append_tool_calls(vec![call("a")]).unwrap();
        c.reset();
        assert!(c.is_empty());
        assert_eq!(c.pending_tool_results(), 0);
        c.append_user("fresh").unwrap();
    }

    // Random mixes of legal and illegal appends: accepted appends keep
    // ordinals dense, rejected appends leave the log byte-identical.
    proptest! {
        #[test]
        fn random_append_sequences_keep_invariants(ops in proptest::collection::vec(0u8..4, 1..60)) {
            let mut c = ConversationState::new();
            for op in ops {
                let before = c.snapshot();
                let outcome = match op {
                    0 => c.append_user("u").map(|_| ()),
                    1 => c.append_assistant("a").map(|_| ()),
                    2 => c.append_tool_calls(vec![call("t")]).map(|_| ()),
                    _ => c.append_tool_result(result("t")).map(|_| ()),
                };
                match outcome {
                    Ok(()) => {
                        prop_assert_eq!(c.len(), before.len() + 1);
                    }
                    Err(_) => {
                        prop_assert_eq!(c.snapshot(), before);
                    }
                }
                for (i, t) in c.snapshot().iter().enumerate() {
                    prop_assert_eq!(t.ordinal, i as u64);
                }
            }
        }
    }
}
