//! Dispatch loop: one conversational round at a time.
//!
//! A round starts with a user message and ends with either an assistant
//! reply or a chain-limit abort. In between, the loop alternates between
//! asking the model (under a timeout) and executing the tool calls it
//! requests, strictly sequentially in the order the model listed them.
//!
//! Failure policy, from the outside in:
//! - model failures (timeout, service error) end the round but leave the
//!   conversation usable for the next message;
//! - per-call failures (unknown tool, bad arguments, environment error)
//!   never end the round: they become failure tool results the model can
//!   read and react to;
//! - sink failures are logged and swallowed.

use std::time::Duration;

use serde_json::json;
use wingman_cfd::PlaneHandle;
use wingman_llm::{ChatRequest, LlmError, Message, ModelClient, ModelReply, ToolCallV1};

use crate::conversation::{ConversationState, ToolResultV1, ToolStatus, Turn, TurnContent, TurnRole};
use crate::error::AgentError;
use crate::registry::ToolRegistry;
use crate::report::{ReportSink, ToolRecordV1};
use crate::schema;
use crate::validate::validate_args;

const DEFAULT_SYSTEM_PROMPT: &str = "You are Wingman, an aircraft design assistant. You operate \
    on a live aircraft model through the provided tools. Read state before changing it, make one \
    change at a time, and report numbers with units. When an analysis is requested, run it with \
    the tools rather than estimating.";

#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Wall-clock budget for a single model request.
    pub model_timeout: Duration,
    /// Tool executions allowed per round before the chain is aborted.
    pub max_tool_calls: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            model_timeout: Duration::from_secs(120),
            max_tool_calls: 10,
        }
    }
}

/// Where the loop is, for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingUserInput,
    RequestingModel,
    ExecutingTool,
    Failed,
}

/// How a round ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    /// The model produced a final prose reply.
    Reply(String),
    /// The chain hit `max_tool_calls` without a final reply. Carries what
    /// was executed this round plus the rendered `MaxToolChain` error; the
    /// conversation itself stays consistent.
    ChainLimit {
        results: Vec<ToolResultV1>,
        error: String,
    },
}

/// Callback invoked after each tool execution, so a frontend can show
/// activity while the chain runs.
pub type ToolObserver = Box<dyn FnMut(&ToolCallV1, &ToolResultV1) + Send>;

pub struct DispatchLoop {
    registry: ToolRegistry,
    model: Box<dyn ModelClient>,
    handle: PlaneHandle,
    conversation: ConversationState,
    sink: Box<dyn ReportSink>,
    config: DispatchConfig,
    state: LoopState,
    session: uuid::Uuid,
    system_prompt: String,
    /// Compiled once; the registry is sealed so it cannot drift.
    compiled_tools: Vec<serde_json::Value>,
    observer: Option<ToolObserver>,
}

impl DispatchLoop {
    /// Seals the registry and compiles the schema once.
    pub fn new(
        mut registry: ToolRegistry,
        model: Box<dyn ModelClient>,
        handle: PlaneHandle,
        sink: Box<dyn ReportSink>,
        config: DispatchConfig,
    ) -> Self {
        registry.seal();
        let compiled_tools = schema::compile(&registry);
        let session = uuid::Uuid::new_v4();
        tracing::info!(%session, tools = compiled_tools.len(), "dispatch loop ready");
        Self {
            registry,
            model,
            handle,
            conversation: ConversationState::new(),
            sink,
            config,
            state: LoopState::AwaitingUserInput,
            session,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            compiled_tools,
            observer: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_observer(mut self, observer: ToolObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn session(&self) -> uuid::Uuid {
        self.session
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn handle(&self) -> &PlaneHandle {
        &self.handle
    }

    pub fn compiled_tools(&self) -> &[serde_json::Value] {
        &self.compiled_tools
    }

    pub fn flush_sink(&mut self) {
        if let Err(e) = self.sink.flush() {
            tracing::warn!(error = %e, "report sink flush failed");
        }
    }

    /// Run one round: user message in, reply or chain-limit out.
    ///
    /// Model-side failures return an error and reset the loop for the
    /// next message; the conversation keeps every turn appended so far.
    pub async fn run_round(&mut self, user_msg: &str) -> Result<RoundOutcome, AgentError> {
        self.conversation.append_user(user_msg)?;
        let mut executed: usize = 0;
        let mut round_results: Vec<ToolResultV1> = Vec::new();

        loop {
            self.state = LoopState::RequestingModel;
            let request = ChatRequest {
                messages: self.wire_messages(),
                tools: self.compiled_tools.clone(),
                max_tokens: None,
                temperature: None,
            };

            let reply = match tokio::time::timeout(
                self.config.model_timeout,
                self.model.complete_chat(&request),
            )
            .await
            {
                Err(_elapsed) => {
                    self.state = LoopState::Failed;
                    return Err(AgentError::ModelTimeout {
                        timeout_secs: self.config.model_timeout.as_secs(),
                    });
                }
                Ok(Err(e)) => {
                    self.state = LoopState::Failed;
                    return Err(AgentError::ModelService(e));
                }
                Ok(Ok(reply)) => reply,
            };

            match reply {
                ModelReply::Text(text) => {
                    self.conversation.append_assistant(text.clone())?;
                    self.state = LoopState::AwaitingUserInput;
                    return Ok(RoundOutcome::Reply(text));
                }
                ModelReply::ToolCalls(calls) => {
                    // A batch with no calls is a malformed provider reply,
                    // not a turn-sequence violation: fail the round, keep
                    // the session.
                    if calls.is_empty() {
                        self.state = LoopState::Failed;
                        return Err(AgentError::ModelService(LlmError::InvalidResponse(
                            "tool-call reply carried no calls".to_string(),
                        )));
                    }
                    let calls = Self::with_call_ids(calls, executed);
                    self.conversation.append_tool_calls(calls.clone())?;

                    for call in &calls {
                        let result = if executed < self.config.max_tool_calls {
                            self.state = LoopState::ExecutingTool;
                            executed += 1;
                            self.execute_call(call)
                        } else {
                            // The batch must still be closed so the log
                            // stays consistent.
                            ToolResultV1 {
                                call_id: call.id.clone(),
                                tool: call.name.clone(),
                                status: ToolStatus::Failure,
                                payload: json!({
                                    "error": "tool-call chain limit reached; call not executed"
                                }),
                            }
                        };
                        self.record(call, &result);
                        if let Some(observer) = self.observer.as_mut() {
                            observer(call, &result);
                        }
                        self.conversation.append_tool_result(result.clone())?;
                        round_results.push(result);
                    }

                    if executed >= self.config.max_tool_calls {
                        let err = AgentError::MaxToolChain {
                            max_tool_calls: self.config.max_tool_calls,
                        };
                        tracing::warn!(session = %self.session, %err, "aborting round");
                        self.state = LoopState::AwaitingUserInput;
                        return Ok(RoundOutcome::ChainLimit {
                            results: round_results,
                            error: err.to_string(),
                        });
                    }
                }
            }
        }
    }

    /// Give every call a stable id so tool results can reference it even
    /// when the provider omitted one.
    fn with_call_ids(calls: Vec<ToolCallV1>, offset: usize) -> Vec<ToolCallV1> {
        calls
            .into_iter()
            .enumerate()
            .map(|(i, mut c)| {
                if c.id.is_none() {
                    c.id = Some(format!("call_{}", offset + i));
                }
                c
            })
            .collect()
    }

    /// Resolve, validate, execute. Every failure mode lands in a failure
    /// result; nothing here ends the round.
    fn execute_call(&mut self, call: &ToolCallV1) -> ToolResultV1 {
        let failure = |payload: serde_json::Value| ToolResultV1 {
            call_id: call.id.clone(),
            tool: call.name.clone(),
            status: ToolStatus::Failure,
            payload,
        };

        let registered = match self.registry.resolve(&call.name) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(tool = %call.name, "model requested unknown tool");
                return failure(json!({ "error": e.to_string() }));
            }
        };

        let args = match validate_args(&registered.spec, &call.args) {
            Ok(args) => args,
            Err(e) => {
                tracing::debug!(tool = %call.name, error = %e, "argument validation failed");
                return failure(json!({
                    "error": e.to_string(),
                    "detail": e,
                }));
            }
        };

        match (registered.handler)(&mut self.handle, &args) {
            Ok(payload) => ToolResultV1 {
                call_id: call.id.clone(),
                tool: call.name.clone(),
                status: ToolStatus::Success,
                payload,
            },
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "tool execution failed");
                failure(json!({ "error": e.to_string(), "operation": e.operation }))
            }
        }
    }

    fn record(&mut self, call: &ToolCallV1, result: &ToolResultV1) {
        let record = ToolRecordV1::from_result(self.session, call.args.clone(), result);
        if let Err(e) = self.sink.record(&record) {
            tracing::warn!(error = %e, tool = %result.tool, "report sink write failed");
        }
    }

    /// Project the turn log into provider messages, system prompt first.
    fn wire_messages(&self) -> Vec<Message> {
        let mut out = vec![Message::system(self.system_prompt.clone())];
        for turn in self.conversation.iter() {
            out.push(Self::wire_message(turn));
        }
        out
    }

    fn wire_message(turn: &Turn) -> Message {
        match &turn.content {
            TurnContent::Text { text } => match turn.role {
                TurnRole::Assistant => Message::assistant(text.clone()),
                _ => Message::user(text.clone()),
            },
            TurnContent::ToolCalls { calls } => Message::assistant_tool_calls(calls.clone()),
            TurnContent::ToolResult { result } => {
                let body = json!({ "status": result.status, "payload": result.payload });
                Message::tool_result(
                    result.call_id.clone().unwrap_or_default(),
                    body.to_string(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::register_builtin_tools;
    use crate::report::MemorySink;
    use wingman_cfd::{Plane, VortexLatticeEnv};
    use wingman_llm::ScriptedModel;

    fn call(name: &str, args: serde_json::Value) -> ToolCallV1 {
        ToolCallV1 {
            id: None,
            name: name.to_string(),
            args,
        }
    }

    fn scripted_loop(replies: Vec<ModelReply>, config: DispatchConfig) -> DispatchLoop {
        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry).unwrap();
        let handle = PlaneHandle::new(Box::new(VortexLatticeEnv::new(Plane::default_trainer(
            "trainer",
        ))));
        DispatchLoop::new(
            registry,
            Box::new(ScriptedModel::new(replies)),
            handle,
            Box::new(MemorySink::new()),
            config,
        )
    }

    #[tokio::test]
    async fn text_reply_is_a_two_turn_round() {
        let mut lp = scripted_loop(
            vec![ModelReply::Text("hello pilot".to_string())],
            DispatchConfig::default(),
        );
        let outcome = lp.run_round("hi").await.unwrap();
        assert_eq!(outcome, RoundOutcome::Reply("hello pilot".to_string()));
        assert_eq!(lp.state(), LoopState::AwaitingUserInput);

        let turns = lp.conversation().snapshot();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, TurnRole::User);
        assert_eq!(turns[1].role, TurnRole::Assistant);
    }

    #[tokio::test]
    async fn tool_round_trip_is_four_turns() {
        let mut lp = scripted_loop(
            vec![
                ModelReply::ToolCalls(vec![call(
                    "set_geometry",
                    json!({"surface": "wing", "section": 1, "attribute": "chord", "value": 2.0}),
                )]),
                ModelReply::Text("chord set to 2.0 m".to_string()),
            ],
            DispatchConfig::default(),
        );
        let outcome = lp.run_round("set the tip chord to 2 meters").await.unwrap();
        assert_eq!(outcome, RoundOutcome::Reply("chord set to 2.0 m".to_string()));

        let turns = lp.conversation().snapshot();
        let roles: Vec<TurnRole> = turns.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![
                TurnRole::User,
                TurnRole::Assistant,
                TurnRole::Tool,
                TurnRole::Assistant
            ]
        );

        // The change actually landed in the environment.
        let plane = lp.handle().plane().unwrap();
        assert_eq!(plane.wing.sections[1].chord, 2.0);
    }

    #[tokio::test]
    async fn wrong_type_never_reaches_the_handler() {
        let mut lp = scripted_loop(
            vec![
                ModelReply::ToolCalls(vec![call(
                    "set_geometry",
                    json!({"surface": "wing", "section": 1, "attribute": "chord", "value": "two"}),
                )]),
                ModelReply::Text("that value was not a number".to_string()),
            ],
            DispatchConfig::default(),
        );
        lp.run_round("set the tip chord to two").await.unwrap();

        let turns = lp.conversation().snapshot();
        let TurnContent::ToolResult { result } = &turns[2].content else {
            panic!("expected a tool result turn");
        };
        assert_eq!(result.status, ToolStatus::Failure);
        let text = result.payload.to_string();
        assert!(text.contains("value"), "failure should name the parameter: {text}");

        // Chord unchanged.
        let plane = lp.handle().plane().unwrap();
        assert_eq!(plane.wing.sections[1].chord, 0.1);
    }

    #[tokio::test]
    async fn unknown_tool_is_a_failure_result_not_a_crash() {
        let mut lp = scripted_loop(
            vec![
                ModelReply::ToolCalls(vec![call("paint_plane", json!({"color": "red"}))]),
                ModelReply::Text("no such tool".to_string()),
            ],
            DispatchConfig::default(),
        );
        let outcome = lp.run_round("paint it red").await.unwrap();
        assert!(matches!(outcome, RoundOutcome::Reply(_)));

        let turns = lp.conversation().snapshot();
        let TurnContent::ToolResult { result } = &turns[2].content else {
            panic!("expected a tool result turn");
        };
        assert_eq!(result.status, ToolStatus::Failure);
        assert!(result.payload["error"]
            .as_str()
            .unwrap()
            .contains("paint_plane"));
    }

    #[tokio::test]
    async fn chain_limit_aborts_with_consistent_conversation() {
        // A model that keeps reading the same attribute forever.
        let endless: Vec<ModelReply> = (0..20)
            .map(|_| {
                ModelReply::ToolCalls(vec![call(
                    "get_geometry",
                    json!({"surface": "wing", "section": 0, "attribute": "chord"}),
                )])
            })
            .collect();
        let mut lp = scripted_loop(
            endless,
            DispatchConfig {
                max_tool_calls: 3,
                ..DispatchConfig::default()
            },
        );
        let outcome = lp.run_round("keep checking the chord").await.unwrap();
        let RoundOutcome::ChainLimit { results, error } = outcome else {
            panic!("expected chain limit");
        };
        assert_eq!(results.len(), 3);
        assert!(error.contains('3'), "error should name the limit: {error}");

        // No dangling batch: the next round starts cleanly.
        assert_eq!(lp.conversation().pending_tool_results(), 0);
        assert_eq!(lp.state(), LoopState::AwaitingUserInput);
    }

    #[tokio::test]
    async fn oversized_batch_is_closed_before_aborting() {
        // One batch of 5 calls against a limit of 2: the last 3 must be
        // answered with failure results, not left dangling.
        let batch: Vec<ToolCallV1> = (0..5)
            .map(|_| {
                call(
                    "get_geometry",
                    json!({"surface": "wing", "section": 0, "attribute": "chord"}),
                )
            })
            .collect();
        let mut lp = scripted_loop(
            vec![ModelReply::ToolCalls(batch)],
            DispatchConfig {
                max_tool_calls: 2,
                ..DispatchConfig::default()
            },
        );
        let outcome = lp.run_round("inspect everything").await.unwrap();
        let RoundOutcome::ChainLimit { results, .. } = outcome else {
            panic!("expected chain limit");
        };
        assert_eq!(results.len(), 5);
        assert_eq!(
            results.iter().filter(|r| r.status == ToolStatus::Success).count(),
            2
        );
        assert_eq!(lp.conversation().pending_tool_results(), 0);
    }

    #[tokio::test]
    async fn empty_tool_call_batch_ends_round_but_not_session() {
        let mut lp = scripted_loop(
            vec![
                ModelReply::ToolCalls(vec![]),
                ModelReply::Text("recovered".to_string()),
            ],
            DispatchConfig::default(),
        );
        let err = lp.run_round("hello").await.unwrap_err();
        assert!(matches!(err, AgentError::ModelService(_)));
        assert!(!err.is_fatal());
        assert_eq!(lp.state(), LoopState::Failed);

        // No half-open batch was appended; the next round runs normally.
        assert_eq!(lp.conversation().pending_tool_results(), 0);
        let outcome = lp.run_round("still there?").await.unwrap();
        assert_eq!(outcome, RoundOutcome::Reply("recovered".to_string()));
    }

    #[tokio::test]
    async fn model_timeout_ends_round_but_not_session() {
        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry).unwrap();
        let handle = PlaneHandle::new(Box::new(VortexLatticeEnv::new(Plane::default_trainer(
            "trainer",
        ))));
        let model = ScriptedModel::new(vec![
            ModelReply::Text("too late".to_string()),
            ModelReply::Text("on time".to_string()),
        ])
        .with_delay(Duration::from_millis(50));
        let mut lp = DispatchLoop::new(
            registry,
            Box::new(model),
            handle,
            Box::new(MemorySink::new()),
            DispatchConfig {
                model_timeout: Duration::from_millis(5),
                ..DispatchConfig::default()
            },
        );

        let err = lp.run_round("hello?").await.unwrap_err();
        assert!(matches!(err, AgentError::ModelTimeout { .. }));
        assert!(!err.is_fatal());
        assert_eq!(lp.state(), LoopState::Failed);

        // The session survives; the next round runs under a real budget.
        lp.config.model_timeout = Duration::from_secs(5);
        let outcome = lp.run_round("still there?").await.unwrap();
        assert_eq!(outcome, RoundOutcome::Reply("on time".to_string()));
    }

    #[tokio::test]
    async fn every_executed_call_hits_the_sink_once() {
        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry).unwrap();
        let handle = PlaneHandle::new(Box::new(VortexLatticeEnv::new(Plane::default_trainer(
            "trainer",
        ))));
        let model = ScriptedModel::new(vec![
            ModelReply::ToolCalls(vec![
                call(
                    "get_geometry",
                    json!({"surface": "wing", "section": 0, "attribute": "chord"}),
                ),
                call("wing_metrics", json!({})),
            ]),
            ModelReply::Text("done".to_string()),
        ]);
        let mut lp = DispatchLoop::new(
            registry,
            Box::new(model),
            handle,
            Box::new(MemorySink::new()),
            DispatchConfig::default(),
        );
        lp.run_round("inspect the wing").await.unwrap();

        // MemorySink is owned by the loop; count via the conversation
        // instead: two tool turns, both successes.
        let tool_turns: Vec<_> = lp
            .conversation()
            .iter()
            .filter(|t| t.role == TurnRole::Tool)
            .collect();
        assert_eq!(tool_turns.len(), 2);
    }
}
