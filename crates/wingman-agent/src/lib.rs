//! Wingman agent: the conversational tool-orchestration core.
//!
//! Turns natural-language instructions into validated, typed tool calls
//! against a live aircraft model. The pieces, in the order a request
//! flows through them:
//! - `conversation`: the append-only turn log with sequencing invariants
//! - `registry` + `builtin`: the fixed tool vocabulary and the aircraft
//!   tool set
//! - `schema`: deterministic compilation of the registry into the
//!   function-calling document providers consume
//! - `validate`: the gate between model-supplied arguments and handlers
//! - `dispatch`: the bounded request/execute loop that runs one round
//! - `report`: best-effort JSONL telemetry of every executed call

pub mod builtin;
pub mod conversation;
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod report;
pub mod schema;
pub mod validate;

pub use builtin::register_builtin_tools;
pub use conversation::{ConversationState, ToolResultV1, ToolStatus, Turn, TurnContent, TurnRole};
pub use dispatch::{DispatchConfig, DispatchLoop, LoopState, RoundOutcome, ToolObserver};
pub use error::{AgentError, ArgumentError};
pub use registry::{ParamKind, ParamSpecV1, RegisteredTool, ToolHandler, ToolRegistry, ToolSpecV1};
pub use report::{JsonlSink, MemorySink, NullSink, ReportSink, ToolRecordV1};
pub use validate::validate_args;
