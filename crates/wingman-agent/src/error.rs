//! Error taxonomy for the agent.
//!
//! Two families, deliberately kept apart:
//! - `AgentError`: failures of the loop itself. `is_fatal()` separates
//!   programmer errors (bad registration, turn-sequence violations) from
//!   round-level failures the session survives.
//! - `ArgumentError`: a model-supplied argument rejected by validation.
//!   Never an `AgentError`; it is serialized into a failure tool result
//!   and fed back to the model.

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("tool {0:?} is already registered")]
    DuplicateTool(String),
    #[error("invalid tool schema for {tool:?}: {reason}")]
    InvalidSchema { tool: String, reason: String },
    #[error("registry is sealed; tools cannot be registered after startup")]
    RegistrySealed,
    #[error("unknown tool {0:?}")]
    UnknownTool(String),
    #[error("invalid turn sequence: {0}")]
    InvalidTurnSequence(String),
    #[error("model did not respond within {timeout_secs}s")]
    ModelTimeout { timeout_secs: u64 },
    #[error("model service error: {0}")]
    ModelService(#[from] wingman_llm::LlmError),
    #[error("tool-call chain exceeded {max_tool_calls} calls without a final reply")]
    MaxToolChain { max_tool_calls: usize },
}

impl AgentError {
    /// Fatal errors are programmer errors: the process should not have
    /// started (registration) or a caller broke the turn protocol. The
    /// rest end the round but leave the session usable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DuplicateTool(_)
                | Self::InvalidSchema { .. }
                | Self::RegistrySealed
                | Self::InvalidTurnSequence(_)
        )
    }
}

/// A tool argument the validator rejected. Names the parameter so the
/// model can repair the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArgumentError {
    #[error("arguments must be a JSON object, got {got}")]
    NotAnObject { got: String },
    #[error("unknown parameter {parameter:?}")]
    UnknownParameter { parameter: String },
    #[error("missing required parameter {parameter:?}")]
    MissingParameter { parameter: String },
    #[error("parameter {parameter:?}: expected {expected}, got {got}")]
    WrongType {
        parameter: String,
        expected: String,
        got: String,
    },
    #[error("parameter {parameter:?}: {value} is outside [{min}, {max}]")]
    OutOfBounds {
        parameter: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("parameter {parameter:?}: {value:?} is not one of {allowed:?}")]
    NotInEnum {
        parameter: String,
        value: String,
        allowed: Vec<String>,
    },
}

impl ArgumentError {
    pub fn parameter(&self) -> Option<&str> {
        match self {
            Self::NotAnObject { .. } => None,
            Self::UnknownParameter { parameter }
            | Self::MissingParameter { parameter }
            | Self::WrongType { parameter, .. }
            | Self::OutOfBounds { parameter, .. }
            | Self::NotInEnum { parameter, .. } => Some(parameter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatality_split() {
        assert!(AgentError::RegistrySealed.is_fatal());
        assert!(AgentError::DuplicateTool("x".into()).is_fatal());
        assert!(AgentError::InvalidTurnSequence("y".into()).is_fatal());
        assert!(!AgentError::ModelTimeout { timeout_secs: 120 }.is_fatal());
        assert!(!AgentError::MaxToolChain { max_tool_calls: 10 }.is_fatal());
        assert!(!AgentError::UnknownTool("z".into()).is_fatal());
    }

    #[test]
    fn argument_errors_name_the_parameter() {
        let err = ArgumentError::OutOfBounds {
            parameter: "value".into(),
            value: 9.0,
            min: 0.001,
            max: 5.0,
        };
        assert_eq!(err.parameter(), Some("value"));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "out_of_bounds");
        assert_eq!(json["parameter"], "value");
    }
}
