//! Tool registry: the fixed vocabulary of actions the model may take.
//!
//! Tools are registered once at startup, validated eagerly, then the
//! registry is sealed before the first round. Every call the dispatch
//! loop executes resolves through here; there is no dynamic discovery.

use serde::Serialize;
use serde_json::Value;
use wingman_cfd::{EnvironmentError, PlaneHandle};

use crate::error::AgentError;

/// A tool handler: validated arguments in, JSON payload out. Environment
/// failures are returned, never panicked, and the loop folds them into a
/// failure tool result.
pub type ToolHandler =
    Box<dyn Fn(&mut PlaneHandle, &serde_json::Map<String, Value>) -> Result<Value, EnvironmentError> + Send>;

/// Parameter type plus its constraints. Constraints live here, once, and
/// drive both schema emission and runtime validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamKind {
    Number {
        min: Option<f64>,
        max: Option<f64>,
        /// Physical unit appended to the schema description, e.g. "m".
        unit: Option<String>,
    },
    Integer {
        min: Option<i64>,
        max: Option<i64>,
    },
    String {
        /// Closed vocabulary, if any. `Some(vec![])` is a schema bug.
        one_of: Option<Vec<String>>,
    },
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpecV1 {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
}

impl ParamSpecV1 {
    pub fn required(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpecV1 {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpecV1>,
}

pub struct RegisteredTool {
    pub spec: ToolSpecV1,
    pub handler: ToolHandler,
}

/// Registration-ordered tool set. Order is part of the contract: the
/// compiled schema lists tools in the order they were registered.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    sealed: bool,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Freeze the registry. Call after the last `register`, before the
    /// first round.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn specs(&self) -> impl Iterator<Item = &ToolSpecV1> {
        self.tools.iter().map(|t| &t.spec)
    }

    pub fn register(&mut self, spec: ToolSpecV1, handler: ToolHandler) -> Result<(), AgentError> {
        if self.sealed {
            return Err(AgentError::RegistrySealed);
        }
        Self::validate_spec(&spec)?;
        if self.tools.iter().any(|t| t.spec.name == spec.name) {
            return Err(AgentError::DuplicateTool(spec.name));
        }
        tracing::debug!(tool = %spec.name, params = spec.params.len(), "registered tool");
        self.tools.push(RegisteredTool { spec, handler });
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&RegisteredTool, AgentError> {
        self.tools
            .iter()
            .find(|t| t.spec.name == name)
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))
    }

    fn validate_spec(spec: &ToolSpecV1) -> Result<(), AgentError> {
        let invalid = |reason: String| AgentError::InvalidSchema {
            tool: spec.name.clone(),
            reason,
        };

        if spec.name.trim().is_empty() {
            return Err(invalid("tool name is empty".to_string()));
        }
        let mut seen = std::collections::HashSet::new();
        for p in &spec.params {
            if p.name.trim().is_empty() {
                return Err(invalid("parameter name is empty".to_string()));
            }
            if !seen.insert(p.name.as_str()) {
                return Err(invalid(format!("duplicate parameter {:?}", p.name)));
            }
            match &p.kind {
                ParamKind::Number {
                    min: Some(min),
                    max: Some(max),
                    ..
                } if min > max => {
                    return Err(invalid(format!(
                        "parameter {:?}: inverted bounds [{min}, {max}]",
                        p.name
                    )));
                }
                ParamKind::Integer {
                    min: Some(min),
                    max: Some(max),
                } if min > max => {
                    return Err(invalid(format!(
                        "parameter {:?}: inverted bounds [{min}, {max}]",
                        p.name
                    )));
                }
                ParamKind::String { one_of: Some(v) } if v.is_empty() => {
                    return Err(invalid(format!(
                        "parameter {:?}: empty enumeration",
                        p.name
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}
