//! Argument validation: the gate between the model and a handler.
//!
//! Checks run in a fixed order so the model gets one stable, specific
//! complaint per bad call: object shape, unknown names, missing required
//! names, then per-value type and constraint checks. A handler only ever
//! sees arguments that passed all of them.

use serde_json::Value;

use crate::error::ArgumentError;
use crate::registry::{ParamKind, ToolSpecV1};

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validate `args` against the spec. Returns the argument object on
/// success so handlers can index it without re-checking shape.
pub fn validate_args(
    spec: &ToolSpecV1,
    args: &Value,
) -> Result<serde_json::Map<String, Value>, ArgumentError> {
    let obj = args.as_object().ok_or_else(|| ArgumentError::NotAnObject {
        got: type_name(args).to_string(),
    })?;

    for name in obj.keys() {
        if !spec.params.iter().any(|p| &p.name == name) {
            return Err(ArgumentError::UnknownParameter {
                parameter: name.clone(),
            });
        }
    }

    for p in &spec.params {
        if p.required && !obj.contains_key(&p.name) {
            return Err(ArgumentError::MissingParameter {
                parameter: p.name.clone(),
            });
        }
    }

    for p in &spec.params {
        if let Some(value) = obj.get(&p.name) {
            validate_value(&p.name, &p.kind, value)?;
        }
    }

    Ok(obj.clone())
}

fn validate_value(name: &str, kind: &ParamKind, value: &Value) -> Result<(), ArgumentError> {
    let wrong_type = |expected: &str| ArgumentError::WrongType {
        parameter: name.to_string(),
        expected: expected.to_string(),
        got: type_name(value).to_string(),
    };

    match kind {
        ParamKind::Number { min, max, .. } => {
            let n = value.as_f64().ok_or_else(|| wrong_type("number"))?;
            if !n.is_finite() {
                return Err(wrong_type("finite number"));
            }
            check_bounds(name, n, min.unwrap_or(f64::NEG_INFINITY), max.unwrap_or(f64::INFINITY))
        }
        ParamKind::Integer { min, max } => {
            // A JSON 3.0 is not an integer even though it is a whole float.
            let n = value.as_i64().ok_or_else(|| wrong_type("integer"))?;
            check_bounds(
                name,
                n as f64,
                min.map(|m| m as f64).unwrap_or(f64::NEG_INFINITY),
                max.map(|m| m as f64).unwrap_or(f64::INFINITY),
            )
        }
        ParamKind::String { one_of } => {
            let s = value.as_str().ok_or_else(|| wrong_type("string"))?;
            if let Some(allowed) = one_of {
                if !allowed.iter().any(|a| a == s) {
                    return Err(ArgumentError::NotInEnum {
                        parameter: name.to_string(),
                        value: s.to_string(),
                        allowed: allowed.clone(),
                    });
                }
            }
            Ok(())
        }
        ParamKind::Boolean => {
            value.as_bool().ok_or_else(|| wrong_type("boolean"))?;
            Ok(())
        }
    }
}

fn check_bounds(name: &str, value: f64, min: f64, max: f64) -> Result<(), ArgumentError> {
    if value < min || value > max {
        return Err(ArgumentError::OutOfBounds {
            parameter: name.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}
