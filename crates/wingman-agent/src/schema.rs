//! Schema compiler: registry to OpenAI function-calling document.
//!
//! Deterministic by construction: tools are emitted in registration
//! order and `serde_json`'s map keeps keys sorted, so identical
//! registries serialize to byte-identical text. Anything that consumes
//! the schema (provider wire code, the `tools schema` CLI dump, caching
//! by hash) can rely on that.

use serde_json::{json, Value};

use crate::registry::{ParamKind, ParamSpecV1, ToolRegistry, ToolSpecV1};

/// Compile the whole registry into the `tools` array a chat request
/// carries.
pub fn compile(registry: &ToolRegistry) -> Vec<Value> {
    registry.specs().map(compile_tool).collect()
}

pub fn compile_tool(spec: &ToolSpecV1) -> Value {
    let mut properties = serde_json::Map::new();
    let mut required: Vec<Value> = Vec::new();
    for p in &spec.params {
        properties.insert(p.name.clone(), compile_param(p));
        if p.required {
            required.push(Value::String(p.name.clone()));
        }
    }

    let mut parameters = json!({
        "type": "object",
        "properties": Value::Object(properties),
    });
    if !required.is_empty() {
        parameters["required"] = Value::Array(required);
    }

    json!({
        "type": "function",
        "function": {
            "name": spec.name,
            "description": spec.description,
            "parameters": parameters,
        }
    })
}

fn compile_param(p: &ParamSpecV1) -> Value {
    match &p.kind {
        ParamKind::Number { min, max, unit } => {
            let description = match unit {
                Some(unit) => format!("{} ({unit})", p.description),
                None => p.description.clone(),
            };
            let mut v = json!({ "type": "number", "description": description });
            if let Some(min) = min {
                v["minimum"] = json!(min);
            }
            if let Some(max) = max {
                v["maximum"] = json!(max);
            }
            v
        }
        ParamKind::Integer { min, max } => {
            let mut v = json!({ "type": "integer", "description": p.description });
            if let Some(min) = min {
                v["minimum"] = json!(min);
            }
            if let Some(max) = max {
                v["maximum"] = json!(max);
            }
            v
        }
        ParamKind::String { one_of } => {
            let mut v = json!({ "type": "string", "description": p.description });
            if let Some(allowed) = one_of {
                v["enum"] = json!(allowed);
            }
            v
        }
        ParamKind::Boolean => json!({ "type": "boolean", "description": p.description }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ToolRegistry;

    fn sample_registry() -> ToolRegistry {
        let mut reg = ToolRegistry::new();
        reg.register(
            ToolSpecV1 {
                name: "set_geometry".to_string(),
                description: "Set one geometric attribute".to_string(),
                params: vec![
                    ParamSpecV1::required(
                        "surface",
                        ParamKind::String {
                            one_of: Some(vec![
                                "wing".to_string(),
                                "elevator".to_string(),
                                "fin".to_string(),
                            ]),
                        },
                        "Which surface to modify",
                    ),
                    ParamSpecV1::required(
                        "section",
                        ParamKind::Integer {
                            min: Some(0),
                            max: Some(16),
                        },
                        "Section index, root first",
                    ),
                    ParamSpecV1::required(
                        "value",
                        ParamKind::Number {
                            min: Some(0.001),
                            max: Some(5.0),
                            unit: Some("m".to_string()),
                        },
                        "New chord length",
                    ),
                ],
            },
            Box::new(|_, _| Ok(serde_json::json!({}))),
        )
        .unwrap();
        reg
    }

    #[test]
    fn openai_function_shape() {
        let tools = compile(&sample_registry());
        assert_eq!(tools.len(), 1);
        let f = &tools[0]["function"];
        assert_eq!(f["name"], "set_geometry");
        assert_eq!(f["parameters"]["type"], "object");
        assert_eq!(
            f["parameters"]["required"],
            serde_json::json!(["surface", "section", "value"])
        );
        assert_eq!(
            f["parameters"]["properties"]["surface"]["enum"],
            serde_json::json!(["wing", "elevator", "fin"])
        );
        assert_eq!(f["parameters"]["properties"]["value"]["minimum"], 0.001);
        // Unit annotation folded into the description.
        assert_eq!(
            f["parameters"]["properties"]["value"]["description"],
            "New chord length (m)"
        );
    }

    #[test]
    fn identical_registries_compile_byte_identical() {
        let a = serde_json::to_string(&compile(&sample_registry())).unwrap();
        let b = serde_json::to_string(&compile(&sample_registry())).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn tools_keep_registration_order() {
        let mut reg = ToolRegistry::new();
        for name in ["zz_last_alphabetically_first", "aa_first_alphabetically_last"] {
            reg.register(
                ToolSpecV1 {
                    name: name.to_string(),
                    description: String::new(),
                    params: vec![],
                },
                Box::new(|_, _| Ok(serde_json::json!({}))),
            )
            .unwrap();
        }
        let doc = compile(&reg);
        assert_eq!(doc[0]["function"]["name"], "zz_last_alphabetically_first");
        assert_eq!(doc[1]["function"]["name"], "aa_first_alphabetically_last");
    }
}
