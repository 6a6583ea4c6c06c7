//! The aircraft tool set.
//!
//! Every tool is a thin, validated wrapper over one `PlaneHandle`
//! operation. Descriptions are written for the model: they say what the
//! tool does, name units, and note index conventions (sections are
//! root-first, index 0).

use std::str::FromStr;

use serde_json::{json, Map, Value};
use wingman_cfd::{
    wing_metrics, EnvironmentError, FoilSide, PointMass, PolarSpec, SectionAttr, SurfaceKind,
};

use crate::error::AgentError;
use crate::registry::{ParamKind, ParamSpecV1, ToolHandler, ToolRegistry, ToolSpecV1};

const MAX_SECTION_INDEX: i64 = 16;

// ============================================================================
// Argument access
// ============================================================================

// Validation guarantees presence and type for required parameters; these
// helpers keep handlers panic-free anyway and give a tagged error if the
// contract is ever broken.

fn num(args: &Map<String, Value>, name: &'static str) -> Result<f64, EnvironmentError> {
    args.get(name)
        .and_then(Value::as_f64)
        .ok_or_else(|| EnvironmentError::new("arguments", format!("missing number {name:?}")))
}

fn num_or(args: &Map<String, Value>, name: &'static str, default: f64) -> f64 {
    args.get(name).and_then(Value::as_f64).unwrap_or(default)
}

fn int(args: &Map<String, Value>, name: &'static str) -> Result<usize, EnvironmentError> {
    args.get(name)
        .and_then(Value::as_i64)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| EnvironmentError::new("arguments", format!("missing integer {name:?}")))
}

fn text<'a>(args: &'a Map<String, Value>, name: &'static str) -> Result<&'a str, EnvironmentError> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| EnvironmentError::new("arguments", format!("missing string {name:?}")))
}

fn surface_kind(args: &Map<String, Value>) -> Result<SurfaceKind, EnvironmentError> {
    let s = text(args, "surface")?;
    SurfaceKind::from_str(s).map_err(|e| EnvironmentError::new("arguments", e.to_string()))
}

fn section_attr_arg(args: &Map<String, Value>) -> Result<SectionAttr, EnvironmentError> {
    let s = text(args, "attribute")?;
    SectionAttr::from_str(s).map_err(|e| EnvironmentError::new("arguments", e.to_string()))
}

// ============================================================================
// Shared parameter specs
// ============================================================================

fn surface_param() -> ParamSpecV1 {
    ParamSpecV1::required(
        "surface",
        ParamKind::String {
            one_of: Some(
                SurfaceKind::ALL
                    .iter()
                    .map(|k| k.as_str().to_string())
                    .collect(),
            ),
        },
        "Which lifting surface",
    )
}

fn section_param() -> ParamSpecV1 {
    ParamSpecV1::required(
        "section",
        ParamKind::Integer {
            min: Some(0),
            max: Some(MAX_SECTION_INDEX),
        },
        "Section index along the half-span, root first",
    )
}

fn attribute_param() -> ParamSpecV1 {
    ParamSpecV1::required(
        "attribute",
        ParamKind::String {
            one_of: Some(
                SectionAttr::ALL
                    .iter()
                    .map(|a| a.as_str().to_string())
                    .collect(),
            ),
        },
        "Which attribute of the section. chord, y_position and offset are in meters; twist and dihedral in degrees",
    )
}

// ============================================================================
// Tools
// ============================================================================

fn describe_plane() -> (ToolSpecV1, ToolHandler) {
    (
        ToolSpecV1 {
            name: "describe_plane".to_string(),
            description: "Full snapshot of the current aircraft: every surface with its sections \
                          (chord, y position, offset, twist, dihedral, foils), point masses, and \
                          derived wing metrics. Good first step."
                .to_string(),
            params: vec![],
        },
        Box::new(|handle, _args| {
            let plane = handle.plane()?;
            let metrics = wing_metrics(plane.surface(SurfaceKind::Wing))
                .map_err(|e| EnvironmentError::new("describe_plane", e.to_string()))?;
            let plane_json = serde_json::to_value(&plane)
                .map_err(|e| EnvironmentError::new("describe_plane", e.to_string()))?;
            Ok(json!({
                "plane": plane_json,
                "wing_metrics": metrics,
                "total_point_mass_kg": plane.total_point_mass_kg(),
            }))
        }),
    )
}

fn get_geometry() -> (ToolSpecV1, ToolHandler) {
    (
        ToolSpecV1 {
            name: "get_geometry".to_string(),
            description: "Read one geometric attribute of one section.".to_string(),
            params: vec![surface_param(), section_param(), attribute_param()],
        },
        Box::new(|handle, args| {
            let surface = surface_kind(args)?;
            let section = int(args, "section")?;
            let attr = section_attr_arg(args)?;
            let value = handle.section_attr(surface, section, attr)?;
            Ok(json!({
                "surface": surface.as_str(),
                "section": section,
                "attribute": attr.as_str(),
                "value": value,
                "unit": attr.unit(),
            }))
        }),
    )
}

fn set_geometry() -> (ToolSpecV1, ToolHandler) {
    (
        ToolSpecV1 {
            name: "set_geometry".to_string(),
            description: "Set one geometric attribute of one section. Lengths in meters, angles \
                          in degrees. The aircraft keeps its previous value if the new one is \
                          rejected."
                .to_string(),
            params: vec![
                surface_param(),
                section_param(),
                attribute_param(),
                ParamSpecV1::required(
                    "value",
                    ParamKind::Number {
                        min: Some(-180.0),
                        max: Some(180.0),
                        unit: None,
                    },
                    "New value. Per-attribute constraints (e.g. chord must be positive) are \
                     enforced by the model",
                ),
            ],
        },
        Box::new(|handle, args| {
            let surface = surface_kind(args)?;
            let section = int(args, "section")?;
            let attr = section_attr_arg(args)?;
            let value = num(args, "value")?;
            handle.set_section_attr(surface, section, attr, value)?;
            Ok(json!({
                "surface": surface.as_str(),
                "section": section,
                "attribute": attr.as_str(),
                "value": value,
                "unit": attr.unit(),
            }))
        }),
    )
}

fn set_foil() -> (ToolSpecV1, ToolHandler) {
    (
        ToolSpecV1 {
            name: "set_foil".to_string(),
            description: "Assign an airfoil to one section, e.g. \"E387\" or \"NACA 0012\"."
                .to_string(),
            params: vec![
                surface_param(),
                section_param(),
                ParamSpecV1::optional(
                    "side",
                    ParamKind::String {
                        one_of: Some(vec![
                            "left".to_string(),
                            "right".to_string(),
                            "both".to_string(),
                        ]),
                    },
                    "Which side of the section gets the foil. Defaults to both",
                ),
                ParamSpecV1::required(
                    "foil",
                    ParamKind::String { one_of: None },
                    "Airfoil name",
                ),
            ],
        },
        Box::new(|handle, args| {
            let surface = surface_kind(args)?;
            let section = int(args, "section")?;
            let side = match args.get("side").and_then(Value::as_str) {
                Some(s) => FoilSide::from_str(s)
                    .map_err(|e| EnvironmentError::new("arguments", e.to_string()))?,
                None => FoilSide::Both,
            };
            let foil = text(args, "foil")?;
            handle.set_foil(surface, section, side, foil)?;
            Ok(json!({
                "surface": surface.as_str(),
                "section": section,
                "foil": foil,
            }))
        }),
    )
}

fn wing_metrics_tool() -> (ToolSpecV1, ToolHandler) {
    (
        ToolSpecV1 {
            name: "wing_metrics".to_string(),
            description: "Derived planform metrics of a surface: span, area, aspect ratio, taper \
                          ratio, mean aerodynamic chord. Defaults to the main wing."
                .to_string(),
            params: vec![ParamSpecV1::optional(
                "surface",
                ParamKind::String {
                    one_of: Some(
                        SurfaceKind::ALL
                            .iter()
                            .map(|k| k.as_str().to_string())
                            .collect(),
                    ),
                },
                "Which surface to measure. Defaults to wing",
            )],
        },
        Box::new(|handle, args| {
            let surface = match args.get("surface").and_then(Value::as_str) {
                Some(s) => SurfaceKind::from_str(s)
                    .map_err(|e| EnvironmentError::new("arguments", e.to_string()))?,
                None => SurfaceKind::Wing,
            };
            let plane = handle.plane()?;
            let metrics = wing_metrics(plane.surface(surface))
                .map_err(|e| EnvironmentError::new("wing_metrics", e.to_string()))?;
            Ok(json!({ "surface": surface.as_str(), "metrics": metrics }))
        }),
    )
}

fn add_point_mass() -> (ToolSpecV1, ToolHandler) {
    (
        ToolSpecV1 {
            name: "add_point_mass".to_string(),
            description: "Attach a point mass to the aircraft at body coordinates (x aft, y \
                          starboard, z up), e.g. a battery or ballast."
                .to_string(),
            params: vec![
                ParamSpecV1::required(
                    "mass_kg",
                    ParamKind::Number {
                        min: Some(0.001),
                        max: Some(1000.0),
                        unit: Some("kg".to_string()),
                    },
                    "Mass",
                ),
                ParamSpecV1::required(
                    "x",
                    ParamKind::Number {
                        min: Some(-100.0),
                        max: Some(100.0),
                        unit: Some("m".to_string()),
                    },
                    "Longitudinal position",
                ),
                ParamSpecV1::required(
                    "y",
                    ParamKind::Number {
                        min: Some(-100.0),
                        max: Some(100.0),
                        unit: Some("m".to_string()),
                    },
                    "Spanwise position",
                ),
                ParamSpecV1::required(
                    "z",
                    ParamKind::Number {
                        min: Some(-100.0),
                        max: Some(100.0),
                        unit: Some("m".to_string()),
                    },
                    "Vertical position",
                ),
                ParamSpecV1::optional(
                    "tag",
                    ParamKind::String { one_of: None },
                    "Label for the mass, e.g. \"battery\"",
                ),
            ],
        },
        Box::new(|handle, args| {
            let mass = PointMass {
                mass_kg: num(args, "mass_kg")?,
                position: [num(args, "x")?, num(args, "y")?, num(args, "z")?],
                tag: args
                    .get("tag")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            };
            handle.add_point_mass(mass.clone())?;
            Ok(json!({
                "added": mass,
                "total_point_mass_kg": handle.plane()?.total_point_mass_kg(),
            }))
        }),
    )
}

fn run_polar() -> (ToolSpecV1, ToolHandler) {
    (
        ToolSpecV1 {
            name: "run_polar".to_string(),
            description: "Run a fixed-speed polar sweep over angle of attack and return CL, CD, \
                          CL/CD, CL^1.5/CD and CM per point, plus the best-glide point and the \
                          zero-lift angle. Defaults: 10 m/s, -10 to 20 deg in 0.5 deg steps."
                .to_string(),
            params: vec![
                ParamSpecV1::optional(
                    "speed_ms",
                    ParamKind::Number {
                        min: Some(0.1),
                        max: Some(300.0),
                        unit: Some("m/s".to_string()),
                    },
                    "Free-stream speed",
                ),
                ParamSpecV1::optional(
                    "start_alpha_deg",
                    ParamKind::Number {
                        min: Some(-90.0),
                        max: Some(90.0),
                        unit: Some("deg".to_string()),
                    },
                    "First angle of attack",
                ),
                ParamSpecV1::optional(
                    "end_alpha_deg",
                    ParamKind::Number {
                        min: Some(-90.0),
                        max: Some(90.0),
                        unit: Some("deg".to_string()),
                    },
                    "Last angle of attack",
                ),
                ParamSpecV1::optional(
                    "delta_alpha_deg",
                    ParamKind::Number {
                        min: Some(0.01),
                        max: Some(30.0),
                        unit: Some("deg".to_string()),
                    },
                    "Step between angles",
                ),
            ],
        },
        Box::new(|handle, args| {
            let defaults = PolarSpec::default();
            let spec = PolarSpec {
                free_stream_speed_ms: num_or(args, "speed_ms", defaults.free_stream_speed_ms),
                start_alpha_deg: num_or(args, "start_alpha_deg", defaults.start_alpha_deg),
                end_alpha_deg: num_or(args, "end_alpha_deg", defaults.end_alpha_deg),
                delta_alpha_deg: num_or(args, "delta_alpha_deg", defaults.delta_alpha_deg),
            };
            let result = handle.run_polar(&spec)?;
            let best = result.best_l_over_d().cloned();
            let zero_lift = result.zero_lift_alpha_deg();
            Ok(json!({
                "spec": result.spec,
                "points": result.points,
                "best_l_over_d": best,
                "zero_lift_alpha_deg": zero_lift,
            }))
        }),
    )
}

/// Register the full aircraft tool set, in the order the model sees it.
pub fn register_builtin_tools(registry: &mut ToolRegistry) -> Result<(), AgentError> {
    for (spec, handler) in [
        describe_plane(),
        get_geometry(),
        set_geometry(),
        set_foil(),
        wing_metrics_tool(),
        add_point_mass(),
        run_polar(),
    ] {
        registry.register(spec, handler)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate_args;
    use wingman_cfd::{Plane, PlaneHandle, VortexLatticeEnv};

    fn handle() -> PlaneHandle {
        PlaneHandle::new(Box::new(VortexLatticeEnv::new(Plane::default_trainer(
            "trainer",
        ))))
    }

    fn registry() -> ToolRegistry {
        let mut reg = ToolRegistry::new();
        register_builtin_tools(&mut reg).unwrap();
        reg.seal();
        reg
    }

    fn invoke(reg: &ToolRegistry, handle: &mut PlaneHandle, tool: &str, args: Value) -> Value {
        let registered = reg.resolve(tool).unwrap();
        let map = validate_args(&registered.spec, &args).unwrap();
        (registered.handler)(handle, &map).unwrap()
    }

    #[test]
    fn all_builtins_register() {
        let reg = registry();
        assert_eq!(reg.len(), 7);
        for name in [
            "describe_plane",
            "get_geometry",
            "set_geometry",
            "set_foil",
            "wing_metrics",
            "add_point_mass",
            "run_polar",
        ] {
            assert!(reg.resolve(name).is_ok(), "missing {name}");
        }
    }

    #[test]
    fn set_then_get_geometry() {
        let reg = registry();
        let mut h = handle();
        let out = invoke(
            &reg,
            &mut h,
            "set_geometry",
            json!({"surface": "wing", "section": 1, "attribute": "chord", "value": 2.0}),
        );
        assert_eq!(out["value"], 2.0);
        assert_eq!(out["unit"], "m");

        let out = invoke(
            &reg,
            &mut h,
            "get_geometry",
            json!({"surface": "wing", "section": 1, "attribute": "chord"}),
        );
        assert_eq!(out["value"], 2.0);
    }

    #[test]
    fn negative_chord_surfaces_as_environment_error() {
        let reg = registry();
        let mut h = handle();
        let registered = reg.resolve("set_geometry").unwrap();
        let args = json!({"surface": "wing", "section": 0, "attribute": "chord", "value": -1.0});
        let map = validate_args(&registered.spec, &args).unwrap();
        let err = (registered.handler)(&mut h, &map).unwrap_err();
        assert_eq!(err.operation, "set_section_attr");
        // State unchanged.
        assert_eq!(
            h.section_attr(SurfaceKind::Wing, 0, SectionAttr::Chord)
                .unwrap(),
            0.2
        );
    }

    #[test]
    fn describe_plane_reports_metrics_and_masses() {
        let reg = registry();
        let mut h = handle();
        invoke(
            &reg,
            &mut h,
            "add_point_mass",
            json!({"mass_kg": 0.5, "x": 0.1, "y": 0.0, "z": 0.0, "tag": "battery"}),
        );
        let out = invoke(&reg, &mut h, "describe_plane", json!({}));
        assert_eq!(out["total_point_mass_kg"], 0.5);
        assert!(out["wing_metrics"]["span_m"].as_f64().unwrap() > 0.0);
        assert_eq!(out["plane"]["name"], "trainer");
    }

    #[test]
    fn run_polar_defaults_and_summary() {
        let reg = registry();
        let mut h = handle();
        let out = invoke(&reg, &mut h, "run_polar", json!({}));
        assert_eq!(out["points"].as_array().unwrap().len(), 61);
        assert!(out["best_l_over_d"]["cl_over_cd"].as_f64().unwrap() > 1.0);
        assert!(out["zero_lift_alpha_deg"].as_f64().unwrap() < 0.0);
    }

    #[test]
    fn set_foil_defaults_to_both_sides() {
        let reg = registry();
        let mut h = handle();
        invoke(
            &reg,
            &mut h,
            "set_foil",
            json!({"surface": "wing", "section": 0, "foil": "NACA 2412"}),
        );
        let plane = h.plane().unwrap();
        assert_eq!(plane.wing.sections[0].right_foil, "NACA 2412");
        assert_eq!(plane.wing.sections[0].left_foil, "NACA 2412");
    }
}
