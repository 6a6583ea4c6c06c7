//! In-process finite-wing estimator.
//!
//! A deliberately small lifting-line model: aspect-ratio-corrected lift
//! slope, induced plus profile drag, linear pitching moment. It is the
//! default backend when no analysis server is configured, and the backend
//! every test runs against, so it must be deterministic and instantaneous.
//!
//! Coefficients are speed-independent here; the sweep speed in `PolarSpec`
//! is still validated so requests behave identically against the remote
//! backend.

use crate::environment::{CfdEnvironment, EnvironmentError};
use crate::metrics::wing_metrics;
use crate::plane::{FoilSide, Plane, PointMass, SectionAttr, SurfaceKind};
use crate::polar::{PolarPoint, PolarResult, PolarSpec};

const OSWALD_EFFICIENCY: f64 = 0.85;
const PROFILE_CD0: f64 = 0.018;
const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

/// Section data for the handful of foils the default planes use:
/// zero-lift angle (deg) and zero-lift pitching moment.
fn foil_section_data(name: &str) -> (f64, f64) {
    let upper = name.to_ascii_uppercase();
    if upper.starts_with("NACA 00") || upper.starts_with("NACA00") {
        // Symmetric sections.
        (0.0, 0.0)
    } else if upper.contains("E387") {
        (-2.6, -0.08)
    } else {
        // Mildly cambered default for unknown foils.
        (-1.5, -0.05)
    }
}

pub struct VortexLatticeEnv {
    plane: Plane,
}

impl VortexLatticeEnv {
    pub fn new(plane: Plane) -> Self {
        Self { plane }
    }

    fn plane_err(op: &'static str, e: crate::plane::PlaneError) -> EnvironmentError {
        EnvironmentError::new(op, e.to_string())
    }
}

impl CfdEnvironment for VortexLatticeEnv {
    fn ping(&self) -> bool {
        true
    }

    fn plane(&self) -> Result<Plane, EnvironmentError> {
        Ok(self.plane.clone())
    }

    fn section_attr(
        &self,
        surface: SurfaceKind,
        section: usize,
        attr: SectionAttr,
    ) -> Result<f64, EnvironmentError> {
        self.plane
            .section_attr(surface, section, attr)
            .map_err(|e| Self::plane_err("section_attr", e))
    }

    fn set_section_attr(
        &mut self,
        surface: SurfaceKind,
        section: usize,
        attr: SectionAttr,
        value: f64,
    ) -> Result<(), EnvironmentError> {
        self.plane
            .set_section_attr(surface, section, attr, value)
            .map_err(|e| Self::plane_err("set_section_attr", e))
    }

    fn set_foil(
        &mut self,
        surface: SurfaceKind,
        section: usize,
        side: FoilSide,
        foil: &str,
    ) -> Result<(), EnvironmentError> {
        self.plane
            .set_foil(surface, section, side, foil)
            .map_err(|e| Self::plane_err("set_foil", e))
    }

    fn add_point_mass(&mut self, mass: PointMass) -> Result<(), EnvironmentError> {
        if !(mass.mass_kg > 0.0) {
            return Err(EnvironmentError::new(
                "add_point_mass",
                format!("mass must be positive, got {} kg", mass.mass_kg),
            ));
        }
        self.plane.point_masses.push(mass);
        Ok(())
    }

    fn run_polar(&mut self, spec: &PolarSpec) -> Result<PolarResult, EnvironmentError> {
        spec.validate()
            .map_err(|e| EnvironmentError::new("run_polar", e.to_string()))?;

        let m = wing_metrics(&self.plane.wing)
            .map_err(|e| Self::plane_err("run_polar", e))?;
        let ar = m.aspect_ratio;
        // Finite-wing lift slope per radian.
        let a = TWO_PI / (1.0 + TWO_PI / (std::f64::consts::PI * OSWALD_EFFICIENCY * ar));

        let root_foil = &self.plane.wing.sections[0].right_foil;
        let (alpha_zero_lift, cm0) = foil_section_data(root_foil);

        let points = spec
            .alphas()
            .into_iter()
            .map(|alpha| {
                let cl = a * (alpha - alpha_zero_lift).to_radians();
                let cd = PROFILE_CD0
                    + cl * cl / (std::f64::consts::PI * OSWALD_EFFICIENCY * ar);
                let cm = cm0 - 0.011 * (alpha - alpha_zero_lift);
                PolarPoint::from_coefficients(alpha, cl, cd, cm)
            })
            .collect();

        Ok(PolarResult {
            spec: spec.clone(),
            points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> VortexLatticeEnv {
        VortexLatticeEnv::new(Plane::default_trainer("t"))
    }

    #[test]
    fn lift_increases_with_alpha() {
        let mut env = env();
        let result = env.run_polar(&PolarSpec::default()).unwrap();
        assert_eq!(result.points.len(), 61);
        for pair in result.points.windows(2) {
            assert!(pair[1].cl > pair[0].cl);
        }
    }

    #[test]
    fn drag_is_always_positive_and_drag_polar_is_convex() {
        let mut env = env();
        let result = env.run_polar(&PolarSpec::default()).unwrap();
        for p in &result.points {
            assert!(p.cd >= PROFILE_CD0);
        }
        // Minimum drag sits at zero lift, so CD grows away from it.
        let min_cd = result
            .points
            .iter()
            .map(|p| p.cd)
            .fold(f64::INFINITY, f64::min);
        assert!((min_cd - PROFILE_CD0).abs() < 1e-3);
    }

    #[test]
    fn best_glide_is_interior() {
        let mut env = env();
        let result = env.run_polar(&PolarSpec::default()).unwrap();
        let best = result.best_l_over_d().unwrap();
        assert!(best.alpha_deg > result.spec.start_alpha_deg);
        assert!(best.alpha_deg < result.spec.end_alpha_deg);
        assert!(best.cl_over_cd > 1.0);
    }

    #[test]
    fn cambered_wing_lifts_at_zero_alpha() {
        let mut env = env();
        let result = env
            .run_polar(&PolarSpec {
                start_alpha_deg: 0.0,
                end_alpha_deg: 0.0,
                delta_alpha_deg: 1.0,
                ..PolarSpec::default()
            })
            .unwrap();
        // E387 root section: zero-lift angle below zero, so CL(0) > 0.
        assert!(result.points[0].cl > 0.0);
    }

    #[test]
    fn geometry_changes_feed_the_next_polar() {
        let mut env = env();
        let before = env.run_polar(&PolarSpec::default()).unwrap();
        // Stretch the span: higher aspect ratio, steeper lift slope.
        env.set_section_attr(SurfaceKind::Wing, 1, SectionAttr::YPosition, 2.0)
            .unwrap();
        let after = env.run_polar(&PolarSpec::default()).unwrap();
        let i = 40; // alpha = 10 deg
        assert!(after.points[i].cl > before.points[i].cl);
    }

    #[test]
    fn rejects_invalid_spec_and_nonpositive_mass() {
        let mut env = env();
        let bad = PolarSpec {
            delta_alpha_deg: -1.0,
            ..PolarSpec::default()
        };
        let err = env.run_polar(&bad).unwrap_err();
        assert_eq!(err.operation, "run_polar");

        let err = env
            .add_point_mass(PointMass {
                mass_kg: 0.0,
                position: [0.0; 3],
                tag: String::new(),
            })
            .unwrap_err();
        assert_eq!(err.operation, "add_point_mass");
    }
}
