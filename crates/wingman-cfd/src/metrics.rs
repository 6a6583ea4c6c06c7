//! Derived wing metrics.
//!
//! Recomputed from geometry on every call; nothing here is cached, so a
//! mutation through any tool is immediately visible to the next report.

use serde::{Deserialize, Serialize};

use crate::plane::{PlaneError, Surface};

/// Planform quantities for a full (mirrored) surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WingMetrics {
    /// Projected span, both halves, meters.
    pub span_m: f64,
    /// Planform area, both halves, square meters.
    pub area_m2: f64,
    pub aspect_ratio: f64,
    /// Tip chord over root chord.
    pub taper_ratio: f64,
    /// Mean aerodynamic chord, meters (area-weighted over trapezoid panels).
    pub mean_aero_chord_m: f64,
}

/// Compute planform metrics for a surface with at least two sections.
///
/// Sections must be ordered root to tip with strictly increasing spanwise
/// position; the surface is assumed mirrored about the root.
pub fn wing_metrics(surface: &Surface) -> Result<WingMetrics, PlaneError> {
    if surface.sections.len() < 2 {
        return Err(PlaneError::SectionOutOfRange {
            surface: surface.kind,
            index: 1,
            len: surface.sections.len(),
        });
    }

    let root = &surface.sections[0];
    let tip = &surface.sections[surface.sections.len() - 1];

    let half_span = tip.y_position - root.y_position;
    if half_span <= 0.0 {
        return Err(PlaneError::InvalidValue {
            attribute: crate::plane::SectionAttr::YPosition,
            value: tip.y_position,
            reason: "sections must be ordered root to tip with increasing span",
        });
    }

    let mut half_area = 0.0;
    let mut mac_weighted = 0.0;
    for pair in surface.sections.windows(2) {
        let (inner, outer) = (&pair[0], &pair[1]);
        let dy = outer.y_position - inner.y_position;
        if dy <= 0.0 {
            return Err(PlaneError::InvalidValue {
                attribute: crate::plane::SectionAttr::YPosition,
                value: outer.y_position,
                reason: "sections must be ordered root to tip with increasing span",
            });
        }
        let panel_area = 0.5 * (inner.chord + outer.chord) * dy;
        // Per-trapezoid MAC, weighted into the surface mean by panel area.
        let c_sum = inner.chord + outer.chord;
        let panel_mac = (2.0 / 3.0) * (c_sum - inner.chord * outer.chord / c_sum);
        half_area += panel_area;
        mac_weighted += panel_mac * panel_area;
    }

    let span = 2.0 * half_span;
    let area = 2.0 * half_area;
    Ok(WingMetrics {
        span_m: span,
        area_m2: area,
        aspect_ratio: span * span / area,
        taper_ratio: tip.chord / root.chord,
        mean_aero_chord_m: mac_weighted / half_area,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plane::Plane;
    use approx::assert_relative_eq;

    #[test]
    fn trainer_wing_metrics() {
        let plane = Plane::default_trainer("t");
        let m = wing_metrics(&plane.wing).unwrap();
        // Trapezoid: half span 1.0, chords 0.2 -> 0.1.
        assert_relative_eq!(m.span_m, 2.0);
        assert_relative_eq!(m.area_m2, 0.3);
        assert_relative_eq!(m.aspect_ratio, 4.0 / 0.3, epsilon = 1e-12);
        assert_relative_eq!(m.taper_ratio, 0.5);
        // MAC of a 0.2/0.1 trapezoid: (2/3)(0.3 - 0.02/0.3).
        assert_relative_eq!(m.mean_aero_chord_m, (2.0 / 3.0) * (0.3 - 0.02 / 0.3), epsilon = 1e-12);
    }

    #[test]
    fn rectangular_wing_mac_equals_chord() {
        let mut plane = Plane::new("rect");
        plane.wing.sections.push(crate::plane::WingSection::new(0.0, 0.25, "E387"));
        plane.wing.sections.push(crate::plane::WingSection::new(2.0, 0.25, "E387"));
        let m = wing_metrics(&plane.wing).unwrap();
        assert_relative_eq!(m.mean_aero_chord_m, 0.25, epsilon = 1e-12);
        assert_relative_eq!(m.aspect_ratio, 16.0, epsilon = 1e-12);
        assert_relative_eq!(m.taper_ratio, 1.0);
    }

    #[test]
    fn single_section_surface_is_rejected() {
        let mut plane = Plane::new("stub");
        plane.wing.sections.push(crate::plane::WingSection::new(0.0, 0.2, "E387"));
        assert!(wing_metrics(&plane.wing).is_err());
    }

    #[test]
    fn unordered_sections_are_rejected() {
        let mut plane = Plane::new("bad");
        plane.wing.sections.push(crate::plane::WingSection::new(1.0, 0.2, "E387"));
        plane.wing.sections.push(crate::plane::WingSection::new(0.5, 0.1, "E387"));
        assert!(wing_metrics(&plane.wing).is_err());
    }
}
