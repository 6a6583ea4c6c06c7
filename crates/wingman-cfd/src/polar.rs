//! Fixed-speed polar analysis types.
//!
//! A polar is a sweep over angle of attack at constant free-stream speed,
//! reporting the classic sailplane set: CL, CD, CL/CD, CL^1.5/CD and Cm.

use serde::{Deserialize, Serialize};

/// Hard cap on sweep length so a careless request cannot produce an
/// unbounded result payload.
pub const MAX_POLAR_POINTS: usize = 2_000;

#[derive(Debug, thiserror::Error)]
pub enum PolarSpecError {
    #[error("free-stream speed must be positive, got {0} m/s")]
    NonPositiveSpeed(f64),
    #[error("alpha step must be positive, got {0} deg")]
    NonPositiveStep(f64),
    #[error("alpha range is inverted: start {start} deg > end {end} deg")]
    InvertedRange { start: f64, end: f64 },
    #[error("sweep would produce {n} points (max {max})")]
    TooManyPoints { n: usize, max: usize },
}

/// Specification of a fixed-speed polar sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolarSpec {
    pub free_stream_speed_ms: f64,
    pub start_alpha_deg: f64,
    pub end_alpha_deg: f64,
    pub delta_alpha_deg: f64,
}

impl Default for PolarSpec {
    fn default() -> Self {
        Self {
            free_stream_speed_ms: 10.0,
            start_alpha_deg: -10.0,
            end_alpha_deg: 20.0,
            delta_alpha_deg: 0.5,
        }
    }
}

impl PolarSpec {
    pub fn validate(&self) -> Result<(), PolarSpecError> {
        if !(self.free_stream_speed_ms > 0.0) {
            return Err(PolarSpecError::NonPositiveSpeed(self.free_stream_speed_ms));
        }
        if !(self.delta_alpha_deg > 0.0) {
            return Err(PolarSpecError::NonPositiveStep(self.delta_alpha_deg));
        }
        if self.start_alpha_deg > self.end_alpha_deg {
            return Err(PolarSpecError::InvertedRange {
                start: self.start_alpha_deg,
                end: self.end_alpha_deg,
            });
        }
        let n = ((self.end_alpha_deg - self.start_alpha_deg) / self.delta_alpha_deg) as usize + 1;
        if n > MAX_POLAR_POINTS {
            return Err(PolarSpecError::TooManyPoints {
                n,
                max: MAX_POLAR_POINTS,
            });
        }
        Ok(())
    }

    /// The alpha stations of the sweep, inclusive of both ends.
    pub fn alphas(&self) -> Vec<f64> {
        let mut out = Vec::new();
        let mut alpha = self.start_alpha_deg;
        // Half-step tolerance so floating accumulation does not drop the
        // final station.
        while alpha <= self.end_alpha_deg + 0.5 * self.delta_alpha_deg {
            out.push(alpha);
            alpha += self.delta_alpha_deg;
            if out.len() >= MAX_POLAR_POINTS {
                break;
            }
        }
        out
    }
}

/// One station of a polar sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolarPoint {
    pub alpha_deg: f64,
    pub cl: f64,
    pub cd: f64,
    pub cl_over_cd: f64,
    /// Endurance parameter CL^1.5/CD (only defined for positive lift).
    pub cl32_over_cd: f64,
    pub cm: f64,
}

impl PolarPoint {
    pub fn from_coefficients(alpha_deg: f64, cl: f64, cd: f64, cm: f64) -> Self {
        let cl_over_cd = if cd > 0.0 { cl / cd } else { 0.0 };
        let cl32_over_cd = if cd > 0.0 && cl > 0.0 {
            cl.powf(1.5) / cd
        } else {
            0.0
        };
        Self {
            alpha_deg,
            cl,
            cd,
            cl_over_cd,
            cl32_over_cd,
            cm,
        }
    }
}

/// A completed polar sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolarResult {
    pub spec: PolarSpec,
    pub points: Vec<PolarPoint>,
}

impl PolarResult {
    /// Station with the best glide ratio, if any station produced lift.
    pub fn best_l_over_d(&self) -> Option<&PolarPoint> {
        self.points
            .iter()
            .filter(|p| p.cl_over_cd.is_finite())
            .max_by(|a, b| {
                a.cl_over_cd
                    .partial_cmp(&b.cl_over_cd)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Linearly interpolated zero-lift angle, if the sweep crosses CL = 0.
    pub fn zero_lift_alpha_deg(&self) -> Option<f64> {
        for pair in self.points.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.cl == 0.0 {
                return Some(a.alpha_deg);
            }
            if a.cl < 0.0 && b.cl >= 0.0 {
                let t = -a.cl / (b.cl - a.cl);
                return Some(a.alpha_deg + t * (b.alpha_deg - a.alpha_deg));
            }
        }
        None
    }
}
