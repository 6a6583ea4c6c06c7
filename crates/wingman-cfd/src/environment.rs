//! The environment seam: `CfdEnvironment` + `PlaneHandle`.
//!
//! The environment owns the live aircraft object; everything the rest of
//! the system sees is a cloned snapshot or a typed result. `PlaneHandle`
//! is the single mutation path: it is exclusively owned by the running
//! session (deliberately not `Clone`) and consults `is_valid()` before
//! every operation so no call can succeed on a stale connection.

use crate::plane::{FoilSide, Plane, PointMass, SectionAttr, SurfaceKind};
use crate::polar::{PolarResult, PolarSpec};

/// A failure surfaced by the external environment (or the handle itself),
/// tagged with the operation that raised it.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{operation}: {detail}")]
pub struct EnvironmentError {
    pub operation: &'static str,
    pub detail: String,
}

impl EnvironmentError {
    pub fn new(operation: &'static str, detail: impl Into<String>) -> Self {
        Self {
            operation,
            detail: detail.into(),
        }
    }
}

/// Capability set the CFD environment exposes.
///
/// Implementations may block on real computation (a remote solver run);
/// from the dispatch loop's perspective every operation is synchronous.
pub trait CfdEnvironment: Send {
    /// Liveness check. A remote backend pings the server; the in-process
    /// backend is always live.
    fn ping(&self) -> bool;

    /// Cloned snapshot of the current aircraft.
    fn plane(&self) -> Result<Plane, EnvironmentError>;

    fn section_attr(
        &self,
        surface: SurfaceKind,
        section: usize,
        attr: SectionAttr,
    ) -> Result<f64, EnvironmentError>;

    fn set_section_attr(
        &mut self,
        surface: SurfaceKind,
        section: usize,
        attr: SectionAttr,
        value: f64,
    ) -> Result<(), EnvironmentError>;

    fn set_foil(
        &mut self,
        surface: SurfaceKind,
        section: usize,
        side: FoilSide,
        foil: &str,
    ) -> Result<(), EnvironmentError>;

    fn add_point_mass(&mut self, mass: PointMass) -> Result<(), EnvironmentError>;

    fn run_polar(&mut self, spec: &PolarSpec) -> Result<PolarResult, EnvironmentError>;
}

/// Session-owned handle to the live aircraft.
///
/// Not `Clone`: a session holds exactly one handle, which keeps mutation of
/// the external environment serialized by construction.
pub struct PlaneHandle {
    env: Box<dyn CfdEnvironment>,
    connected: bool,
}

impl PlaneHandle {
    pub fn new(env: Box<dyn CfdEnvironment>) -> Self {
        Self {
            env,
            connected: true,
        }
    }

    /// True while the handle is connected and the environment answers.
    pub fn is_valid(&self) -> bool {
        self.connected && self.env.ping()
    }

    /// Mark the handle dead (connection dropped, session ending). Every
    /// subsequent operation fails.
    pub fn invalidate(&mut self) {
        self.connected = false;
    }

    fn ensure_valid(&self) -> Result<(), EnvironmentError> {
        if !self.connected {
            return Err(EnvironmentError::new(
                "handle",
                "handle was invalidated; reconnect to the environment",
            ));
        }
        if !self.env.ping() {
            return Err(EnvironmentError::new(
                "handle",
                "environment is not responding",
            ));
        }
        Ok(())
    }

    pub fn plane(&self) -> Result<Plane, EnvironmentError> {
        self.ensure_valid()?;
        self.env.plane()
    }

    pub fn section_attr(
        &self,
        surface: SurfaceKind,
        section: usize,
        attr: SectionAttr,
    ) -> Result<f64, EnvironmentError> {
        self.ensure_valid()?;
        self.env.section_attr(surface, section, attr)
    }

    pub fn set_section_attr(
        &mut self,
        surface: SurfaceKind,
        section: usize,
        attr: SectionAttr,
        value: f64,
    ) -> Result<(), EnvironmentError> {
        self.ensure_valid()?;
        tracing::debug!(%surface, section, %attr, value, "set_section_attr");
        self.env.set_section_attr(surface, section, attr, value)
    }

    pub fn set_foil(
        &mut self,
        surface: SurfaceKind,
        section: usize,
        side: FoilSide,
        foil: &str,
    ) -> Result<(), EnvironmentError> {
        self.ensure_valid()?;
        self.env.set_foil(surface, section, side, foil)
    }

    pub fn add_point_mass(&mut self, mass: PointMass) -> Result<(), EnvironmentError> {
        self.ensure_valid()?;
        self.env.add_point_mass(mass)
    }

    pub fn run_polar(&mut self, spec: &PolarSpec) -> Result<PolarResult, EnvironmentError> {
        self.ensure_valid()?;
        tracing::info!(
            speed = spec.free_stream_speed_ms,
            start = spec.start_alpha_deg,
            end = spec.end_alpha_deg,
            "run_polar"
        );
        self.env.run_polar(spec)
    }
}
