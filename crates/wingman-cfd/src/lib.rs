//! Wingman CFD: aircraft model + environment adapter
//!
//! This crate owns the aircraft side of the system:
//! - a serializable aircraft data model (`Plane`, `Surface`, `WingSection`),
//! - derived wing metrics (span, area, aspect ratio, MAC),
//! - fixed-speed polar analysis types (`PolarSpec`, `PolarResult`),
//! - the `CfdEnvironment` trait plus the session-owned `PlaneHandle` that
//!   every tool handler goes through.
//!
//! Two backends implement `CfdEnvironment`:
//! - `VortexLatticeEnv`: a deterministic in-process finite-wing estimator
//!   (the default, and the test backend), and
//! - `XflrRpcEnv` (feature `xflr-rpc`): a JSON client for an XFLR-style
//!   analysis server running in server mode.
//!
//! CFD objects never cross the crate boundary directly: callers get cloned,
//! serializable snapshots, and all mutation funnels through `PlaneHandle`.

pub mod environment;
pub mod metrics;
pub mod plane;
pub mod polar;
pub mod vlm;
#[cfg(feature = "xflr-rpc")]
pub mod xflr;

pub use environment::{CfdEnvironment, EnvironmentError, PlaneHandle};
pub use metrics::{wing_metrics, WingMetrics};
pub use plane::{FoilSide, Plane, PlaneError, PointMass, SectionAttr, Surface, SurfaceKind, WingSection};
pub use polar::{PolarPoint, PolarResult, PolarSpec, PolarSpecError};
pub use vlm::VortexLatticeEnv;
#[cfg(feature = "xflr-rpc")]
pub use xflr::XflrRpcEnv;
