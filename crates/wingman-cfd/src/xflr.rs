//! Remote analysis backend over HTTP.
//!
//! Talks to an XFLR-style analysis server that holds the authoritative
//! plane state. Each operation is a small JSON POST; `/health` answers the
//! liveness probe. Enabled by the `xflr-rpc` feature.

use std::time::Duration;

use serde_json::{json, Value};

use crate::environment::{CfdEnvironment, EnvironmentError};
use crate::plane::{FoilSide, Plane, PointMass, SectionAttr, SurfaceKind};
use crate::polar::{PolarResult, PolarSpec};

const DEFAULT_TIMEOUT_SECS: u64 = 600;

pub struct XflrRpcEnv {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl XflrRpcEnv {
    /// Connects to a server at `base_url` (for example `http://127.0.0.1:8080`)
    /// and registers the given plane as the session aircraft.
    pub fn connect(base_url: &str, plane: &Plane) -> Result<Self, EnvironmentError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| EnvironmentError::new("connect", e.to_string()))?;
        let env = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        };
        env.post("connect", "/plane", json!({ "plane": plane }))?;
        Ok(env)
    }

    fn post(
        &self,
        operation: &'static str,
        path: &str,
        body: Value,
    ) -> Result<Value, EnvironmentError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| EnvironmentError::new(operation, e.to_string()))?;
        let status = resp.status();
        let payload: Value = resp
            .json()
            .map_err(|e| EnvironmentError::new(operation, e.to_string()))?;
        if !status.is_success() {
            let detail = payload
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("server returned {status}"));
            return Err(EnvironmentError::new(operation, detail));
        }
        Ok(payload)
    }
}

impl CfdEnvironment for XflrRpcEnv {
    fn ping(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        self.client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn plane(&self) -> Result<Plane, EnvironmentError> {
        let payload = self.post("plane", "/plane/get", json!({}))?;
        serde_json::from_value(payload)
            .map_err(|e| EnvironmentError::new("plane", e.to_string()))
    }

    fn section_attr(
        &self,
        surface: SurfaceKind,
        section: usize,
        attr: SectionAttr,
    ) -> Result<f64, EnvironmentError> {
        let payload = self.post(
            "section_attr",
            "/plane/attr/get",
            json!({
                "surface": surface.as_str(),
                "section": section,
                "attribute": attr.as_str(),
            }),
        )?;
        payload
            .get("value")
            .and_then(Value::as_f64)
            .ok_or_else(|| EnvironmentError::new("section_attr", "missing numeric value"))
    }

    fn set_section_attr(
        &mut self,
        surface: SurfaceKind,
        section: usize,
        attr: SectionAttr,
        value: f64,
    ) -> Result<(), EnvironmentError> {
        self.post(
            "set_section_attr",
            "/plane/attr/set",
            json!({
                "surface": surface.as_str(),
                "section": section,
                "attribute": attr.as_str(),
                "value": value,
            }),
        )
        .map(|_| ())
    }

    fn set_foil(
        &mut self,
        surface: SurfaceKind,
        section: usize,
        side: FoilSide,
        foil: &str,
    ) -> Result<(), EnvironmentError> {
        let side = match side {
            FoilSide::Left => "left",
            FoilSide::Right => "right",
            FoilSide::Both => "both",
        };
        self.post(
            "set_foil",
            "/plane/foil/set",
            json!({
                "surface": surface.as_str(),
                "section": section,
                "side": side,
                "foil": foil,
            }),
        )
        .map(|_| ())
    }

    fn add_point_mass(&mut self, mass: PointMass) -> Result<(), EnvironmentError> {
        self.post("add_point_mass", "/plane/mass", json!({ "mass": mass }))
            .map(|_| ())
    }

    fn run_polar(&mut self, spec: &PolarSpec) -> Result<PolarResult, EnvironmentError> {
        spec.validate()
            .map_err(|e| EnvironmentError::new("run_polar", e.to_string()))?;
        let payload = self.post("run_polar", "/analysis/polar", json!({ "spec": spec }))?;
        serde_json::from_value(payload)
            .map_err(|e| EnvironmentError::new("run_polar", e.to_string()))
    }
}
