//! Environment-variable settings for the CLI.
//!
//! Explicit flags always win; env vars fill in when a flag is absent;
//! compiled defaults come last.

use std::time::Duration;

use anyhow::{anyhow, Result};
use wingman_agent::DispatchConfig;

const WINGMAN_LLM_TIMEOUT_SECS_ENV: &str = "WINGMAN_LLM_TIMEOUT_SECS";
const WINGMAN_MAX_TOOL_CALLS_ENV: &str = "WINGMAN_MAX_TOOL_CALLS";
const WINGMAN_REPORT_PATH_ENV: &str = "WINGMAN_REPORT_PATH";

const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;
/// Stand-in for "no timeout"; a model request should never take a day.
const DISABLED_TIMEOUT_SECS: u64 = 86_400;

fn env_u64(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(v) => {
            let v = v.trim();
            if v.is_empty() {
                return Ok(default);
            }
            v.parse::<u64>()
                .map_err(|_| anyhow!("invalid {name}={v:?} (expected integer)"))
        }
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(anyhow!("failed to read {name}: {e}")),
    }
}

/// Model-request timeout. `WINGMAN_LLM_TIMEOUT_SECS=0` disables it.
pub fn model_timeout() -> Result<Duration> {
    let secs = env_u64(WINGMAN_LLM_TIMEOUT_SECS_ENV, DEFAULT_LLM_TIMEOUT_SECS)?;
    Ok(Duration::from_secs(if secs == 0 {
        DISABLED_TIMEOUT_SECS
    } else {
        secs
    }))
}

/// Tool executions allowed per round, clamped to a sane range.
pub fn max_tool_calls() -> Result<usize> {
    let n = env_u64(
        WINGMAN_MAX_TOOL_CALLS_ENV,
        DispatchConfig::default().max_tool_calls as u64,
    )?;
    Ok((n as usize).clamp(1, 64))
}

/// Report sink path, if one is configured by flag or env.
pub fn report_path(flag: Option<&str>) -> Option<String> {
    if let Some(path) = flag {
        return Some(path.to_string());
    }
    std::env::var(WINGMAN_REPORT_PATH_ENV).ok().filter(|p| !p.trim().is_empty())
}

pub fn dispatch_config() -> Result<DispatchConfig> {
    Ok(DispatchConfig {
        model_timeout: model_timeout()?,
        max_tool_calls: max_tool_calls()?,
    })
}
