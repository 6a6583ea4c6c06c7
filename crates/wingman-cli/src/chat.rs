//! Interactive chat session.
//!
//! By default we use `rustyline` for line editing and history. A minimal
//! stdin-based fallback exists behind `--no-default-features`.

use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use serde_json::json;
use wingman_agent::{
    DispatchLoop, JsonlSink, NullSink, ReportSink, RoundOutcome, ToolStatus,
};
use wingman_cfd::{Plane, PlaneHandle, VortexLatticeEnv};
use wingman_llm::{ModelClient, ModelReply, ScriptedModel, ToolCallV1, UnifiedClient};

use crate::settings;

#[derive(Args)]
pub struct ChatArgs {
    /// Name for the session aircraft
    #[arg(long, default_value = "trainer")]
    plane_name: String,

    /// Replay a canned tool-calling script instead of a real model
    #[arg(long)]
    mock: bool,

    /// Append tool activity to this JSONL file (or WINGMAN_REPORT_PATH)
    #[arg(long)]
    report: Option<String>,

    /// Use a remote XFLR-style analysis server at this base URL
    #[cfg(feature = "xflr-rpc")]
    #[arg(long)]
    xflr: Option<String>,
}

fn build_handle(args: &ChatArgs) -> Result<PlaneHandle> {
    let plane = Plane::default_trainer(&args.plane_name);

    #[cfg(feature = "xflr-rpc")]
    if let Some(url) = &args.xflr {
        let env = wingman_cfd::XflrRpcEnv::connect(url, &plane)
            .map_err(|e| anyhow!("failed to connect to analysis server: {e}"))?;
        return Ok(PlaneHandle::new(Box::new(env)));
    }

    Ok(PlaneHandle::new(Box::new(VortexLatticeEnv::new(plane))))
}

fn build_model(mock: bool) -> Result<Box<dyn ModelClient>> {
    if mock {
        return Ok(Box::new(demo_script()));
    }
    let client = UnifiedClient::from_env().map_err(|e| anyhow!("{e}"))?;
    Ok(Box::new(client))
}

/// A short scripted session: inspect the plane, then sweep a polar.
/// Useful for demos and for exercising the full loop offline.
fn demo_script() -> ScriptedModel {
    ScriptedModel::new([
        ModelReply::ToolCalls(vec![ToolCallV1 {
            id: None,
            name: "describe_plane".to_string(),
            args: json!({}),
        }]),
        ModelReply::Text(
            "You are flying a two-panel trainer with an E387 wing. Ask me to change the \
             geometry or run a polar."
                .to_string(),
        ),
        ModelReply::ToolCalls(vec![ToolCallV1 {
            id: None,
            name: "run_polar".to_string(),
            args: json!({}),
        }]),
        ModelReply::Text("Polar complete; the best-glide point is in the transcript.".to_string()),
    ])
}

fn build_sink(args: &ChatArgs) -> Result<Box<dyn ReportSink>> {
    match settings::report_path(args.report.as_deref()) {
        Some(path) => {
            let sink = JsonlSink::open(std::path::Path::new(&path))
                .map_err(|e| anyhow!("failed to open report file {path:?}: {e}"))?;
            Ok(Box::new(sink))
        }
        None => Ok(Box::new(NullSink)),
    }
}

pub async fn cmd_chat(args: ChatArgs) -> Result<()> {
    let handle = build_handle(&args)?;
    if !handle.is_valid() {
        return Err(anyhow!("analysis environment did not answer the liveness check"));
    }
    let model = build_model(args.mock)?;
    let sink = build_sink(&args)?;
    let registry = crate::builtin_registry()?;
    let config = settings::dispatch_config()?;

    let mut lp = DispatchLoop::new(registry, model, handle, sink, config).with_observer(
        Box::new(|call, result| {
            let marker = match result.status {
                ToolStatus::Success => "tool".green().bold(),
                ToolStatus::Failure => "tool".red().bold(),
            };
            eprintln!("  {marker} {} {}", call.name, call.args);
        }),
    );

    println!("{}", "Wingman".green().bold());
    println!("Talking to a live aircraft model. Type `exit` to quit.\n");

    chat_loop(&mut lp).await
}

async fn run_one_round(lp: &mut DispatchLoop, line: &str) -> Result<()> {
    match lp.run_round(line).await {
        Ok(RoundOutcome::Reply(text)) => {
            println!("{} {text}\n", "wingman:".cyan().bold());
        }
        Ok(RoundOutcome::ChainLimit { results, error }) => {
            eprintln!(
                "{} {error} ({} tool call(s) this round)",
                "warning:".yellow().bold(),
                results.len()
            );
        }
        Err(e) if e.is_fatal() => return Err(anyhow!("{e}")),
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
        }
    }
    Ok(())
}

#[cfg(feature = "repl-rustyline")]
async fn chat_loop(lp: &mut DispatchLoop) -> Result<()> {
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    let mut rl = DefaultEditor::new().map_err(|e| anyhow!("failed to init rustyline: {e}"))?;
    loop {
        let line = match rl.readline("you> ") {
            Ok(l) => l,
            Err(ReadlineError::Eof) => break,
            Err(ReadlineError::Interrupted) => continue,
            Err(e) => {
                lp.flush_sink();
                return Err(anyhow!("readline error: {e}"));
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }
        rl.add_history_entry(line)
            .map_err(|e| anyhow!("failed to record history: {e}"))?;
        if let Err(e) = run_one_round(lp, line).await {
            lp.flush_sink();
            return Err(e);
        }
    }
    lp.flush_sink();
    Ok(())
}

#[cfg(not(feature = "repl-rustyline"))]
async fn chat_loop(lp: &mut DispatchLoop) -> Result<()> {
    use std::io::{BufRead, Write};

    let stdin = std::io::stdin();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }
        if let Err(e) = run_one_round(lp, line).await {
            lp.flush_sink();
            return Err(e);
        }
    }
    lp.flush_sink();
    Ok(())
}
