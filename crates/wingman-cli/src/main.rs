//! Wingman CLI
//!
//! Command-line interface for the conversational aircraft assistant:
//! - `chat`: interactive session driving the aircraft tools through a model
//! - `tools list` / `tools schema`: inspect the tool vocabulary
//! - `polar`: one-shot sweep against the in-process estimator, no model

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use wingman_agent::{register_builtin_tools, ToolRegistry};
use wingman_cfd::{Plane, PolarSpec, VortexLatticeEnv};

mod chat;
mod settings;

#[derive(Parser)]
#[command(name = "wingman")]
#[command(author, version, about = "Wingman: conversational aircraft design assistant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat session against the live aircraft
    Chat(chat::ChatArgs),
    /// Inspect the tool vocabulary
    Tools {
        #[command(subcommand)]
        command: ToolsCommands,
    },
    /// Run a polar sweep directly, without a model
    Polar(PolarArgs),
}

#[derive(Subcommand)]
enum ToolsCommands {
    /// List tool names and descriptions
    List,
    /// Dump the compiled function-calling schema as JSON
    Schema,
}

#[derive(Args)]
struct PolarArgs {
    /// Free-stream speed in m/s
    #[arg(long, default_value_t = 10.0)]
    speed: f64,
    /// First angle of attack in degrees
    #[arg(long, default_value_t = -10.0)]
    start: f64,
    /// Last angle of attack in degrees
    #[arg(long, default_value_t = 20.0)]
    end: f64,
    /// Step between angles in degrees
    #[arg(long, default_value_t = 0.5)]
    step: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Chat(args) => chat::cmd_chat(args).await,
        Commands::Tools { command } => cmd_tools(command),
        Commands::Polar(args) => cmd_polar(&args),
    }
}

fn builtin_registry() -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry).map_err(|e| anyhow!("tool registration failed: {e}"))?;
    Ok(registry)
}

fn cmd_tools(command: ToolsCommands) -> Result<()> {
    let registry = builtin_registry()?;
    match command {
        ToolsCommands::List => {
            for spec in registry.specs() {
                println!("{}  {}", spec.name.green().bold(), spec.description);
            }
        }
        ToolsCommands::Schema => {
            let doc = wingman_agent::schema::compile(&registry);
            println!(
                "{}",
                serde_json::to_string_pretty(&doc).context("serializing schema")?
            );
        }
    }
    Ok(())
}

fn cmd_polar(args: &PolarArgs) -> Result<()> {
    use wingman_cfd::CfdEnvironment;

    let spec = PolarSpec {
        free_stream_speed_ms: args.speed,
        start_alpha_deg: args.start,
        end_alpha_deg: args.end,
        delta_alpha_deg: args.step,
    };
    let mut env = VortexLatticeEnv::new(Plane::default_trainer("trainer"));
    let result = env
        .run_polar(&spec)
        .map_err(|e| anyhow!("polar failed: {e}"))?;

    println!(
        "{}",
        format!(
            "{:>8} {:>8} {:>8} {:>8} {:>8}",
            "alpha", "CL", "CD", "CL/CD", "CM"
        )
        .bold()
    );
    for p in &result.points {
        println!(
            "{:>8.2} {:>8.4} {:>8.4} {:>8.2} {:>8.4}",
            p.alpha_deg, p.cl, p.cd, p.cl_over_cd, p.cm
        );
    }
    if let Some(best) = result.best_l_over_d() {
        println!(
            "\n{} alpha {:.1} deg, CL/CD {:.1}",
            "best glide:".green().bold(),
            best.alpha_deg,
            best.cl_over_cd
        );
    }
    if let Some(a0) = result.zero_lift_alpha_deg() {
        println!("{} {:.2} deg", "zero lift:".green().bold(), a0);
    }
    Ok(())
}
