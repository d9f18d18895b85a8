//! CLI argument parsing for the generation pipeline.
//!
//! The CLI is intentionally thin: it resolves configuration and hands off to
//! the pipeline, so the same core logic can sit behind other transports.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint for the proposal pipeline.
#[derive(Parser, Debug)]
#[command(
    name = "evia",
    version,
    about = "Staged R&D proposal generator",
    after_help = "Examples:\n  evia run --intake intake.json\n  evia run --intake intake.json --evidence brief.pdf --evidence notes.txt\n  evia gate --intake intake.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level pipeline commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Run(RunArgs),
    Gate(GateArgs),
}

/// Run command inputs for one full pipeline execution.
#[derive(Parser, Debug)]
#[command(about = "Execute the full stage pipeline and package the run")]
pub struct RunArgs {
    /// Intake record as a JSON object
    #[arg(long, value_name = "FILE")]
    pub intake: PathBuf,

    /// Evidence file recorded as a {type: "file", value: <path>} item; repeatable
    #[arg(long, value_name = "FILE")]
    pub evidence: Vec<PathBuf>,

    /// Root directory that owns per-run output directories
    #[arg(long, value_name = "DIR", default_value = "runs")]
    pub runs_root: PathBuf,

    /// Directory holding the per-stage instruction files
    #[arg(long, value_name = "DIR", default_value = "prompts")]
    pub prompts: PathBuf,

    /// Call the live generation backend instead of synthesizing placeholders
    #[arg(long)]
    pub live: bool,

    /// Model name forwarded to the live backend
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,
}

/// Gate command inputs for a readiness check without generation.
#[derive(Parser, Debug)]
#[command(about = "Report intake readiness and clarification questions")]
pub struct GateArgs {
    /// Intake record as a JSON object
    #[arg(long, value_name = "FILE")]
    pub intake: PathBuf,
}
