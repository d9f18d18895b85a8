use anyhow::Result;
use clap::Parser;

mod backend;
mod cli;
mod config;
mod decision;
mod fixation;
mod gate;
mod intake;
mod output;
mod pipeline;
mod prompts;
mod render;
mod stage;

fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "evia=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = cli::RootArgs::parse();
    match args.command {
        cli::Command::Run(args) => pipeline::run_run(&args),
        cli::Command::Gate(args) => pipeline::run_gate(&args),
    }
}

#[cfg(test)]
mod pipeline_tests;
