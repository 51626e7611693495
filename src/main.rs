//! CLI entry point for the topicmap tool.

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

use topicmap_core::config::load_config;

mod cli;
mod commands;

use cli::{Cli, Command};
use commands::RunContext;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?cli, "CLI arguments parsed");

    let loaded = load_config(cli.config.as_deref())?;
    let ctx = RunContext::resolve(&loaded, cli.database.as_deref());
    info!(
        database = %ctx.database_path.display(),
        config_file = loaded.loaded_from_file,
        "topicmap starting"
    );

    match &cli.command {
        Command::Seed(args) => commands::run_seed_command(args, &ctx).await,
        Command::Import(args) => commands::run_import_command(args, &ctx).await,
        Command::Aggregate(args) => commands::run_aggregate_command(args, &ctx).await,
        Command::Map(args) => commands::run_map_command(args, &ctx).await,
        Command::Verify(args) => commands::run_verify_command(args, &ctx).await,
    }
}
