mod cli;
mod commands;
mod config;
mod output;

use std::io::IsTerminal;
use std::process;

use anyhow::Result;
use clap::Parser;
#[cfg(feature = "colored-output")]
use colored::*;
use tracing::error;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::{
    cli::{Args, Commands},
    commands::CommandExecutor,
    config::AppConfig,
    output::OutputManager,
};

/// Log filter used when neither a flag nor `RUST_LOG` says otherwise.
const DEFAULT_LOG_FILTER: &str = "stream_failover=info,match_catalog=info,mwatch=info";

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let json = args.json;

    if let Err(e) = run(args).await {
        if json {
            let error_json = serde_json::json!({
                "status": "error",
                "message": format!("{e:#}"),
            });
            println!("{error_json}");
        } else {
            error!("Application error: {:#}", e);
            #[cfg(feature = "colored-output")]
            {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            }
            #[cfg(not(feature = "colored-output"))]
            {
                eprintln!("Error: {:#}", e);
            }
        }
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    init_logging(args.verbose, args.quiet);

    let config = AppConfig::load(args.config.as_deref())?;
    let output = OutputManager::new(args.json, std::io::stdout().is_terminal());
    let executor = CommandExecutor::new(config, output)?;

    match args.command {
        Commands::Sports => executor.sports().await,
        Commands::Matches { sport, live } => executor.matches(sport.as_deref(), live).await,
        Commands::Streams { source, id } => executor.streams(&source, &id).await,
        Commands::Watch {
            match_ids,
            duration,
        } => executor.watch(&match_ids, duration).await,
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(verbose)
                .with_writer(std::io::stderr),
        )
        .init();
}
