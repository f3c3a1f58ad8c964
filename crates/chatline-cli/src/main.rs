use std::path::PathBuf;

use anyhow::{Context, Result};
use chatline_cli::cli::{replay, CliConfig, Fixture};
use chatline_core::tracing_setup::init_tracing;
use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "chatline")]
#[command(about = "Replay recorded chat pushes through the conversation registry")]
struct Cli {
    /// Pretty-print JSON output
    #[arg(long, short, global = true)]
    pretty: bool,

    /// Path to JSON config file (retry, logFilter, pretty)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a fixture and print every client event as a JSON line
    Replay {
        /// Fixture file (conversations, session, pushes)
        fixture: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match cli.config {
        Some(ref path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    init_tracing(config.core.log_filter.as_deref());
    let pretty = cli.pretty || config.pretty;

    match cli.command {
        Commands::Replay { fixture } => {
            let fixture = Fixture::load(&fixture)?;
            let report = replay(fixture, config.core).await;
            for event in &report.events {
                print_json(event, pretty)?;
            }
            print_json(
                &serde_json::json!({
                    "summary": {
                        "size": report.conversations.len(),
                        "conversations": report.conversations,
                    }
                }),
                pretty,
            )?;
        }
    }
    Ok(())
}

fn print_json(value: &Value, pretty: bool) -> Result<()> {
    let line = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("Failed to serialize output")?;
    println!("{}", line);
    Ok(())
}
