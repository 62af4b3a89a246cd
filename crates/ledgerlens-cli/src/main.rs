//! LedgerLens CLI - Document ingestion and AI-assisted extraction
//!
//! Usage:
//!   ledgerlens ingest receipt.jpg --merge   Extract and merge into a ledger
//!   ledgerlens chat "what is this?" -f r.jpg  Ask about a document
//!   ledgerlens insights *.jpg               Observations over extracted data
//!   ledgerlens status                       Check the extraction service

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Ingest { files, merge, json } => commands::cmd_ingest(&files, merge, json).await,
        Commands::Chat { message, file } => commands::cmd_chat(&message, file.as_deref()).await,
        Commands::Insights { files } => commands::cmd_insights(&files).await,
        Commands::Status => commands::cmd_status().await,
    }
}
