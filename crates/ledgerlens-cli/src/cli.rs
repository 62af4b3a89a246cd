//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// LedgerLens - Turn photographed financial documents into a ledger
#[derive(Parser)]
#[command(name = "ledgerlens")]
#[command(about = "Document ingestion and AI-assisted transaction extraction", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload documents and extract their transactions
    Ingest {
        /// Image or PDF files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Merge extracted transactions into the printed ledger
        #[arg(long)]
        merge: bool,

        /// Print the resulting documents as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ask the assistant a question
    Chat {
        /// The message to send
        message: String,

        /// Focus the conversation on this document file (ingested first)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Ingest documents and print insights over the merged ledger
    Insights {
        /// Image or PDF files to ingest first
        files: Vec<PathBuf>,
    },

    /// Show extraction service status
    Status,
}
