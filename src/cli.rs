//! Command-line interface definition for Confab
//!
//! This module defines the CLI structure using clap's derive API. With no
//! subcommand the binary drops straight into the interactive chat loop.

use clap::{Parser, Subcommand};

/// Confab - interactive terminal chat client
///
/// Streams completions from an OpenAI-compatible backend and keeps every
/// conversation in a local history database for later resumption.
#[derive(Parser, Debug, Clone)]
#[command(name = "confab")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: String,

    /// Override the history database path
    #[arg(long)]
    pub db: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute; defaults to the interactive chat loop
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands for Confab
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the interactive chat loop (the default)
    Repl,

    /// Inspect stored conversation history
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

/// History subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List stored sessions, oldest activity first
    List,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
