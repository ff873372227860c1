//! Confab - interactive terminal chat client
//!
//! Main entry point: wires tracing, configuration, the history store, and
//! command dispatch together.

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use confab::cli::{Cli, Commands};
use confab::commands;
use confab::config::Config;
use confab::storage::SqliteStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);

    // If the user supplied a storage path on the CLI, mirror it into
    // CONFAB_HISTORY_DB so the store initializer can pick it up.
    if let Some(db_path) = &cli.db {
        std::env::set_var("CONFAB_HISTORY_DB", db_path);
        tracing::info!("Using history DB override from CLI: {}", db_path);
    }

    // Load and validate configuration
    let config = Config::load(&cli.config)?;
    config.validate()?;

    // Storage initialization is the only fatal failure; every later error is
    // handled at the turn boundary.
    let store = Arc::new(SqliteStore::open()?);

    match cli.command {
        None | Some(Commands::Repl) => {
            commands::repl::run_repl(config, store).await?;
        }
        Some(Commands::History { command }) => {
            commands::history::handle_history(&store, command)?;
        }
    }

    Ok(())
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "confab=debug" } else { "confab=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
