//! Confab - interactive terminal chat client library
//!
//! This library provides the core functionality for the Confab chat client:
//! session and history management backed by SQLite, and a streaming chat
//! engine over an OpenAI-compatible completion API.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `storage`: durable session and message persistence
//! - `session`: session identity, titling, and selection
//! - `history`: transcript reads and appends
//! - `engine`: one streaming chat turn end-to-end
//! - `providers`: completion backend abstraction and implementations
//! - `commands`: the interactive loop and history listing
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `cli`: command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use confab::config::Config;
//! use confab::storage::SqliteStore;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml")?;
//!     config.validate()?;
//!
//!     let store = SqliteStore::open()?;
//!     // Component usage would go here
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod providers;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use engine::ChatEngine;
pub use error::{ConfabError, Result};
pub use history::HistoryAccessor;
pub use session::SessionManager;
pub use storage::SqliteStore;
