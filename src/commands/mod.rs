/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes two top-level command modules:

- `repl`    -- the interactive chat loop
- `history` -- stored-session listing

These handlers are intentionally small and use the library components:
storage, session manager, history accessor, and the streaming chat engine.
*/

// Stored-session listing
pub mod history;

// Reserved command parser for the interactive loop
pub mod repl_commands;

// Interactive chat handler
pub mod repl {
    //! Interactive chat loop.
    //!
    //! Instantiates the provider and the core components, then runs a
    //! readline loop that dispatches reserved `:` commands and forwards
    //! everything else to the streaming chat engine. The loop holds the one
    //! piece of REPL state: the current session id.

    use super::history;
    use super::repl_commands::{parse_command, print_help, ReplCommand};
    use crate::config::Config;
    use crate::engine::ChatEngine;
    use crate::error::Result;
    use crate::history::HistoryAccessor;
    use crate::providers::create_provider;
    use crate::session::SessionManager;
    use crate::storage::SqliteStore;
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use std::sync::Arc;

    /// Start the interactive chat loop
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `store` - Opened history store shared by all components
    ///
    /// No error from a single turn ends the loop; everything is reported on
    /// one line and the prompt returns.
    pub async fn run_repl(config: Config, store: Arc<SqliteStore>) -> Result<()> {
        tracing::info!("Starting interactive chat");

        let provider = create_provider(&config.provider.provider_type, &config.provider)?;
        let model = provider.model();
        let backend = provider.name().to_string();

        let sessions = SessionManager::new(Arc::clone(&store), model.clone(), backend.clone());
        let history = HistoryAccessor::new(Arc::clone(&store));
        let engine = ChatEngine::new(
            SessionManager::new(Arc::clone(&store), model.clone(), backend),
            HistoryAccessor::new(Arc::clone(&store)),
            provider,
            &config.chat,
        );

        let mut rl = DefaultEditor::new()?;
        let mut current_sid: Option<i64> = None;

        print_welcome_banner(&model);

        loop {
            match rl.readline(">>> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(trimmed)?;

                    let command = match parse_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{}", format!("Error: {}", e).red());
                            continue;
                        }
                    };

                    match command {
                        ReplCommand::ListSessions => match sessions.list() {
                            Ok(list) if list.is_empty() => {
                                println!("{}", "No sessions saved yet.".yellow());
                            }
                            Ok(list) => history::print_session_table(&list),
                            Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
                        },
                        ReplCommand::ResumeSession(sid) => match sessions.select_session(sid) {
                            Ok(sid) => {
                                current_sid = Some(sid);
                                println!("Switched to session {}", sid);
                            }
                            // Previous selection stays in place.
                            Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
                        },
                        ReplCommand::ShowHistory => match current_sid {
                            None => println!("{}", "No session selected.".yellow()),
                            Some(sid) => match history.load(sid) {
                                Ok(messages) => {
                                    for message in messages {
                                        println!(
                                            "{} {}: {}",
                                            message
                                                .timestamp
                                                .format("%Y-%m-%d %H:%M:%S")
                                                .to_string()
                                                .dimmed(),
                                            message.role.to_string().cyan(),
                                            message.content
                                        );
                                    }
                                }
                                Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
                            },
                        },
                        ReplCommand::SetSystemMessage(content) => {
                            match sessions.new_blank_session(&content) {
                                Ok(sid) => {
                                    current_sid = Some(sid);
                                    println!("Started session {} with system message", sid);
                                }
                                Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
                            }
                        }
                        ReplCommand::Help => print_help(),
                        ReplCommand::Quit => break,
                        ReplCommand::Chat => {
                            let mut stdout = std::io::stdout();
                            match engine.run_turn(current_sid, trimmed, &mut stdout).await {
                                Ok(sid) => current_sid = Some(sid),
                                Err(e) => eprintln!("{}", format!("Error: {}", e).red()),
                            }
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Display the welcome banner at the start of the interactive loop
    fn print_welcome_banner(model: &str) {
        println!("\nconfab - chatting with {}", model.cyan());
        println!("Type ':help' for available commands, ':quit' to leave\n");
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use tempfile::tempdir;

        /// Unknown provider should fail during provider creation, before the
        /// readline loop starts.
        #[tokio::test]
        async fn test_run_repl_unknown_provider() {
            let dir = tempdir().unwrap();
            let store =
                Arc::new(SqliteStore::open_at(dir.path().join("history.db")).unwrap());

            let mut config = Config::default();
            config.provider.provider_type = "invalid_provider".to_string();

            let res = run_repl(config, store).await;
            assert!(res.is_err());
        }
    }
}
