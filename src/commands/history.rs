use crate::cli::HistoryCommand;
use crate::error::Result;
use crate::storage::{Session, SqliteStore};
use colored::Colorize;
use prettytable::{format, Table};

/// Handle history commands
pub fn handle_history(store: &SqliteStore, command: HistoryCommand) -> Result<()> {
    match command {
        HistoryCommand::List => {
            let sessions = store.list_sessions()?;

            if sessions.is_empty() {
                println!("{}", "No conversation history found.".yellow());
                return Ok(());
            }

            print_session_table(&sessions);
            println!(
                "Use {} inside the REPL to resume a session.",
                ":cs <ID>".cyan()
            );
            println!();
        }
    }

    Ok(())
}

/// Render the stored-session table shared by `history list` and `:ss`
pub fn print_session_table(sessions: &[Session]) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Title".bold(),
        "Model".bold(),
        "Last Updated".bold()
    ]);

    for session in sessions {
        let title = if session.title.chars().count() > 40 {
            let prefix: String = session.title.chars().take(37).collect();
            format!("{}...", prefix)
        } else {
            session.title.clone()
        };
        let updated = session.updated.format("%Y-%m-%d %H:%M").to_string();

        table.add_row(prettytable::row![
            session.id.to_string().cyan(),
            title,
            session.model,
            updated
        ]);
    }

    println!("\nConversation History:");
    table.printstd();
    println!();
}
