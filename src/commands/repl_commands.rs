//! Reserved command parser for the interactive loop
//!
//! Lines starting with `:` are reserved commands; everything else is sent to
//! the model as a chat turn. The command set is a fixed registration table
//! built at compile time, so help text and the parser can never drift apart.

use thiserror::Error;

/// One entry in the command registration table
pub struct CommandEntry {
    /// Reserved token, including the leading `:`
    pub token: &'static str,
    /// Usage string shown in help output
    pub usage: &'static str,
    /// One-line description shown in help output
    pub description: &'static str,
}

/// The full command surface, in help-display order
pub const COMMANDS: &[CommandEntry] = &[
    CommandEntry {
        token: ":ss",
        usage: ":ss",
        description: "list all chat sessions",
    },
    CommandEntry {
        token: ":cs",
        usage: ":cs <id>",
        description: "continue a saved session",
    },
    CommandEntry {
        token: ":sh",
        usage: ":sh",
        description: "show the history of the current session",
    },
    CommandEntry {
        token: ":sm",
        usage: ":sm <content>",
        description: "start a new session with a system message",
    },
    CommandEntry {
        token: ":help",
        usage: ":help",
        description: "show this help",
    },
    CommandEntry {
        token: ":quit",
        usage: ":quit",
        description: "exit the REPL",
    },
];

/// Errors that can occur when parsing reserved commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType ':help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument {
        command: &'static str,
        usage: &'static str,
    },

    /// Command was given an argument it cannot use
    #[error("Invalid argument for {command}: {arg}\n\nUsage: {usage}")]
    InvalidArgument {
        command: &'static str,
        arg: String,
        usage: &'static str,
    },
}

/// A parsed line of REPL input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// List stored sessions
    ListSessions,
    /// Switch the current session to the given id
    ResumeSession(i64),
    /// Print the current session's transcript
    ShowHistory,
    /// Start a blank session seeded with this system message
    SetSystemMessage(String),
    /// Print the command table
    Help,
    /// Leave the REPL
    Quit,
    /// Not a reserved command; send the line as a chat turn
    Chat,
}

/// Parse a line of user input into a [`ReplCommand`]
///
/// # Examples
///
/// ```
/// use confab::commands::repl_commands::{parse_command, ReplCommand};
///
/// assert_eq!(parse_command(":ss").unwrap(), ReplCommand::ListSessions);
/// assert_eq!(parse_command(":cs 3").unwrap(), ReplCommand::ResumeSession(3));
/// assert_eq!(parse_command("tell me a joke").unwrap(), ReplCommand::Chat);
/// assert!(parse_command(":cs three").is_err());
/// ```
pub fn parse_command(input: &str) -> Result<ReplCommand, CommandError> {
    let trimmed = input.trim();
    if !trimmed.starts_with(':') {
        return Ok(ReplCommand::Chat);
    }

    let (token, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest.trim()),
        None => (trimmed, ""),
    };

    match token {
        ":ss" => Ok(ReplCommand::ListSessions),
        ":sh" => Ok(ReplCommand::ShowHistory),
        ":help" => Ok(ReplCommand::Help),
        ":quit" => Ok(ReplCommand::Quit),
        ":cs" => {
            if arg.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: ":cs",
                    usage: ":cs <id>",
                });
            }
            arg.parse::<i64>()
                .map(ReplCommand::ResumeSession)
                .map_err(|_| CommandError::InvalidArgument {
                    command: ":cs",
                    arg: arg.to_string(),
                    usage: ":cs <id>",
                })
        }
        ":sm" => {
            if arg.is_empty() {
                return Err(CommandError::MissingArgument {
                    command: ":sm",
                    usage: ":sm <content>",
                });
            }
            Ok(ReplCommand::SetSystemMessage(arg.to_string()))
        }
        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

/// Print the command table
pub fn print_help() {
    println!("\nAvailable commands:");
    for entry in COMMANDS {
        println!("  {:<16} {}", entry.usage, entry.description);
    }
    println!("\nAnything else is sent to the model as a chat message.\n");
}
