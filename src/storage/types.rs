use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a message within a conversation transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instruction message seeding the conversation
    System,
    /// A prompt typed by the user
    User,
    /// A completion produced by the backend
    Assistant,
}

impl Role {
    /// Stable lowercase form used in storage and on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parse the stored lowercase form back into a role
    pub fn parse_str(s: &str) -> Result<Self, String> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(format!("Unknown message role: {}", other)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier, assigned by the store on creation
    pub id: i64,
    /// User-facing title; empty until the first user prompt sets it
    pub title: String,
    /// Model that serves this session, fixed at creation
    pub model: String,
    /// Provider that serves this session, fixed at creation
    pub provider: String,
    /// Last time a message was appended to the session
    pub updated: DateTime<Utc>,
}

/// One stored message row belonging to a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Row id, assigned by the store; breaks ties between equal timestamps
    pub id: i64,
    /// Owning session id
    pub sid: i64,
    /// Who produced the message
    pub role: Role,
    /// Message text
    pub content: String,
    /// Assigned at write time; non-decreasing within a session
    pub timestamp: DateTime<Utc>,
}
