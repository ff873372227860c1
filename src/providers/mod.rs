//! Completion backend abstraction
//!
//! This module defines the `ChatProvider` trait the streaming chat engine
//! talks to, the wire-facing message type, and the provider factory.

use crate::config::ProviderConfig;
use crate::error::{ConfabError, Result};
use crate::storage::MessageRecord;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

mod openai;
pub use openai::OpenAiProvider;

/// A role/content pair as sent to the completion API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use confab::providers::ChatMessage;
    ///
    /// let msg = ChatMessage::user("Hello, assistant!");
    /// assert_eq!(msg.role, "user");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new system message
    ///
    /// # Examples
    ///
    /// ```
    /// use confab::providers::ChatMessage;
    ///
    /// let msg = ChatMessage::system("You are a helpful assistant.");
    /// assert_eq!(msg.role, "system");
    /// ```
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

impl From<&MessageRecord> for ChatMessage {
    fn from(record: &MessageRecord) -> Self {
        Self {
            role: record.role.as_str().to_string(),
            content: record.content.clone(),
        }
    }
}

/// Incremental text deltas from a streaming completion
///
/// Each item is one chunk of assistant text, or the error that ended the
/// stream early. The stream terminates when the backend signals end of
/// stream; no explicit final-chunk marker is surfaced.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Provider trait for streaming chat backends
///
/// # Examples
///
/// ```no_run
/// use confab::providers::{ChatMessage, ChatProvider, ChunkStream};
/// use confab::error::Result;
/// use async_trait::async_trait;
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl ChatProvider for MyProvider {
///     fn name(&self) -> &str {
///         "example"
///     }
///
///     fn model(&self) -> String {
///         "example-model".to_string()
///     }
///
///     async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<ChunkStream> {
///         Ok(Box::pin(futures::stream::empty::<Result<String>>()))
///     }
/// }
/// ```
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider identifier recorded on sessions (e.g. "openai")
    fn name(&self) -> &str;

    /// Name of the model completions are requested from
    fn model(&self) -> String;

    /// Request a streaming completion for the given ordered context
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be issued or the backend
    /// rejects it; mid-stream failures surface as `Err` items on the
    /// returned stream.
    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<ChunkStream>;
}

/// Create a provider from its configured type name
///
/// # Errors
///
/// Returns a configuration error for unknown provider types.
pub fn create_provider(provider_type: &str, config: &ProviderConfig) -> Result<Box<dyn ChatProvider>> {
    match provider_type {
        "openai" => Ok(Box::new(OpenAiProvider::new(config.openai.clone())?)),
        other => Err(ConfabError::Config(format!("Unknown provider: {}", other)).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_user() {
        let msg = ChatMessage::user("Hello");
        assert_eq!(msg.role, "user");
        assert_eq!(msg.content, "Hello");
    }

    #[test]
    fn test_chat_message_assistant() {
        let msg = ChatMessage::assistant("Hi there");
        assert_eq!(msg.role, "assistant");
        assert_eq!(msg.content, "Hi there");
    }

    #[test]
    fn test_chat_message_system() {
        let msg = ChatMessage::system("Be helpful");
        assert_eq!(msg.role, "system");
        assert_eq!(msg.content, "Be helpful");
    }

    #[test]
    fn test_chat_message_serialization() {
        let msg = ChatMessage::user("Test");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("\"content\":\"Test\""));
    }

    #[test]
    fn test_chat_message_from_record() {
        use crate::storage::{MessageRecord, Role};
        use chrono::Utc;

        let record = MessageRecord {
            id: 1,
            sid: 1,
            role: Role::Assistant,
            content: "stored".to_string(),
            timestamp: Utc::now(),
        };
        let msg = ChatMessage::from(&record);
        assert_eq!(msg.role, "assistant");
        assert_eq!(msg.content, "stored");
    }

    #[test]
    fn test_create_provider_unknown_type() {
        let config = ProviderConfig::default();
        let result = create_provider("carrier-pigeon", &config);
        assert!(result.is_err());
    }

    #[test]
    fn test_create_provider_openai() {
        let config = ProviderConfig::default();
        let result = create_provider("openai", &config);
        assert!(result.is_ok());
    }
}
