//! Error types for Confab
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Confab operations
///
/// This enum encompasses all possible errors that can occur while opening
/// the history store, managing sessions, talking to the completion backend,
/// and parsing user input.
#[derive(Error, Debug)]
pub enum ConfabError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// History store cannot be opened, initialized, or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// A referenced session id does not exist in the store
    #[error("Unknown session id: {0}")]
    SessionNotFound(i64),

    /// Completion backend failure (request, mid-stream error, or interrupt)
    #[error("Provider error: {0}")]
    Provider(String),

    /// A command argument failed to parse
    #[error("Invalid input: {0}")]
    MalformedInput(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Underlying SQLite errors
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type alias for Confab operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = ConfabError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_storage_error_display() {
        let error = ConfabError::Storage("database unreachable".to_string());
        assert_eq!(error.to_string(), "Storage error: database unreachable");
    }

    #[test]
    fn test_session_not_found_display() {
        let error = ConfabError::SessionNotFound(42);
        assert_eq!(error.to_string(), "Unknown session id: 42");
    }

    #[test]
    fn test_provider_error_display() {
        let error = ConfabError::Provider("API timeout".to_string());
        assert_eq!(error.to_string(), "Provider error: API timeout");
    }

    #[test]
    fn test_malformed_input_display() {
        let error = ConfabError::MalformedInput("please specify a session id".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid input: please specify a session id"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: ConfabError = io_error.into();
        assert!(matches!(error, ConfabError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_str = "{invalid json}";
        let json_error = serde_json::from_str::<serde_json::Value>(json_str).unwrap_err();
        let error: ConfabError = json_error.into();
        assert!(matches!(error, ConfabError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_str = "invalid: : yaml";
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let error: ConfabError = yaml_error.into();
        assert!(matches!(error, ConfabError::Yaml(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConfabError>();
    }
}
