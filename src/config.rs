//! Configuration management for Confab
//!
//! This module handles loading, parsing, and validating configuration from
//! a YAML file with environment-variable overrides.

use crate::error::{ConfabError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Confab
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Completion backend configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Chat behavior configuration
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Provider configuration
///
/// Specifies which completion backend to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,

    /// OpenAI-compatible backend configuration
    #[serde(default)]
    pub openai: OpenAiConfig,
}

fn default_provider_type() -> String {
    "openai".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            openai: OpenAiConfig::default(),
        }
    }
}

/// OpenAI-compatible backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Base URL for the chat-completions API
    ///
    /// Pointing this at a local gateway or mock server is supported; the
    /// provider appends `/chat/completions`.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model requested for completions
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the environment variable holding the bearer token
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// Chat behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// System message seeded into brand-new sessions
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Maximum seconds to wait for the next streamed chunk
    ///
    /// A hung remote call would otherwise block the process indefinitely;
    /// hitting this timeout fails the turn like any other provider error.
    #[serde(default = "default_stream_idle_timeout")]
    pub stream_idle_timeout_seconds: u64,
}

fn default_system_prompt() -> String {
    "You are a helpful assistant.".to_string()
}

fn default_stream_idle_timeout() -> u64 {
    120
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            stream_idle_timeout_seconds: default_stream_idle_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from a file with environment overrides applied
    ///
    /// A missing file is not an error; defaults are used with a warning.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfabError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ConfabError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(provider_type) = std::env::var("CONFAB_PROVIDER") {
            self.provider.provider_type = provider_type;
        }
        if let Ok(api_base) = std::env::var("CONFAB_OPENAI_API_BASE") {
            self.provider.openai.api_base = api_base;
        }
        if let Ok(model) = std::env::var("CONFAB_OPENAI_MODEL") {
            self.provider.openai.model = model;
        }
    }

    /// Validate the loaded configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown provider type or an
    /// empty model name.
    pub fn validate(&self) -> Result<()> {
        if self.provider.provider_type != "openai" {
            return Err(ConfabError::Config(format!(
                "Unknown provider type: {}",
                self.provider.provider_type
            ))
            .into());
        }
        if self.provider.openai.model.trim().is_empty() {
            return Err(ConfabError::Config("Model name must not be empty".to_string()).into());
        }
        if self.provider.openai.api_base.trim().is_empty() {
            return Err(ConfabError::Config("API base must not be empty".to_string()).into());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}
