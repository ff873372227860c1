//! OpenAI-compatible provider implementation
//!
//! Speaks the `/chat/completions` protocol with `stream: true`: the response
//! body is a server-sent-event stream whose `data:` payloads carry JSON
//! chunks with incremental `choices[0].delta.content` text, terminated by a
//! literal `[DONE]` payload.

use crate::config::OpenAiConfig;
use crate::error::{ConfabError, Result};
use crate::providers::{ChatMessage, ChatProvider, ChunkStream};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Payload that terminates an OpenAI SSE stream
const DONE_MARKER: &str = "[DONE]";

/// OpenAI-compatible chat completion provider
///
/// Connects to any server implementing the OpenAI chat-completions API
/// (including local gateways) and streams completions back chunk by chunk.
///
/// # Examples
///
/// ```no_run
/// use confab::config::OpenAiConfig;
/// use confab::providers::{ChatMessage, ChatProvider, OpenAiProvider};
///
/// # async fn example() -> confab::error::Result<()> {
/// let provider = OpenAiProvider::new(OpenAiConfig::default())?;
/// let messages = vec![ChatMessage::user("Hello!")];
/// let stream = provider.stream_chat(&messages).await?;
/// # Ok(())
/// # }
/// ```
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

/// Request structure for the chat completions endpoint
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

/// One streamed completion chunk
#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

/// A single choice inside a streamed chunk
#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

/// Incremental delta carried by a chunk; content is absent for role-only
/// and final chunks
#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
    /// Create a new provider instance
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent("confab/0.1.0")
            .build()
            .map_err(|e| ConfabError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized OpenAI-compatible provider: api_base={}, model={}",
            config.api_base,
            config.model
        );

        Ok(Self { client, config })
    }

    fn api_key(&self) -> Result<String> {
        std::env::var(&self.config.api_key_env).map_err(|_| {
            ConfabError::Provider(format!(
                "API key not found: set the {} environment variable",
                self.config.api_key_env
            ))
            .into()
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> String {
        self.config.model.clone()
    }

    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<ChunkStream> {
        let url = format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'));
        let request = CompletionRequest {
            model: &self.config.model,
            messages,
            stream: true,
        };

        tracing::debug!(
            "Requesting streamed completion: {} messages, model={}",
            messages.len(),
            self.config.model
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key()?)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Completion request failed: {}", e);
                ConfabError::Provider(format!("Completion request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Completion endpoint returned {}: {}", status, error_text);
            return Err(ConfabError::Provider(format!(
                "Completion endpoint returned {}: {}",
                status, error_text
            ))
            .into());
        }

        let byte_stream = response.bytes_stream();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            pump_sse_stream(byte_stream, tx).await;
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

/// Consume an SSE byte stream, forwarding text deltas to `tx`
///
/// Runs until the `[DONE]` payload, end of body, or a read error. Errors are
/// forwarded as the stream's final item so the consumer can abort the turn.
async fn pump_sse_stream(
    byte_stream: impl Stream<Item = reqwest::Result<Bytes>>,
    tx: mpsc::UnboundedSender<Result<String>>,
) {
    let mut events = SseEventBuffer::new();

    tokio::pin!(byte_stream);

    while let Some(chunk_result) = byte_stream.next().await {
        let chunk = match chunk_result {
            Ok(c) => c,
            Err(e) => {
                let _ = tx.send(Err(
                    ConfabError::Provider(format!("Stream interrupted: {}", e)).into()
                ));
                return;
            }
        };

        let text = match std::str::from_utf8(&chunk) {
            Ok(s) => s,
            Err(_) => continue,
        };

        for payload in events.push(text) {
            if !forward_payload(&payload, &tx) {
                return;
            }
        }
    }

    // Process any remaining partial event in the buffer.
    if let Some(payload) = events.take_remainder() {
        forward_payload(&payload, &tx);
    }
}

/// Decode one `data:` payload and send its delta; returns false when the
/// stream should stop (terminator, decode error, or receiver gone)
fn forward_payload(payload: &str, tx: &mpsc::UnboundedSender<Result<String>>) -> bool {
    if payload == DONE_MARKER {
        return false;
    }

    match extract_delta(payload) {
        Ok(Some(delta)) if !delta.is_empty() => tx.send(Ok(delta)).is_ok(),
        Ok(_) => true,
        Err(e) => {
            let _ = tx.send(Err(e));
            false
        }
    }
}

/// Pull the text delta out of one streamed JSON payload
fn extract_delta(payload: &str) -> Result<Option<String>> {
    let chunk: CompletionChunk = serde_json::from_str(payload).map_err(|e| {
        ConfabError::Provider(format!("Failed to parse completion chunk: {}", e))
    })?;
    Ok(chunk.choices.into_iter().next().and_then(|c| c.delta.content))
}

/// Accumulates raw SSE text and yields complete `data:` payloads
///
/// Events are separated by blank lines; `data:` values spanning multiple
/// lines are joined with newlines. Payloads may arrive split across
/// arbitrary read boundaries, so a buffer carries partial events between
/// calls.
struct SseEventBuffer {
    buffer: String,
}

impl SseEventBuffer {
    fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Feed raw stream text; returns the data payloads completed by it
    fn push(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(text);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let event_block = self.buffer[..pos].to_string();
            self.buffer = self.buffer[pos + 2..].to_string();
            if let Some(payload) = parse_event_block(&event_block) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Drain a trailing event not terminated by a blank line
    fn take_remainder(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let block = std::mem::take(&mut self.buffer);
        parse_event_block(&block)
    }
}

/// Extract the joined `data:` value from one SSE event block
///
/// Lines starting with `:` are SSE comments; `event:`/`id:`/`retry:` fields
/// carry nothing the completion protocol needs and are skipped.
fn parse_event_block(event_block: &str) -> Option<String> {
    let mut data_lines: Vec<&str> = Vec::new();

    for line in event_block.lines() {
        if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.trim());
        }
    }

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}
